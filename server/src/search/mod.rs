use crate::model::enums::TagType;
use std::collections::HashSet;
use std::str::FromStr;

pub mod comment;
pub mod post;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filter '{0}' has no values")]
    EmptyCondition(String),
    #[error("'{0}' is not a tag type")]
    UnknownTagType(String),
}

/// A single term of a search query. Terms are separated by whitespace and look like
/// `make:Toyota,Honda`. A leading `-` negates the term. A term without a key matches
/// tags of any type.
#[derive(Debug, PartialEq, Eq)]
pub struct Term<'a> {
    pub tag_type: Option<TagType>,
    pub values: Vec<&'a str>,
    pub negated: bool,
}

/// Splits `criteria` into terms.
pub fn parse_terms(criteria: &str) -> Result<Vec<Term<'_>>, Error> {
    criteria
        .split_whitespace()
        .map(|term| {
            let (unnegated_term, negated) = match term.strip_prefix('-') {
                Some(unnegated_term) => (unnegated_term, true),
                None => (term, false),
            };
            let (tag_type, condition) = match unnegated_term.split_once(':') {
                Some((key, condition)) => {
                    let tag_type = TagType::from_str(key).map_err(|_| Error::UnknownTagType(key.to_owned()))?;
                    (Some(tag_type), condition)
                }
                None => (None, unnegated_term),
            };

            let values: Vec<&str> = condition.split(',').filter(|value| !value.is_empty()).collect();
            if values.is_empty() {
                return Err(Error::EmptyCondition(term.to_owned()));
            }
            Ok(Term {
                tag_type,
                values,
                negated,
            })
        })
        .collect()
}

/// Stores results from what would otherwise be subqueries of a search query.
/// `PostgreSQL` does a poor job of optimizing queries that contain many subquery
/// filters, so candidate sets are resolved up front and combined here.
#[derive(Debug, Default)]
pub struct MatchSet {
    matches: Option<HashSet<i64>>,
    nonmatches: HashSet<i64>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates `self` with a new batch of `ids`, which may represent a matching
    /// (`negated = false`) or nonmatching (`negated = true`) set.
    pub fn update(&mut self, ids: Vec<i64>, negated: bool) {
        // Nonmatching sets are unioned while matching sets are intersected
        if negated {
            self.nonmatches.extend(ids);
        } else {
            self.matches = Some(match self.matches.as_ref() {
                Some(matches) => ids.into_iter().filter(|id| matches.contains(id)).collect(),
                None => ids.into_iter().collect(),
            });
        }
    }

    /// Returns true if a positive constraint has been applied and nothing survived it.
    pub fn is_exhausted(&self) -> bool {
        self.matches.as_ref().is_some_and(|matches| matches.is_subset(&self.nonmatches))
    }

    /// Candidate ids, or `None` if every id is a candidate. Nonmatches are already removed.
    pub fn matches(&self) -> Option<Vec<i64>> {
        self.matches
            .as_ref()
            .map(|matches| matches.difference(&self.nonmatches).copied().collect())
    }

    /// Ids that must be excluded. Only meaningful if [`MatchSet::matches`] is `None`.
    pub fn nonmatches(&self) -> Vec<i64> {
        self.nonmatches.iter().copied().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terms() {
        let terms = parse_terms("year:2023  make:Toyota,Honda -model:Prius Supra").unwrap();
        assert_eq!(
            terms,
            vec![
                Term {
                    tag_type: Some(TagType::Year),
                    values: vec!["2023"],
                    negated: false,
                },
                Term {
                    tag_type: Some(TagType::Make),
                    values: vec!["Toyota", "Honda"],
                    negated: false,
                },
                Term {
                    tag_type: Some(TagType::Model),
                    values: vec!["Prius"],
                    negated: true,
                },
                Term {
                    tag_type: None,
                    values: vec!["Supra"],
                    negated: false,
                },
            ]
        );
        assert!(parse_terms("").unwrap().is_empty());
    }

    #[test]
    fn bad_terms() {
        assert!(matches!(parse_terms("color:red"), Err(Error::UnknownTagType(key)) if key == "color"));
        assert!(matches!(parse_terms("make:"), Err(Error::EmptyCondition(_))));
        assert!(matches!(parse_terms("make:,,"), Err(Error::EmptyCondition(_))));
    }

    #[test]
    fn match_set() {
        let mut set = MatchSet::new();
        assert_eq!(set.matches(), None);
        assert!(!set.is_exhausted());

        set.update(vec![1, 2, 3, 4], false);
        set.update(vec![2, 3, 4, 5], false);
        set.update(vec![4], true);
        let mut matches = set.matches().unwrap();
        matches.sort_unstable();
        assert_eq!(matches, vec![2, 3]);
        assert!(!set.is_exhausted());

        set.update(vec![2, 3], true);
        assert!(set.is_exhausted());

        let mut excluding = MatchSet::new();
        excluding.update(vec![7], true);
        assert_eq!(excluding.matches(), None);
        assert_eq!(excluding.nonmatches(), vec![7]);
        assert!(!excluding.is_exhausted());

        let mut disjoint = MatchSet::new();
        disjoint.update(vec![1], false);
        disjoint.update(vec![2], false);
        assert!(disjoint.is_exhausted());
    }
}
