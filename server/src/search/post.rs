use crate::auth::Client;
use crate::model::enums::TagType;
use crate::schema::{post, post_hide, post_save, post_tag, tag};
use crate::search::{self, MatchSet};
use crate::string::SmallString;
use crate::time::Timer;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Which tags the posts of a feed must or must not carry. Values given for the same tag type
/// are alternatives, while every tag type given must match. `None` stands for "any tag type".
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PostFilter {
    required: BTreeMap<Option<TagType>, Vec<SmallString>>,
    excluded: BTreeMap<Option<TagType>, Vec<SmallString>>,
}

impl PostFilter {
    /// Builds a filter from query parameters like `?year=2023&make=Toyota&make=Honda`.
    /// Keys that aren't tag types are ignored.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            if let Ok(tag_type) = TagType::from_str(key.as_ref()) {
                filter.add(Some(tag_type), value.as_ref(), false);
            }
        }
        filter
    }

    /// Adds the terms of a search query like `year:2023 make:Toyota,Honda -model:Prius`.
    pub fn add_criteria(&mut self, criteria: &str) -> Result<(), search::Error> {
        for term in search::parse_terms(criteria)? {
            for value in term.values {
                self.add(term.tag_type, value, term.negated);
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }

    fn add(&mut self, tag_type: Option<TagType>, value: &str, negated: bool) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let constraints = if negated { &mut self.excluded } else { &mut self.required };
        let values = constraints.entry(tag_type).or_default();
        if !values.iter().any(|existing| existing.as_str() == value) {
            values.push(SmallString::new(value));
        }
    }
}

/// Returns the total number of posts in the feed of `client` that pass `filter`, along with the
/// ids of the posts on the requested page, newest first. Posts hidden by the client are left out.
pub fn list(
    conn: &mut PgConnection,
    client: Client,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> QueryResult<(i64, Vec<i64>)> {
    let _timer = Timer::new("post feed");

    let mut match_set = MatchSet::new();
    for (&tag_type, names) in &filter.required {
        match_set.update(tagged_posts(conn, tag_type, names)?, false);
        if match_set.is_exhausted() {
            return Ok((0, Vec::new()));
        }
    }
    for (&tag_type, names) in &filter.excluded {
        match_set.update(tagged_posts(conn, tag_type, names)?, true);
    }
    if let Some(user_id) = client.id {
        let hidden_posts = post_hide::table
            .select(post_hide::post_id)
            .filter(post_hide::user_id.eq(user_id))
            .load(conn)?;
        match_set.update(hidden_posts, true);
    }
    if match_set.is_exhausted() {
        return Ok((0, Vec::new()));
    }

    let matches = match_set.matches();
    let nonmatches = match_set.nonmatches();
    let build_query = || {
        let query = post::table.select(post::id).into_boxed();
        match &matches {
            Some(post_ids) => query.filter(post::id.eq_any(post_ids.clone())),
            None if nonmatches.is_empty() => query,
            None => query.filter(post::id.ne_all(nonmatches.clone())),
        }
    };

    let total = build_query().count().first(conn)?;
    let post_ids = build_query()
        .order_by((post::creation_time.desc(), post::id.desc()))
        .offset(offset)
        .limit(limit)
        .load(conn)?;
    Ok((total, post_ids))
}

/// Posts written by the user with id `user_id`, newest first.
pub fn by_author(conn: &mut PgConnection, user_id: i64, offset: i64, limit: i64) -> QueryResult<(i64, Vec<i64>)> {
    let total = post::table.filter(post::user_id.eq(user_id)).count().first(conn)?;
    let post_ids = post::table
        .select(post::id)
        .filter(post::user_id.eq(user_id))
        .order_by((post::creation_time.desc(), post::id.desc()))
        .offset(offset)
        .limit(limit)
        .load(conn)?;
    Ok((total, post_ids))
}

/// Posts saved by the user with id `user_id`, most recently saved first.
pub fn saved_by(conn: &mut PgConnection, user_id: i64, offset: i64, limit: i64) -> QueryResult<(i64, Vec<i64>)> {
    let total = post_save::table
        .filter(post_save::user_id.eq(user_id))
        .count()
        .first(conn)?;
    let post_ids = post_save::table
        .select(post_save::post_id)
        .filter(post_save::user_id.eq(user_id))
        .order_by((post_save::time.desc(), post_save::post_id.desc()))
        .offset(offset)
        .limit(limit)
        .load(conn)?;
    Ok((total, post_ids))
}

/// Posts hidden by the user with id `user_id`, most recently hidden first.
pub fn hidden_by(conn: &mut PgConnection, user_id: i64, offset: i64, limit: i64) -> QueryResult<(i64, Vec<i64>)> {
    let total = post_hide::table
        .filter(post_hide::user_id.eq(user_id))
        .count()
        .first(conn)?;
    let post_ids = post_hide::table
        .select(post_hide::post_id)
        .filter(post_hide::user_id.eq(user_id))
        .order_by((post_hide::time.desc(), post_hide::post_id.desc()))
        .offset(offset)
        .limit(limit)
        .load(conn)?;
    Ok((total, post_ids))
}

/// Ids of posts carrying a tag with any of the given `names`.
fn tagged_posts(conn: &mut PgConnection, tag_type: Option<TagType>, names: &[SmallString]) -> QueryResult<Vec<i64>> {
    let query = post_tag::table
        .inner_join(tag::table)
        .select(post_tag::post_id)
        .filter(tag::name.eq_any(names))
        .distinct()
        .into_boxed();
    match tag_type {
        Some(tag_type) => query.filter(tag::category.eq(tag_type)).load(conn),
        None => query.load(conn),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::UserRank;
    use crate::model::post::Post;
    use crate::model::user::User;
    use crate::test::*;
    use crate::update;
    use serial_test::serial;

    fn names(values: &[&str]) -> Vec<SmallString> {
        values.iter().map(SmallString::new).collect()
    }

    #[test]
    fn from_query_pairs() {
        let pairs = [("year", "2023"), ("make", "Toyota"), ("make", " Honda "), ("limit", "5"), ("make", "")];
        let filter = PostFilter::from_query_pairs(pairs);
        assert_eq!(filter.required.get(&Some(TagType::Year)), Some(&names(&["2023"])));
        assert_eq!(filter.required.get(&Some(TagType::Make)), Some(&names(&["Toyota", "Honda"])));
        assert_eq!(filter.required.len(), 2);
        assert!(filter.excluded.is_empty());

        assert!(PostFilter::from_query_pairs([("offset", "10")]).is_empty());
    }

    #[test]
    fn criteria() {
        let mut filter = PostFilter::from_query_pairs([("make", "Mazda")]);
        filter.add_criteria("make:Toyota,Mazda -trim:Base JDM").unwrap();
        assert_eq!(filter.required.get(&Some(TagType::Make)), Some(&names(&["Mazda", "Toyota"])));
        assert_eq!(filter.required.get(&None), Some(&names(&["JDM"])));
        assert_eq!(filter.excluded.get(&Some(TagType::Trim)), Some(&names(&["Base"])));

        let mut filter = PostFilter::default();
        assert!(filter.add_criteria("colour:blue").is_err());
        assert!(filter.is_empty());
    }

    fn tag_post(conn: &mut PgConnection, post: &Post, tags: &[(TagType, &str)]) -> QueryResult<()> {
        let tags: Vec<_> = tags
            .iter()
            .map(|&(tag_type, name)| (tag_type, SmallString::new(name)))
            .collect();
        let tag_ids = update::tag::get_or_create_ids(conn, &tags)?;
        update::tag::set_post_tags(conn, post.id, &tag_ids)
    }

    fn client_for(user: &User) -> Client {
        Client::new(Some(user.id), UserRank::Regular)
    }

    #[test]
    #[serial]
    fn tag_intersection() {
        test_transaction(|conn| {
            let user = create_test_user(conn, TEST_USERNAME)?;
            let both = create_test_post(conn, &user)?;
            let make_only = create_test_post(conn, &user)?;
            let year_only = create_test_post(conn, &user)?;
            tag_post(conn, &both, &[(TagType::Year, "2023"), (TagType::Make, "Toyota")])?;
            tag_post(conn, &make_only, &[(TagType::Year, "2021"), (TagType::Make, "Toyota")])?;
            tag_post(conn, &year_only, &[(TagType::Year, "2023"), (TagType::Make, "Honda")])?;

            let filter = PostFilter::from_query_pairs([("make", "Toyota"), ("year", "2023")]);
            let (total, post_ids) = list(conn, Client::anonymous(), &filter, 0, 50)?;
            assert_eq!(total, 1);
            assert_eq!(post_ids, vec![both.id]);

            let filter = PostFilter::from_query_pairs([("make", "Toyota"), ("make", "Honda"), ("year", "2023")]);
            let (total, _) = list(conn, Client::anonymous(), &filter, 0, 50)?;
            assert_eq!(total, 2);

            let filter = PostFilter::from_query_pairs([("make", "Yugo")]);
            assert_eq!(list(conn, Client::anonymous(), &filter, 0, 50)?, (0, Vec::new()));
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn hidden_posts_per_user() {
        test_transaction(|conn| {
            let author = create_test_user(conn, "feed_author")?;
            let reader = create_test_user(conn, "feed_reader")?;
            let older = create_test_post(conn, &author)?;
            let newer = create_test_post(conn, &author)?;
            update::post::hide(conn, newer.id, reader.id)?;

            let filter = PostFilter::default();
            let (_, reader_feed) = list(conn, client_for(&reader), &filter, 0, 50)?;
            assert!(reader_feed.contains(&older.id));
            assert!(!reader_feed.contains(&newer.id));

            let (_, author_feed) = list(conn, client_for(&author), &filter, 0, 50)?;
            let newer_position = author_feed.iter().position(|&id| id == newer.id);
            let older_position = author_feed.iter().position(|&id| id == older.id);
            assert!(newer_position.is_some());
            assert!(newer_position < older_position);

            let (total, hidden) = hidden_by(conn, reader.id, 0, 50)?;
            assert_eq!((total, hidden), (1, vec![newer.id]));
            Ok(())
        });
    }
}
