use diesel::{Identifiable, QueryResult};
use std::collections::HashMap;
use std::ops::IndexMut;
use std::str::FromStr;

pub mod car;
pub mod comment;
pub mod post;
pub mod tag;
pub mod user;
pub mod user_token;

pub trait BoolFill {
    fn filled(val: bool) -> Self;
}

/// Creates a boolean `FieldTable` from an (optional) comma separated `fields` [str].
pub fn create_table<T, E>(fields: Option<&str>) -> Result<T, <E as FromStr>::Err>
where
    T: BoolFill + IndexMut<E, Output = bool>,
    E: FromStr,
{
    if let Some(fields_str) = fields {
        let mut table = T::filled(false);
        for field in fields_str.split(',') {
            table[E::from_str(field)?] = true;
        }
        Ok(table)
    } else {
        Ok(T::filled(true))
    }
}

/// Validates that a batch retrieval is the expected size.
fn check_batch_results(batch_size: usize, retrieved_size: usize) {
    debug_assert!(retrieved_size == 0 || retrieved_size == batch_size);
}

/// Validates that a retrieval designed to fetch one element actually does contain only one element.
/// An empty batch means the resource was deleted after it was looked up.
fn single<T>(mut batch: Vec<T>) -> QueryResult<T> {
    debug_assert!(batch.len() <= 1);
    batch.pop().ok_or(diesel::result::Error::NotFound)
}

/// Convience function that shortens line counts.
fn retrieve<T, E, F>(enabled: bool, mut function: F) -> Result<Vec<T>, E>
where
    F: FnMut() -> Result<Vec<T>, E>,
{
    if enabled { function() } else { Ok(Vec::new()) }
}

/// For a given set of resources, orders them so that their primary keys are in the same order
/// as the order slice. Ids without a resource are skipped, since rows can disappear between the
/// statement that found the ids and the one that loads them.
fn order_as<T>(values: Vec<T>, order: &[i64]) -> Vec<T>
where
    for<'a> &'a T: Identifiable<Id = &'a i64>,
{
    order_transformed_as(values, order, |value| *value.id())
}

/// Similar to [`order_as`], but extracts primary key of `values` using `get_id` function.
fn order_transformed_as<V, F>(values: Vec<V>, order: &[i64], get_id: F) -> Vec<V>
where
    F: Fn(&V) -> i64,
{
    let mut values: HashMap<i64, V> = values.into_iter().map(|value| (get_id(&value), value)).collect();
    order.iter().filter_map(|id| values.remove(id)).collect()
}

/// Maps `(id, value)` pairs onto `ids`, producing one entry per id.
fn order_lookup<T>(values: Vec<(i64, T)>, ids: &[i64]) -> Vec<Option<T>> {
    let mut values: HashMap<i64, T> = values.into_iter().collect();
    ids.iter().map(|id| values.remove(id)).collect()
}

/// Like [`order_lookup`], but ids without a value get `T::default()`. Used for aggregates
/// like scores and counts, where resources with no rows simply don't appear in the query results.
fn order_aggregate<T: Default>(values: Vec<(i64, T)>, ids: &[i64]) -> Vec<T> {
    order_lookup(values, ids).into_iter().map(Option::unwrap_or_default).collect()
}

/// Groups `(id, value)` pairs by id and lays the groups out in the order of `ids`.
/// Values within a group keep their relative order.
fn group_by_id<T>(values: Vec<(i64, T)>, ids: &[i64]) -> Vec<Vec<T>> {
    let positions: HashMap<i64, usize> = ids.iter().enumerate().map(|(index, &id)| (id, index)).collect();
    let mut groups: Vec<Vec<T>> = std::iter::repeat_with(Vec::new).take(ids.len()).collect();
    for (id, value) in values {
        if let Some(&position) = positions.get(&id) {
            groups[position].push(value);
        }
    }
    groups
}

/// Returns which of `ids` appear in `present`, in the order of `ids`.
fn flag_present(present: &[i64], ids: &[i64]) -> Vec<bool> {
    ids.iter().map(|id| present.contains(id)).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ordering() {
        let values = vec![(3, 'c'), (1, 'a'), (2, 'b')];
        let ordered = order_transformed_as(values, &[1, 2, 3], |&(id, _)| id);
        assert_eq!(ordered, vec![(1, 'a'), (2, 'b'), (3, 'c')]);

        // Resources deleted between the id search and the batch load are left out
        let values = vec![(3, 'c'), (1, 'a')];
        let ordered = order_transformed_as(values, &[1, 2, 3], |&(id, _)| id);
        assert_eq!(ordered, vec![(1, 'a'), (3, 'c')]);
        assert_eq!(order_lookup(vec![(3, 'c')], &[1, 3]), vec![None, Some('c')]);

        let scores = order_aggregate(vec![(7, 4_i64), (5, -2)], &[5, 6, 7]);
        assert_eq!(scores, vec![-2, 0, 4]);
    }

    #[test]
    fn single_resource() {
        assert_eq!(single(vec![7]).ok(), Some(7));
        assert!(matches!(single(Vec::<i64>::new()), Err(diesel::result::Error::NotFound)));
    }

    #[test]
    fn grouping() {
        let tags = vec![(2, "make"), (1, "year"), (2, "model"), (9, "stray")];
        let groups = group_by_id(tags, &[1, 2, 3]);
        assert_eq!(groups, vec![vec!["year"], vec!["make", "model"], vec![]]);

        assert_eq!(flag_present(&[3], &[1, 3]), vec![false, true]);
    }

    #[test]
    fn field_table() {
        use crate::resource::post::{Field, FieldTable};

        let all: FieldTable<bool> = create_table::<_, Field>(None).unwrap();
        assert!(all[Field::Title] && all[Field::OwnVote]);

        let some: FieldTable<bool> = create_table::<_, Field>(Some("id,score")).unwrap();
        assert!(some[Field::Id] && some[Field::Score]);
        assert!(!some[Field::Body]);

        assert!(create_table::<FieldTable<bool>, Field>(Some("id,avatarUrl")).is_err());
    }
}
