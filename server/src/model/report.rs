use crate::schema::report;
use diesel::pg::Pg;
use diesel::prelude::*;

/// Exactly one of `post_id` and `comment_id` must be set.
#[derive(Insertable)]
#[diesel(table_name = report)]
#[diesel(check_for_backend(Pg))]
pub struct NewReport<'a> {
    pub user_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub reason: &'a str,
}
