use crate::model::enums::TagType;
use crate::resource;
use crate::schema::{post_tag, tag};
use crate::string::SmallString;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MicroTag {
    pub name: SmallString,
    pub category: TagType,
}

/// Retrieves the tags of each post in `post_ids`, grouped and ordered like `post_ids`.
/// Tags on a post are ordered by type and then by name.
pub fn get_post_tags(conn: &mut PgConnection, post_ids: &[i64]) -> QueryResult<Vec<Vec<MicroTag>>> {
    let tags: Vec<(i64, SmallString, TagType)> = post_tag::table
        .inner_join(tag::table)
        .select((post_tag::post_id, tag::name, tag::category))
        .filter(post_tag::post_id.eq_any(post_ids))
        .order_by((post_tag::post_id, tag::category, tag::name))
        .load(conn)?;
    let tags: Vec<_> = tags
        .into_iter()
        .map(|(post_id, name, category)| (post_id, MicroTag { name, category }))
        .collect();
    Ok(resource::group_by_id(tags, post_ids))
}
