use crate::model::enums::TagType;
use crate::schema::tag;
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;

#[derive(Insertable)]
#[diesel(table_name = tag)]
#[diesel(check_for_backend(Pg))]
pub struct NewTag<'a> {
    pub name: &'a str,
    pub category: TagType,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = tag)]
#[diesel(check_for_backend(Pg))]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub category: TagType,
    pub creation_time: DateTime,
}
