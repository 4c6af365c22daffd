use crate::model::enums::Score;
use crate::model::tag::Tag;
use crate::model::user::User;
use crate::schema::{post, post_hide, post_save, post_tag, post_vote};
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;

#[derive(Insertable)]
#[diesel(table_name = post)]
#[diesel(check_for_backend(Pg))]
pub struct NewPost<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Clone, AsChangeset, Associations, Identifiable, Queryable, Selectable)]
#[diesel(belongs_to(User))]
#[diesel(table_name = post)]
#[diesel(check_for_backend(Pg))]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub creation_time: DateTime,
    pub last_edit_time: DateTime,
}

pub type NewPostTag = PostTag;

#[derive(Associations, Identifiable, Insertable, Queryable, Selectable)]
#[diesel(belongs_to(Post), belongs_to(Tag))]
#[diesel(table_name = post_tag)]
#[diesel(primary_key(post_id, tag_id))]
#[diesel(check_for_backend(Pg))]
pub struct PostTag {
    pub post_id: i64,
    pub tag_id: i64,
}

#[derive(Insertable)]
#[diesel(table_name = post_vote)]
#[diesel(check_for_backend(Pg))]
pub struct NewPostVote {
    pub post_id: i64,
    pub user_id: i64,
    pub value: Score,
}

#[derive(Associations, Identifiable, Queryable, Selectable)]
#[diesel(belongs_to(Post), belongs_to(User))]
#[diesel(table_name = post_vote)]
#[diesel(primary_key(post_id, user_id))]
#[diesel(check_for_backend(Pg))]
pub struct PostVote {
    pub post_id: i64,
    pub user_id: i64,
    pub value: Score,
    pub time: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = post_save)]
#[diesel(check_for_backend(Pg))]
pub struct NewPostSave {
    pub post_id: i64,
    pub user_id: i64,
}

#[derive(Insertable)]
#[diesel(table_name = post_hide)]
#[diesel(check_for_backend(Pg))]
pub struct NewPostHide {
    pub post_id: i64,
    pub user_id: i64,
}
