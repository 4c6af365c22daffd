use crate::model::enums::Score;
use crate::model::post::Post;
use crate::model::user::User;
use crate::schema::{comment, comment_hide, comment_save, comment_vote};
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;

#[derive(Insertable)]
#[diesel(table_name = comment)]
#[diesel(check_for_backend(Pg))]
pub struct NewComment<'a> {
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub text: &'a str,
}

#[derive(Clone, Associations, Identifiable, Queryable, Selectable)]
#[diesel(belongs_to(Post), belongs_to(User))]
#[diesel(table_name = comment)]
#[diesel(check_for_backend(Pg))]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub text: String,
    pub creation_time: DateTime,
    pub last_edit_time: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = comment_vote)]
#[diesel(check_for_backend(Pg))]
pub struct NewCommentVote {
    pub comment_id: i64,
    pub user_id: i64,
    pub value: Score,
}

#[derive(Associations, Identifiable, Queryable, Selectable)]
#[diesel(belongs_to(Comment), belongs_to(User))]
#[diesel(table_name = comment_vote)]
#[diesel(primary_key(comment_id, user_id))]
#[diesel(check_for_backend(Pg))]
pub struct CommentVote {
    pub comment_id: i64,
    pub user_id: i64,
    pub value: Score,
    pub time: DateTime,
}

#[derive(Insertable)]
#[diesel(table_name = comment_save)]
#[diesel(check_for_backend(Pg))]
pub struct NewCommentSave {
    pub comment_id: i64,
    pub user_id: i64,
}

#[derive(Insertable)]
#[diesel(table_name = comment_hide)]
#[diesel(check_for_backend(Pg))]
pub struct NewCommentHide {
    pub comment_id: i64,
    pub user_id: i64,
}
