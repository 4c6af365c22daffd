use crate::auth::Client;
use crate::model::comment::Comment;
use crate::model::enums::{Rating, Score};
use crate::resource::user::MicroUser;
use crate::resource::{self, BoolFill};
use crate::schema::{comment, comment_save, comment_vote, post, user};
use crate::thread::Threaded;
use crate::time::DateTime;
use diesel::dsl::sum;
use diesel::{ExpressionMethods, Identifiable, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use serde::Serialize;
use serde_with::skip_serializing_none;
use strum::{EnumString, EnumTable};

/// The post a comment was written on, for listings outside of the post's own thread.
#[derive(Serialize)]
pub struct MicroPost {
    pub id: i64,
    pub title: String,
}

#[derive(Clone, Copy, EnumString, EnumTable)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    Version,
    Id,
    PostId,
    ParentId,
    Post,
    User,
    Text,
    CreationTime,
    LastEditTime,
    Score,
    OwnVote,
    OwnSaved,
}

impl BoolFill for FieldTable<bool> {
    fn filled(val: bool) -> Self {
        Self::filled(val)
    }
}

#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInfo {
    #[serde(skip)]
    comment_id: i64,
    #[serde(skip)]
    reply_to: Option<i64>,
    version: Option<DateTime>,
    id: Option<i64>,
    post_id: Option<i64>,
    parent_id: Option<Option<i64>>,
    post: Option<MicroPost>,
    user: Option<MicroUser>,
    text: Option<String>,
    creation_time: Option<DateTime>,
    last_edit_time: Option<DateTime>,
    score: Option<i64>,
    own_vote: Option<Rating>,
    own_saved: Option<bool>,
}

impl Threaded for CommentInfo {
    fn id(&self) -> i64 {
        self.comment_id
    }

    fn parent_id(&self) -> Option<i64> {
        self.reply_to
    }
}

impl CommentInfo {
    pub fn new(
        conn: &mut PgConnection,
        client: Client,
        comment: Comment,
        fields: &FieldTable<bool>,
    ) -> QueryResult<Self> {
        Self::new_batch(conn, client, vec![comment], fields).and_then(resource::single)
    }

    pub fn new_from_id(
        conn: &mut PgConnection,
        client: Client,
        comment_id: i64,
        fields: &FieldTable<bool>,
    ) -> QueryResult<Self> {
        Self::new_batch_from_ids(conn, client, &[comment_id], fields).and_then(resource::single)
    }

    pub fn new_batch(
        conn: &mut PgConnection,
        client: Client,
        comments: Vec<Comment>,
        fields: &FieldTable<bool>,
    ) -> QueryResult<Vec<Self>> {
        let comment_ids: Vec<i64> = comments.iter().map(Identifiable::id).copied().collect();
        let mut posts = resource::retrieve(fields[Field::Post], || get_posts(conn, &comment_ids))?;
        let mut authors = resource::retrieve(fields[Field::User], || get_authors(conn, &comment_ids))?;
        let mut scores = resource::retrieve(fields[Field::Score], || get_scores(conn, &comment_ids))?;
        let mut own_votes =
            resource::retrieve(fields[Field::OwnVote], || get_own_votes(conn, client, &comment_ids))?;
        let mut own_saves =
            resource::retrieve(fields[Field::OwnSaved], || get_own_saves(conn, client, &comment_ids))?;

        let batch_size = comments.len();
        resource::check_batch_results(batch_size, posts.len());
        resource::check_batch_results(batch_size, authors.len());
        resource::check_batch_results(batch_size, scores.len());
        resource::check_batch_results(batch_size, own_votes.len());
        resource::check_batch_results(batch_size, own_saves.len());

        let results = comments
            .into_iter()
            .rev()
            .map(|comment| Self {
                comment_id: comment.id,
                reply_to: comment.parent_id,
                version: fields[Field::Version].then_some(comment.last_edit_time),
                id: fields[Field::Id].then_some(comment.id),
                post_id: fields[Field::PostId].then_some(comment.post_id),
                parent_id: fields[Field::ParentId].then_some(comment.parent_id),
                post: posts.pop().flatten(),
                user: authors.pop().flatten(),
                text: fields[Field::Text].then_some(comment.text),
                creation_time: fields[Field::CreationTime].then_some(comment.creation_time),
                last_edit_time: fields[Field::LastEditTime].then_some(comment.last_edit_time),
                score: scores.pop(),
                own_vote: own_votes.pop(),
                own_saved: own_saves.pop(),
            })
            .collect::<Vec<_>>();
        Ok(results.into_iter().rev().collect())
    }

    pub fn new_batch_from_ids(
        conn: &mut PgConnection,
        client: Client,
        comment_ids: &[i64],
        fields: &FieldTable<bool>,
    ) -> QueryResult<Vec<Self>> {
        let unordered_comments = comment::table.filter(comment::id.eq_any(comment_ids)).load(conn)?;
        let comments = resource::order_as(unordered_comments, comment_ids);
        Self::new_batch(conn, client, comments, fields)
    }
}

fn get_posts(conn: &mut PgConnection, comment_ids: &[i64]) -> QueryResult<Vec<Option<MicroPost>>> {
    comment::table
        .inner_join(post::table)
        .select((comment::id, post::id, post::title))
        .filter(comment::id.eq_any(comment_ids))
        .load::<(i64, i64, String)>(conn)
        .map(|posts| {
            let posts = posts
                .into_iter()
                .map(|(comment_id, id, title)| (comment_id, MicroPost { id, title }))
                .collect();
            resource::order_lookup(posts, comment_ids)
        })
}

fn get_authors(conn: &mut PgConnection, comment_ids: &[i64]) -> QueryResult<Vec<Option<MicroUser>>> {
    comment::table
        .inner_join(user::table)
        .select((comment::id, user::name, user::karma))
        .filter(comment::id.eq_any(comment_ids))
        .load(conn)
        .map(|authors| resource::user::order_authors(authors, comment_ids))
}

fn get_scores(conn: &mut PgConnection, comment_ids: &[i64]) -> QueryResult<Vec<i64>> {
    comment_vote::table
        .group_by(comment_vote::comment_id)
        .select((comment_vote::comment_id, sum(comment_vote::value)))
        .filter(comment_vote::comment_id.eq_any(comment_ids))
        .load::<(i64, Option<i64>)>(conn)
        .map(|scores| {
            let scores: Vec<_> = scores
                .into_iter()
                .map(|(comment_id, score)| (comment_id, score.unwrap_or(0)))
                .collect();
            resource::order_aggregate(scores, comment_ids)
        })
}

fn get_own_votes(conn: &mut PgConnection, client: Client, comment_ids: &[i64]) -> QueryResult<Vec<Rating>> {
    let Some(client_id) = client.id else {
        return Ok(vec![Rating::default(); comment_ids.len()]);
    };
    comment_vote::table
        .select((comment_vote::comment_id, comment_vote::value))
        .filter(comment_vote::user_id.eq(client_id))
        .filter(comment_vote::comment_id.eq_any(comment_ids))
        .load::<(i64, Score)>(conn)
        .map(|votes| {
            let votes: Vec<_> = votes
                .into_iter()
                .map(|(comment_id, score)| (comment_id, Rating::from(score)))
                .collect();
            resource::order_aggregate(votes, comment_ids)
        })
}

fn get_own_saves(conn: &mut PgConnection, client: Client, comment_ids: &[i64]) -> QueryResult<Vec<bool>> {
    let Some(client_id) = client.id else {
        return Ok(vec![false; comment_ids.len()]);
    };
    comment_save::table
        .select(comment_save::comment_id)
        .filter(comment_save::user_id.eq(client_id))
        .filter(comment_save::comment_id.eq_any(comment_ids))
        .load(conn)
        .map(|saved: Vec<i64>| resource::flag_present(&saved, comment_ids))
}
