use crate::auth::Client;
use crate::model::enums::{Rating, Score};
use crate::model::post::Post;
use crate::resource::tag::MicroTag;
use crate::resource::user::MicroUser;
use crate::resource::{self, BoolFill};
use crate::schema::{comment, post, post_hide, post_save, post_vote, user};
use crate::time::DateTime;
use diesel::dsl::{count_star, sum};
use diesel::{ExpressionMethods, Identifiable, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use serde::Serialize;
use serde_with::skip_serializing_none;
use strum::{EnumString, EnumTable};

#[derive(Clone, Copy, EnumString, EnumTable)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    Version,
    Id,
    User,
    Title,
    Body,
    CreationTime,
    LastEditTime,
    Tags,
    Score,
    OwnVote,
    CommentCount,
    OwnSaved,
    OwnHidden,
}

impl BoolFill for FieldTable<bool> {
    fn filled(val: bool) -> Self {
        Self::filled(val)
    }
}

#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInfo {
    version: Option<DateTime>,
    id: Option<i64>,
    user: Option<MicroUser>,
    title: Option<String>,
    body: Option<String>,
    creation_time: Option<DateTime>,
    last_edit_time: Option<DateTime>,
    tags: Option<Vec<MicroTag>>,
    score: Option<i64>,
    own_vote: Option<Rating>,
    comment_count: Option<i64>,
    own_saved: Option<bool>,
    own_hidden: Option<bool>,
}

impl PostInfo {
    pub fn new(conn: &mut PgConnection, client: Client, post: Post, fields: &FieldTable<bool>) -> QueryResult<Self> {
        Self::new_batch(conn, client, vec![post], fields).and_then(resource::single)
    }

    pub fn new_from_id(
        conn: &mut PgConnection,
        client: Client,
        post_id: i64,
        fields: &FieldTable<bool>,
    ) -> QueryResult<Self> {
        Self::new_batch_from_ids(conn, client, &[post_id], fields).and_then(resource::single)
    }

    pub fn new_batch(
        conn: &mut PgConnection,
        client: Client,
        posts: Vec<Post>,
        fields: &FieldTable<bool>,
    ) -> QueryResult<Vec<Self>> {
        let post_ids: Vec<i64> = posts.iter().map(Identifiable::id).copied().collect();
        let mut authors = resource::retrieve(fields[Field::User], || get_authors(conn, &post_ids))?;
        let mut tags =
            resource::retrieve(fields[Field::Tags], || resource::tag::get_post_tags(conn, &post_ids))?;
        let mut scores = resource::retrieve(fields[Field::Score], || get_scores(conn, &post_ids))?;
        let mut own_votes = resource::retrieve(fields[Field::OwnVote], || get_own_votes(conn, client, &post_ids))?;
        let mut comment_counts =
            resource::retrieve(fields[Field::CommentCount], || get_comment_counts(conn, &post_ids))?;
        let mut own_saves = resource::retrieve(fields[Field::OwnSaved], || get_own_saves(conn, client, &post_ids))?;
        let mut own_hides = resource::retrieve(fields[Field::OwnHidden], || get_own_hides(conn, client, &post_ids))?;

        let batch_size = posts.len();
        resource::check_batch_results(batch_size, authors.len());
        resource::check_batch_results(batch_size, tags.len());
        resource::check_batch_results(batch_size, scores.len());
        resource::check_batch_results(batch_size, own_votes.len());
        resource::check_batch_results(batch_size, comment_counts.len());
        resource::check_batch_results(batch_size, own_saves.len());
        resource::check_batch_results(batch_size, own_hides.len());

        let results = posts
            .into_iter()
            .rev()
            .map(|post| Self {
                version: fields[Field::Version].then_some(post.last_edit_time),
                id: fields[Field::Id].then_some(post.id),
                user: authors.pop().flatten(),
                title: fields[Field::Title].then_some(post.title),
                body: fields[Field::Body].then_some(post.body),
                creation_time: fields[Field::CreationTime].then_some(post.creation_time),
                last_edit_time: fields[Field::LastEditTime].then_some(post.last_edit_time),
                tags: tags.pop(),
                score: scores.pop(),
                own_vote: own_votes.pop(),
                comment_count: comment_counts.pop(),
                own_saved: own_saves.pop(),
                own_hidden: own_hides.pop(),
            })
            .collect::<Vec<_>>();
        Ok(results.into_iter().rev().collect())
    }

    pub fn new_batch_from_ids(
        conn: &mut PgConnection,
        client: Client,
        post_ids: &[i64],
        fields: &FieldTable<bool>,
    ) -> QueryResult<Vec<Self>> {
        let unordered_posts = post::table.filter(post::id.eq_any(post_ids)).load(conn)?;
        let posts = resource::order_as(unordered_posts, post_ids);
        Self::new_batch(conn, client, posts, fields)
    }
}

fn get_authors(conn: &mut PgConnection, post_ids: &[i64]) -> QueryResult<Vec<Option<MicroUser>>> {
    post::table
        .inner_join(user::table)
        .select((post::id, user::name, user::karma))
        .filter(post::id.eq_any(post_ids))
        .load(conn)
        .map(|authors| resource::user::order_authors(authors, post_ids))
}

/// Score is the sum of all votes cast on a post.
fn get_scores(conn: &mut PgConnection, post_ids: &[i64]) -> QueryResult<Vec<i64>> {
    post_vote::table
        .group_by(post_vote::post_id)
        .select((post_vote::post_id, sum(post_vote::value)))
        .filter(post_vote::post_id.eq_any(post_ids))
        .load::<(i64, Option<i64>)>(conn)
        .map(|scores| {
            let scores: Vec<_> = scores
                .into_iter()
                .map(|(post_id, score)| (post_id, score.unwrap_or(0)))
                .collect();
            resource::order_aggregate(scores, post_ids)
        })
}

fn get_own_votes(conn: &mut PgConnection, client: Client, post_ids: &[i64]) -> QueryResult<Vec<Rating>> {
    let Some(client_id) = client.id else {
        return Ok(vec![Rating::default(); post_ids.len()]);
    };
    post_vote::table
        .select((post_vote::post_id, post_vote::value))
        .filter(post_vote::user_id.eq(client_id))
        .filter(post_vote::post_id.eq_any(post_ids))
        .load::<(i64, Score)>(conn)
        .map(|votes| {
            let votes: Vec<_> = votes
                .into_iter()
                .map(|(post_id, score)| (post_id, Rating::from(score)))
                .collect();
            resource::order_aggregate(votes, post_ids)
        })
}

fn get_comment_counts(conn: &mut PgConnection, post_ids: &[i64]) -> QueryResult<Vec<i64>> {
    comment::table
        .group_by(comment::post_id)
        .select((comment::post_id, count_star()))
        .filter(comment::post_id.eq_any(post_ids))
        .load::<(i64, i64)>(conn)
        .map(|counts| resource::order_aggregate(counts, post_ids))
}

fn get_own_saves(conn: &mut PgConnection, client: Client, post_ids: &[i64]) -> QueryResult<Vec<bool>> {
    let Some(client_id) = client.id else {
        return Ok(vec![false; post_ids.len()]);
    };
    post_save::table
        .select(post_save::post_id)
        .filter(post_save::user_id.eq(client_id))
        .filter(post_save::post_id.eq_any(post_ids))
        .load(conn)
        .map(|saved: Vec<i64>| resource::flag_present(&saved, post_ids))
}

fn get_own_hides(conn: &mut PgConnection, client: Client, post_ids: &[i64]) -> QueryResult<Vec<bool>> {
    let Some(client_id) = client.id else {
        return Ok(vec![false; post_ids.len()]);
    };
    post_hide::table
        .select(post_hide::post_id)
        .filter(post_hide::user_id.eq(client_id))
        .filter(post_hide::post_id.eq_any(post_ids))
        .load(conn)
        .map(|hidden: Vec<i64>| resource::flag_present(&hidden, post_ids))
}
