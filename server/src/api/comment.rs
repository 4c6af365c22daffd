use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{DeleteBody, ReportBody, ResourceParams, SaveResponse, VoteBody};
use crate::app::AppState;
use crate::auth::Client;
use crate::model::comment::{Comment, NewComment};
use crate::model::enums::ResourceType;
use crate::resource::comment::CommentInfo;
use crate::schema::{comment, post};
use crate::time::DateTime;
use crate::update::vote::{VoteOutcome, VoteTarget};
use crate::{api, resource, update};
use axum::extract::{Extension, State};
use axum::{Router, routing};
use diesel::dsl::exists;
use diesel::{
    Connection, ExpressionMethods, Insertable, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl,
    SelectableHelper, select,
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/comments", routing::post(create))
        .route("/comment/{id}", routing::get(get).put(update).delete(delete))
        .route("/comment/{id}/vote", routing::post(vote))
        .route("/comment/{id}/save", routing::post(save))
        .route("/comment/{id}/hide", routing::post(hide).delete(unhide))
        .route("/comment/{id}/report", routing::post(report))
}

async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<Json<CommentInfo>> {
    api::verify_privilege(client, state.config.privileges().comment_view)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let comment = load(conn, comment_id)?;
        CommentInfo::new(conn, client, comment, &fields)
            .map(Json)
            .map_err(ApiError::from)
    })
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CreateBody {
    post_id: i64,
    parent_id: Option<i64>,
    text: String,
}

/// Comments on a post, optionally as a reply to another comment on the same post.
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<CreateBody>,
) -> ApiResult<Json<CommentInfo>> {
    api::verify_privilege(client, state.config.privileges().comment_create)?;
    let user_id = api::require_login(client)?;
    let text = api::non_empty(&body.text, "Text")?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let mut conn = state.get_connection()?;
    let comment = conn.transaction(|conn| {
        let post_exists: bool = select(exists(post::table.find(body.post_id))).get_result(conn)?;
        if !post_exists {
            return Err(ApiError::NotFound(ResourceType::Post));
        }
        if let Some(parent_id) = body.parent_id {
            let parent_post_id: i64 = comment::table
                .find(parent_id)
                .select(comment::post_id)
                .first(conn)
                .optional()?
                .ok_or(ApiError::NotFound(ResourceType::ParentComment))?;
            if parent_post_id != body.post_id {
                return Err(ApiError::ParentNotOnPost);
            }
        }

        NewComment {
            post_id: body.post_id,
            user_id,
            parent_id: body.parent_id,
            text,
        }
        .insert_into(comment::table)
        .returning(Comment::as_returning())
        .get_result(conn)
        .map_err(ApiError::from)
    })?;

    conn.transaction(|conn| CommentInfo::new(conn, client, comment, &fields))
        .map(Json)
        .map_err(ApiError::from)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateBody {
    version: DateTime,
    text: String,
}

/// Edits the text of a comment. The post and parent of a comment never change.
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<CommentInfo>> {
    let text = api::non_empty(&body.text, "Text")?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let mut conn = state.get_connection()?;
    conn.transaction(|conn| {
        let comment = load(conn, comment_id)?;
        let privileges = state.config.privileges();
        api::verify_ownership(client, comment.user_id, privileges.comment_edit_own, privileges.comment_edit_any)?;
        api::verify_version(comment.last_edit_time, body.version)?;

        diesel::update(comment::table.find(comment_id))
            .set(comment::text.eq(text))
            .execute(conn)?;
        update::comment::last_edit_time(conn, comment_id).map_err(ApiError::from)
    })?;

    conn.transaction(|conn| CommentInfo::new_from_id(conn, client, comment_id, &fields))
        .map(Json)
        .map_err(ApiError::from)
}

/// Deletes a comment. Replies to it stay on the post.
async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
    Json(body): Json<DeleteBody>,
) -> ApiResult<Json<()>> {
    state.get_connection()?.transaction(|conn| {
        let comment = load(conn, comment_id)?;
        let privileges = state.config.privileges();
        api::verify_ownership(
            client,
            comment.user_id,
            privileges.comment_delete_own,
            privileges.comment_delete_any,
        )?;
        api::verify_version(comment.last_edit_time, body.version)?;

        update::comment::delete(conn, comment_id)?;
        Ok(Json(()))
    })
}

async fn vote(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
    Json(body): Json<VoteBody>,
) -> ApiResult<Json<VoteOutcome>> {
    api::verify_privilege(client, state.config.privileges().comment_vote)?;
    let user_id = api::require_login(client)?;
    let score = body.score()?;

    let mut conn = state.get_connection()?;
    update::vote::cast(&mut conn, &state.config, user_id, VoteTarget::Comment(comment_id), score).map(Json)
}

async fn save(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<SaveResponse>> {
    api::verify_privilege(client, state.config.privileges().comment_save)?;
    let user_id = api::require_login(client)?;

    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, comment_id)?;
        let saved = update::comment::toggle_save(conn, comment_id, user_id)?;
        Ok(Json(SaveResponse { saved }))
    })
}

async fn hide(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().comment_hide)?;
    let user_id = api::require_login(client)?;

    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, comment_id)?;
        update::comment::hide(conn, comment_id, user_id)?;
        Ok(Json(()))
    })
}

async fn unhide(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().comment_hide)?;
    let user_id = api::require_login(client)?;

    let mut conn = state.get_connection()?;
    update::comment::unhide(&mut conn, comment_id, user_id)?;
    Ok(Json(()))
}

async fn report(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(comment_id): Path<i64>,
    Json(body): Json<ReportBody>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().comment_report)?;
    let user_id = api::require_login(client)?;
    let reason = api::non_empty(&body.reason, "Reason")?;

    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, comment_id)?;
        update::comment::report(conn, comment_id, user_id, reason)?;
        Ok(Json(()))
    })
}

fn load(conn: &mut PgConnection, comment_id: i64) -> ApiResult<Comment> {
    comment::table
        .find(comment_id)
        .select(Comment::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Comment))
}

fn verify_exists(conn: &mut PgConnection, comment_id: i64) -> ApiResult<()> {
    select(exists(comment::table.find(comment_id)))
        .get_result::<bool>(conn)?
        .then_some(())
        .ok_or(ApiError::NotFound(ResourceType::Comment))
}

#[cfg(test)]
mod test {
    use crate::test::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn anonymous_mutations() {
        let server = test_server();

        server
            .post("/comments")
            .json(&json!({ "postId": 1, "parentId": null, "text": "Nice build" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/comment/1/vote")
            .json(&json!({ "score": -1 }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server.post("/comment/1/save").await.assert_status(StatusCode::UNAUTHORIZED);
        server.post("/comment/1/hide").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/comment/1/report")
            .json(&json!({ "reason": "off topic" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_post_id() {
        test_server()
            .post("/comments")
            .json(&json!({ "text": "Orphaned thought" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
