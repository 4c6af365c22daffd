use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{
    DeleteBody, PageParams, PagedResponse, ReportBody, ResourceParams, SaveResponse, UnpagedResponse, VoteBody,
};
use crate::app::AppState;
use crate::auth::Client;
use crate::model::comment::Comment;
use crate::model::enums::ResourceType;
use crate::model::post::{NewPost, Post};
use crate::resource::comment::CommentInfo;
use crate::resource::post::PostInfo;
use crate::schema::{comment, post};
use crate::search::post::PostFilter;
use crate::thread::{self, Node};
use crate::time::DateTime;
use crate::update::tag::TagSelection;
use crate::update::vote::{VoteOutcome, VoteTarget};
use crate::{api, resource, search, update};
use axum::extract::{Extension, RawQuery, State};
use axum::{Router, routing};
use diesel::dsl::exists;
use diesel::{Connection, ExpressionMethods, Insertable, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl};
use diesel::{SelectableHelper, select};
use serde::Deserialize;
use tracing::debug;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", routing::get(list).post(create))
        .route("/post/{id}", routing::get(get).put(update).delete(delete))
        .route("/post/{id}/comments", routing::get(get_comments))
        .route("/post/{id}/vote", routing::post(vote))
        .route("/post/{id}/save", routing::post(save))
        .route("/post/{id}/hide", routing::post(hide).delete(unhide))
        .route("/post/{id}/report", routing::post(report))
}

const MAX_POSTS_PER_PAGE: i64 = 50;

/// Lists the feed. Tag filters may be given as query parameters (`?make=Toyota&make=Honda&year=2023`)
/// and as a search query (`?query=make:Toyota -model:Prius`).
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<PagedResponse<PostInfo>>> {
    api::verify_privilege(client, state.config.privileges().post_list)?;

    let offset = params.offset();
    let limit = params.limit(MAX_POSTS_PER_PAGE);
    let fields = resource::create_table(params.fields()).map_err(Box::from)?;

    let raw_query = raw_query.unwrap_or_default();
    let mut filter = PostFilter::from_query_pairs(url::form_urlencoded::parse(raw_query.as_bytes()));
    filter.add_criteria(params.criteria())?;

    state.get_connection()?.transaction(|conn| {
        let (total, post_ids) = search::post::list(conn, client, &filter, offset, limit)?;
        Ok(Json(PagedResponse {
            query: params.into_query(),
            offset,
            limit,
            total,
            results: PostInfo::new_batch_from_ids(conn, client, &post_ids, &fields)?,
        }))
    })
}

async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<Json<PostInfo>> {
    api::verify_privilege(client, state.config.privileges().post_view)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let post = load(conn, post_id)?;
        PostInfo::new(conn, client, post, &fields)
            .map(Json)
            .map_err(ApiError::from)
    })
}

/// Returns the discussion on a post as a forest of comments, newest first at every level.
/// Comments the client has hidden are left out and their replies are shown as top-level comments.
async fn get_comments(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<Json<UnpagedResponse<Node<CommentInfo>>>> {
    api::verify_privilege(client, state.config.privileges().comment_view)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, post_id)?;
        let hidden = match client.id {
            Some(user_id) => update::comment::hidden_on_post(conn, post_id, user_id)?,
            None => Vec::new(),
        };
        let comments: Vec<Comment> = comment::table
            .select(Comment::as_select())
            .filter(comment::post_id.eq(post_id))
            .filter(comment::id.ne_all(hidden))
            .order_by((comment::creation_time.desc(), comment::id.desc()))
            .load(conn)?;

        let infos = CommentInfo::new_batch(conn, client, comments, &fields)?;
        Ok(Json(UnpagedResponse {
            results: thread::build(infos),
        }))
    })
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateBody {
    title: String,
    body: String,
    #[serde(default)]
    tags: TagSelection,
}

async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<CreateBody>,
) -> ApiResult<Json<PostInfo>> {
    api::verify_privilege(client, state.config.privileges().post_create)?;
    let user_id = api::require_login(client)?;

    let title = api::non_empty(&body.title, "Title")?;
    let tags = update::tag::validate(body.tags)?;
    update::tag::verify_reference(&state.config, state.reference.as_ref(), &tags)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let mut conn = state.get_connection()?;
    let post = conn.transaction(|conn| {
        let post: Post = NewPost {
            user_id,
            title,
            body: body.body.trim(),
        }
        .insert_into(post::table)
        .returning(Post::as_returning())
        .get_result(conn)?;

        let tag_ids = update::tag::get_or_create_ids(conn, &tags)?;
        update::tag::set_post_tags(conn, post.id, &tag_ids)?;
        Ok::<_, ApiError>(post)
    })?;
    debug!("User {user_id} created post {}", post.id);

    conn.transaction(|conn| PostInfo::new(conn, client, post, &fields))
        .map(Json)
        .map_err(ApiError::from)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateBody {
    version: DateTime,
    title: Option<String>,
    body: Option<String>,
    tags: Option<TagSelection>,
}

async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<PostInfo>> {
    let title = body.title.as_deref().map(|title| api::non_empty(title, "Title")).transpose()?;
    let tags = body.tags.map(update::tag::validate).transpose()?;
    if let Some(tags) = &tags {
        update::tag::verify_reference(&state.config, state.reference.as_ref(), tags)?;
    }

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let mut conn = state.get_connection()?;
    conn.transaction(|conn| {
        let post = load(conn, post_id)?;
        let privileges = state.config.privileges();
        api::verify_ownership(client, post.user_id, privileges.post_edit_own, privileges.post_edit_any)?;
        api::verify_version(post.last_edit_time, body.version)?;

        if let Some(title) = title {
            diesel::update(post::table.find(post_id))
                .set(post::title.eq(title))
                .execute(conn)?;
        }
        if let Some(text) = &body.body {
            diesel::update(post::table.find(post_id))
                .set(post::body.eq(text.trim()))
                .execute(conn)?;
        }
        if let Some(tags) = &tags {
            let tag_ids = update::tag::get_or_create_ids(conn, tags)?;
            update::tag::set_post_tags(conn, post_id, &tag_ids)?;
        }
        update::post::last_edit_time(conn, post_id).map_err(ApiError::from)
    })?;

    conn.transaction(|conn| PostInfo::new_from_id(conn, client, post_id, &fields))
        .map(Json)
        .map_err(ApiError::from)
}

async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
    Json(body): Json<DeleteBody>,
) -> ApiResult<Json<()>> {
    state.get_connection()?.transaction(|conn| {
        let post = load(conn, post_id)?;
        let privileges = state.config.privileges();
        api::verify_ownership(client, post.user_id, privileges.post_delete_own, privileges.post_delete_any)?;
        api::verify_version(post.last_edit_time, body.version)?;

        update::post::delete(conn, post_id)?;
        Ok(Json(()))
    })
}

async fn vote(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
    Json(body): Json<VoteBody>,
) -> ApiResult<Json<VoteOutcome>> {
    api::verify_privilege(client, state.config.privileges().post_vote)?;
    let user_id = api::require_login(client)?;
    let score = body.score()?;

    let mut conn = state.get_connection()?;
    update::vote::cast(&mut conn, &state.config, user_id, VoteTarget::Post(post_id), score).map(Json)
}

/// Saves the post if the client hasn't saved it yet, otherwise removes it from their saved posts.
async fn save(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<SaveResponse>> {
    api::verify_privilege(client, state.config.privileges().post_save)?;
    let user_id = api::require_login(client)?;

    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, post_id)?;
        let saved = update::post::toggle_save(conn, post_id, user_id)?;
        Ok(Json(SaveResponse { saved }))
    })
}

async fn hide(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().post_hide)?;
    let user_id = api::require_login(client)?;

    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, post_id)?;
        update::post::hide(conn, post_id, user_id)?;
        Ok(Json(()))
    })
}

async fn unhide(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().post_hide)?;
    let user_id = api::require_login(client)?;

    let mut conn = state.get_connection()?;
    update::post::unhide(&mut conn, post_id, user_id)?;
    Ok(Json(()))
}

async fn report(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(post_id): Path<i64>,
    Json(body): Json<ReportBody>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().post_report)?;
    let user_id = api::require_login(client)?;
    let reason = api::non_empty(&body.reason, "Reason")?;

    state.get_connection()?.transaction(|conn| {
        verify_exists(conn, post_id)?;
        update::post::report(conn, post_id, user_id, reason)?;
        Ok(Json(()))
    })
}

fn load(conn: &mut PgConnection, post_id: i64) -> ApiResult<Post> {
    post::table
        .find(post_id)
        .select(Post::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Post))
}

fn verify_exists(conn: &mut PgConnection, post_id: i64) -> ApiResult<()> {
    select(exists(post::table.find(post_id)))
        .get_result::<bool>(conn)?
        .then_some(())
        .ok_or(ApiError::NotFound(ResourceType::Post))
}
