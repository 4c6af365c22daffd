use crate::api::error::{self, ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{PageParams, PagedResponse, ResourceParams};
use crate::app::AppState;
use crate::auth::{Client, password};
use crate::config::RegexType;
use crate::model::enums::{ResourceProperty, ResourceType};
use crate::model::user::{NewUser, User};
use crate::resource::comment::CommentInfo;
use crate::resource::post::PostInfo;
use crate::resource::user::{UserInfo, Visibility};
use crate::schema::user;
use crate::{api, resource, search};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum::extract::{Extension, State};
use axum::{Router, routing};
use diesel::dsl::exists;
use diesel::{
    Connection, ExpressionMethods, Insertable, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl,
    SelectableHelper, select,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", routing::post(create))
        .route("/user/{name}", routing::get(get))
        .route("/user/{name}/posts", routing::get(list_posts))
        .route("/user/{name}/comments", routing::get(list_comments))
        .route("/user-availability/{name}", routing::get(availability))
        .route("/saved-posts", routing::get(list_saved_posts))
        .route("/hidden-posts", routing::get(list_hidden_posts))
}

const MAX_POSTS_PER_PAGE: i64 = 50;
const MAX_COMMENTS_PER_PAGE: i64 = 100;

/// Looks up the id of the user called `name`. Names are case-insensitive.
pub fn id_from_name(conn: &mut PgConnection, name: &str) -> ApiResult<i64> {
    user::table
        .select(user::id)
        .filter(user::name.eq(name))
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::User))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateBody {
    name: String,
    password: String,
    email: Option<String>,
}

/// Registers a new user with the default rank.
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<CreateBody>,
) -> ApiResult<Json<UserInfo>> {
    api::verify_privilege(client, state.config.privileges().user_create)?;

    let name = body.name.trim();
    let email = body.email.as_deref().map(str::trim).filter(|email| !email.is_empty());
    api::verify_matches_regex(&state.config, name, RegexType::Username)?;
    api::verify_matches_regex(&state.config, &body.password, RegexType::Password)?;
    api::verify_valid_email(email)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = password::hash_password(&state.config, &body.password, &salt)?;
    let new_user = NewUser {
        name,
        password_hash: &hash,
        password_salt: salt.as_str(),
        email,
        rank: state.config.default_rank,
    };

    state.get_connection()?.transaction(|conn| {
        let name_taken: bool = select(exists(user::table.filter(user::name.eq(name)))).get_result(conn)?;
        if name_taken {
            return Err(ApiError::AlreadyExists(ResourceProperty::UserName));
        }
        if let Some(email) = email {
            let email_taken: bool = select(exists(user::table.filter(user::email.eq(email)))).get_result(conn)?;
            if email_taken {
                return Err(ApiError::AlreadyExists(ResourceProperty::UserEmail));
            }
        }

        let insert_result = new_user
            .insert_into(user::table)
            .returning(User::as_returning())
            .get_result(conn);
        let user = error::map_unique_violation(insert_result, ResourceProperty::UserName)?;
        info!("Registered user {}", user.name);
        UserInfo::new(conn, user, &fields, Visibility::Full).map(Json).map_err(ApiError::from)
    })
}

/// Users see their own full profile. Everyone else sees public fields only.
async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(name): Path<String>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<Json<UserInfo>> {
    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let user: User = user::table
            .select(User::as_select())
            .filter(user::name.eq(&name))
            .first(conn)
            .optional()?
            .ok_or(ApiError::NotFound(ResourceType::User))?;

        let visibility = if client.id == Some(user.id) {
            Visibility::Full
        } else {
            api::verify_privilege(client, state.config.privileges().user_view)?;
            Visibility::PublicOnly
        };
        UserInfo::new(conn, user, &fields, visibility).map(Json).map_err(ApiError::from)
    })
}

#[derive(Serialize)]
struct Availability {
    available: bool,
}

/// Reports whether `name` could be registered right now.
async fn availability(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<Availability>> {
    let name = name.trim();
    if !state.config.regex(RegexType::Username).is_match(name) {
        return Ok(Json(Availability { available: false }));
    }

    let mut conn = state.get_connection()?;
    let taken: bool = select(exists(user::table.filter(user::name.eq(name)))).get_result(&mut conn)?;
    Ok(Json(Availability { available: !taken }))
}

async fn list_posts(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(name): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<PagedResponse<PostInfo>>> {
    api::verify_privilege(client, state.config.privileges().post_list)?;

    let offset = params.offset();
    let limit = params.limit(MAX_POSTS_PER_PAGE);
    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let user_id = id_from_name(conn, &name)?;
        let (total, post_ids) = search::post::by_author(conn, user_id, offset, limit)?;
        Ok(Json(PagedResponse {
            query: params.into_query(),
            offset,
            limit,
            total,
            results: PostInfo::new_batch_from_ids(conn, client, &post_ids, &fields)?,
        }))
    })
}

/// Lists a user's comments across all posts, each with the post it was written on.
async fn list_comments(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(name): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<PagedResponse<CommentInfo>>> {
    api::verify_privilege(client, state.config.privileges().comment_view)?;

    let offset = params.offset();
    let limit = params.limit(MAX_COMMENTS_PER_PAGE);
    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let user_id = id_from_name(conn, &name)?;
        let (total, comment_ids) = search::comment::by_author(conn, user_id, offset, limit)?;
        Ok(Json(PagedResponse {
            query: params.into_query(),
            offset,
            limit,
            total,
            results: CommentInfo::new_batch_from_ids(conn, client, &comment_ids, &fields)?,
        }))
    })
}

async fn list_saved_posts(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<PagedResponse<PostInfo>>> {
    let user_id = api::require_login(client)?;

    let offset = params.offset();
    let limit = params.limit(MAX_POSTS_PER_PAGE);
    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let (total, post_ids) = search::post::saved_by(conn, user_id, offset, limit)?;
        Ok(Json(PagedResponse {
            query: params.into_query(),
            offset,
            limit,
            total,
            results: PostInfo::new_batch_from_ids(conn, client, &post_ids, &fields)?,
        }))
    })
}

async fn list_hidden_posts(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<PagedResponse<PostInfo>>> {
    let user_id = api::require_login(client)?;

    let offset = params.offset();
    let limit = params.limit(MAX_POSTS_PER_PAGE);
    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let (total, post_ids) = search::post::hidden_by(conn, user_id, offset, limit)?;
        Ok(Json(PagedResponse {
            query: params.into_query(),
            offset,
            limit,
            total,
            results: PostInfo::new_batch_from_ids(conn, client, &post_ids, &fields)?,
        }))
    })
}
