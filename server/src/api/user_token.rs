use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{ResourceParams, user};
use crate::app::AppState;
use crate::auth::Client;
use crate::model::enums::{ResourceType, UserRank};
use crate::model::user::{NewUserToken, UserToken};
use crate::resource::user::MicroUser;
use crate::resource::user_token::UserTokenInfo;
use crate::schema::{user as user_table, user_token};
use crate::string::SmallString;
use crate::time::DateTime;
use crate::{api, resource};
use axum::extract::{Extension, State};
use axum::{Router, routing};
use diesel::{Connection, ExpressionMethods, Insertable, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::Deserialize;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user-token/{name}", routing::post(create))
        .route("/user-token/{name}/{token}", routing::delete(delete))
}

/// Tokens can only be managed by the user they belong to.
fn verify_token_owner(client: Client, owner_id: i64, required_rank: UserRank) -> ApiResult<()> {
    api::verify_privilege(client, required_rank)?;
    if client.id == Some(owner_id) {
        Ok(())
    } else {
        Err(ApiError::InsufficientPrivileges)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CreateBody {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    note: Option<String>,
    expiration_time: Option<DateTime>,
}

fn enabled_by_default() -> bool {
    true
}

async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(name): Path<String>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<CreateBody>,
) -> ApiResult<Json<UserTokenInfo>> {
    api::verify_privilege(client, state.config.privileges().user_token_create)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let user_id = user::id_from_name(conn, &name)?;
        verify_token_owner(client, user_id, state.config.privileges().user_token_create)?;

        let (user_name, karma): (SmallString, i64) = user_table::table
            .find(user_id)
            .select((user_table::name, user_table::karma))
            .first(conn)?;
        let user_token: UserToken = NewUserToken {
            id: Uuid::new_v4(),
            user_id,
            note: body.note.as_deref(),
            enabled: body.enabled,
            expiration_time: body.expiration_time,
        }
        .insert_into(user_token::table)
        .returning(UserToken::as_returning())
        .get_result(conn)?;
        Ok(Json(UserTokenInfo::new(MicroUser::new(user_name, karma), user_token, &fields)))
    })
}

async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path((name, token)): Path<(String, Uuid)>,
) -> ApiResult<Json<()>> {
    api::verify_privilege(client, state.config.privileges().user_token_delete)?;

    state.get_connection()?.transaction(|conn| {
        let user_id = user::id_from_name(conn, &name)?;
        verify_token_owner(client, user_id, state.config.privileges().user_token_delete)?;

        let deleted = diesel::delete(user_token::table.find(token))
            .filter(user_token::user_id.eq(user_id))
            .execute(conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound(ResourceType::UserToken));
        }
        Ok(Json(()))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn token_ownership() {
        let owner = Client::new(Some(7), UserRank::Regular);
        let moderator = Client::new(Some(8), UserRank::Moderator);
        assert!(verify_token_owner(owner, 7, UserRank::Regular).is_ok());
        assert!(matches!(
            verify_token_owner(moderator, 7, UserRank::Regular),
            Err(ApiError::InsufficientPrivileges)
        ));
        assert!(matches!(
            verify_token_owner(Client::anonymous(), 7, UserRank::Regular),
            Err(ApiError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn anonymous_requests() {
        let server = test_server();
        server
            .post(&format!("/user-token/{TEST_USERNAME}"))
            .json(&json!({ "note": "phone" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .delete(&format!("/user-token/{TEST_USERNAME}/{TEST_TOKEN}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
