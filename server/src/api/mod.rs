mod car;
mod comment;
pub mod error;
mod extract;
mod middleware;
mod password_reset;
mod post;
mod reference;
mod tag;
mod user;
mod user_token;

pub use error::{ApiError, ApiResult};

use crate::app::AppState;
use crate::auth::Client;
use crate::config::{Config, RegexType};
use crate::model::enums::{Score, UserRank};
use crate::string::SmallString;
use crate::time::DateTime;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::num::NonZero;
use tower_http::trace::TraceLayer;

/// Builds the router for the whole API. Every request passes through the
/// authentication middleware, which attaches a [`Client`] to it.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .merge(car::routes())
        .merge(comment::routes())
        .merge(password_reset::routes())
        .merge(post::routes())
        .merge(reference::routes())
        .merge(tag::routes())
        .merge(user::routes())
        .merge(user_token::routes())
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Checks that `client` has at least `required_rank`. Anonymous clients that fall short
/// are asked to log in rather than told they lack privileges.
pub fn verify_privilege(client: Client, required_rank: UserRank) -> ApiResult<()> {
    if client.rank >= required_rank {
        Ok(())
    } else if client.id.is_none() {
        Err(ApiError::NotLoggedIn)
    } else {
        Err(ApiError::InsufficientPrivileges)
    }
}

/// Checks privileges for an action on a resource owned by `owner_id`. Owners need
/// `own_rank`, everyone else needs `any_rank`.
pub fn verify_ownership(client: Client, owner_id: i64, own_rank: UserRank, any_rank: UserRank) -> ApiResult<()> {
    let required_rank = if client.id == Some(owner_id) { own_rank } else { any_rank };
    verify_privilege(client, required_rank)
}

/// Returns the id of the client, or an error if the client is anonymous.
pub fn require_login(client: Client) -> ApiResult<i64> {
    client.id.ok_or(ApiError::NotLoggedIn)
}

pub fn verify_matches_regex(config: &Config, haystack: &str, regex_type: RegexType) -> ApiResult<()> {
    if config.regex(regex_type).is_match(haystack) {
        Ok(())
    } else {
        Err(ApiError::ExpressionFailsRegex(SmallString::new(haystack), regex_type))
    }
}

pub fn verify_valid_email(email: Option<&str>) -> Result<(), lettre::address::AddressError> {
    match email {
        Some(address) => address.parse::<lettre::Address>().map(|_| ()),
        None => Ok(()),
    }
}

pub fn verify_version(current_version: DateTime, client_version: DateTime) -> ApiResult<()> {
    (current_version == client_version)
        .then_some(())
        .ok_or(ApiError::ResourceModified)
}

/// Trims `text` and checks that something is left.
pub fn non_empty<'a>(text: &'a str, field: &'static str) -> ApiResult<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ApiError::EmptyField(field))
    } else {
        Ok(trimmed)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteBody {
    version: DateTime,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct VoteBody {
    score: i16,
}

impl VoteBody {
    fn score(&self) -> ApiResult<Score> {
        Score::from_repr(self.score).ok_or(ApiError::InvalidVote(self.score))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportBody {
    reason: String,
}

#[derive(Serialize)]
struct SaveResponse {
    saved: bool,
}

#[derive(Deserialize)]
struct ResourceParams {
    fields: Option<String>,
}

impl ResourceParams {
    fn fields(&self) -> Option<&str> {
        self.fields.as_deref()
    }
}

const DEFAULT_PAGE_SIZE: i64 = 20;

/// Paging parameters. Other query parameters are tolerated, since feed filters
/// are read from the raw query string.
#[derive(Deserialize)]
struct PageParams {
    offset: Option<i64>,
    limit: Option<NonZero<i64>>,
    query: Option<String>,
    fields: Option<String>,
}

impl PageParams {
    fn criteria(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    fn fields(&self) -> Option<&str> {
        self.fields.as_deref()
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    fn limit(&self, max_limit: i64) -> i64 {
        self.limit.map_or(DEFAULT_PAGE_SIZE, NonZero::get).clamp(1, max_limit)
    }

    fn into_query(self) -> Option<String> {
        self.query
    }
}

#[derive(Serialize)]
struct UnpagedResponse<T> {
    results: Vec<T>,
}

#[derive(Serialize)]
struct PagedResponse<T> {
    query: Option<String>,
    offset: i64,
    limit: i64,
    total: i64,
    results: Vec<T>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use axum::http::StatusCode;

    #[test]
    fn privileges() {
        let anonymous = Client::anonymous();
        let regular = Client::new(Some(1), UserRank::Regular);
        assert!(verify_privilege(anonymous, UserRank::Anonymous).is_ok());
        assert!(matches!(verify_privilege(anonymous, UserRank::Regular), Err(ApiError::NotLoggedIn)));
        assert!(verify_privilege(regular, UserRank::Regular).is_ok());
        assert!(matches!(verify_privilege(regular, UserRank::Moderator), Err(ApiError::InsufficientPrivileges)));

        assert!(verify_ownership(regular, 1, UserRank::Regular, UserRank::Moderator).is_ok());
        assert!(verify_ownership(regular, 2, UserRank::Regular, UserRank::Moderator).is_err());
        assert!(matches!(require_login(anonymous), Err(ApiError::NotLoggedIn)));
        assert_eq!(require_login(regular).ok(), Some(1));
    }

    #[test]
    fn page_limits() {
        let params = PageParams {
            offset: Some(-5),
            limit: NonZero::new(500),
            query: None,
            fields: None,
        };
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(50), 50);

        let params = PageParams {
            offset: None,
            limit: None,
            query: None,
            fields: None,
        };
        assert_eq!(params.limit(50), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn vote_body() {
        let vote = |score| VoteBody { score }.score();
        assert_eq!(vote(1).ok(), Some(Score::Up));
        assert_eq!(vote(-1).ok(), Some(Score::Down));
        assert!(matches!(vote(0), Err(ApiError::InvalidVote(0))));
        assert!(matches!(vote(2), Err(ApiError::InvalidVote(2))));
    }

    #[test]
    fn text_fields() {
        assert_eq!(non_empty("  Rusty  ", "Text").ok(), Some("Rusty"));
        assert!(matches!(non_empty(" \n ", "Reason"), Err(ApiError::EmptyField("Reason"))));
    }

    #[tokio::test]
    async fn unknown_route() {
        let response = test_server().get("/nonexistent").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
