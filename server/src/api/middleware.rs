use crate::api::ApiResult;
use crate::app::AppState;
use crate::auth::{Client, header};
use crate::update;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

/// Attempts to authorize the user by either username/password or user token.
/// Requests without credentials proceed as an anonymous client.
pub async fn auth(State(state): State<AppState>, mut request: Request, next: Next) -> ApiResult<Response> {
    let client = match request.headers().get(AUTHORIZATION) {
        Some(auth_value) => header::authenticate_user(&state, auth_value.to_str()?)?,
        None => Client::anonymous(),
    };

    // If client is not anonymous and query contains "bump-login", update login time
    if let Some(user_id) = client.id
        && let Some(query) = request.uri().query()
        && query.contains("bump-login")
    {
        let mut conn = state.get_connection()?;
        update::user::last_login_time(&mut conn, user_id)?;
    }

    request.extensions_mut().insert(client);
    Ok(next.run(request).await)
}
