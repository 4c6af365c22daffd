use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path};
use crate::app::AppState;
use crate::auth::password;
use crate::mail::Mailer;
use crate::schema::user;
use crate::string::SmallString;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum::extract::State;
use axum::{Router, routing};
use diesel::{BoolExpressionMethods, Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use lettre::Address;
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new().route("/password-reset/{identifier}", routing::get(request_reset).post(reset_password))
}

struct ResetTarget {
    id: i64,
    name: SmallString,
    email: Option<SmallString>,
    password_salt: String,
}

/// Finds the user whose name or email is `identifier`.
fn find_user(conn: &mut PgConnection, identifier: &str) -> ApiResult<ResetTarget> {
    let (id, name, email, password_salt) = user::table
        .select((user::id, user::name, user::email, user::password_salt))
        .filter(user::name.eq(identifier).or(user::email.eq(identifier)))
        .first::<(i64, SmallString, Option<SmallString>, String)>(conn)?;
    Ok(ResetTarget {
        id,
        name,
        email,
        password_salt,
    })
}

/// Emails the user a link that carries their reset token.
async fn request_reset(State(state): State<AppState>, Path(identifier): Path<String>) -> ApiResult<Json<()>> {
    let mailer = Mailer::new(&state.config)?;
    let identifier = percent_encoding::percent_decode_str(&identifier).decode_utf8()?;

    let mut conn = state.get_connection()?;
    let target = find_user(&mut conn, &identifier)?;
    let address: Address = target.email.as_deref().ok_or(ApiError::NoEmail)?.parse()?;
    let mailbox = Mailbox::new(Some(target.name.to_string()), address);

    let token = password::reset_token(&state.config, &target.password_salt);
    let domain = state.config.domain.as_ref().map(|url| url.as_str().trim_end_matches('/')).unwrap_or("");
    let link = format!("{domain}/password-reset/{}?token={token}", target.name);
    let site_name = &state.config.site_name;

    let text = format!(
        "Hello {},\n\n\
         You (or someone else) requested to reset your password on {site_name}.\n\
         If you wish to proceed, open this link: {link}\n\
         Otherwise, please ignore this email.",
        target.name
    );
    let html = format!(
        "<p>Hello {},</p>\
         <p>You (or someone else) requested to reset your password on {site_name}.</p>\
         <p>If you wish to proceed, <a href=\"{link}\">click here</a>. Otherwise, please ignore this email.</p>",
        target.name
    );
    mailer.send(mailbox, "Password Reset Request", html, text)?;
    Ok(Json(()))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ResetBody {
    token: String,
}

#[derive(Serialize)]
struct NewPassword {
    password: String,
}

/// Replaces the user's password with a random temporary one if `token` is valid.
/// Changing the password changes the salt, which invalidates the token.
async fn reset_password(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Json(body): Json<ResetBody>,
) -> ApiResult<Json<NewPassword>> {
    let identifier = percent_encoding::percent_decode_str(&identifier).decode_utf8()?;

    state.get_connection()?.transaction(|conn| {
        let target = find_user(conn, &identifier)?;
        if body.token != password::reset_token(&state.config, &target.password_salt) {
            return Err(ApiError::UnauthorizedPasswordReset);
        }

        let temporary_password = password::temporary_password();
        let salt = SaltString::generate(&mut OsRng);
        let hash = password::hash_password(&state.config, &temporary_password, &salt)?;
        diesel::update(user::table.find(target.id))
            .set((user::password_salt.eq(salt.as_str()), user::password_hash.eq(hash)))
            .execute(conn)?;
        info!("Password of user {} was reset", target.name);

        Ok(Json(NewPassword {
            password: temporary_password,
        }))
    })
}

#[cfg(test)]
mod test {
    use crate::test::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn reset_without_smtp() {
        let response = test_server().get("/password-reset/test_user").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "MissingSmtpInfo");
    }
}
