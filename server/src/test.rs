use crate::api::error::ApiResult;
use crate::app::AppState;
use crate::auth::password;
use crate::model::comment::{Comment, NewComment};
use crate::model::enums::UserRank;
use crate::model::post::{NewPost, Post};
use crate::model::user::{NewUser, User};
use crate::reference::StaticCatalog;
use crate::schema::{comment, post, user};
use crate::{api, config, db};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum_test::TestServer;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_PRIVILEGE: UserRank = UserRank::Regular;
pub const TEST_USERNAME: &str = "test_user";
pub const TEST_PASSWORD: &str = "test_password";
pub const TEST_TOKEN: Uuid = uuid::uuid!("67e55044-10b1-426f-9247-bb680e5fe0c8");

pub fn establish_connection_or_panic() -> PgConnection {
    let database_url = config::database_url(None).unwrap_or_else(|err| panic!("{err}"));
    PgConnection::establish(&database_url).unwrap_or_else(|err| panic!("{err}"))
}

// Used in place of conn.test_transaction as that function doesn't give any useful information on failure
pub fn test_transaction<F, R>(function: F) -> R
where
    F: FnOnce(&mut PgConnection) -> ApiResult<R>,
{
    establish_connection_or_panic().test_transaction::<_, diesel::result::Error, _>(|conn| {
        Ok(function(conn).unwrap_or_else(|err| panic!("{err}")))
    })
}

/// Application state for router tests. The connection pool points nowhere, so only
/// requests that are rejected before touching the database can be served.
pub fn test_state() -> AppState {
    AppState::new(
        db::create_connection_pool(String::from("postgres://invalid")),
        config::test_config(None),
        Arc::new(StaticCatalog::default()),
    )
}

pub fn test_server() -> TestServer {
    TestServer::new(api::routes(test_state())).unwrap_or_else(|err| panic!("{err}"))
}

pub fn create_test_user(conn: &mut PgConnection, name: &str) -> QueryResult<User> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = password::hash_password(&config::test_config(None), TEST_PASSWORD, &salt)
        .unwrap_or_else(|err| panic!("{err}"));
    let new_user = NewUser {
        name,
        password_hash: &password_hash,
        password_salt: salt.as_str(),
        email: None,
        rank: TEST_PRIVILEGE,
    };
    diesel::insert_into(user::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(conn)
}

pub fn create_test_post(conn: &mut PgConnection, user: &User) -> QueryResult<Post> {
    let new_post = NewPost {
        user_id: user.id,
        title: "Test post",
        body: "Has anyone swapped a K20 into an EG hatch?",
    };
    diesel::insert_into(post::table)
        .values(&new_post)
        .returning(Post::as_returning())
        .get_result(conn)
}

pub fn create_test_comment(
    conn: &mut PgConnection,
    post: &Post,
    user: &User,
    parent_id: Option<i64>,
) -> QueryResult<Comment> {
    let new_comment = NewComment {
        post_id: post.id,
        user_id: user.id,
        parent_id,
        text: "Test comment",
    };
    diesel::insert_into(comment::table)
        .values(&new_comment)
        .returning(Comment::as_returning())
        .get_result(conn)
}
