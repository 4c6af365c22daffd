use crate::model::enums::UserRank;
use crate::model::user::User;
use crate::resource::{self, BoolFill};
use crate::schema::{car, comment, post, user};
use crate::string::SmallString;
use crate::time::DateTime;
use diesel::dsl::count_star;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl, SelectableHelper};
use serde::Serialize;
use serde_with::skip_serializing_none;
use strum::{EnumString, EnumTable};

/// Author summary embedded in posts, comments and tokens.
#[derive(Clone, Serialize)]
pub struct MicroUser {
    pub name: SmallString,
    pub karma: i64,
}

impl MicroUser {
    pub fn new(name: SmallString, karma: i64) -> Self {
        Self { name, karma }
    }
}

/// Determines how much of a user's profile the client may see.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    PublicOnly,
    Full,
}

#[derive(Clone, Copy, EnumString, EnumTable)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    Version,
    Id,
    Name,
    Email,
    Rank,
    Karma,
    CreationTime,
    LastLoginTime,
    PostCount,
    CommentCount,
    CarCount,
}

impl BoolFill for FieldTable<bool> {
    fn filled(val: bool) -> Self {
        Self::filled(val)
    }
}

#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    version: Option<DateTime>,
    id: Option<i64>,
    name: Option<SmallString>,
    email: Option<Option<SmallString>>,
    rank: Option<UserRank>,
    karma: Option<i64>,
    creation_time: Option<DateTime>,
    last_login_time: Option<DateTime>,
    post_count: Option<i64>,
    comment_count: Option<i64>,
    car_count: Option<i64>,
}

impl UserInfo {
    pub fn new(
        conn: &mut PgConnection,
        user: User,
        fields: &FieldTable<bool>,
        visibility: Visibility,
    ) -> QueryResult<Self> {
        let post_count = fields[Field::PostCount]
            .then(|| {
                post::table
                    .filter(post::user_id.eq(user.id))
                    .select(count_star())
                    .first::<i64>(conn)
            })
            .transpose()?;
        let comment_count = fields[Field::CommentCount]
            .then(|| {
                comment::table
                    .filter(comment::user_id.eq(user.id))
                    .select(count_star())
                    .first::<i64>(conn)
            })
            .transpose()?;
        let car_count = fields[Field::CarCount]
            .then(|| {
                car::table
                    .filter(car::user_id.eq(user.id))
                    .select(count_star())
                    .first::<i64>(conn)
            })
            .transpose()?;

        Ok(Self {
            version: fields[Field::Version].then_some(user.last_edit_time),
            id: fields[Field::Id].then_some(user.id),
            name: fields[Field::Name].then_some(user.name),
            email: (fields[Field::Email] && visibility == Visibility::Full).then_some(user.email),
            rank: fields[Field::Rank].then_some(user.rank),
            karma: fields[Field::Karma].then_some(user.karma),
            creation_time: fields[Field::CreationTime].then_some(user.creation_time),
            last_login_time: fields[Field::LastLoginTime].then_some(user.last_login_time),
            post_count,
            comment_count,
            car_count,
        })
    }

    pub fn new_from_id(
        conn: &mut PgConnection,
        user_id: i64,
        fields: &FieldTable<bool>,
        visibility: Visibility,
    ) -> QueryResult<Self> {
        let user = user::table.find(user_id).select(User::as_select()).first(conn)?;
        Self::new(conn, user, fields, visibility)
    }
}

/// Converts `(resource_id, name, karma)` rows into authors ordered like `resource_ids`.
pub fn order_authors(author_rows: Vec<(i64, SmallString, i64)>, resource_ids: &[i64]) -> Vec<Option<MicroUser>> {
    let rows: Vec<_> = author_rows
        .into_iter()
        .map(|(id, name, karma)| (id, MicroUser::new(name, karma)))
        .collect();
    resource::order_lookup(rows, resource_ids)
}
