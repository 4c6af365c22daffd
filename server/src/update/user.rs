use crate::schema::user;
use crate::time::DateTime;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};

/// Updates the last known login time for the user with the given `user_id`.
pub fn last_login_time(conn: &mut PgConnection, user_id: i64) -> QueryResult<()> {
    diesel::update(user::table.find(user_id))
        .set(user::last_login_time.eq(DateTime::now()))
        .execute(conn)?;
    Ok(())
}

/// Updates `last_edit_time` of user with given `user_id`.
pub fn last_edit_time(conn: &mut PgConnection, user_id: i64) -> QueryResult<()> {
    diesel::update(user::table.find(user_id))
        .set(user::last_edit_time.eq(DateTime::now()))
        .execute(conn)?;
    Ok(())
}

/// Adds `delta` to the karma of the user with the given `user_id`.
///
/// The increment happens in the database, so concurrent adjustments never overwrite each other.
pub fn adjust_karma(conn: &mut PgConnection, user_id: i64, delta: i64) -> QueryResult<()> {
    if delta == 0 {
        return Ok(());
    }
    diesel::update(user::table.find(user_id))
        .set(user::karma.eq(user::karma + delta))
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::user::User;
    use crate::test::*;
    use diesel::SelectableHelper;
    use serial_test::serial;

    #[test]
    #[serial]
    fn karma_accumulates() {
        test_transaction(|conn| {
            let user = create_test_user(conn, TEST_USERNAME)?;
            adjust_karma(conn, user.id, 2)?;
            adjust_karma(conn, user.id, -5)?;
            adjust_karma(conn, user.id, 0)?;

            let updated: User = user::table.find(user.id).select(User::as_select()).first(conn)?;
            assert_eq!(updated.karma, -3);
            Ok(())
        });
    }
}
