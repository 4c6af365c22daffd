use crate::api::error::{ApiError, ApiResult};
use crate::model::comment::{NewCommentHide, NewCommentSave};
use crate::model::enums::ResourceType;
use crate::model::report::NewReport;
use crate::schema::{comment, comment_hide, comment_save, comment_vote, report};
use crate::time::DateTime;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};

/// Updates `last_edit_time` of comment with given `comment_id`.
pub fn last_edit_time(conn: &mut PgConnection, comment_id: i64) -> QueryResult<()> {
    diesel::update(comment::table.find(comment_id))
        .set(comment::last_edit_time.eq(DateTime::now()))
        .execute(conn)?;
    Ok(())
}

/// Deletes the comment with id `comment_id`. Replies to the comment are kept and
/// are shown as top-level comments from then on.
pub fn delete(conn: &mut PgConnection, comment_id: i64) -> ApiResult<()> {
    delete_dependents(conn, comment_id)?;
    let deleted = diesel::delete(comment::table.find(comment_id)).execute(conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(ResourceType::Comment));
    }
    Ok(())
}

/// Removes votes, saves, hides, and reports of the comment with id `comment_id`.
pub fn delete_dependents(conn: &mut PgConnection, comment_id: i64) -> QueryResult<()> {
    diesel::delete(comment_vote::table.filter(comment_vote::comment_id.eq(comment_id))).execute(conn)?;
    diesel::delete(comment_save::table.filter(comment_save::comment_id.eq(comment_id))).execute(conn)?;
    diesel::delete(comment_hide::table.filter(comment_hide::comment_id.eq(comment_id))).execute(conn)?;
    diesel::delete(report::table.filter(report::comment_id.eq(comment_id))).execute(conn)?;
    Ok(())
}

/// Returns whether the comment is saved after toggling.
pub fn toggle_save(conn: &mut PgConnection, comment_id: i64, user_id: i64) -> QueryResult<bool> {
    let removed = diesel::delete(comment_save::table.find((comment_id, user_id))).execute(conn)?;
    if removed > 0 {
        return Ok(false);
    }
    diesel::insert_into(comment_save::table)
        .values(NewCommentSave { comment_id, user_id })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(true)
}

pub fn hide(conn: &mut PgConnection, comment_id: i64, user_id: i64) -> QueryResult<()> {
    diesel::insert_into(comment_hide::table)
        .values(NewCommentHide { comment_id, user_id })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

pub fn unhide(conn: &mut PgConnection, comment_id: i64, user_id: i64) -> QueryResult<()> {
    diesel::delete(comment_hide::table.find((comment_id, user_id))).execute(conn)?;
    Ok(())
}

pub fn report(conn: &mut PgConnection, comment_id: i64, user_id: i64, reason: &str) -> QueryResult<()> {
    let new_report = NewReport {
        user_id,
        post_id: None,
        comment_id: Some(comment_id),
        reason,
    };
    diesel::insert_into(report::table).values(new_report).execute(conn)?;
    Ok(())
}

/// Returns ids of the comments on `post_id` that the user has hidden.
pub fn hidden_on_post(conn: &mut PgConnection, post_id: i64, user_id: i64) -> QueryResult<Vec<i64>> {
    comment_hide::table
        .inner_join(comment::table)
        .select(comment::id)
        .filter(comment::post_id.eq(post_id))
        .filter(comment_hide::user_id.eq(user_id))
        .load(conn)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use diesel::dsl::count_star;
    use serial_test::serial;

    #[test]
    #[serial]
    fn replies_survive_deletion() {
        test_transaction(|conn| {
            let user = create_test_user(conn, TEST_USERNAME)?;
            let post = create_test_post(conn, &user)?;
            let parent = create_test_comment(conn, &post, &user, None)?;
            let reply = create_test_comment(conn, &post, &user, Some(parent.id))?;
            hide(conn, parent.id, user.id)?;
            assert_eq!(hidden_on_post(conn, post.id, user.id)?, vec![parent.id]);

            delete(conn, parent.id)?;
            let remaining: Vec<i64> = comment::table
                .select(comment::id)
                .filter(comment::post_id.eq(post.id))
                .load(conn)?;
            assert_eq!(remaining, vec![reply.id]);

            let hides: i64 = comment_hide::table.select(count_star()).first(conn)?;
            assert_eq!(hides, 0);
            assert!(hidden_on_post(conn, post.id, user.id)?.is_empty());
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn toggle_save_twice() {
        test_transaction(|conn| {
            let user = create_test_user(conn, TEST_USERNAME)?;
            let post = create_test_post(conn, &user)?;
            let comment = create_test_comment(conn, &post, &user, None)?;
            assert!(toggle_save(conn, comment.id, user.id)?);
            assert!(!toggle_save(conn, comment.id, user.id)?);
            Ok(())
        });
    }
}
