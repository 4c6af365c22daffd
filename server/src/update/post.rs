use crate::api::error::{ApiError, ApiResult};
use crate::model::enums::ResourceType;
use crate::model::post::{NewPostHide, NewPostSave};
use crate::model::report::NewReport;
use crate::schema::{comment, post, post_hide, post_save, post_tag, post_vote, report};
use crate::time::DateTime;
use crate::update;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};

/// Updates `last_edit_time` of post with given `post_id`.
pub fn last_edit_time(conn: &mut PgConnection, post_id: i64) -> QueryResult<()> {
    diesel::update(post::table.find(post_id))
        .set(post::last_edit_time.eq(DateTime::now()))
        .execute(conn)?;
    Ok(())
}

/// Deletes the post with id `post_id` along with its comments and everything attached to them.
/// Karma earned through votes on the deleted content is kept.
pub fn delete(conn: &mut PgConnection, post_id: i64) -> ApiResult<()> {
    let comment_ids: Vec<i64> = comment::table
        .select(comment::id)
        .filter(comment::post_id.eq(post_id))
        .load(conn)?;
    for &comment_id in &comment_ids {
        update::comment::delete_dependents(conn, comment_id)?;
    }
    diesel::delete(comment::table.filter(comment::post_id.eq(post_id))).execute(conn)?;

    diesel::delete(post_vote::table.filter(post_vote::post_id.eq(post_id))).execute(conn)?;
    diesel::delete(post_tag::table.filter(post_tag::post_id.eq(post_id))).execute(conn)?;
    diesel::delete(post_save::table.filter(post_save::post_id.eq(post_id))).execute(conn)?;
    diesel::delete(post_hide::table.filter(post_hide::post_id.eq(post_id))).execute(conn)?;
    diesel::delete(report::table.filter(report::post_id.eq(post_id))).execute(conn)?;

    let deleted = diesel::delete(post::table.find(post_id)).execute(conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(ResourceType::Post));
    }
    Ok(())
}

/// Saves the post for the user if it isn't saved yet, otherwise removes the save.
/// Returns whether the post is saved afterwards.
pub fn toggle_save(conn: &mut PgConnection, post_id: i64, user_id: i64) -> QueryResult<bool> {
    let removed = diesel::delete(post_save::table.find((post_id, user_id))).execute(conn)?;
    if removed > 0 {
        return Ok(false);
    }
    diesel::insert_into(post_save::table)
        .values(NewPostSave { post_id, user_id })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(true)
}

/// Hides the post from the user's feed. Hiding an already hidden post does nothing.
pub fn hide(conn: &mut PgConnection, post_id: i64, user_id: i64) -> QueryResult<()> {
    diesel::insert_into(post_hide::table)
        .values(NewPostHide { post_id, user_id })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

pub fn unhide(conn: &mut PgConnection, post_id: i64, user_id: i64) -> QueryResult<()> {
    diesel::delete(post_hide::table.find((post_id, user_id))).execute(conn)?;
    Ok(())
}

pub fn report(conn: &mut PgConnection, post_id: i64, user_id: i64, reason: &str) -> QueryResult<()> {
    let new_report = NewReport {
        user_id,
        post_id: Some(post_id),
        comment_id: None,
        reason,
    };
    diesel::insert_into(report::table).values(new_report).execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::model::enums::{Score, TagType};
    use crate::schema::{comment_hide, comment_save, comment_vote};
    use crate::string::SmallString;
    use crate::test::*;
    use crate::update::vote::{self, VoteTarget};
    use diesel::BoolExpressionMethods;
    use diesel::dsl::count_star;
    use serial_test::serial;

    #[test]
    #[serial]
    fn delete_with_dependents() {
        let config = config::test_config(None);
        test_transaction(|conn| {
            let author = create_test_user(conn, "deleted_author")?;
            let reader = create_test_user(conn, "deleted_reader")?;
            let post = create_test_post(conn, &author)?;
            let comment = create_test_comment(conn, &post, &reader, None)?;
            let reply = create_test_comment(conn, &post, &author, Some(comment.id))?;

            let tags = [(TagType::Make, SmallString::new("Honda")), (TagType::Year, SmallString::new("1996"))];
            let tag_ids = update::tag::get_or_create_ids(conn, &tags)?;
            update::tag::set_post_tags(conn, post.id, &tag_ids)?;

            vote::cast(conn, &config, reader.id, VoteTarget::Post(post.id), Score::Up)?;
            vote::cast(conn, &config, author.id, VoteTarget::Comment(comment.id), Score::Up)?;
            vote::cast(conn, &config, reader.id, VoteTarget::Comment(reply.id), Score::Down)?;
            toggle_save(conn, post.id, reader.id)?;
            hide(conn, post.id, reader.id)?;
            report(conn, post.id, reader.id, "spam")?;
            update::comment::toggle_save(conn, comment.id, author.id)?;
            update::comment::hide(conn, reply.id, reader.id)?;
            update::comment::report(conn, comment.id, author.id, "rude")?;

            delete(conn, post.id)?;

            let comment_ids = [comment.id, reply.id];
            let remaining = [
                comment::table.filter(comment::post_id.eq(post.id)).select(count_star()).first::<i64>(conn)?,
                post_vote::table.filter(post_vote::post_id.eq(post.id)).select(count_star()).first(conn)?,
                post_tag::table.filter(post_tag::post_id.eq(post.id)).select(count_star()).first(conn)?,
                post_save::table.filter(post_save::post_id.eq(post.id)).select(count_star()).first(conn)?,
                post_hide::table.filter(post_hide::post_id.eq(post.id)).select(count_star()).first(conn)?,
                comment_vote::table
                    .filter(comment_vote::comment_id.eq_any(comment_ids))
                    .select(count_star())
                    .first(conn)?,
                comment_save::table
                    .filter(comment_save::comment_id.eq_any(comment_ids))
                    .select(count_star())
                    .first(conn)?,
                comment_hide::table
                    .filter(comment_hide::comment_id.eq_any(comment_ids))
                    .select(count_star())
                    .first(conn)?,
                report::table
                    .filter(report::post_id.eq(post.id).or(report::comment_id.eq_any(comment_ids)))
                    .select(count_star())
                    .first(conn)?,
            ];
            assert_eq!(remaining, [0; 9]);

            // Tags themselves outlive the posts that used them
            assert_eq!(update::tag::get_or_create_ids(conn, &tags)?, tag_ids);
            assert!(matches!(delete(conn, post.id), Err(ApiError::NotFound(ResourceType::Post))));
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn save_and_hide() {
        test_transaction(|conn| {
            let user = create_test_user(conn, TEST_USERNAME)?;
            let post = create_test_post(conn, &user)?;

            assert!(toggle_save(conn, post.id, user.id)?);
            assert!(!toggle_save(conn, post.id, user.id)?);
            assert!(toggle_save(conn, post.id, user.id)?);

            hide(conn, post.id, user.id)?;
            hide(conn, post.id, user.id)?;
            let hidden: i64 = post_hide::table.select(count_star()).first(conn)?;
            assert_eq!(hidden, 1);

            unhide(conn, post.id, user.id)?;
            unhide(conn, post.id, user.id)?;
            let hidden: i64 = post_hide::table.select(count_star()).first(conn)?;
            assert_eq!(hidden, 0);
            Ok(())
        });
    }
}
