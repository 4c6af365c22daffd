use crate::schema::comment;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};

/// Comments written by the user with id `user_id` across all posts, newest first.
pub fn by_author(conn: &mut PgConnection, user_id: i64, offset: i64, limit: i64) -> QueryResult<(i64, Vec<i64>)> {
    let total = comment::table
        .filter(comment::user_id.eq(user_id))
        .count()
        .first(conn)?;
    let comment_ids = comment::table
        .select(comment::id)
        .filter(comment::user_id.eq(user_id))
        .order_by((comment::creation_time.desc(), comment::id.desc()))
        .offset(offset)
        .limit(limit)
        .load(conn)?;
    Ok((total, comment_ids))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn comments_by_author() {
        test_transaction(|conn| {
            let author = create_test_user(conn, "comment_author")?;
            let other = create_test_user(conn, "other_commenter")?;
            let post = create_test_post(conn, &other)?;
            let first = create_test_comment(conn, &post, &author, None)?;
            let reply = create_test_comment(conn, &post, &author, Some(first.id))?;
            create_test_comment(conn, &post, &other, Some(reply.id))?;

            let (total, comment_ids) = by_author(conn, author.id, 0, 10)?;
            assert_eq!(total, 2);
            assert_eq!(comment_ids, vec![reply.id, first.id]);

            let (total, comment_ids) = by_author(conn, author.id, 1, 10)?;
            assert_eq!((total, comment_ids), (2, vec![first.id]));
            Ok(())
        });
    }
}
