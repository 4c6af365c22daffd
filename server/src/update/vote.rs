//! Votes on posts and comments. Every user holds at most one vote per post or comment, and each change to
//! that vote is mirrored onto the karma of the content's author in the same transaction.

use crate::api::error::{self, ApiError, ApiResult};
use crate::config::Config;
use crate::model::comment::NewCommentVote;
use crate::model::enums::{ResourceProperty, ResourceType, Score};
use crate::model::post::NewPostVote;
use crate::schema::{comment, comment_vote, post, post_vote};
use crate::time::DateTime;
use crate::update;
use diesel::dsl::sum;
use diesel::{Connection, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl};
use serde::Serialize;
use tracing::debug;

/// Content a vote can be cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(i64),
    Comment(i64),
}

impl VoteTarget {
    fn resource_type(self) -> ResourceType {
        match self {
            Self::Post(_) => ResourceType::Post,
            Self::Comment(_) => ResourceType::Comment,
        }
    }
}

/// How a requested vote changes the vote a user already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No previous vote. The requested vote is recorded.
    Cast(Score),
    /// The same vote was requested again. The vote is removed.
    Withdraw(Score),
    /// The opposite vote was requested. The stored vote is replaced.
    Flip(Score),
}

impl Transition {
    pub fn between(existing: Option<Score>, requested: Score) -> Self {
        match existing {
            None => Self::Cast(requested),
            Some(score) if score == requested => Self::Withdraw(requested),
            Some(_) => Self::Flip(requested),
        }
    }

    /// Change in the target's score, which is also the change in its author's karma.
    pub fn karma_delta(self) -> i64 {
        match self {
            Self::Cast(score) => score.value(),
            Self::Withdraw(score) => -score.value(),
            Self::Flip(score) => 2 * score.value(),
        }
    }

    /// The vote the user holds once the transition is applied.
    pub fn resulting_vote(self) -> Option<Score> {
        match self {
            Self::Cast(score) | Self::Flip(score) => Some(score),
            Self::Withdraw(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub score: i64,
    pub own_vote: i16,
}

/// Casts a vote of `requested` by `voter` on `target`.
///
/// Voting the same way twice withdraws the vote and voting the opposite way replaces it.
/// The author of the target gains or loses karma to match, unless they are the voter and
/// `self_vote_karma` is disabled.
pub fn cast(
    conn: &mut PgConnection,
    config: &Config,
    voter: i64,
    target: VoteTarget,
    requested: Score,
) -> ApiResult<VoteOutcome> {
    conn.transaction(|conn| {
        let author = target_author(conn, target)?;
        let existing = existing_vote(conn, voter, target)?;
        let transition = Transition::between(existing, requested);
        debug!("User {voter} voting on {target:?}: {transition:?}");

        apply(conn, voter, target, transition)?;
        if author != voter || config.self_vote_karma {
            update::user::adjust_karma(conn, author, transition.karma_delta())?;
        }

        Ok(VoteOutcome {
            score: score(conn, target)?,
            own_vote: transition.resulting_vote().map_or(0, |score| score as i16),
        })
    })
}

/// Returns the sum of all votes cast on `target`.
pub fn score(conn: &mut PgConnection, target: VoteTarget) -> ApiResult<i64> {
    let total: Option<i64> = match target {
        VoteTarget::Post(post_id) => post_vote::table
            .select(sum(post_vote::value))
            .filter(post_vote::post_id.eq(post_id))
            .first(conn)?,
        VoteTarget::Comment(comment_id) => comment_vote::table
            .select(sum(comment_vote::value))
            .filter(comment_vote::comment_id.eq(comment_id))
            .first(conn)?,
    };
    Ok(total.unwrap_or(0))
}

fn target_author(conn: &mut PgConnection, target: VoteTarget) -> ApiResult<i64> {
    let author = match target {
        VoteTarget::Post(post_id) => post::table
            .find(post_id)
            .select(post::user_id)
            .first(conn)
            .optional()?,
        VoteTarget::Comment(comment_id) => comment::table
            .find(comment_id)
            .select(comment::user_id)
            .first(conn)
            .optional()?,
    };
    author.ok_or(ApiError::NotFound(target.resource_type()))
}

/// Locks and returns the vote `voter` currently holds on `target`, if any.
fn existing_vote(conn: &mut PgConnection, voter: i64, target: VoteTarget) -> ApiResult<Option<Score>> {
    let existing = match target {
        VoteTarget::Post(post_id) => post_vote::table
            .find((post_id, voter))
            .select(post_vote::value)
            .for_update()
            .first(conn)
            .optional()?,
        VoteTarget::Comment(comment_id) => comment_vote::table
            .find((comment_id, voter))
            .select(comment_vote::value)
            .for_update()
            .first(conn)
            .optional()?,
    };
    Ok(existing)
}

fn apply(conn: &mut PgConnection, voter: i64, target: VoteTarget, transition: Transition) -> ApiResult<()> {
    match (target, transition) {
        (VoteTarget::Post(post_id), Transition::Cast(value)) => {
            let new_vote = NewPostVote {
                post_id,
                user_id: voter,
                value,
            };
            let result = diesel::insert_into(post_vote::table).values(new_vote).execute(conn);
            error::map_unique_violation(result, ResourceProperty::Vote)?;
        }
        (VoteTarget::Post(post_id), Transition::Withdraw(_)) => {
            diesel::delete(post_vote::table.find((post_id, voter))).execute(conn)?;
        }
        (VoteTarget::Post(post_id), Transition::Flip(value)) => {
            diesel::update(post_vote::table.find((post_id, voter)))
                .set((post_vote::value.eq(value), post_vote::time.eq(DateTime::now())))
                .execute(conn)?;
        }
        (VoteTarget::Comment(comment_id), Transition::Cast(value)) => {
            let new_vote = NewCommentVote {
                comment_id,
                user_id: voter,
                value,
            };
            let result = diesel::insert_into(comment_vote::table).values(new_vote).execute(conn);
            error::map_unique_violation(result, ResourceProperty::Vote)?;
        }
        (VoteTarget::Comment(comment_id), Transition::Withdraw(_)) => {
            diesel::delete(comment_vote::table.find((comment_id, voter))).execute(conn)?;
        }
        (VoteTarget::Comment(comment_id), Transition::Flip(value)) => {
            diesel::update(comment_vote::table.find((comment_id, voter)))
                .set((comment_vote::value.eq(value), comment_vote::time.eq(DateTime::now())))
                .execute(conn)?;
        }
    }
    Ok(())
}
