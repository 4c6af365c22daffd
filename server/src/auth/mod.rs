pub mod header;
pub mod password;

use crate::model::enums::UserRank;

/// The identity attached to every request by the authentication middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Client {
    pub id: Option<i64>,
    pub rank: UserRank,
}

impl Client {
    pub fn new(id: Option<i64>, rank: UserRank) -> Self {
        Self { id, rank }
    }

    pub fn anonymous() -> Self {
        Self::new(None, UserRank::Anonymous)
    }
}
