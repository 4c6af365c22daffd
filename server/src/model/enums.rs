use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::SmallInt;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum::{Display, EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;

/// In general, the order of these enums should not be changed.
/// They are encoded in the database as an integer, so changing
/// the underlying representation of an enum changes its meaning.
///
/// New enum variants should therefore always be appended at the end.

#[derive(
    Debug,
    Display,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumString,
    FromRepr,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(i16)]
pub enum UserRank {
    Anonymous,
    Restricted,
    Regular,
    Power,
    Moderator,
    Administrator,
}

impl ToSql<SmallInt, Pg> for UserRank
where
    i16: ToSql<SmallInt, Pg>,
{
    fn to_sql(&self, out: &mut Output<Pg>) -> serialize::Result {
        let value = *self as i16;
        <i16 as ToSql<SmallInt, Pg>>::to_sql(&value, &mut out.reborrow())
    }
}

impl FromSql<SmallInt, Pg> for UserRank
where
    i16: FromSql<SmallInt, Pg>,
{
    fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let database_value = i16::from_sql(bytes)?;
        UserRank::from_repr(database_value).ok_or(DeserializeUserRankError.into())
    }
}

/// The kind of vehicle attribute a tag describes. Tag names are only unique within a type,
/// so "2023" may exist both as a year and as a model.
#[derive(
    Debug,
    Display,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumCount,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(i16)]
pub enum TagType {
    Year,
    Make,
    Model,
    Trim,
    Drivetrain,
    Transmission,
}

impl ToSql<SmallInt, Pg> for TagType
where
    i16: ToSql<SmallInt, Pg>,
{
    fn to_sql(&self, out: &mut Output<Pg>) -> serialize::Result {
        let value = *self as i16;
        <i16 as ToSql<SmallInt, Pg>>::to_sql(&value, &mut out.reborrow())
    }
}

impl FromSql<SmallInt, Pg> for TagType
where
    i16: FromSql<SmallInt, Pg>,
{
    fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let database_value = i16::from_sql(bytes)?;
        TagType::from_repr(database_value).ok_or(DeserializeTagTypeError.into())
    }
}

/// A vote as it appears in requests and responses. `None` means the client has no vote.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i16)]
pub enum Rating {
    Down = -1,
    #[default]
    None = 0,
    Up = 1,
}

impl From<Score> for Rating {
    fn from(value: Score) -> Self {
        match value {
            Score::Down => Self::Down,
            Score::Up => Self::Up,
        }
    }
}

/// A vote as it is stored. There is no neutral score; the absence of a row means "no vote".
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr, AsExpression, FromSqlRow)]
#[diesel(sql_type = SmallInt)]
#[repr(i16)]
pub enum Score {
    Down = -1,
    Up = 1,
}

impl Score {
    pub fn value(self) -> i64 {
        i64::from(self as i16)
    }
}

impl ToSql<SmallInt, Pg> for Score
where
    i16: ToSql<SmallInt, Pg>,
{
    fn to_sql(&self, out: &mut Output<Pg>) -> serialize::Result {
        let value = *self as i16;
        <i16 as ToSql<SmallInt, Pg>>::to_sql(&value, &mut out.reborrow())
    }
}

impl FromSql<SmallInt, Pg> for Score
where
    i16: FromSql<SmallInt, Pg>,
{
    fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let database_value = i16::from_sql(bytes)?;
        Score::from_repr(database_value).ok_or(DeserializeScoreError.into())
    }
}

#[derive(Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Car,
    Comment,
    #[strum(serialize = "parent comment")]
    ParentComment,
    Post,
    User,
    #[strum(serialize = "user token")]
    UserToken,
}

#[derive(Debug, Display)]
pub enum ResourceProperty {
    #[strum(serialize = "User email")]
    UserEmail,
    #[strum(serialize = "Username")]
    UserName,
    #[strum(serialize = "Vote")]
    Vote,
}

#[derive(Debug, Error)]
#[error("Failed to deserialize user rank")]
struct DeserializeUserRankError;

#[derive(Debug, Error)]
#[error("Failed to deserialize tag type")]
struct DeserializeTagTypeError;

#[derive(Debug, Error)]
#[error("Failed to deserialize score")]
struct DeserializeScoreError;

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rank_ordering() {
        assert!(UserRank::Restricted < UserRank::Regular);
        assert!(UserRank::Administrator > UserRank::Moderator);
        assert_eq!(UserRank::Regular, UserRank::Regular);
        assert_ne!(UserRank::Regular, UserRank::Moderator);
    }

    #[test]
    fn tag_type_names() {
        assert_eq!(TagType::from_str("drivetrain").ok(), Some(TagType::Drivetrain));
        assert_eq!(TagType::Transmission.to_string(), "transmission");
        assert!(TagType::from_str("color").is_err());
    }

    #[test]
    fn score_to_rating() {
        assert_eq!(Score::Down.value(), -1);
        assert_eq!(Score::Up.value(), 1);
        assert_eq!(Rating::from(Score::Down), Rating::Down);
        assert_eq!(Rating::from(Score::Up), Rating::Up);
    }

    #[test]
    fn rating_wire_format() {
        assert_eq!(serde_json::to_string(&Rating::Down).ok().as_deref(), Some("-1"));
        assert_eq!(serde_json::from_str::<Rating>("1").ok(), Some(Rating::Up));
        assert!(serde_json::from_str::<Rating>("2").is_err());
    }
}
