use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Timestamptz;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use time::OffsetDateTime;
use time::serde::rfc3339;
use tracing::debug;

/// Logs how long the enclosing scope took when dropped.
pub struct Timer<'a> {
    name: &'a str,
    start: std::time::Instant,
}

impl<'a> Timer<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        let elapsed_time = self.start.elapsed();
        let time_in_s = elapsed_time.as_secs_f32();
        match elapsed_time.as_nanos().checked_ilog10().unwrap_or(0) {
            0..3 => debug!("{} took {:.1}ns", self.name, time_in_s * 1e9),
            3..6 => debug!("{} took {:.1}μs", self.name, time_in_s * 1e6),
            6..9 => debug!("{} took {:.1}ms", self.name, time_in_s * 1e3),
            9.. => debug!("{} took {:.1}s", self.name, time_in_s),
        }
    }
}

// A wrapper for time::OffsetDateTime that serializes/deserializes according to RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Timestamptz)]
pub struct DateTime(#[serde(with = "rfc3339")] OffsetDateTime);

impl DateTime {
    pub fn now() -> Self {
        OffsetDateTime::now_utc().into()
    }

    pub fn current_year() -> i32 {
        Self::now().year()
    }
}

impl Deref for DateTime {
    type Target = OffsetDateTime;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DateTime {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(value: OffsetDateTime) -> Self {
        DateTime(value)
    }
}

impl<DB: Backend> ToSql<Timestamptz, DB> for DateTime
where
    OffsetDateTime: ToSql<diesel::sql_types::Timestamptz, DB>,
{
    fn to_sql<'a>(&'a self, out: &mut Output<'a, '_, DB>) -> serialize::Result {
        self.0.to_sql(out)
    }
}

impl<DB: Backend> FromSql<Timestamptz, DB> for DateTime
where
    OffsetDateTime: FromSql<diesel::sql_types::Timestamptz, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        OffsetDateTime::from_sql(bytes).map(DateTime)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc3339_round_trip() {
        let json = "\"2024-06-01T12:30:00Z\"";
        let time: DateTime = serde_json::from_str(json).unwrap();
        assert_eq!(time.year(), 2024);
        assert_eq!(serde_json::to_string(&time).unwrap(), json);
    }

    #[test]
    fn ordering() {
        let earlier = DateTime::now();
        let later = DateTime::from(*earlier + time::Duration::SECOND);
        assert!(earlier < later);
    }
}
