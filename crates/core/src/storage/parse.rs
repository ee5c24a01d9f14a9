//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{IssueStatus, Medium, MembershipTier, Role};

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Convert a stored role string to Role
pub fn role_from_str(value: &str) -> Role {
    match value {
        "admin" => Role::Admin,
        _ => Role::Member,
    }
}

/// Convert a stored medium string to Medium
pub fn medium_from_str(value: &str) -> Medium {
    match value {
        "Movie" => Medium::Movie,
        _ => Medium::Book,
    }
}

/// Convert a stored tier string to MembershipTier, None for unknown values
pub fn tier_from_str_opt(value: Option<String>) -> Option<MembershipTier> {
    match value.as_deref() {
        Some("6months") => Some(MembershipTier::HalfYear),
        Some("1year") => Some(MembershipTier::OneYear),
        Some("2years") => Some(MembershipTier::TwoYears),
        _ => None,
    }
}

/// Convert a stored status string to IssueStatus
pub fn status_from_str(value: &str) -> IssueStatus {
    match value {
        "Returned" => IssueStatus::Returned,
        _ => IssueStatus::Issued,
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
