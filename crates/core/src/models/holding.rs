//! Catalog holding model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of item a holding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Medium {
    Book,
    Movie,
}

impl Medium {
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Book => "Book",
            Medium::Movie => "Movie",
        }
    }
}

impl std::fmt::Display for Medium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single physical copy in the catalog, identified by serial number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub serial_no: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub medium: Medium,
    /// Procurement cost in whole rupees
    pub cost: i64,
    pub acquired_at: DateTime<Utc>,
    /// On the shelf and issuable. Only the circulation ledger flips this.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(
        serial_no: String,
        title: String,
        author: String,
        category: String,
        medium: Medium,
        cost: i64,
        acquired_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            serial_no,
            title,
            author,
            category,
            medium,
            cost,
            acquired_at,
            is_available: true,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_holdings_start_available() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
        let holding = Holding::new(
            "BK001".into(),
            "The Great Gatsby".into(),
            "F. Scott Fitzgerald".into(),
            "Fiction".into(),
            Medium::Book,
            299,
            now,
            now,
        );
        assert!(holding.is_available);
        assert_eq!(holding.medium.as_str(), "Book");
    }
}
