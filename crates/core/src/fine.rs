//! Late-return fine arithmetic
//!
//! Fines accrue per calendar day, not per 24-hour span. Both endpoints
//! are truncated to their calendar date before comparison, so a return
//! at 23:59 one day late costs the same as one at 00:01.

use chrono::{DateTime, Utc};

/// Fine per day late, in whole rupees
pub const FINE_PER_DAY: i64 = 10;

/// Fine owed for a copy due on `due_on` and returned on `returned_on`.
///
/// Zero when the return lands on or before the due date.
pub fn fine_for(due_on: DateTime<Utc>, returned_on: DateTime<Utc>) -> i64 {
    let due = due_on.date_naive();
    let returned = returned_on.date_naive();
    if returned <= due {
        return 0;
    }
    (returned - due).num_days() * FINE_PER_DAY
}
