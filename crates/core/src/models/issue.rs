//! Issue records and their lifecycle state
//!
//! An issue is born `Issued` and only becomes `Returned` once its fine is
//! settled. Between the physical return and settlement the record keeps
//! status `Issued` with `returned_on` set; that gap is the pending
//! settlement window.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an issue record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
    /// Copy is out, or back but not yet settled
    Issued,
    /// Fine settled, copy back on the shelf
    Returned,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Issued => "Issued",
            IssueStatus::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One loan of one holding to one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub member_id: Uuid,
    pub holding_id: Uuid,
    pub issued_on: DateTime<Utc>,
    pub due_on: DateTime<Utc>,
    pub returned_on: Option<DateTime<Utc>>,
    /// Authoritative fine in whole rupees, recorded at return time
    pub fine_amount: i64,
    pub fine_paid: bool,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    pub fn new(
        member_id: Uuid,
        holding_id: Uuid,
        issued_on: DateTime<Utc>,
        due_on: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            holding_id,
            issued_on,
            due_on,
            returned_on: None,
            fine_amount: 0,
            fine_paid: false,
            status: IssueStatus::Issued,
            created_at: now,
        }
    }

    /// Still out past the due date, counted in calendar days
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == IssueStatus::Issued
            && self.returned_on.is_none()
            && self.due_on.date_naive() < today
    }

    /// Returned physically but not yet settled through fine payment
    pub fn is_pending_settlement(&self) -> bool {
        self.returned_on.is_some() && self.status != IssueStatus::Returned
    }
}

/// Member fields shown alongside an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub membership_no: Option<String>,
}

/// Holding fields shown alongside an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub id: Uuid,
    pub serial_no: String,
    pub title: String,
    pub author: String,
    pub medium: super::Medium,
}

/// An issue joined with the member and holding it concerns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetail {
    pub issue: Issue,
    pub member: MemberSummary,
    pub holding: HoldingSummary,
}
