//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, future server backend).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::holdings::HoldingFilter;
use crate::error::Result;
use crate::models::{Holding, Issue, IssueDetail, Member, Role};

/// Member repository operations
pub trait MemberRepository {
    /// Create a new member
    fn create_member(&self, member: &Member) -> Result<()>;

    /// Find member by ID
    fn find_member_by_id(&self, id: Uuid) -> Result<Option<Member>>;

    /// Find member by email
    fn find_member_by_email(&self, email: &str) -> Result<Option<Member>>;

    /// List members with a given role
    fn list_members_by_role(&self, role: Role) -> Result<Vec<Member>>;

    /// Set a member's active flag
    fn set_member_active(&self, id: Uuid, is_active: bool) -> Result<()>;
}

/// Catalog repository operations
pub trait CatalogRepository {
    /// Create a new holding
    fn create_holding(&self, holding: &Holding) -> Result<()>;

    /// Update a holding's descriptive fields
    fn update_holding(&self, holding: &Holding) -> Result<()>;

    /// Find holding by ID
    fn find_holding_by_id(&self, id: Uuid) -> Result<Option<Holding>>;

    /// Find holding by serial number
    fn find_holding_by_serial(&self, serial_no: &str) -> Result<Option<Holding>>;

    /// List holdings matching a filter
    fn list_holdings(&self, filter: &HoldingFilter) -> Result<Vec<Holding>>;

    /// Claim a holding for issue; false when it was not available
    fn claim_holding(&self, id: Uuid) -> Result<bool>;

    /// Put a holding back on the shelf
    fn release_holding(&self, id: Uuid) -> Result<()>;
}

/// Issue ledger repository operations
pub trait IssueRepository {
    /// Create a new issue record
    fn create_issue(&self, issue: &Issue) -> Result<()>;

    /// Find issue by ID
    fn find_issue_by_id(&self, id: Uuid) -> Result<Option<Issue>>;

    /// Find issue by ID with member and holding context
    fn find_issue_detail(&self, id: Uuid) -> Result<Option<IssueDetail>>;

    /// All issues for one member, newest first
    fn list_issues_for_member(&self, member_id: Uuid) -> Result<Vec<IssueDetail>>;

    /// All issues still in status Issued
    fn list_active_issues(&self) -> Result<Vec<IssueDetail>>;

    /// Issues still out with a due date before `cutoff`
    fn list_overdue_issues(&self, cutoff: DateTime<Utc>) -> Result<Vec<IssueDetail>>;

    /// Count a member's issues in status Issued
    fn count_active_issues_for_member(&self, member_id: Uuid) -> Result<i64>;

    /// Record a physical return; false when one was already recorded
    fn record_issue_return(
        &self,
        id: Uuid,
        returned_on: DateTime<Utc>,
        fine_amount: i64,
    ) -> Result<bool>;

    /// Complete settlement; false when a paid settlement already happened
    fn settle_issue(&self, id: Uuid) -> Result<bool>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite or mocks.
pub trait Storage: MemberRepository + CatalogRepository + IssueRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: MemberRepository + CatalogRepository + IssueRepository {}
