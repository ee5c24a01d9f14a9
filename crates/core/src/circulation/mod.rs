//! Circulation ledger: issue, return, and fine settlement
//!
//! Returning a copy is a two-step desk flow. `record_return` stamps the
//! physical drop-off and the fine it earned; `pay_fine` settles that fine
//! and is the only place a copy goes back on the shelf. Until settlement
//! the copy stays reserved, so an unpaid fine never quietly releases it.
//!
//! Every mutating operation runs in a transaction on the shared
//! connection, and the contended writes (the availability flip, the
//! settlement) are conditional updates, so two racing calls resolve
//! to exactly one winner.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::fine::fine_for;
use crate::invariants::assert_issue_invariants;
use crate::models::{Issue, IssueDetail, IssueStatus, Member};
use crate::permissions::{PermissionMatrix, StaffAction};
use crate::storage::{HoldingStore, IssueStore, MemberStore};

/// Longest allowed loan, in calendar days from the issue date
pub const LOAN_PERIOD_DAYS: i64 = 15;

/// How many holdings one member may have out at once
pub const MAX_ACTIVE_ISSUES: i64 = 3;

/// Input for issuing a holding
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Member receiving the copy; defaults to the acting member
    pub member_id: Option<Uuid>,
    pub holding_id: Uuid,
    pub issued_on: DateTime<Utc>,
    pub due_on: DateTime<Utc>,
}

/// Circulation lifecycle service
pub struct IssueLedger<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> IssueLedger<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    /// Issue a holding to a member.
    ///
    /// The preconditions run in a fixed order so the first failure wins:
    /// holding exists, holding available, member exists, membership active
    /// (staff bypass), issue date not in the past, due date inside the
    /// loan window, borrow limit not reached.
    #[instrument(skip(self, actor, request), fields(actor = %actor.email, holding_id = %request.holding_id))]
    pub fn issue(&self, actor: &Member, request: IssueRequest) -> Result<IssueDetail> {
        let member_id = request.member_id.unwrap_or(actor.id);
        if member_id != actor.id
            && !PermissionMatrix::can_perform(actor.role, StaffAction::IssueOnBehalf)
        {
            return Err(Error::PermissionDenied(
                "only staff can issue for another member".into(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        let holdings = HoldingStore::new(&tx);
        let members = MemberStore::new(&tx);
        let issues = IssueStore::new(&tx);

        let holding = holdings
            .find_by_id(request.holding_id)?
            .ok_or_else(|| Error::NotFound("holding not found".into()))?;

        if !holding.is_available {
            return Err(Error::Conflict("holding is not available for issue".into()));
        }

        let member = members
            .find_by_id(member_id)?
            .ok_or_else(|| Error::NotFound("member not found".into()))?;

        let now = self.clock.now();
        if !member.is_active_for_borrowing(now) {
            return Err(Error::InvalidOperation(
                "membership is not active or has expired".into(),
            ));
        }

        // Date bounds compare calendar days, never time of day
        if request.issued_on.date_naive() < now.date_naive() {
            return Err(Error::InvalidOperation(
                "issue date cannot be in the past".into(),
            ));
        }
        if request.due_on.date_naive() < request.issued_on.date_naive() {
            return Err(Error::InvalidOperation(
                "return date cannot be before the issue date".into(),
            ));
        }
        let latest_due = request.issued_on.date_naive() + Duration::days(LOAN_PERIOD_DAYS);
        if request.due_on.date_naive() > latest_due {
            return Err(Error::InvalidOperation(format!(
                "return date cannot be more than {} days after the issue date",
                LOAN_PERIOD_DAYS
            )));
        }

        if issues.count_active_for_member(member.id)? >= MAX_ACTIVE_ISSUES {
            return Err(Error::InvalidOperation(format!(
                "member already has {} holdings on issue",
                MAX_ACTIVE_ISSUES
            )));
        }

        // Conditional claim: a racing issue that got in first shows up
        // here as zero changed rows
        if !holdings.claim(holding.id)? {
            return Err(Error::Conflict("holding is not available for issue".into()));
        }

        let issue = Issue::new(member.id, holding.id, request.issued_on, request.due_on, now);
        assert_issue_invariants(&issue);
        issues.create(&issue)?;

        let detail = issues
            .find_detail(issue.id)?
            .ok_or_else(|| Error::NotFound("issue record not found".into()))?;
        tx.commit()?;

        info!(
            issue_id = %issue.id,
            member_id = %member.id,
            serial_no = %holding.serial_no,
            "Holding issued"
        );
        Ok(detail)
    }

    /// Record the physical return of an issued holding.
    ///
    /// Stamps the return date (defaulting to now) and the authoritative
    /// fine. Status stays Issued and the copy stays off the shelf until
    /// the fine is settled.
    #[instrument(skip(self, actor, returned_on), fields(actor = %actor.email))]
    pub fn record_return(
        &self,
        actor: &Member,
        issue_id: Uuid,
        returned_on: Option<DateTime<Utc>>,
    ) -> Result<IssueDetail> {
        let tx = self.conn.unchecked_transaction()?;
        let issues = IssueStore::new(&tx);

        let issue = issues
            .find_by_id(issue_id)?
            .ok_or_else(|| Error::NotFound("issue record not found".into()))?;

        if issue.status == IssueStatus::Returned {
            return Err(Error::InvalidOperation(
                "holding has already been returned".into(),
            ));
        }

        if !PermissionMatrix::can_act_for(actor.role, actor.id, issue.member_id) {
            return Err(Error::PermissionDenied(
                "not authorized to return this issue".into(),
            ));
        }

        if issue.returned_on.is_some() {
            return Err(Error::InvalidOperation(
                "return already recorded, fine settlement is pending".into(),
            ));
        }

        let returned_on = returned_on.unwrap_or_else(|| self.clock.now());
        if returned_on.date_naive() < issue.issued_on.date_naive() {
            return Err(Error::InvalidOperation(
                "return date cannot be before the issue date".into(),
            ));
        }
        let fine_amount = fine_for(issue.due_on, returned_on);

        // Guarded stamp; losing it means another return landed in between
        if !issues.record_return(issue.id, returned_on, fine_amount)? {
            return Err(Error::InvalidOperation(
                "return already recorded, fine settlement is pending".into(),
            ));
        }

        let detail = issues
            .find_detail(issue.id)?
            .ok_or_else(|| Error::NotFound("issue record not found".into()))?;
        tx.commit()?;

        info!(issue_id = %issue.id, fine_amount, "Return recorded");
        Ok(detail)
    }

    /// Settle the fine on a returned holding and put it back on the shelf.
    ///
    /// This is the only operation that moves an issue to Returned and
    /// restores availability. It must be called even when the fine is
    /// zero; a zero-fine settlement stays repeatable, a paid one does not.
    #[instrument(skip(self, actor), fields(actor = %actor.email))]
    pub fn pay_fine(&self, actor: &Member, issue_id: Uuid) -> Result<IssueDetail> {
        let tx = self.conn.unchecked_transaction()?;
        let issues = IssueStore::new(&tx);
        let holdings = HoldingStore::new(&tx);

        let issue = issues
            .find_by_id(issue_id)?
            .ok_or_else(|| Error::NotFound("issue record not found".into()))?;

        if !PermissionMatrix::can_act_for(actor.role, actor.id, issue.member_id) {
            return Err(Error::PermissionDenied(
                "not authorized to pay this fine".into(),
            ));
        }

        if issue.returned_on.is_none() {
            return Err(Error::InvalidOperation(
                "holding has not been returned yet".into(),
            ));
        }

        if issue.status == IssueStatus::Returned && issue.fine_paid {
            return Err(Error::InvalidOperation("fine has already been paid".into()));
        }

        // Losing the guarded update means a concurrent settlement won
        if !issues.settle(issue.id)? {
            return Err(Error::InvalidOperation("fine has already been paid".into()));
        }
        holdings.release(issue.holding_id)?;

        let detail = issues
            .find_detail(issue.id)?
            .ok_or_else(|| Error::NotFound("issue record not found".into()))?;
        tx.commit()?;

        info!(
            issue_id = %issue.id,
            fine_amount = issue.fine_amount,
            "Fine settled, holding released"
        );
        Ok(detail)
    }

    /// All issues for one member, newest first
    pub fn issues_for_member(&self, actor: &Member, member_id: Uuid) -> Result<Vec<IssueDetail>> {
        if !PermissionMatrix::can_act_for(actor.role, actor.id, member_id) {
            return Err(Error::PermissionDenied(
                "not authorized to view these issues".into(),
            ));
        }
        IssueStore::new(self.conn).list_for_member(member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Holding, Medium, MembershipTier};
    use crate::storage::Database;
    use chrono::TimeZone;

    fn on(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        on(2025, 6, day)
    }

    fn clock_at(day: u32) -> FixedClock {
        FixedClock::new(at(day))
    }

    fn create_admin(db: &Database) -> Member {
        let admin = Member::new_admin(
            "Admin".to_string(),
            "admin@library.com".to_string(),
            "hash".to_string(),
            at(1),
        );
        db.members().create(&admin).unwrap();
        admin
    }

    fn create_member(db: &Database, email: &str) -> Member {
        let member = Member::new_member(
            "Test User".to_string(),
            email.to_string(),
            "hash".to_string(),
            MembershipTier::OneYear,
            at(1),
        );
        db.members().create(&member).unwrap();
        member
    }

    fn create_holding(db: &Database, serial_no: &str) -> Holding {
        let holding = Holding::new(
            serial_no.to_string(),
            "Some Title".to_string(),
            "Some Author".to_string(),
            "Fiction".to_string(),
            Medium::Book,
            299,
            at(1),
            at(1),
        );
        db.holdings().create(&holding).unwrap();
        holding
    }

    fn request_for(holding: &Holding, issue_day: u32, due_day: u32) -> IssueRequest {
        IssueRequest {
            member_id: None,
            holding_id: holding.id,
            issued_on: at(issue_day),
            due_on: at(due_day),
        }
    }

    #[test]
    fn test_issue_happy_path() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");
        let clock = clock_at(10);

        let detail = db
            .circulation(&clock)
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap();

        assert_eq!(detail.issue.status, IssueStatus::Issued);
        assert_eq!(detail.issue.fine_amount, 0);
        assert!(!detail.issue.fine_paid);
        assert!(detail.issue.returned_on.is_none());
        assert_eq!(detail.member.email, "user@library.com");
        assert_eq!(detail.holding.serial_no, "BK001");

        let shelved = db.holdings().find_by_id(holding.id).unwrap().unwrap();
        assert!(!shelved.is_available);
        assert_eq!(db.issues().count_active_for_member(member.id).unwrap(), 1);
    }

    #[test]
    fn test_issue_unknown_holding_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let clock = clock_at(10);

        let request = IssueRequest {
            member_id: None,
            holding_id: Uuid::new_v4(),
            issued_on: at(10),
            due_on: at(20),
        };
        let err = db.circulation(&clock).issue(&member, request).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_issue_unknown_member_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let admin = create_admin(&db);
        let holding = create_holding(&db, "BK001");
        let clock = clock_at(10);

        let mut request = request_for(&holding, 10, 20);
        request.member_id = Some(Uuid::new_v4());
        let err = db.circulation(&clock).issue(&admin, request).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_issued_copy_conflicts_regardless_of_other_inputs() {
        let db = Database::open_in_memory().unwrap();
        let first = create_member(&db, "first@library.com");
        let second = create_member(&db, "second@library.com");
        let holding = create_holding(&db, "BK001");
        let clock = clock_at(10);

        db.circulation(&clock)
            .issue(&first, request_for(&holding, 10, 20))
            .unwrap();

        // Even with a hopeless date window the answer is the conflict
        let err = db
            .circulation(&clock)
            .issue(&second, request_for(&holding, 10, 30))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_inactive_membership_cannot_borrow() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");
        db.members().set_active(member.id, false).unwrap();
        let member = db.members().find_by_id(member.id).unwrap().unwrap();
        let clock = clock_at(10);

        let err = db
            .circulation(&clock)
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_expired_membership_cannot_borrow() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        // A year's membership from June 2025 has lapsed by July 2026
        let clock = FixedClock::new(on(2026, 7, 1));
        let request = IssueRequest {
            member_id: None,
            holding_id: holding.id,
            issued_on: on(2026, 7, 1),
            due_on: on(2026, 7, 10),
        };
        let err = db.circulation(&clock).issue(&member, request).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_staff_bypass_membership_state() {
        let db = Database::open_in_memory().unwrap();
        let admin = create_admin(&db);
        let holding = create_holding(&db, "BK001");
        let clock = clock_at(10);

        // Staff accounts carry no tier or expiry yet may borrow
        let detail = db
            .circulation(&clock)
            .issue(&admin, request_for(&holding, 10, 20))
            .unwrap();
        assert_eq!(detail.member.email, "admin@library.com");
    }

    #[test]
    fn test_issue_date_cannot_be_in_the_past() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");
        let clock = clock_at(10);

        let err = db
            .circulation(&clock)
            .issue(&member, request_for(&holding, 9, 20))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        // Post-dated issues are allowed
        db.circulation(&clock)
            .issue(&member, request_for(&holding, 12, 20))
            .unwrap();
    }

    #[test]
    fn test_loan_window_boundary() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let h1 = create_holding(&db, "BK001");
        let h2 = create_holding(&db, "BK002");
        let clock = clock_at(10);
        let ledger = db.circulation(&clock);

        // Sixteen days out is over the line
        let err = ledger.issue(&member, request_for(&h1, 10, 26)).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        // Fifteen exactly is fine
        ledger.issue(&member, request_for(&h1, 10, 25)).unwrap();

        // Due before issue is nonsense
        let err = ledger.issue(&member, request_for(&h2, 12, 11)).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_borrow_limit_leaves_no_side_effects() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let clock = clock_at(10);

        for serial in ["BK001", "BK002", "BK003"] {
            let holding = create_holding(&db, serial);
            db.circulation(&clock)
                .issue(&member, request_for(&holding, 10, 20))
                .unwrap();
        }

        let fourth = create_holding(&db, "BK004");
        let err = db
            .circulation(&clock)
            .issue(&member, request_for(&fourth, 10, 20))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        // The failed attempt must not have touched the fourth copy
        let untouched = db.holdings().find_by_id(fourth.id).unwrap().unwrap();
        assert!(untouched.is_available);
    }

    #[test]
    fn test_issue_on_behalf_requires_staff() {
        let db = Database::open_in_memory().unwrap();
        let admin = create_admin(&db);
        let alice = create_member(&db, "alice@library.com");
        let bob = create_member(&db, "bob@library.com");
        let h1 = create_holding(&db, "BK001");
        let h2 = create_holding(&db, "BK002");
        let clock = clock_at(10);

        let mut request = request_for(&h1, 10, 20);
        request.member_id = Some(bob.id);
        let err = db.circulation(&clock).issue(&alice, request).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let mut request = request_for(&h2, 10, 20);
        request.member_id = Some(bob.id);
        let detail = db.circulation(&clock).issue(&admin, request).unwrap();
        assert_eq!(detail.member.email, "bob@library.com");
    }

    #[test]
    fn test_on_time_round_trip_keeps_copy_reserved_until_settlement() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap();

        // Drop-off on day 15: no fine, but the copy stays reserved
        let returned = db
            .circulation(&clock_at(15))
            .record_return(&member, issued.issue.id, None)
            .unwrap();
        assert_eq!(returned.issue.fine_amount, 0);
        assert_eq!(returned.issue.status, IssueStatus::Issued);
        assert_eq!(returned.issue.returned_on, Some(at(15)));
        assert!(returned.issue.is_pending_settlement());
        let shelved = db.holdings().find_by_id(holding.id).unwrap().unwrap();
        assert!(!shelved.is_available);

        // Settlement completes the record and frees the copy
        let settled = db
            .circulation(&clock_at(15))
            .pay_fine(&member, issued.issue.id)
            .unwrap();
        assert_eq!(settled.issue.status, IssueStatus::Returned);
        assert!(!settled.issue.fine_paid);
        assert_eq!(settled.issue.fine_amount, 0);
        let shelved = db.holdings().find_by_id(holding.id).unwrap().unwrap();
        assert!(shelved.is_available);
    }

    #[test]
    fn test_late_round_trip_charges_per_day() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 10, 25))
            .unwrap();

        // Five days late at ten per day
        let returned = db
            .circulation(&clock_at(30))
            .record_return(&member, issued.issue.id, None)
            .unwrap();
        assert_eq!(returned.issue.fine_amount, 50);
        assert!(returned.issue.is_pending_settlement());

        let settled = db
            .circulation(&clock_at(30))
            .pay_fine(&member, issued.issue.id)
            .unwrap();
        assert_eq!(settled.issue.status, IssueStatus::Returned);
        assert!(settled.issue.fine_paid);

        // A paid settlement cannot be paid again
        let err = db
            .circulation(&clock_at(30))
            .pay_fine(&member, issued.issue.id)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_zero_fine_settlement_is_repeatable() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap();
        db.circulation(&clock_at(12))
            .record_return(&member, issued.issue.id, None)
            .unwrap();

        db.circulation(&clock_at(12))
            .pay_fine(&member, issued.issue.id)
            .unwrap();
        // No positive fine was paid, so repeating settlement is harmless
        let again = db
            .circulation(&clock_at(13))
            .pay_fine(&member, issued.issue.id)
            .unwrap();
        assert_eq!(again.issue.status, IssueStatus::Returned);
        assert!(!again.issue.fine_paid);
    }

    #[test]
    fn test_second_return_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap();
        db.circulation(&clock_at(15))
            .record_return(&member, issued.issue.id, None)
            .unwrap();

        // Pending settlement: the stamp cannot be overwritten
        let err = db
            .circulation(&clock_at(16))
            .record_return(&member, issued.issue.id, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        // And after settlement the issue is simply already returned
        db.circulation(&clock_at(16))
            .pay_fine(&member, issued.issue.id)
            .unwrap();
        let err = db
            .circulation(&clock_at(17))
            .record_return(&member, issued.issue.id, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_return_and_settlement_authorization() {
        let db = Database::open_in_memory().unwrap();
        let admin = create_admin(&db);
        let alice = create_member(&db, "alice@library.com");
        let mallory = create_member(&db, "mallory@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&alice, request_for(&holding, 10, 20))
            .unwrap();

        let err = db
            .circulation(&clock_at(15))
            .record_return(&mallory, issued.issue.id, None)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        // Staff can take the return at the desk
        db.circulation(&clock_at(15))
            .record_return(&admin, issued.issue.id, None)
            .unwrap();

        let err = db
            .circulation(&clock_at(15))
            .pay_fine(&mallory, issued.issue.id)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        db.circulation(&clock_at(15))
            .pay_fine(&admin, issued.issue.id)
            .unwrap();
    }

    #[test]
    fn test_pay_fine_requires_a_recorded_return() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap();

        let err = db
            .circulation(&clock_at(12))
            .pay_fine(&member, issued.issue.id)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let err = db
            .circulation(&clock_at(12))
            .pay_fine(&member, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_return_date_cannot_precede_issue_date() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        // Post-dated issue: out on day 12, desk clock still on day 10
        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 12, 20))
            .unwrap();

        let err = db
            .circulation(&clock_at(10))
            .record_return(&member, issued.issue.id, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let err = db
            .circulation(&clock_at(15))
            .record_return(&member, issued.issue.id, Some(at(11)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        db.circulation(&clock_at(15))
            .record_return(&member, issued.issue.id, None)
            .unwrap();
    }

    #[test]
    fn test_explicit_return_date_is_honored() {
        let db = Database::open_in_memory().unwrap();
        let member = create_member(&db, "user@library.com");
        let holding = create_holding(&db, "BK001");

        let issued = db
            .circulation(&clock_at(10))
            .issue(&member, request_for(&holding, 10, 20))
            .unwrap();

        // Backfilling a drop-box return from two days earlier
        let returned = db
            .circulation(&clock_at(25))
            .record_return(&member, issued.issue.id, Some(at(23)))
            .unwrap();
        assert_eq!(returned.issue.returned_on, Some(at(23)));
        assert_eq!(returned.issue.fine_amount, 30);
    }

    #[test]
    fn test_issue_listing_is_owner_or_staff() {
        let db = Database::open_in_memory().unwrap();
        let admin = create_admin(&db);
        let alice = create_member(&db, "alice@library.com");
        let mallory = create_member(&db, "mallory@library.com");
        let h1 = create_holding(&db, "BK001");
        let h2 = create_holding(&db, "BK002");

        db.circulation(&clock_at(10))
            .issue(&alice, request_for(&h1, 10, 20))
            .unwrap();
        db.circulation(&clock_at(12))
            .issue(&alice, request_for(&h2, 12, 22))
            .unwrap();

        let own = db
            .circulation(&clock_at(12))
            .issues_for_member(&alice, alice.id)
            .unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].holding.serial_no, "BK002");

        let err = db
            .circulation(&clock_at(12))
            .issues_for_member(&mallory, alice.id)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let as_staff = db
            .circulation(&clock_at(12))
            .issues_for_member(&admin, alice.id)
            .unwrap();
        assert_eq!(as_staff.len(), 2);
    }

    #[test]
    fn test_concurrent_issue_has_single_winner() {
        use std::sync::{Arc, Mutex};
        use std::thread;

        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let (alice, bob, holding) = {
            let db = db.lock().unwrap();
            (
                create_member(&db, "alice@library.com"),
                create_member(&db, "bob@library.com"),
                create_holding(&db, "BK001"),
            )
        };

        let mut handles = Vec::new();
        for member in [alice, bob] {
            let db = Arc::clone(&db);
            let holding_id = holding.id;
            handles.push(thread::spawn(move || {
                let clock = clock_at(10);
                let request = IssueRequest {
                    member_id: None,
                    holding_id,
                    issued_on: at(10),
                    due_on: at(20),
                };
                let db = db.lock().unwrap();
                db.circulation(&clock).issue(&member, request)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(Error::Conflict(_))))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 1);
    }
}
