//! Read-side reports over the catalog, membership register, and circulation

use chrono::NaiveTime;
use rusqlite::Connection;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::fine::FINE_PER_DAY;
use crate::models::{Holding, IssueDetail, Medium, Member, MemberProfile, Role};
use crate::permissions::{PermissionMatrix, StaffAction};
use crate::storage::{HoldingFilter, HoldingStore, IssueStore, MemberStore};

/// An issue past its due date, with the fine it would earn today.
///
/// `estimated_fine` is a projection for the report; the authoritative
/// fine is computed when the return is actually recorded.
#[derive(Debug, Clone)]
pub struct OverdueIssue {
    pub detail: IssueDetail,
    pub days_overdue: i64,
    pub estimated_fine: i64,
}

/// Reporting queries
pub struct Reports<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> Reports<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    /// Master list of books, newest first
    pub fn master_books(&self) -> Result<Vec<Holding>> {
        let filter = HoldingFilter {
            medium: Some(Medium::Book),
            ..HoldingFilter::default()
        };
        HoldingStore::new(self.conn).list(&filter)
    }

    /// Master list of movies, newest first
    pub fn master_movies(&self) -> Result<Vec<Holding>> {
        let filter = HoldingFilter {
            medium: Some(Medium::Movie),
            ..HoldingFilter::default()
        };
        HoldingStore::new(self.conn).list(&filter)
    }

    /// Register of member accounts, staff only. Staff accounts themselves
    /// are not part of the register.
    pub fn membership_register(&self, actor: &Member) -> Result<Vec<MemberProfile>> {
        if !PermissionMatrix::can_perform(actor.role, StaffAction::ViewMembershipRegister) {
            return Err(Error::PermissionDenied(
                "only staff can view the membership register".into(),
            ));
        }

        let members = MemberStore::new(self.conn).list_by_role(Role::Member)?;
        Ok(members.iter().map(MemberProfile::from).collect())
    }

    /// Everything currently out or awaiting settlement, staff only
    pub fn active_issues(&self, actor: &Member) -> Result<Vec<IssueDetail>> {
        if !PermissionMatrix::can_perform(actor.role, StaffAction::ViewCirculationReports) {
            return Err(Error::PermissionDenied(
                "only staff can view circulation reports".into(),
            ));
        }

        IssueStore::new(self.conn).list_active()
    }

    /// Issues past their due date as of today, staff only
    pub fn overdue_issues(&self, actor: &Member) -> Result<Vec<OverdueIssue>> {
        if !PermissionMatrix::can_perform(actor.role, StaffAction::ViewCirculationReports) {
            return Err(Error::PermissionDenied(
                "only staff can view circulation reports".into(),
            ));
        }

        // Overdue means the due date is a past calendar day, so the
        // cutoff is midnight today
        let today = self.clock.now().date_naive();
        let cutoff = today.and_time(NaiveTime::MIN).and_utc();

        let overdue = IssueStore::new(self.conn)
            .list_overdue(cutoff)?
            .into_iter()
            .map(|detail| {
                let days_overdue = (today - detail.issue.due_on.date_naive()).num_days();
                OverdueIssue {
                    days_overdue,
                    estimated_fine: days_overdue * FINE_PER_DAY,
                    detail,
                }
            })
            .collect();

        Ok(overdue)
    }
}
