//! Issue ledger storage operations
//!
//! The mutating statements here are conditional updates: each carries its
//! lifecycle guard in the WHERE clause and reports via the changed-row
//! count whether it took effect. Racing writers then resolve on the
//! database, not in application state.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    medium_from_str, parse_datetime, parse_datetime_opt, parse_uuid, status_from_str, OptionalExt,
};
use crate::error::Result;
use crate::models::{HoldingSummary, Issue, IssueDetail, MemberSummary};

const DETAIL_QUERY: &str = "SELECT i.id, i.member_id, i.holding_id, i.issued_on, i.due_on, \
     i.returned_on, i.fine_amount, i.fine_paid, i.status, i.created_at, \
     m.name, m.email, m.membership_no, \
     h.serial_no, h.title, h.author, h.medium \
     FROM issues i \
     INNER JOIN members m ON m.id = i.member_id \
     INNER JOIN holdings h ON h.id = i.holding_id";

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        member_id: parse_uuid(&row.get::<_, String>(1)?)?,
        holding_id: parse_uuid(&row.get::<_, String>(2)?)?,
        issued_on: parse_datetime(&row.get::<_, String>(3)?)?,
        due_on: parse_datetime(&row.get::<_, String>(4)?)?,
        returned_on: parse_datetime_opt(row.get::<_, Option<String>>(5)?)?,
        fine_amount: row.get(6)?,
        fine_paid: row.get(7)?,
        status: status_from_str(&row.get::<_, String>(8)?),
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<IssueDetail> {
    let issue = issue_from_row(row)?;
    let member = MemberSummary {
        id: issue.member_id,
        name: row.get(10)?,
        email: row.get(11)?,
        membership_no: row.get(12)?,
    };
    let holding = HoldingSummary {
        id: issue.holding_id,
        serial_no: row.get(13)?,
        title: row.get(14)?,
        author: row.get(15)?,
        medium: medium_from_str(&row.get::<_, String>(16)?),
    };
    Ok(IssueDetail {
        issue,
        member,
        holding,
    })
}

pub struct IssueStore<'a> {
    conn: &'a Connection,
}

impl<'a> IssueStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new issue record
    #[instrument(skip(self, issue), fields(member_id = %issue.member_id, holding_id = %issue.holding_id))]
    pub fn create(&self, issue: &Issue) -> Result<()> {
        self.conn.execute(
            "INSERT INTO issues (id, member_id, holding_id, issued_on, due_on, returned_on, \
             fine_amount, fine_paid, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                issue.id.to_string(),
                issue.member_id.to_string(),
                issue.holding_id.to_string(),
                issue.issued_on.to_rfc3339(),
                issue.due_on.to_rfc3339(),
                issue.returned_on.map(|t| t.to_rfc3339()),
                issue.fine_amount,
                issue.fine_paid,
                issue.status.as_str(),
                issue.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find issue by ID (bare row, no joins)
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Issue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, holding_id, issued_on, due_on, returned_on, fine_amount, \
             fine_paid, status, created_at FROM issues WHERE id = ?1",
        )?;

        let issue = stmt
            .query_row(params![id.to_string()], issue_from_row)
            .optional()?;

        Ok(issue)
    }

    /// Find issue by ID with member and holding context
    #[instrument(skip(self))]
    pub fn find_detail(&self, id: Uuid) -> Result<Option<IssueDetail>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DETAIL_QUERY} WHERE i.id = ?1"))?;

        let detail = stmt
            .query_row(params![id.to_string()], detail_from_row)
            .optional()?;

        Ok(detail)
    }

    /// All issues for one member, newest first
    pub fn list_for_member(&self, member_id: Uuid) -> Result<Vec<IssueDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DETAIL_QUERY} WHERE i.member_id = ?1 ORDER BY i.created_at DESC"
        ))?;

        let issues = stmt
            .query_map(params![member_id.to_string()], detail_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(issues)
    }

    /// All issues still in status Issued, newest first
    pub fn list_active(&self) -> Result<Vec<IssueDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DETAIL_QUERY} WHERE i.status = 'Issued' ORDER BY i.created_at DESC"
        ))?;

        let issues = stmt
            .query_map([], detail_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(issues)
    }

    /// Issues still out with a due date before `cutoff`, most overdue first
    pub fn list_overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<IssueDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DETAIL_QUERY} WHERE i.status = 'Issued' AND i.returned_on IS NULL \
             AND i.due_on < ?1 ORDER BY i.due_on ASC"
        ))?;

        let issues = stmt
            .query_map(params![cutoff.to_rfc3339()], detail_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(issues)
    }

    /// How many issues a member currently has in status Issued
    pub fn count_active_for_member(&self, member_id: Uuid) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE member_id = ?1 AND status = 'Issued'",
            params![member_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record the physical return of a copy.
    ///
    /// Stamps the return date and the authoritative fine, exactly once:
    /// the guard refuses rows that already carry a return date or have
    /// left status Issued. Returns whether the stamp was applied.
    #[instrument(skip(self))]
    pub fn record_return(
        &self,
        id: Uuid,
        returned_on: DateTime<Utc>,
        fine_amount: i64,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE issues SET returned_on = ?1, fine_amount = ?2 \
             WHERE id = ?3 AND returned_on IS NULL AND status = 'Issued'",
            params![returned_on.to_rfc3339(), fine_amount, id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Complete settlement: mark a positive fine paid and the issue Returned.
    ///
    /// The guard requires a recorded return and refuses rows whose positive
    /// fine was already paid. A zero-fine row stays settleable, which makes
    /// the operation safe to repeat in that case.
    #[instrument(skip(self))]
    pub fn settle(&self, id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE issues \
             SET fine_paid = CASE WHEN fine_amount > 0 THEN 1 ELSE fine_paid END, \
                 status = 'Returned' \
             WHERE id = ?1 AND returned_on IS NOT NULL \
               AND NOT (status = 'Returned' AND fine_paid = 1)",
            params![id.to_string()],
        )?;
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Holding, Medium, Member, MembershipTier};
    use crate::storage::Database;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap()
    }

    fn create_test_member(db: &Database, email: &str) -> Member {
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

    fn create_test_holding(db: &Database, serial_no: &str) -> Holding {
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

    fn create_test_issue(db: &Database, member: &Member, holding: &Holding, day: u32) -> Issue {
        let issued_on = at(day);
        let issue = Issue::new(
            member.id,
            holding.id,
            issued_on,
            issued_on + Duration::days(15),
            issued_on,
        );
        db.issues().create(&issue).unwrap();
        issue
    }

    #[test]
    fn test_create_and_detail_join() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let holding = create_test_holding(&db, "BK001");
        let issue = create_test_issue(&db, &member, &holding, 2);

        let detail = db.issues().find_detail(issue.id).unwrap().unwrap();
        assert_eq!(detail.issue.id, issue.id);
        assert_eq!(detail.member.email, "user@library.com");
        assert_eq!(detail.member.membership_no, member.membership_no);
        assert_eq!(detail.holding.serial_no, "BK001");
        assert_eq!(detail.holding.medium, Medium::Book);
    }

    #[test]
    fn test_list_for_member_newest_first() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let other = create_test_member(&db, "other@library.com");
        let h1 = create_test_holding(&db, "BK001");
        let h2 = create_test_holding(&db, "BK002");
        let h3 = create_test_holding(&db, "BK003");

        let first = create_test_issue(&db, &member, &h1, 2);
        let second = create_test_issue(&db, &member, &h2, 5);
        create_test_issue(&db, &other, &h3, 3);

        let listed = db.issues().list_for_member(member.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].issue.id, second.id);
        assert_eq!(listed[1].issue.id, first.id);
    }

    #[test]
    fn test_count_active_ignores_settled() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let h1 = create_test_holding(&db, "BK001");
        let h2 = create_test_holding(&db, "BK002");

        let settled = create_test_issue(&db, &member, &h1, 2);
        create_test_issue(&db, &member, &h2, 3);

        db.issues().record_return(settled.id, at(10), 0).unwrap();
        db.issues().settle(settled.id).unwrap();

        assert_eq!(db.issues().count_active_for_member(member.id).unwrap(), 1);
    }

    #[test]
    fn test_record_return_stamps_once() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let holding = create_test_holding(&db, "BK001");
        let issue = create_test_issue(&db, &member, &holding, 2);

        assert!(db.issues().record_return(issue.id, at(20), 30).unwrap());
        // Second stamp is refused, the first fine stands
        assert!(!db.issues().record_return(issue.id, at(25), 80).unwrap());

        let reloaded = db.issues().find_by_id(issue.id).unwrap().unwrap();
        assert_eq!(reloaded.returned_on, Some(at(20)));
        assert_eq!(reloaded.fine_amount, 30);
        assert!(!reloaded.fine_paid);
    }

    #[test]
    fn test_settle_requires_recorded_return() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let holding = create_test_holding(&db, "BK001");
        let issue = create_test_issue(&db, &member, &holding, 2);

        assert!(!db.issues().settle(issue.id).unwrap());

        db.issues().record_return(issue.id, at(20), 30).unwrap();
        assert!(db.issues().settle(issue.id).unwrap());

        let reloaded = db.issues().find_by_id(issue.id).unwrap().unwrap();
        assert!(reloaded.fine_paid);
        assert_eq!(reloaded.status.as_str(), "Returned");

        // Paid settlement cannot happen twice
        assert!(!db.issues().settle(issue.id).unwrap());
    }

    #[test]
    fn test_settle_with_zero_fine_stays_repeatable() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let holding = create_test_holding(&db, "BK001");
        let issue = create_test_issue(&db, &member, &holding, 2);

        db.issues().record_return(issue.id, at(10), 0).unwrap();
        assert!(db.issues().settle(issue.id).unwrap());
        assert!(db.issues().settle(issue.id).unwrap());

        let reloaded = db.issues().find_by_id(issue.id).unwrap().unwrap();
        assert!(!reloaded.fine_paid);
        assert_eq!(reloaded.status.as_str(), "Returned");
    }

    #[test]
    fn test_list_overdue_sorted_by_due_date() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();

        let member = create_test_member(&db, "user@library.com");
        let h1 = create_test_holding(&db, "BK001");
        let h2 = create_test_holding(&db, "BK002");
        let h3 = create_test_holding(&db, "BK003");

        // Due on day 17 and day 20; the third is returned and drops out
        let late_second = create_test_issue(&db, &member, &h1, 5);
        let late_first = create_test_issue(&db, &member, &h2, 2);
        let returned = create_test_issue(&db, &member, &h3, 2);
        db.issues().record_return(returned.id, at(25), 80).unwrap();

        let overdue = db.issues().list_overdue(at(25)).unwrap();
        assert_eq!(overdue.len(), 2);
        assert_eq!(overdue[0].issue.id, late_first.id);
        assert_eq!(overdue[1].issue.id, late_second.id);

        // Nothing is overdue the day everything falls due
        assert!(db.issues().list_overdue(at(17)).unwrap().is_empty());
    }
}
