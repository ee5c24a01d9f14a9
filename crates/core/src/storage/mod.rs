//! SQLite storage layer for Carrel

mod holdings;
mod issues;
mod members;
mod migrations;
mod parse;
mod traits;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Registrar;
use crate::catalog::Catalog;
use crate::circulation::IssueLedger;
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Holding, Issue, IssueDetail, Member, Role};
use crate::reports::Reports;
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

pub use holdings::{HoldingFilter, HoldingStore};
pub use issues::IssueStore;
pub use members::MemberStore;
pub use traits::{CatalogRepository, IssueRepository, MemberRepository, Storage};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Remove every member, holding, and issue row (reset tooling)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM issues;
             DELETE FROM holdings;
             DELETE FROM members;",
        )?;
        Ok(())
    }

    /// Get member store
    pub fn members(&self) -> MemberStore<'_> {
        MemberStore::new(&self.conn)
    }

    /// Get holding store
    pub fn holdings(&self) -> HoldingStore<'_> {
        HoldingStore::new(&self.conn)
    }

    /// Get issue store
    pub fn issues(&self) -> IssueStore<'_> {
        IssueStore::new(&self.conn)
    }

    /// Get the registration and login service
    pub fn registrar<'a>(&'a self, clock: &'a dyn Clock) -> Registrar<'a> {
        Registrar::new(&self.conn, clock)
    }

    /// Get the catalog maintenance service
    pub fn catalog<'a>(&'a self, clock: &'a dyn Clock) -> Catalog<'a> {
        Catalog::new(&self.conn, clock)
    }

    /// Get the circulation ledger
    pub fn circulation<'a>(&'a self, clock: &'a dyn Clock) -> IssueLedger<'a> {
        IssueLedger::new(&self.conn, clock)
    }

    /// Get the reporting service
    pub fn reports<'a>(&'a self, clock: &'a dyn Clock) -> Reports<'a> {
        Reports::new(&self.conn, clock)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl MemberRepository for Database {
    fn create_member(&self, member: &Member) -> Result<()> {
        self.members().create(member)
    }

    fn find_member_by_id(&self, id: Uuid) -> Result<Option<Member>> {
        self.members().find_by_id(id)
    }

    fn find_member_by_email(&self, email: &str) -> Result<Option<Member>> {
        self.members().find_by_email(email)
    }

    fn list_members_by_role(&self, role: Role) -> Result<Vec<Member>> {
        self.members().list_by_role(role)
    }

    fn set_member_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        self.members().set_active(id, is_active)
    }
}

impl CatalogRepository for Database {
    fn create_holding(&self, holding: &Holding) -> Result<()> {
        self.holdings().create(holding)
    }

    fn update_holding(&self, holding: &Holding) -> Result<()> {
        self.holdings().update(holding)
    }

    fn find_holding_by_id(&self, id: Uuid) -> Result<Option<Holding>> {
        self.holdings().find_by_id(id)
    }

    fn find_holding_by_serial(&self, serial_no: &str) -> Result<Option<Holding>> {
        self.holdings().find_by_serial(serial_no)
    }

    fn list_holdings(&self, filter: &HoldingFilter) -> Result<Vec<Holding>> {
        self.holdings().list(filter)
    }

    fn claim_holding(&self, id: Uuid) -> Result<bool> {
        self.holdings().claim(id)
    }

    fn release_holding(&self, id: Uuid) -> Result<()> {
        self.holdings().release(id)
    }
}

impl IssueRepository for Database {
    fn create_issue(&self, issue: &Issue) -> Result<()> {
        self.issues().create(issue)
    }

    fn find_issue_by_id(&self, id: Uuid) -> Result<Option<Issue>> {
        self.issues().find_by_id(id)
    }

    fn find_issue_detail(&self, id: Uuid) -> Result<Option<IssueDetail>> {
        self.issues().find_detail(id)
    }

    fn list_issues_for_member(&self, member_id: Uuid) -> Result<Vec<IssueDetail>> {
        self.issues().list_for_member(member_id)
    }

    fn list_active_issues(&self) -> Result<Vec<IssueDetail>> {
        self.issues().list_active()
    }

    fn list_overdue_issues(&self, cutoff: DateTime<Utc>) -> Result<Vec<IssueDetail>> {
        self.issues().list_overdue(cutoff)
    }

    fn count_active_issues_for_member(&self, member_id: Uuid) -> Result<i64> {
        self.issues().count_active_for_member(member_id)
    }

    fn record_issue_return(
        &self,
        id: Uuid,
        returned_on: DateTime<Utc>,
        fine_amount: i64,
    ) -> Result<bool> {
        self.issues().record_return(id, returned_on, fine_amount)
    }

    fn settle_issue(&self, id: Uuid) -> Result<bool> {
        self.issues().settle(id)
    }
}
