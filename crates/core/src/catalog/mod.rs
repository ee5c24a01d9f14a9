//! Catalog maintenance
//!
//! Adding and correcting holdings is staff work. Availability is not
//! touched from here at all; the circulation ledger owns that flag.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::invariants::assert_holding_invariants;
use crate::models::{Holding, Medium, Member};
use crate::permissions::{PermissionMatrix, StaffAction};
use crate::storage::{HoldingFilter, HoldingStore};

/// Input for adding a holding to the catalog
#[derive(Debug, Clone)]
pub struct NewHolding {
    pub serial_no: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub medium: Medium,
    pub cost: i64,
    /// Defaults to the current instant when absent
    pub acquired_at: Option<DateTime<Utc>>,
}

/// Corrections to an existing holding; absent fields stay as they are
#[derive(Debug, Clone, Default)]
pub struct HoldingUpdate {
    pub serial_no: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub medium: Option<Medium>,
    pub cost: Option<i64>,
    pub acquired_at: Option<DateTime<Utc>>,
}

/// Catalog maintenance service
pub struct Catalog<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> Catalog<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    /// Add a new holding to the catalog
    #[instrument(skip(self, actor, request), fields(actor = %actor.email, serial_no = %request.serial_no))]
    pub fn add(&self, actor: &Member, request: NewHolding) -> Result<Holding> {
        if !PermissionMatrix::can_perform(actor.role, StaffAction::AddHolding) {
            return Err(Error::PermissionDenied(
                "only staff can add to the catalog".into(),
            ));
        }

        let holdings = HoldingStore::new(self.conn);

        let serial_no = request.serial_no.trim().to_string();
        if serial_no.is_empty() {
            return Err(Error::InvalidOperation("serial number is required".into()));
        }
        if request.title.trim().is_empty() || request.author.trim().is_empty() {
            return Err(Error::InvalidOperation(
                "title and author are required".into(),
            ));
        }
        if request.cost < 0 {
            return Err(Error::InvalidOperation("cost cannot be negative".into()));
        }

        if holdings.find_by_serial(&serial_no)?.is_some() {
            return Err(Error::InvalidOperation(
                "a holding with this serial number already exists".into(),
            ));
        }

        let now = self.clock.now();
        let holding = Holding::new(
            serial_no,
            request.title,
            request.author,
            request.category,
            request.medium,
            request.cost,
            request.acquired_at.unwrap_or(now),
            now,
        );
        assert_holding_invariants(&holding);

        holdings.create(&holding)?;
        info!(holding_id = %holding.id, "Holding added to catalog");

        Ok(holding)
    }

    /// Correct the descriptive fields of a holding
    #[instrument(skip(self, actor, update), fields(actor = %actor.email))]
    pub fn update(&self, actor: &Member, id: Uuid, update: HoldingUpdate) -> Result<Holding> {
        if !PermissionMatrix::can_perform(actor.role, StaffAction::UpdateHolding) {
            return Err(Error::PermissionDenied(
                "only staff can edit the catalog".into(),
            ));
        }

        let holdings = HoldingStore::new(self.conn);
        let mut holding = holdings
            .find_by_id(id)?
            .ok_or_else(|| Error::NotFound("holding not found".into()))?;

        if let Some(serial_no) = update.serial_no {
            let serial_no = serial_no.trim().to_string();
            if serial_no.is_empty() {
                return Err(Error::InvalidOperation("serial number is required".into()));
            }
            // Moving to a serial another holding already carries is a clash
            if serial_no != holding.serial_no && holdings.find_by_serial(&serial_no)?.is_some() {
                return Err(Error::InvalidOperation(
                    "a holding with this serial number already exists".into(),
                ));
            }
            holding.serial_no = serial_no;
        }
        if let Some(title) = update.title {
            holding.title = title;
        }
        if let Some(author) = update.author {
            holding.author = author;
        }
        if let Some(category) = update.category {
            holding.category = category;
        }
        if let Some(medium) = update.medium {
            holding.medium = medium;
        }
        if let Some(cost) = update.cost {
            if cost < 0 {
                return Err(Error::InvalidOperation("cost cannot be negative".into()));
            }
            holding.cost = cost;
        }
        if let Some(acquired_at) = update.acquired_at {
            holding.acquired_at = acquired_at;
        }
        assert_holding_invariants(&holding);

        holdings.update(&holding)?;
        info!(holding_id = %holding.id, "Holding updated");

        Ok(holding)
    }

    /// Fetch one holding
    pub fn get(&self, id: Uuid) -> Result<Holding> {
        HoldingStore::new(self.conn)
            .find_by_id(id)?
            .ok_or_else(|| Error::NotFound("holding not found".into()))
    }

    /// List holdings matching a filter
    pub fn list(&self, filter: &HoldingFilter) -> Result<Vec<Holding>> {
        HoldingStore::new(self.conn).list(filter)
    }

    /// List only holdings currently on the shelf
    pub fn available(&self, filter: &HoldingFilter) -> Result<Vec<Holding>> {
        let filter = HoldingFilter {
            available: Some(true),
            ..filter.clone()
        };
        HoldingStore::new(self.conn).list(&filter)
    }
}
