//! Holding storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{medium_from_str, parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Holding, Medium};

/// Optional criteria for catalog listings. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct HoldingFilter {
    pub medium: Option<Medium>,
    pub category: Option<String>,
    pub available: Option<bool>,
}

impl HoldingFilter {
    pub fn matches(&self, holding: &Holding) -> bool {
        if let Some(medium) = self.medium {
            if holding.medium != medium {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &holding.category != category {
                return false;
            }
        }
        if let Some(available) = self.available {
            if holding.is_available != available {
                return false;
            }
        }
        true
    }
}

fn holding_from_row(row: &Row<'_>) -> rusqlite::Result<Holding> {
    Ok(Holding {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        serial_no: row.get(1)?,
        title: row.get(2)?,
        author: row.get(3)?,
        category: row.get(4)?,
        medium: medium_from_str(&row.get::<_, String>(5)?),
        cost: row.get(6)?,
        acquired_at: parse_datetime(&row.get::<_, String>(7)?)?,
        is_available: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

pub struct HoldingStore<'a> {
    conn: &'a Connection,
}

impl<'a> HoldingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new holding
    #[instrument(skip(self, holding), fields(serial_no = %holding.serial_no))]
    pub fn create(&self, holding: &Holding) -> Result<()> {
        self.conn.execute(
            "INSERT INTO holdings (id, serial_no, title, author, category, medium, cost, \
             acquired_at, is_available, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                holding.id.to_string(),
                holding.serial_no,
                holding.title,
                holding.author,
                holding.category,
                holding.medium.as_str(),
                holding.cost,
                holding.acquired_at.to_rfc3339(),
                holding.is_available,
                holding.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Update the descriptive fields of a holding.
    ///
    /// Availability is deliberately absent here; only the circulation
    /// ledger moves copies on and off the shelf.
    #[instrument(skip(self, holding), fields(serial_no = %holding.serial_no))]
    pub fn update(&self, holding: &Holding) -> Result<()> {
        self.conn.execute(
            "UPDATE holdings SET serial_no = ?1, title = ?2, author = ?3, category = ?4, \
             medium = ?5, cost = ?6, acquired_at = ?7 WHERE id = ?8",
            params![
                holding.serial_no,
                holding.title,
                holding.author,
                holding.category,
                holding.medium.as_str(),
                holding.cost,
                holding.acquired_at.to_rfc3339(),
                holding.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Find holding by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Holding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, serial_no, title, author, category, medium, cost, acquired_at, \
             is_available, created_at FROM holdings WHERE id = ?1",
        )?;

        let holding = stmt
            .query_row(params![id.to_string()], holding_from_row)
            .optional()?;

        Ok(holding)
    }

    /// Find holding by serial number
    #[instrument(skip(self))]
    pub fn find_by_serial(&self, serial_no: &str) -> Result<Option<Holding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, serial_no, title, author, category, medium, cost, acquired_at, \
             is_available, created_at FROM holdings WHERE serial_no = ?1",
        )?;

        let holding = stmt
            .query_row(params![serial_no], holding_from_row)
            .optional()?;

        Ok(holding)
    }

    /// List holdings matching a filter, newest first
    pub fn list(&self, filter: &HoldingFilter) -> Result<Vec<Holding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, serial_no, title, author, category, medium, cost, acquired_at, \
             is_available, created_at FROM holdings ORDER BY created_at DESC",
        )?;

        let holdings = stmt
            .query_map([], holding_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(holdings.into_iter().filter(|h| filter.matches(h)).collect())
    }

    /// Take a holding off the shelf for issue.
    ///
    /// Conditional update: succeeds only when the copy is still available,
    /// so two racing issue attempts cannot both claim it. Returns whether
    /// this caller won the claim.
    #[instrument(skip(self))]
    pub fn claim(&self, id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE holdings SET is_available = 0 WHERE id = ?1 AND is_available = 1",
            params![id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Put a holding back on the shelf
    #[instrument(skip(self))]
    pub fn release(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE holdings SET is_available = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }
}
