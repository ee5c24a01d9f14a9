//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Members table (staff and borrowing members)
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                membership_no TEXT UNIQUE,
                tier TEXT,
                expires_at TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Holdings table (catalog copies)
            CREATE TABLE IF NOT EXISTS holdings (
                id TEXT PRIMARY KEY,
                serial_no TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                category TEXT NOT NULL,
                medium TEXT NOT NULL,
                cost INTEGER NOT NULL,
                acquired_at TEXT NOT NULL,
                is_available INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Issues table (one row per loan)
            CREATE TABLE IF NOT EXISTS issues (
                id TEXT PRIMARY KEY,
                member_id TEXT NOT NULL,
                holding_id TEXT NOT NULL,
                issued_on TEXT NOT NULL,
                due_on TEXT NOT NULL,
                returned_on TEXT,
                fine_amount INTEGER NOT NULL DEFAULT 0,
                fine_paid INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'Issued',
                created_at TEXT NOT NULL,
                FOREIGN KEY (member_id) REFERENCES members(id),
                FOREIGN KEY (holding_id) REFERENCES holdings(id)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for circulation queries",
        sql: r#"
            -- Issue ledger indexes
            CREATE INDEX IF NOT EXISTS idx_issues_member_status ON issues(member_id, status);
            CREATE INDEX IF NOT EXISTS idx_issues_holding ON issues(holding_id);
            CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
            CREATE INDEX IF NOT EXISTS idx_issues_due ON issues(due_on);
        "#,
    },
    Migration {
        version: 3,
        description: "Add indexes for catalog and membership lookups",
        sql: r#"
            -- Catalog filter index (type and shelf state)
            CREATE INDEX IF NOT EXISTS idx_holdings_medium_available
                ON holdings(medium, is_available);

            -- Membership register is read by role, newest first
            CREATE INDEX IF NOT EXISTS idx_members_role_created
                ON members(role, created_at);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
