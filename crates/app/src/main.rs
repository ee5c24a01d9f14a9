//! Carrel - library circulation desk
//!
//! Operational entry point: initializes logging, resolves the data
//! directory, opens and migrates the catalog database, and optionally
//! seeds the demonstration data set.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carrel_core::{Database, Error, HoldingFilter, Result, Role, SystemClock};

mod seed;

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Carrel");

    if let Err(e) = run() {
        tracing::error!("Failed to start: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let db_path = data_path()?.join("carrel.db");

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::open(&db_path)?;
    tracing::info!(
        path = %db_path.display(),
        schema_version = db.schema_version(),
        "Database ready"
    );

    let clock = SystemClock;
    match std::env::args().nth(1).as_deref() {
        Some("seed") => seed::run(&db, &clock),
        Some("catalog") => print_catalog(&db, &clock),
        Some(other) => {
            eprintln!("unknown command: {other}");
            eprintln!("usage: carrel [seed|catalog]");
            std::process::exit(2);
        }
        None => summarize(&db),
    }
}

fn data_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "carrel", "carrel").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })?;

    Ok(dirs.data_dir().to_path_buf())
}

/// Log what the database currently holds
fn summarize(db: &Database) -> Result<()> {
    let holdings = db.holdings().list(&HoldingFilter::default())?;
    let members = db.members().list_by_role(Role::Member)?;
    let active = db.issues().list_active()?;

    tracing::info!(
        holdings = holdings.len(),
        members = members.len(),
        active_issues = active.len(),
        "Catalog summary"
    );
    Ok(())
}

/// Print the master book and movie lists as JSON
fn print_catalog(db: &Database, clock: &SystemClock) -> Result<()> {
    let reports = db.reports(clock);
    let listing = serde_json::json!({
        "books": reports.master_books()?,
        "movies": reports.master_movies()?,
    });
    println!("{listing:#}");
    Ok(())
}
