//! Demonstration data set
//!
//! Mirrors the sample catalog the desk is demonstrated with: one staff
//! account, one regular member, three books, and two movies.

use carrel_core::{
    Clock, Database, Error, Medium, MembershipTier, NewHolding, NewMemberRequest, Result, Role,
};
use tracing::info;

const DEMO_HOLDINGS: &[(&str, &str, &str, &str, Medium, i64)] = &[
    ("BK001", "The Great Gatsby", "F. Scott Fitzgerald", "Fiction", Medium::Book, 299),
    ("BK002", "To Kill a Mockingbird", "Harper Lee", "Fiction", Medium::Book, 349),
    ("BK003", "1984", "George Orwell", "Science Fiction", Medium::Book, 399),
    ("MV001", "The Matrix", "Wachowski Brothers", "Sci-Fi", Medium::Movie, 599),
    ("MV002", "Inception", "Christopher Nolan", "Thriller", Medium::Movie, 699),
];

/// Wipe the database and load the demonstration data
pub fn run(db: &Database, clock: &dyn Clock) -> Result<()> {
    db.clear_all()?;

    let registrar = db.registrar(clock);
    registrar.register(NewMemberRequest {
        name: "Admin".to_string(),
        email: "admin@library.com".to_string(),
        password: "admin123".to_string(),
        role: Some(Role::Admin),
        tier: None,
    })?;
    registrar.register(NewMemberRequest {
        name: "Regular User".to_string(),
        email: "user@library.com".to_string(),
        password: "user123".to_string(),
        role: None,
        tier: Some(MembershipTier::OneYear),
    })?;

    let admin = db
        .members()
        .find_by_email("admin@library.com")?
        .ok_or_else(|| Error::NotFound("seeded admin account missing".into()))?;

    let catalog = db.catalog(clock);
    for &(serial_no, title, author, category, medium, cost) in DEMO_HOLDINGS {
        catalog.add(
            &admin,
            NewHolding {
                serial_no: serial_no.to_string(),
                title: title.to_string(),
                author: author.to_string(),
                category: category.to_string(),
                medium,
                cost,
                acquired_at: None,
            },
        )?;
    }

    info!(
        members = 2,
        holdings = DEMO_HOLDINGS.len(),
        "Demonstration data loaded"
    );
    Ok(())
}
