//! Carrel Core Library
//!
//! Core models, permissions, circulation rules, and storage for the Carrel
//! library desk.

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod clock;
pub mod error;
pub mod fine;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod reports;
pub mod storage;

pub use auth::{NewMemberRequest, Registrar, MIN_PASSWORD_LEN};
pub use catalog::{Catalog, HoldingUpdate, NewHolding};
pub use circulation::{IssueLedger, IssueRequest, LOAN_PERIOD_DAYS, MAX_ACTIVE_ISSUES};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use fine::{fine_for, FINE_PER_DAY};
pub use models::*;
pub use permissions::*;
pub use reports::{OverdueIssue, Reports};
pub use storage::{
    CatalogRepository, Database, HoldingFilter, IssueRepository, MemberRepository, Storage,
};
