//! Data models for Carrel

mod holding;
mod issue;
mod member;

pub use holding::*;
pub use issue::*;
pub use member::*;
