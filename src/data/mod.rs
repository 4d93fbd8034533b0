//! Data layer module
//!
//! Holds the in-memory product catalog. Nothing here is persisted.

mod catalog;
mod models;

pub use catalog::Catalog;
pub use models::*;
