//! Database repositories for the image bundle data access layer
//!
//! `bundle` holds the repository contract and its Postgres implementation, `memory` an
//! in-process implementation with identical ordering semantics.

pub mod bundle;
pub mod memory;
pub mod ordering;
pub mod transaction;

pub use bundle::{BundleRepository, PgBundleRepository};
pub use memory::InMemoryBundleRepository;
