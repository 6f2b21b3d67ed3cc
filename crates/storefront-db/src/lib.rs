//! Storefront DB Library
//!
//! Bundle persistence and ordering on top of `sqlx` (Postgres).

pub mod db;

pub use db::{BundleRepository, InMemoryBundleRepository, PgBundleRepository};
