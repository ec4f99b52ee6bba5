//! # lifeboat-catalog
//!
//! Postgres catalog access layer shared by the ranking and dispatch
//! services:
//!
//! - Connection pool management and health checks
//! - Runtime migrations for the catalog schema
//! - Derived resource-type refresh feeding dataset access counts
//!
//! The catalog itself (organizations, datasets, resources, assets, rescuers)
//! is populated by the out-of-scope ingestion pipeline; this layer treats it
//! as read-mostly and owns only the derived columns plus the rank, rescue,
//! and allocation logs.

mod db;
mod error;
pub mod resource_types;

pub use db::{Database, DbConfig};
pub use error::DbError;
