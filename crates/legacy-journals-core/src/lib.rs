//! Legacy journals core - store adapter and journal migration engine.
//!
//! This crate rebuilds the normalized journal tables (a parent `journals`
//! row plus one type-specific data row per journal) from a legacy table of
//! incremental diffs.

pub mod error;
pub mod migration;
pub mod schema;
pub mod store;

pub use error::Error;
pub use migration::{
    ChangePair, CombinedSnapshot, ConsistencyValidator, DiffCombiner, Enricher, LegacyJournalRow,
    MigrationConfig, MigrationDriver, MigrationError, MigrationReport, TypeRegistry,
};
pub use store::{Row, SchemaAdapter, SqliteStore, Statement};
