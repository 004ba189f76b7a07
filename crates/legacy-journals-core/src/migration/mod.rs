//! Legacy journal migration.
//!
//! Rebuilds normalized journals from a legacy table in which every row holds
//! only the attributes changed by one version:
//! - Pre-flight validation that no diff chain has gaps
//! - Diff combining into full per-version snapshots
//! - Type-specific enrichment (attachments, custom values, wiki content)
//! - Idempotent upserts of journals, data rows and side-table rows
//!
//! # Pipeline
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | Validate | all legacy rows | ok or offending ids |
//! | Combine | row diff + retained snapshot | snapshot as of this version |
//! | Enrich | snapshot | rewritten snapshot, side-table rows |
//! | Upsert | snapshot projected on the data table | journal + data row |
//!
//! # Example
//!
//! ```ignore
//! use legacy_journals_core::{MigrationConfig, MigrationDriver, SqliteStore};
//!
//! let store = SqliteStore::open("openproject.db")?;
//! let mut driver = MigrationDriver::new(&store, MigrationConfig::default());
//! let report = driver.run()?;
//! println!("{} journals migrated", report.migrated);
//! ```

pub mod driver;
pub mod enrich;
pub mod error;
pub mod legacy;
pub mod migrator;
pub mod registry;
pub mod snapshot;
pub mod upsert;
pub mod validator;

// Driver types
pub use driver::{LegacyJournals, MigrationConfig, MigrationDriver, MigrationReport};

// Enrichers
pub use enrich::{
    Attachable, AttachmentContainerRewrite, Customizable, EnrichContext, Enricher, EnricherChain,
    NoEnrichment, WikiContent,
};

// Error types
pub use error::MigrationError;

// Legacy data
pub use legacy::{ChangePair, ChangedData, LegacyJournalRow};

// Per-type migration
pub use migrator::{map_key, project, MigrationOutcome, TypeMigrator};
pub use registry::TypeRegistry;
pub use snapshot::{CombinedSnapshot, DiffCombiner};
pub use upsert::{DataWrite, JournalResolution};
pub use validator::ConsistencyValidator;
