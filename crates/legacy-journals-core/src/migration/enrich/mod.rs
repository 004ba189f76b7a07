//! Type-specific post-processing of combined snapshots.
//!
//! An [`Enricher`] runs after the diff combiner and before the snapshot is
//! projected onto the data table. It may rewrite the snapshot in place and
//! write side-table rows (attachments, custom values) for the journal.

mod attachable;
mod attachment;
mod customizable;
mod wiki;

pub use attachable::Attachable;
pub use attachment::AttachmentContainerRewrite;
pub use customizable::Customizable;
pub use wiki::WikiContent;

use super::driver::MigrationConfig;
use super::error::MigrationError;
use super::legacy::LegacyJournalRow;
use super::snapshot::CombinedSnapshot;
use crate::store::SchemaAdapter;

/// Everything an enricher may consult besides the snapshot.
pub struct EnrichContext<'a> {
    /// The relational store.
    pub store: &'a dyn SchemaAdapter,
    /// Table names.
    pub config: &'a MigrationConfig,
    /// The legacy row being migrated.
    pub row: &'a LegacyJournalRow,
    /// Id of the parent journal the row resolved to.
    pub journal_id: i64,
}

/// Per-type snapshot post-processing.
pub trait Enricher {
    /// Mutate `snapshot` for this journal type. The default does nothing.
    fn enrich(
        &self,
        _ctx: &EnrichContext<'_>,
        _snapshot: &mut CombinedSnapshot,
    ) -> Result<(), MigrationError> {
        Ok(())
    }
}

/// Enricher for types without special handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl Enricher for NoEnrichment {}

/// Runs several enrichers in order.
pub struct EnricherChain {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl EnricherChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            enrichers: Vec::new(),
        }
    }

    /// Append an enricher.
    pub fn with(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Box::new(enricher));
        self
    }
}

impl Default for EnricherChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for EnricherChain {
    fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        snapshot: &mut CombinedSnapshot,
    ) -> Result<(), MigrationError> {
        for enricher in &self.enrichers {
            enricher.enrich(ctx, snapshot)?;
        }
        Ok(())
    }
}
