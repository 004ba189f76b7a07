//! Per-type migration of a single legacy journal.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::driver::MigrationConfig;
use super::enrich::{EnrichContext, Enricher};
use super::error::MigrationError;
use super::legacy::LegacyJournalRow;
use super::snapshot::{CombinedSnapshot, DiffCombiner};
use super::upsert::{self, DataWrite, JournalResolution};
use crate::store::SchemaAdapter;

/// Columns a snapshot may never write.
const KEY_COLUMNS: [&str; 2] = ["id", "journal_id"];

/// Map a legacy attribute name to its current column name.
pub fn map_key(key: &str) -> &str {
    match key {
        "issue_id" => "work_package_id",
        "tracker_id" => "type_id",
        "end_date" => "due_date",
        other => other,
    }
}

/// Project a snapshot onto the columns of a data table.
///
/// Keys are renamed with [`map_key`], only new values are kept and keys
/// without a matching column are dropped.
pub fn project(snapshot: &CombinedSnapshot, columns: &BTreeSet<String>) -> Vec<(String, Value)> {
    let mut projected = BTreeMap::new();
    for (key, pair) in snapshot.iter() {
        let column = map_key(key);
        if columns.contains(column) && !KEY_COLUMNS.contains(&column) {
            projected.insert(column.to_string(), pair.new.clone());
        }
    }
    projected.into_iter().collect()
}

/// Result of migrating one legacy row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// How the parent journal was resolved.
    pub journal: JournalResolution,
    /// What happened to the data row.
    pub data: DataWrite,
}

/// Migrates the legacy rows of one type discriminator.
///
/// Owns the diff combiner for that type, so versions of different legacy
/// types never merge into each other.
pub struct TypeMigrator {
    legacy_type: String,
    journable_type: String,
    table: String,
    enricher: Box<dyn Enricher>,
    combiner: DiffCombiner,
    columns: Option<BTreeSet<String>>,
}

impl TypeMigrator {
    /// Create a migrator writing `journable_type` journals into `table`.
    pub fn new(
        legacy_type: impl Into<String>,
        journable_type: impl Into<String>,
        table: impl Into<String>,
        enricher: impl Enricher + 'static,
    ) -> Self {
        Self {
            legacy_type: legacy_type.into(),
            journable_type: journable_type.into(),
            table: table.into(),
            enricher: Box::new(enricher),
            combiner: DiffCombiner::new(),
            columns: None,
        }
    }

    pub fn legacy_type(&self) -> &str {
        &self.legacy_type
    }

    pub fn journable_type(&self) -> &str {
        &self.journable_type
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Migrate one legacy row: journal, snapshot, enrichment, data row.
    pub fn migrate(
        &mut self,
        store: &dyn SchemaAdapter,
        config: &MigrationConfig,
        row: &LegacyJournalRow,
    ) -> Result<MigrationOutcome, MigrationError> {
        if self.columns.is_none() {
            self.columns = Some(store.column_names(&self.table)?);
        }

        // Combine first: an out-of-order row must fail before anything is written.
        let snapshot = self
            .combiner
            .combine(row.journaled_id, row.version, &row.changed_data)?;

        let journal = upsert::ensure_journal(store, config, &self.journable_type, row)?;
        let journal_id = journal.id();

        let ctx = EnrichContext {
            store,
            config,
            row,
            journal_id,
        };
        self.enricher.enrich(&ctx, snapshot)?;

        let projected = match &self.columns {
            Some(columns) => project(snapshot, columns),
            None => Vec::new(),
        };
        let data = upsert::write_journal_data(store, &self.table, journal_id, &projected)?;

        Ok(MigrationOutcome { journal, data })
    }
}
