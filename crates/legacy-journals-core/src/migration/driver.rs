//! Migration driver - validates, streams and dispatches legacy journals.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, instrument};

use super::error::MigrationError;
use super::legacy::LegacyJournalRow;
use super::registry::TypeRegistry;
use super::upsert::{DataWrite, JournalResolution};
use super::validator::ConsistencyValidator;
use crate::store::{SchemaAdapter, Statement};

/// Default number of rows between progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Activity types migrated before all others.
pub const PRIORITY_ACTIVITY_TYPES: [&str; 2] = ["attachments", "custom_fields"];

/// Table names and reporting settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Source table of legacy journals.
    pub legacy_table: String,
    /// Parent journal table.
    pub journals_table: String,
    /// Attachment side table.
    pub attachable_table: String,
    /// Custom value side table.
    pub customizable_table: String,
    /// Log a progress line every this many rows. 0 disables progress lines.
    pub progress_interval: u64,
}

impl MigrationConfig {
    /// Set the legacy journals table.
    pub fn with_legacy_table(mut self, table: impl Into<String>) -> Self {
        self.legacy_table = table.into();
        self
    }

    /// Set the journals table.
    pub fn with_journals_table(mut self, table: impl Into<String>) -> Self {
        self.journals_table = table.into();
        self
    }

    /// Set the attachable journals table.
    pub fn with_attachable_table(mut self, table: impl Into<String>) -> Self {
        self.attachable_table = table.into();
        self
    }

    /// Set the customizable journals table.
    pub fn with_customizable_table(mut self, table: impl Into<String>) -> Self {
        self.customizable_table = table.into();
        self
    }

    /// Set the progress interval.
    pub fn with_progress_interval(mut self, rows: u64) -> Self {
        self.progress_interval = rows;
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            legacy_table: "legacy_journals".to_string(),
            journals_table: "journals".to_string(),
            attachable_table: "attachable_journals".to_string(),
            customizable_table: "customizable_journals".to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Summary of a migration run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Legacy rows read.
    pub total: u64,
    /// Rows handed to a migrator.
    pub migrated: u64,
    /// Journals inserted by this run.
    pub journals_created: u64,
    /// Data rows inserted.
    pub data_inserted: u64,
    /// Data rows updated in place.
    pub data_updated: u64,
    /// Data rows left untouched.
    pub data_unchanged: u64,
    /// Skipped rows per unregistered legacy type.
    pub ignored: BTreeMap<String, u64>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl MigrationReport {
    /// Total number of skipped rows.
    pub fn ignored_total(&self) -> u64 {
        self.ignored.values().sum()
    }
}

/// Legacy rows in processing order.
///
/// Partitioning is per diff chain: every version of one (journaled_id, type)
/// lands in the same partition, so each chain is processed contiguously.
#[derive(Debug, Clone, Default)]
pub struct LegacyJournals {
    /// Chains with any attachment or custom field activity, ordered by
    /// journaled_id, type, version.
    pub prioritized: Vec<LegacyJournalRow>,
    /// Every other chain, in the same order.
    pub remainder: Vec<LegacyJournalRow>,
}

impl LegacyJournals {
    pub fn len(&self) -> usize {
        self.prioritized.len() + self.remainder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows, prioritized partition first.
    pub fn iter(&self) -> impl Iterator<Item = &LegacyJournalRow> {
        self.prioritized.iter().chain(self.remainder.iter())
    }
}

/// Drives a complete migration against one store.
pub struct MigrationDriver<'a> {
    store: &'a dyn SchemaAdapter,
    registry: TypeRegistry,
    config: MigrationConfig,
}

impl<'a> MigrationDriver<'a> {
    /// Create a driver with the default type registry.
    pub fn new(store: &'a dyn SchemaAdapter, config: MigrationConfig) -> Self {
        Self::with_registry(store, TypeRegistry::default(), config)
    }

    /// Create a driver with a custom type registry.
    pub fn with_registry(
        store: &'a dyn SchemaAdapter,
        registry: TypeRegistry,
        config: MigrationConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Read every legacy journal, partitioned and sorted for processing.
    pub fn fetch_legacy_journals(&self) -> Result<LegacyJournals, MigrationError> {
        let table = self.store.quote_identifier(&self.config.legacy_table);
        let order = "ORDER BY j.journaled_id, j.type, j.version, j.id";
        let markers = format!("{}, {}", self.store.placeholder(1), self.store.placeholder(2));

        let prioritized = Statement::new(format!(
            "SELECT * FROM {} AS j WHERE j.activity_type IN ({}) {}",
            table, markers, order
        ));
        let remainder = Statement::new(format!(
            "SELECT * FROM {} AS j WHERE j.activity_type IS NULL OR j.activity_type NOT IN ({}) {}",
            table, markers, order
        ));
        let bind = |statement: Statement| {
            PRIORITY_ACTIVITY_TYPES
                .iter()
                .fold(statement, |stmt, activity| stmt.bind(json!(activity)))
        };

        let mut prioritized = self.decode(&bind(prioritized))?;
        let remainder = self.decode(&bind(remainder))?;

        // Pull the other versions of prioritized chains forward.
        let (pulled, remainder): (Vec<_>, Vec<_>) = {
            let chains: HashSet<(i64, &str)> =
                prioritized.iter().map(LegacyJournalRow::chain_key).collect();
            remainder
                .into_iter()
                .partition(|row| chains.contains(&row.chain_key()))
        };
        if !pulled.is_empty() {
            prioritized.extend(pulled);
            prioritized.sort_by(|a, b| {
                (a.journaled_id, &a.journal_type, a.version, a.id)
                    .cmp(&(b.journaled_id, &b.journal_type, b.version, b.id))
            });
        }

        Ok(LegacyJournals {
            prioritized,
            remainder,
        })
    }

    fn decode(&self, statement: &Statement) -> Result<Vec<LegacyJournalRow>, MigrationError> {
        self.store
            .select(statement)?
            .iter()
            .map(LegacyJournalRow::from_row)
            .collect()
    }

    /// Validate the diff chains without writing anything.
    ///
    /// Returns the number of legacy journals checked.
    #[instrument(skip(self))]
    pub fn check(&self) -> Result<usize, MigrationError> {
        let journals = self.fetch_legacy_journals()?;
        ConsistencyValidator::validate(journals.iter())?;
        info!(journals = journals.len(), "legacy journals are consistent");
        Ok(journals.len())
    }

    /// Validate, then migrate every legacy journal.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<MigrationReport, MigrationError> {
        let start = Instant::now();

        let journals = self.fetch_legacy_journals()?;
        ConsistencyValidator::validate(journals.iter())?;

        info!(journals = journals.len(), "migrating legacy journals");

        let mut report = MigrationReport {
            total: journals.len() as u64,
            ..MigrationReport::default()
        };

        for row in journals.iter() {
            self.migrate_row(row, &mut report)?;
        }

        for (legacy_type, amount) in &report.ignored {
            info!(legacy_type = %legacy_type, amount, "legacy journal type ignored");
        }

        report.duration = start.elapsed();
        info!(
            migrated = report.migrated,
            journals_created = report.journals_created,
            ignored = report.ignored_total(),
            duration_ms = report.duration.as_millis() as u64,
            "legacy journal migration completed"
        );

        Ok(report)
    }

    fn migrate_row(
        &mut self,
        row: &LegacyJournalRow,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        let processed = report.migrated + report.ignored_total() + 1;

        match self.registry.get_mut(&row.journal_type) {
            None => {
                *report.ignored.entry(row.journal_type.clone()).or_insert(0) += 1;
            }
            Some(migrator) => {
                let outcome = migrator.migrate(self.store, &self.config, row)?;
                report.migrated += 1;
                if let JournalResolution::Created(_) = outcome.journal {
                    report.journals_created += 1;
                }
                match outcome.data {
                    DataWrite::Inserted => report.data_inserted += 1,
                    DataWrite::Updated => report.data_updated += 1,
                    DataWrite::Unchanged => report.data_unchanged += 1,
                }
            }
        }

        let interval = self.config.progress_interval;
        if interval > 0 && processed % interval == 0 {
            info!(processed, total = report.total, "journals migrated");
        }
        Ok(())
    }
}
