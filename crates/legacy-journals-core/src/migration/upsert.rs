//! Idempotent creation of journals and their data rows.
//!
//! Every insert is preceded by a lookup on the row's natural key, so a run
//! that aborted halfway can simply be started again.

use serde_json::{json, Value};
use tracing::debug;

use super::driver::MigrationConfig;
use super::error::MigrationError;
use super::legacy::LegacyJournalRow;
use crate::store::{require_i64, Row, SchemaAdapter, Statement};

/// How the parent journal was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalResolution {
    /// A new journal row was inserted.
    Created(i64),
    /// A journal from an earlier run was found.
    Existing(i64),
}

impl JournalResolution {
    /// The journal id.
    pub fn id(self) -> i64 {
        match self {
            JournalResolution::Created(id) | JournalResolution::Existing(id) => id,
        }
    }
}

/// What happened to a journal's data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWrite {
    /// A new data row was inserted.
    Inserted,
    /// The existing data row was updated.
    Updated,
    /// The existing data row was left as is (nothing to write).
    Unchanged,
}

fn fetch_journals(
    store: &dyn SchemaAdapter,
    config: &MigrationConfig,
    journable_type: &str,
    row: &LegacyJournalRow,
) -> Result<Vec<Row>, MigrationError> {
    let rows = store.select(&Statement::select_eq(
        store,
        &config.journals_table,
        &[
            ("journable_id", json!(row.journaled_id)),
            ("journable_type", json!(journable_type)),
            ("version", json!(row.version)),
        ],
    ))?;
    Ok(rows)
}

/// Find or create the journal for `row`.
///
/// A new journal keeps the legacy id, so existing references stay valid.
pub fn ensure_journal(
    store: &dyn SchemaAdapter,
    config: &MigrationConfig,
    journable_type: &str,
    row: &LegacyJournalRow,
) -> Result<JournalResolution, MigrationError> {
    let existing = fetch_journals(store, config, journable_type, row)?;
    match existing.len() {
        0 => {}
        1 => return Ok(JournalResolution::Existing(require_i64(&existing[0], "id")?)),
        count => {
            return Err(MigrationError::AmbiguousJournal {
                journable_id: row.journaled_id,
                journable_type: journable_type.to_string(),
                version: row.version,
                count,
            })
        }
    }

    store.execute(&Statement::insert(
        store,
        &config.journals_table,
        &[
            ("id".to_string(), json!(row.id)),
            ("journable_id".to_string(), json!(row.journaled_id)),
            ("version".to_string(), json!(row.version)),
            ("user_id".to_string(), json!(row.user_id)),
            ("notes".to_string(), json!(row.notes)),
            ("activity_type".to_string(), json!(row.activity_type)),
            ("created_at".to_string(), row.created_at.clone()),
            ("journable_type".to_string(), json!(journable_type)),
        ],
    ))?;

    let created = fetch_journals(store, config, journable_type, row)?;
    let journal = created
        .first()
        .ok_or(MigrationError::JournalNotCreated { legacy_id: row.id })?;
    let id = require_i64(journal, "id")?;
    debug!(journal_id = id, journable_type, version = row.version, "journal created");
    Ok(JournalResolution::Created(id))
}

/// Insert or update the data row of `journal_id` in `table`.
///
/// `columns` holds the projected values; an empty projection on an existing
/// row writes nothing.
pub fn write_journal_data(
    store: &dyn SchemaAdapter,
    table: &str,
    journal_id: i64,
    columns: &[(String, Value)],
) -> Result<DataWrite, MigrationError> {
    let existing = store.select(&Statement::select_eq(
        store,
        table,
        &[("journal_id", json!(journal_id))],
    ))?;

    match existing.len() {
        0 => {
            let mut values = Vec::with_capacity(columns.len() + 1);
            values.push(("journal_id".to_string(), json!(journal_id)));
            values.extend(columns.iter().cloned());
            store.execute(&Statement::insert(store, table, &values))?;
            debug!(journal_id, table, columns = columns.len(), "journal data created");
            Ok(DataWrite::Inserted)
        }
        1 if columns.is_empty() => Ok(DataWrite::Unchanged),
        1 => {
            store.execute(&Statement::update_eq(
                store,
                table,
                columns,
                &[("journal_id", json!(journal_id))],
            ))?;
            Ok(DataWrite::Updated)
        }
        count => Err(MigrationError::AmbiguousJournalData {
            table: table.to_string(),
            journal_id,
            count,
        }),
    }
}
