//! Custom value side-table records.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::{EnrichContext, Enricher};
use crate::migration::error::MigrationError;
use crate::migration::snapshot::CombinedSnapshot;
use crate::store::Statement;

static CUSTOM_VALUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^custom_values_?(\d+)$").expect("custom value key pattern"));

fn custom_field_id(key: &str) -> Option<i64> {
    CUSTOM_VALUE_KEY
        .captures(key)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Records custom field values in the customizable side table.
///
/// Keys look like `custom_values<custom_field_id>`; the new value is stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Customizable;

impl Customizable {
    fn record_value(
        ctx: &EnrichContext<'_>,
        custom_field_id: i64,
        value: &Value,
    ) -> Result<(), MigrationError> {
        let table = ctx.config.customizable_table.as_str();
        let existing = ctx.store.select(&Statement::select_eq(
            ctx.store,
            table,
            &[
                ("journal_id", json!(ctx.journal_id)),
                ("custom_field_id", json!(custom_field_id)),
            ],
        ))?;

        match existing.len() {
            0 => {
                ctx.store.execute(&Statement::insert(
                    ctx.store,
                    table,
                    &[
                        ("journal_id".to_string(), json!(ctx.journal_id)),
                        ("custom_field_id".to_string(), json!(custom_field_id)),
                        ("value".to_string(), value.clone()),
                    ],
                ))?;
                debug!(journal_id = ctx.journal_id, custom_field_id, "customizable journal created");
                Ok(())
            }
            1 => Ok(()),
            count => Err(MigrationError::AmbiguousCustomizableJournal {
                journal_id: ctx.journal_id,
                custom_field_id,
                count,
            }),
        }
    }
}

impl Enricher for Customizable {
    fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        snapshot: &mut CombinedSnapshot,
    ) -> Result<(), MigrationError> {
        for (key, pair) in snapshot.iter() {
            if let Some(custom_field_id) = custom_field_id(key) {
                Self::record_value(ctx, custom_field_id, &pair.new)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::driver::MigrationConfig;
    use crate::migration::enrich::test_support::{row, store};
    use crate::migration::legacy::ChangePair;
    use crate::store::{SchemaAdapter, SqliteStore};

    fn enrich(store: &SqliteStore, snapshot: &mut CombinedSnapshot) -> Result<(), MigrationError> {
        let config = MigrationConfig::default();
        let row = row("TimeEntryJournal", 1, 1);
        let ctx = EnrichContext {
            store,
            config: &config,
            row: &row,
            journal_id: 8,
        };
        Customizable.enrich(&ctx, snapshot)
    }

    fn customizable_rows(store: &SqliteStore) -> Vec<crate::store::Row> {
        store
            .select(&Statement::new(
                "SELECT journal_id, custom_field_id, value FROM customizable_journals \
                 ORDER BY custom_field_id",
            ))
            .unwrap()
    }

    #[test]
    fn test_custom_value_key_pattern() {
        assert_eq!(custom_field_id("custom_values3"), Some(3));
        assert_eq!(custom_field_id("custom_values_14"), Some(14));
        assert_eq!(custom_field_id("custom_values"), None);
        assert_eq!(custom_field_id("custom_valuesx"), None);
    }

    #[test]
    fn test_values_are_recorded_once() {
        let store = store();
        let mut snapshot = CombinedSnapshot::new();
        snapshot.insert("custom_values3", ChangePair::new("old", "blue"));
        snapshot.insert("custom_values4", ChangePair::added(Value::Null));
        snapshot.insert("hours", ChangePair::added(2.5));

        enrich(&store, &mut snapshot).unwrap();
        enrich(&store, &mut snapshot).unwrap();

        let rows = customizable_rows(&store);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["custom_field_id"], json!(3));
        assert_eq!(rows[0]["value"], json!("blue"));
        assert_eq!(rows[1]["value"], Value::Null);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_duplicate_values_are_ambiguous() {
        let store = store();
        for _ in 0..2 {
            store
                .execute(
                    &Statement::new(
                        "INSERT INTO customizable_journals (journal_id, custom_field_id, value) \
                         VALUES (8, 3, 'x')",
                    ),
                )
                .unwrap();
        }
        let mut snapshot = CombinedSnapshot::new();
        snapshot.insert("custom_values3", ChangePair::added("x"));

        let err = enrich(&store, &mut snapshot).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::AmbiguousCustomizableJournal {
                journal_id: 8,
                custom_field_id: 3,
                count: 2
            }
        ));
    }
}
