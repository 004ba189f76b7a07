//! Attachment side-table records for attachable journal types.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::{EnrichContext, Enricher};
use crate::migration::error::MigrationError;
use crate::migration::snapshot::CombinedSnapshot;
use crate::store::Statement;

/// `attachments<id>` when an attachment was added, `attachments_<id>` when removed.
static ATTACHMENT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^attachments_?(\d+)$").expect("attachment key pattern"));

fn attachment_id(key: &str) -> Option<i64> {
    ATTACHMENT_KEY
        .captures(key)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Records attachment additions in the attachable side table.
///
/// A diff `[nil, "file.png"]` under `attachments5` adds attachment 5 to the
/// journal; `["file.png", nil]` under `attachments_5` removes it. A removal
/// drops every key of that attachment from the snapshot, so neither this nor
/// any later version of the entity records it again.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attachable;

impl Attachable {
    fn record_addition(
        ctx: &EnrichContext<'_>,
        attachment_id: i64,
        filename: &Value,
    ) -> Result<(), MigrationError> {
        let table = ctx.config.attachable_table.as_str();
        let existing = ctx.store.select(&Statement::select_eq(
            ctx.store,
            table,
            &[
                ("journal_id", json!(ctx.journal_id)),
                ("attachment_id", json!(attachment_id)),
            ],
        ))?;

        match existing.len() {
            0 => {
                ctx.store.execute(&Statement::insert(
                    ctx.store,
                    table,
                    &[
                        ("journal_id".to_string(), json!(ctx.journal_id)),
                        ("attachment_id".to_string(), json!(attachment_id)),
                        ("filename".to_string(), filename.clone()),
                    ],
                ))?;
                debug!(journal_id = ctx.journal_id, attachment_id, "attachable journal created");
                Ok(())
            }
            1 => Ok(()),
            count => Err(MigrationError::AmbiguousAttachableJournal {
                journal_id: ctx.journal_id,
                attachment_id,
                count,
            }),
        }
    }
}

impl Enricher for Attachable {
    fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        snapshot: &mut CombinedSnapshot,
    ) -> Result<(), MigrationError> {
        let keys: Vec<(String, i64)> = snapshot
            .keys()
            .filter_map(|key| attachment_id(key).map(|id| (key.to_string(), id)))
            .collect();

        // Removals first, so an attachment added and removed within the
        // same snapshot is never recorded.
        for (key, removed_id) in &keys {
            let removed = snapshot
                .get(key)
                .is_some_and(|pair| pair.has_old() && !pair.has_new());
            if removed {
                snapshot.retain(|k, _| attachment_id(k) != Some(*removed_id));
            }
        }

        for (key, added_id) in &keys {
            let Some(pair) = snapshot.get(key) else {
                continue;
            };
            if pair.has_new() && !pair.has_old() {
                Self::record_addition(ctx, *added_id, &pair.new)?;
            } else {
                return Err(MigrationError::InvalidAttachableJournal {
                    legacy_id: ctx.row.id,
                    key: key.clone(),
                    snapshot: snapshot.to_json(),
                });
            }
        }

        Ok(())
    }
}
