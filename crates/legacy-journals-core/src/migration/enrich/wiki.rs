//! Wiki content journals.

use serde_json::Value;

use super::{EnrichContext, Enricher};
use crate::migration::error::MigrationError;
use crate::migration::legacy::ChangePair;
use crate::migration::snapshot::CombinedSnapshot;

/// Wiki content journals: derive `lock_version` and move `data` to `text`.
///
/// The compression marker is only checked for presence; `data` is copied to
/// `text` as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikiContent;

impl Enricher for WikiContent {
    fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        snapshot: &mut CombinedSnapshot,
    ) -> Result<(), MigrationError> {
        if !snapshot.contains_key("lock_version") {
            // Legacy versions are 1-based; anything lower means no version.
            if ctx.row.version < 1 {
                return Err(MigrationError::WikiContentVersionMissing {
                    legacy_id: ctx.row.id,
                    journaled_id: ctx.row.journaled_id,
                    snapshot: snapshot.to_json(),
                });
            }
            snapshot.insert("lock_version", ChangePair::added(ctx.row.version));
        }

        if snapshot.contains_key("data") {
            if !snapshot.contains_key("compression") {
                return Err(MigrationError::UnsupportedCompression {
                    legacy_id: ctx.row.id,
                    journaled_id: ctx.row.journaled_id,
                });
            }
            let data = snapshot.remove("data").map(|pair| pair.new).unwrap_or(Value::Null);
            snapshot.insert("text", ChangePair::added(data));
        }

        Ok(())
    }
}
