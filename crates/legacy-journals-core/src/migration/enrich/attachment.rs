//! Attachment journals: container type rename.

use serde_json::Value;

use super::{EnrichContext, Enricher};
use crate::migration::error::MigrationError;
use crate::migration::snapshot::CombinedSnapshot;

/// Attachments of issues now belong to work packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentContainerRewrite;

impl Enricher for AttachmentContainerRewrite {
    fn enrich(
        &self,
        _ctx: &EnrichContext<'_>,
        snapshot: &mut CombinedSnapshot,
    ) -> Result<(), MigrationError> {
        if let Some(pair) = snapshot.get_mut("container_type") {
            if pair.new.as_str() == Some("Issue") {
                pair.new = Value::String("WorkPackage".to_string());
            }
        }
        Ok(())
    }
}
