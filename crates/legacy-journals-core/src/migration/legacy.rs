//! Legacy journal rows and their serialized diffs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::MigrationError;
use crate::error::Error;
use crate::store::{require_i64, row_i64, row_string, Row};

/// An `[old_value, new_value]` pair from a legacy diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Value, Value)", into = "(Value, Value)")]
pub struct ChangePair {
    /// Value before the change.
    pub old: Value,
    /// Value after the change.
    pub new: Value,
}

impl ChangePair {
    /// Create a pair.
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// A pair with no old value.
    pub fn added(new: impl Into<Value>) -> Self {
        Self::new(Value::Null, new)
    }

    /// Whether the old value is present.
    pub fn has_old(&self) -> bool {
        !self.old.is_null()
    }

    /// Whether the new value is present.
    pub fn has_new(&self) -> bool {
        !self.new.is_null()
    }
}

impl From<(Value, Value)> for ChangePair {
    fn from((old, new): (Value, Value)) -> Self {
        Self { old, new }
    }
}

impl From<ChangePair> for (Value, Value) {
    fn from(pair: ChangePair) -> Self {
        (pair.old, pair.new)
    }
}

/// One version's changed attributes.
pub type ChangedData = BTreeMap<String, ChangePair>;

/// Parse a serialized diff. Empty input is an empty diff.
pub fn parse_changed_data(raw: &str) -> Result<ChangedData, Error> {
    if raw.trim().is_empty() {
        return Ok(ChangedData::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| Error::Deserialization(format!("changed_data is not a diff: {}", e)))
}

/// One row of the legacy journals table.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyJournalRow {
    /// Legacy id, carried over as the journal id.
    pub id: i64,
    /// Id of the journaled entity.
    pub journaled_id: i64,
    /// Type discriminator, e.g. `WorkPackageJournal`.
    pub journal_type: String,
    /// 1-based version within (journaled_id, type).
    pub version: i64,
    /// Activity category.
    pub activity_type: Option<String>,
    /// Attributes changed by this version.
    pub changed_data: ChangedData,
    /// Author of the change.
    pub user_id: Option<i64>,
    /// Free text notes.
    pub notes: Option<String>,
    /// Creation timestamp, copied verbatim.
    pub created_at: Value,
}

impl LegacyJournalRow {
    /// The diff chain this row belongs to: (journaled_id, type).
    pub fn chain_key(&self) -> (i64, &str) {
        (self.journaled_id, self.journal_type.as_str())
    }

    /// Decode a fetched row.
    pub fn from_row(row: &Row) -> Result<Self, MigrationError> {
        let id = require_i64(row, "id").map_err(|e| MigrationError::InvalidLegacyRow {
            id: 0,
            reason: e.to_string(),
        })?;
        let invalid = |reason: String| MigrationError::InvalidLegacyRow { id, reason };

        let changed_data = match row_string(row, "changed_data").map_err(|e| invalid(e.to_string()))? {
            Some(raw) => parse_changed_data(&raw).map_err(|e| invalid(e.to_string()))?,
            None => ChangedData::new(),
        };

        Ok(Self {
            id,
            journaled_id: require_i64(row, "journaled_id").map_err(|e| invalid(e.to_string()))?,
            journal_type: row_string(row, "type")
                .map_err(|e| invalid(e.to_string()))?
                .ok_or_else(|| invalid("column type is missing".to_string()))?,
            version: require_i64(row, "version").map_err(|e| invalid(e.to_string()))?,
            activity_type: row_string(row, "activity_type").map_err(|e| invalid(e.to_string()))?,
            changed_data,
            user_id: row_i64(row, "user_id").map_err(|e| invalid(e.to_string()))?,
            notes: row_string(row, "notes").map_err(|e| invalid(e.to_string()))?,
            created_at: row.get("created_at").cloned().unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_row() -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(10));
        row.insert("journaled_id".to_string(), json!("3"));
        row.insert("type".to_string(), json!("WorkPackageJournal"));
        row.insert("version".to_string(), json!(2));
        row.insert("activity_type".to_string(), json!("work_packages"));
        row.insert(
            "changed_data".to_string(),
            json!(r#"{"subject": ["A", "B"], "status_id": [null, 4]}"#),
        );
        row.insert("user_id".to_string(), Value::Null);
        row.insert("notes".to_string(), json!("moved"));
        row.insert("created_at".to_string(), json!("2013-09-03 09:22:36"));
        row
    }

    #[test]
    fn test_decode_row() {
        let row = LegacyJournalRow::from_row(&raw_row()).unwrap();
        assert_eq!(row.id, 10);
        assert_eq!(row.journaled_id, 3);
        assert_eq!(row.version, 2);
        assert_eq!(row.user_id, None);
        assert_eq!(row.changed_data["subject"], ChangePair::new("A", "B"));
        assert_eq!(row.changed_data["status_id"], ChangePair::added(4));
    }

    #[test]
    fn test_null_changed_data_is_empty() {
        let mut raw = raw_row();
        raw.insert("changed_data".to_string(), Value::Null);
        let row = LegacyJournalRow::from_row(&raw).unwrap();
        assert!(row.changed_data.is_empty());
    }

    #[test]
    fn test_malformed_changed_data() {
        let mut raw = raw_row();
        raw.insert("changed_data".to_string(), json!(r#"{"subject": "B"}"#));
        let err = LegacyJournalRow::from_row(&raw).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidLegacyRow { id: 10, .. }));
        assert!(err.to_string().contains("deserialization error"));
    }

    #[test]
    fn test_parse_changed_data_errors() {
        assert!(parse_changed_data("  ").unwrap().is_empty());
        assert!(matches!(
            parse_changed_data("[1, 2]"),
            Err(Error::Deserialization(_))
        ));
    }

    #[test]
    fn test_change_pair_serializes_as_array() {
        let text = serde_json::to_string(&ChangePair::new(Value::Null, "x")).unwrap();
        assert_eq!(text, r#"[null,"x"]"#);
    }
}
