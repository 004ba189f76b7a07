//! Pre-flight check that every diff chain is complete.

use std::collections::HashMap;

use super::error::MigrationError;
use super::legacy::LegacyJournalRow;

/// Checks diff chains before any journal is written.
pub struct ConsistencyValidator;

impl ConsistencyValidator {
    /// Find legacy journals whose predecessor count does not match their version.
    ///
    /// A journal at version `V > 1` must have exactly `V` rows with a version
    /// `<= V` in its (journaled_id, type) group, itself included. Gaps lower
    /// the count, duplicates raise it. Version 1 is never reported.
    pub fn find_incomplete<'a>(rows: impl IntoIterator<Item = &'a LegacyJournalRow>) -> Vec<i64> {
        let rows: Vec<&LegacyJournalRow> = rows.into_iter().collect();
        let mut chains: HashMap<(i64, &str), Vec<i64>> = HashMap::new();
        for &row in &rows {
            chains.entry(row.chain_key()).or_default().push(row.version);
        }
        for versions in chains.values_mut() {
            versions.sort_unstable();
        }

        let mut offending: Vec<i64> = rows
            .iter()
            .filter(|row| row.version > 1)
            .filter(|row| {
                let versions = &chains[&row.chain_key()];
                let predecessors = versions.partition_point(|v| *v <= row.version);
                predecessors as i64 != row.version
            })
            .map(|row| row.id)
            .collect();
        offending.sort_unstable();
        offending.dedup();
        offending
    }

    /// Fail with [`MigrationError::IncompleteJournalChain`] if any chain is broken.
    pub fn validate<'a>(
        rows: impl IntoIterator<Item = &'a LegacyJournalRow>,
    ) -> Result<(), MigrationError> {
        let journal_ids = Self::find_incomplete(rows);
        if journal_ids.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::IncompleteJournalChain { journal_ids })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::legacy::ChangedData;
    use serde_json::Value;

    fn row(id: i64, journaled_id: i64, journal_type: &str, version: i64) -> LegacyJournalRow {
        LegacyJournalRow {
            id,
            journaled_id,
            journal_type: journal_type.to_string(),
            version,
            activity_type: None,
            changed_data: ChangedData::new(),
            user_id: None,
            notes: None,
            created_at: Value::Null,
        }
    }

    #[test]
    fn test_complete_chain_passes() {
        let rows = vec![
            row(1, 7, "WorkPackageJournal", 1),
            row(2, 7, "WorkPackageJournal", 2),
            row(3, 7, "WorkPackageJournal", 3),
        ];
        assert!(ConsistencyValidator::validate(&rows).is_ok());
    }

    #[test]
    fn test_gap_is_reported() {
        let rows = vec![
            row(1, 7, "WorkPackageJournal", 1),
            row(2, 7, "WorkPackageJournal", 2),
            row(4, 7, "WorkPackageJournal", 4),
        ];
        match ConsistencyValidator::validate(&rows) {
            Err(MigrationError::IncompleteJournalChain { journal_ids }) => {
                assert_eq!(journal_ids, vec![4]);
            }
            other => panic!("expected incomplete chain, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_initial_version_is_reported() {
        let rows = vec![row(5, 7, "NewsJournal", 2), row(6, 7, "NewsJournal", 3)];
        assert_eq!(ConsistencyValidator::find_incomplete(&rows), vec![5, 6]);
    }

    #[test]
    fn test_duplicate_version_is_reported() {
        let rows = vec![
            row(1, 7, "NewsJournal", 1),
            row(2, 7, "NewsJournal", 2),
            row(3, 7, "NewsJournal", 2),
        ];
        assert_eq!(ConsistencyValidator::find_incomplete(&rows), vec![2, 3]);
    }

    #[test]
    fn test_groups_are_independent() {
        let rows = vec![
            row(1, 7, "IssueJournal", 1),
            row(2, 7, "WorkPackageJournal", 1),
            row(3, 7, "WorkPackageJournal", 2),
            row(4, 8, "IssueJournal", 1),
        ];
        assert!(ConsistencyValidator::find_incomplete(&rows).is_empty());
    }

    #[test]
    fn test_lone_first_version_passes() {
        assert!(ConsistencyValidator::validate(&[row(1, 1, "NewsJournal", 1)]).is_ok());
        assert!(ConsistencyValidator::validate(&[]).is_ok());
    }
}
