//! Diff combining: rebuild an entity's full state from its diff chain.

use std::collections::{btree_map, HashSet};

use serde_json::Value;

use super::error::MigrationError;
use super::legacy::{ChangePair, ChangedData};

/// Full known state of an entity as of one version.
///
/// Maps attribute name to its most recent `[old, new]` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedSnapshot {
    entries: ChangedData,
}

impl CombinedSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a snapshot from a single diff.
    pub fn from_diff(diff: &ChangedData) -> Self {
        Self {
            entries: diff.clone(),
        }
    }

    /// Shallow merge: keys in `diff` overwrite, all other keys are kept.
    pub fn merge(&mut self, diff: &ChangedData) {
        for (key, pair) in diff {
            self.entries.insert(key.clone(), pair.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&ChangePair> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ChangePair> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, pair: ChangePair) -> Option<ChangePair> {
        self.entries.insert(key.into(), pair)
    }

    pub fn remove(&mut self, key: &str) -> Option<ChangePair> {
        self.entries.remove(key)
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &ChangePair) -> bool) {
        self.entries.retain(|key, pair| keep(key, pair));
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ChangePair> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a JSON object, for error messages.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| format!("{:?}", self.entries))
    }

    /// The new value of `key`, if the key is present.
    pub fn new_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|pair| &pair.new)
    }
}

/// Merges each version's diff into the previous state of the same entity.
///
/// Only the most recently seen entity's snapshot is retained, so input must
/// arrive grouped: every version of one entity contiguous and in version
/// order. Input that breaks the grouping is rejected with
/// [`MigrationError::UngroupedJournalChain`] instead of being combined.
#[derive(Debug, Default)]
pub struct DiffCombiner {
    retained: Option<Retained>,
    finished: HashSet<i64>,
}

#[derive(Debug)]
struct Retained {
    journaled_id: i64,
    version: i64,
    snapshot: CombinedSnapshot,
}

impl DiffCombiner {
    /// Create a combiner with no retained state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine `diff`, version `version` of `journaled_id`, and return the
    /// retained snapshot.
    ///
    /// A new entity must start at its first version and must not have been
    /// seen before; a continuing entity must advance by exactly one version.
    /// Callers may mutate the returned snapshot; the mutation carries forward
    /// to the next version of the same entity.
    pub fn combine(
        &mut self,
        journaled_id: i64,
        version: i64,
        diff: &ChangedData,
    ) -> Result<&mut CombinedSnapshot, MigrationError> {
        let continues = matches!(&self.retained, Some(r) if r.journaled_id == journaled_id);
        let in_order = match &self.retained {
            Some(r) if continues => version == r.version + 1,
            _ => version <= 1 && !self.finished.contains(&journaled_id),
        };
        if !in_order {
            return Err(MigrationError::UngroupedJournalChain {
                journaled_id,
                version,
            });
        }

        let retained = match self.retained.take() {
            Some(mut retained) if continues => {
                retained.version = version;
                retained.snapshot.merge(diff);
                retained
            }
            previous => {
                if let Some(previous) = previous {
                    self.finished.insert(previous.journaled_id);
                }
                Retained {
                    journaled_id,
                    version,
                    snapshot: CombinedSnapshot::from_diff(diff),
                }
            }
        };
        Ok(&mut self.retained.insert(retained).snapshot)
    }

    /// Id of the entity whose snapshot is retained.
    pub fn retained_id(&self) -> Option<i64> {
        self.retained.as_ref().map(|r| r.journaled_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff(entries: &[(&str, ChangePair)]) -> ChangedData {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_later_values_win_and_unrelated_keys_persist() {
        let mut combiner = DiffCombiner::new();
        combiner
            .combine(1, 1, &diff(&[("subject", ChangePair::added("A"))]))
            .unwrap();
        let snapshot = combiner
            .combine(
                1,
                2,
                &diff(&[
                    ("subject", ChangePair::new("A", "B")),
                    ("due_date", ChangePair::added("2020-01-01")),
                ]),
            )
            .unwrap();

        let expected = CombinedSnapshot::from_diff(&diff(&[
            ("subject", ChangePair::new("A", "B")),
            ("due_date", ChangePair::added("2020-01-01")),
        ]));
        assert_eq!(*snapshot, expected);
    }

    #[test]
    fn test_keys_survive_versions_that_omit_them() {
        let mut combiner = DiffCombiner::new();
        combiner
            .combine(4, 1, &diff(&[("status_id", ChangePair::added(1))]))
            .unwrap();
        combiner
            .combine(4, 2, &diff(&[("subject", ChangePair::added("x"))]))
            .unwrap();
        let snapshot = combiner
            .combine(4, 3, &diff(&[("done_ratio", ChangePair::new(0, 50))]))
            .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.new_value("status_id"), Some(&json!(1)));
    }

    #[test]
    fn test_new_entity_starts_fresh() {
        let mut combiner = DiffCombiner::new();
        combiner
            .combine(1, 1, &diff(&[("subject", ChangePair::added("A"))]))
            .unwrap();
        let snapshot = combiner
            .combine(2, 1, &diff(&[("title", ChangePair::added("T"))]))
            .unwrap();

        assert!(!snapshot.contains_key("subject"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(combiner.retained_id(), Some(2));
    }

    #[test]
    fn test_mutations_carry_forward() {
        let mut combiner = DiffCombiner::new();
        let snapshot = combiner
            .combine(1, 1, &diff(&[("data", ChangePair::added("v1"))]))
            .unwrap();
        snapshot.remove("data");
        snapshot.insert("text", ChangePair::added("v1"));

        let snapshot = combiner
            .combine(1, 2, &diff(&[("author_id", ChangePair::added(2))]))
            .unwrap();
        assert!(!snapshot.contains_key("data"));
        assert!(snapshot.contains_key("text"));
    }

    #[test]
    fn test_merge_does_not_touch_input() {
        let first = diff(&[("subject", ChangePair::added("A"))]);
        let mut combiner = DiffCombiner::new();
        combiner
            .combine(1, 1, &first)
            .unwrap()
            .insert("extra", ChangePair::added(1));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_later_version_before_earlier_is_rejected() {
        let mut combiner = DiffCombiner::new();
        let err = combiner
            .combine(10, 2, &diff(&[("attachments5", ChangePair::added("f.png"))]))
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UngroupedJournalChain {
                journaled_id: 10,
                version: 2
            }
        ));
    }

    #[test]
    fn test_skipped_version_is_rejected() {
        let mut combiner = DiffCombiner::new();
        combiner
            .combine(10, 1, &diff(&[("subject", ChangePair::added("A"))]))
            .unwrap();
        assert!(combiner.combine(10, 3, &ChangedData::new()).is_err());
    }

    #[test]
    fn test_entity_cannot_resume_after_another_started() {
        let mut combiner = DiffCombiner::new();
        combiner
            .combine(10, 1, &diff(&[("subject", ChangePair::added("A"))]))
            .unwrap();
        combiner.combine(11, 1, &ChangedData::new()).unwrap();

        let err = combiner.combine(10, 2, &ChangedData::new()).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UngroupedJournalChain { journaled_id: 10, .. }
        ));
        // Restarting the finished entity from scratch is rejected too.
        assert!(combiner.combine(10, 1, &ChangedData::new()).is_err());
    }
}
