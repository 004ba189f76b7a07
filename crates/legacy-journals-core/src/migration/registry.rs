//! Dispatch table from legacy type discriminator to its migrator.

use std::collections::HashMap;

use super::enrich::{
    Attachable, AttachmentContainerRewrite, Customizable, Enricher, EnricherChain, NoEnrichment,
    WikiContent,
};
use super::migrator::TypeMigrator;

/// Registered migrators, selected once per run.
pub struct TypeRegistry {
    migrators: HashMap<String, TypeMigrator>,
}

impl TypeRegistry {
    /// A registry without any types.
    pub fn empty() -> Self {
        Self {
            migrators: HashMap::new(),
        }
    }

    /// Register `legacy_type`, writing into `table`.
    ///
    /// The journable type is the registered journal name without its
    /// `Journal` suffix.
    pub fn register(
        mut self,
        legacy_type: &str,
        journal_name: &str,
        table: &str,
        enricher: impl Enricher + 'static,
    ) -> Self {
        let journable_type = journal_name.strip_suffix("Journal").unwrap_or(journal_name);
        self.migrators.insert(
            legacy_type.to_string(),
            TypeMigrator::new(legacy_type, journable_type, table, enricher),
        );
        self
    }

    /// The migrator for `legacy_type`, if one is registered.
    pub fn get_mut(&mut self, legacy_type: &str) -> Option<&mut TypeMigrator> {
        self.migrators.get_mut(legacy_type)
    }

    pub fn contains(&self, legacy_type: &str) -> bool {
        self.migrators.contains_key(legacy_type)
    }

    pub fn len(&self) -> usize {
        self.migrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrators.is_empty()
    }
}

fn work_package_enricher() -> EnricherChain {
    EnricherChain::new().with(Attachable).with(Customizable)
}

impl Default for TypeRegistry {
    /// The journal types of the legacy schema.
    fn default() -> Self {
        Self::empty()
            .register(
                "AttachmentJournal",
                "AttachmentJournal",
                "attachment_journals",
                AttachmentContainerRewrite,
            )
            .register("ChangesetJournal", "ChangesetJournal", "changeset_journals", NoEnrichment)
            .register("NewsJournal", "NewsJournal", "news_journals", NoEnrichment)
            .register("MessageJournal", "MessageJournal", "message_journals", Attachable)
            .register(
                "WorkPackageJournal",
                "WorkPackageJournal",
                "work_package_journals",
                work_package_enricher(),
            )
            .register(
                "IssueJournal",
                "WorkPackageJournal",
                "work_package_journals",
                work_package_enricher(),
            )
            .register(
                "Timelines_PlanningElementJournal",
                "WorkPackageJournal",
                "work_package_journals",
                work_package_enricher(),
            )
            .register("TimeEntryJournal", "TimeEntryJournal", "time_entry_journals", Customizable)
            .register(
                "WikiContentJournal",
                "WikiContentJournal",
                "wiki_content_journals",
                WikiContent,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_types() {
        let mut registry = TypeRegistry::default();
        assert_eq!(registry.len(), 9);
        assert!(!registry.contains("UnknownLegacyType"));

        let issue = registry.get_mut("IssueJournal").unwrap();
        assert_eq!(issue.journable_type(), "WorkPackage");
        assert_eq!(issue.table(), "work_package_journals");

        let wiki = registry.get_mut("WikiContentJournal").unwrap();
        assert_eq!(wiki.journable_type(), "WikiContent");
        assert_eq!(wiki.legacy_type(), "WikiContentJournal");
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = TypeRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.get_mut("NewsJournal").is_none());
    }
}
