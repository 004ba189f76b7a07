//! Migration-specific error types.
//!
//! Every variant is fatal: the run aborts and nothing is rolled back. Fix the
//! offending data and re-run; the upsert lookups make reruns safe.

use thiserror::Error;

/// Journal migration errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Some diff chains have gaps or duplicate versions.
    #[error(
        "incomplete journals: every journal chain must start with an initial journal \
         holding all attribute values at creation and have no version gaps; \
         offending legacy journal ids: {journal_ids:?}"
    )]
    IncompleteJournalChain {
        /// Legacy ids whose predecessor count does not match their version.
        journal_ids: Vec<i64>,
    },

    /// More than one journal exists for an (id, type, version) triple.
    #[error(
        "ambiguous journals: {count} journals for {journable_type} #{journable_id} \
         version {version}; the unique constraint on id, type and version is not met"
    )]
    AmbiguousJournal {
        /// The journaled entity id.
        journable_id: i64,
        /// The journable type.
        journable_type: String,
        /// The journal version.
        version: i64,
        /// Number of matching rows.
        count: usize,
    },

    /// More than one data row exists for a journal.
    #[error(
        "ambiguous journal data: {count} rows in {table} for journal {journal_id}; \
         the unique constraint on journal_id is not met"
    )]
    AmbiguousJournalData {
        /// The data table.
        table: String,
        /// The journal id.
        journal_id: i64,
        /// Number of matching rows.
        count: usize,
    },

    /// More than one attachable row exists for a (journal, attachment) pair.
    #[error(
        "ambiguous attachable journals: {count} rows for journal {journal_id} and \
         attachment {attachment_id}; the unique constraint on journal_id and \
         attachment_id is not met"
    )]
    AmbiguousAttachableJournal {
        /// The journal id.
        journal_id: i64,
        /// The attachment id.
        attachment_id: i64,
        /// Number of matching rows.
        count: usize,
    },

    /// More than one customizable row exists for a (journal, custom field) pair.
    #[error(
        "ambiguous customizable journals: {count} rows for journal {journal_id} and \
         custom field {custom_field_id}; the unique constraint on journal_id and \
         custom_field_id is not met"
    )]
    AmbiguousCustomizableJournal {
        /// The journal id.
        journal_id: i64,
        /// The custom field id.
        custom_field_id: i64,
        /// Number of matching rows.
        count: usize,
    },

    /// An attachment diff is neither an addition nor a removal.
    #[error(
        "invalid attachable journal: legacy journal {legacy_id} has an entry {key} \
         whose old and new values are both empty or both set: {snapshot}"
    )]
    InvalidAttachableJournal {
        /// The legacy journal id.
        legacy_id: i64,
        /// The offending snapshot key.
        key: String,
        /// The combined snapshot, as JSON.
        snapshot: String,
    },

    /// A wiki content journal has no lock version and no version to derive it from.
    #[error(
        "wiki content journal {legacy_id} (wiki content #{journaled_id}) has no version; \
         the database requires a version to be set: {snapshot}"
    )]
    WikiContentVersionMissing {
        /// The legacy journal id.
        legacy_id: i64,
        /// The wiki content id.
        journaled_id: i64,
        /// The combined snapshot, as JSON.
        snapshot: String,
    },

    /// A wiki content journal holds data without a compression marker.
    #[error(
        "wiki content journal {legacy_id} (wiki content #{journaled_id}) contains data \
         in an unsupported compression"
    )]
    UnsupportedCompression {
        /// The legacy journal id.
        legacy_id: i64,
        /// The wiki content id.
        journaled_id: i64,
    },

    /// Versions of one entity reached the diff combiner out of order.
    #[error(
        "journal chain of #{journaled_id} is not contiguous: version {version} arrived \
         out of order, so its snapshot cannot be combined"
    )]
    UngroupedJournalChain {
        /// The journaled entity id.
        journaled_id: i64,
        /// The version that arrived out of order.
        version: i64,
    },

    /// A journal could not be read back after it was inserted.
    #[error("journal for legacy journal {legacy_id} was not found after insert")]
    JournalNotCreated {
        /// The legacy journal id.
        legacy_id: i64,
    },

    /// A legacy row could not be decoded.
    #[error("invalid legacy journal {id}: {reason}")]
    InvalidLegacyRow {
        /// The legacy journal id, when it could be read.
        id: i64,
        /// What was wrong with the row.
        reason: String,
    },

    /// Store error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),
}
