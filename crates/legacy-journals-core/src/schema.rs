//! SQLite DDL for the legacy table and the journal tables it migrates into.
//!
//! None of the tables declare unique constraints on their natural keys. The
//! migration looks rows up before every insert and reports duplicates as
//! ambiguity errors instead.

use crate::error::Error;
use crate::store::SqliteStore;

/// Legacy denormalized journals.
pub const LEGACY_JOURNALS: &str = r#"
CREATE TABLE IF NOT EXISTS legacy_journals (
    id INTEGER PRIMARY KEY,
    journaled_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    version INTEGER NOT NULL,
    activity_type TEXT,
    changed_data TEXT,
    user_id INTEGER,
    notes TEXT,
    created_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_legacy_journals_chain
    ON legacy_journals (journaled_id, type, version);
"#;

/// Parent journal table plus the attachment and custom value side tables.
pub const JOURNALS: &str = r#"
CREATE TABLE IF NOT EXISTS journals (
    id INTEGER PRIMARY KEY,
    journable_id INTEGER,
    journable_type TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    user_id INTEGER,
    notes TEXT,
    activity_type TEXT,
    created_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_journals_journable
    ON journals (journable_id, journable_type, version);

CREATE TABLE IF NOT EXISTS attachable_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    attachment_id INTEGER NOT NULL,
    filename TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_attachable_journals_key
    ON attachable_journals (journal_id, attachment_id);

CREATE TABLE IF NOT EXISTS customizable_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    custom_field_id INTEGER NOT NULL,
    value TEXT
);
CREATE INDEX IF NOT EXISTS idx_customizable_journals_key
    ON customizable_journals (journal_id, custom_field_id);
"#;

/// Type-specific journal data tables.
pub const JOURNAL_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS attachment_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    container_id INTEGER,
    container_type TEXT,
    filename TEXT,
    disk_filename TEXT,
    filesize INTEGER,
    content_type TEXT,
    digest TEXT,
    downloads INTEGER,
    author_id INTEGER,
    description TEXT
);

CREATE TABLE IF NOT EXISTS changeset_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    repository_id INTEGER,
    revision TEXT,
    committer TEXT,
    committed_on TEXT,
    comments TEXT,
    commit_date TEXT,
    scmid TEXT,
    user_id INTEGER
);

CREATE TABLE IF NOT EXISTS news_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    project_id INTEGER,
    title TEXT,
    summary TEXT,
    description TEXT,
    author_id INTEGER,
    comments_count INTEGER
);

CREATE TABLE IF NOT EXISTS message_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    board_id INTEGER,
    parent_id INTEGER,
    subject TEXT,
    content TEXT,
    author_id INTEGER,
    replies_count INTEGER,
    last_reply_id INTEGER,
    locked INTEGER,
    sticky INTEGER
);

CREATE TABLE IF NOT EXISTS work_package_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    type_id INTEGER,
    project_id INTEGER,
    subject TEXT,
    description TEXT,
    due_date TEXT,
    category_id INTEGER,
    status_id INTEGER,
    assigned_to_id INTEGER,
    priority_id INTEGER,
    fixed_version_id INTEGER,
    author_id INTEGER,
    lock_version INTEGER,
    done_ratio INTEGER,
    estimated_hours REAL,
    start_date TEXT,
    parent_id INTEGER,
    responsible_id INTEGER
);

CREATE TABLE IF NOT EXISTS time_entry_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    project_id INTEGER,
    user_id INTEGER,
    work_package_id INTEGER,
    hours REAL,
    comments TEXT,
    activity_id INTEGER,
    spent_on TEXT,
    tyear INTEGER,
    tmonth INTEGER,
    tweek INTEGER
);

CREATE TABLE IF NOT EXISTS wiki_content_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    journal_id INTEGER NOT NULL,
    page_id INTEGER,
    author_id INTEGER,
    text TEXT,
    lock_version INTEGER
);
"#;

/// Create every table the migration reads from or writes to.
pub fn install(store: &SqliteStore) -> Result<(), Error> {
    store.execute_batch(LEGACY_JOURNALS)?;
    store.execute_batch(JOURNALS)?;
    store.execute_batch(JOURNAL_DATA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SchemaAdapter;

    #[test]
    fn test_install_is_repeatable() {
        let store = SqliteStore::open_in_memory().unwrap();
        install(&store).unwrap();
        install(&store).unwrap();

        let columns = store.column_names("work_package_journals").unwrap();
        assert!(columns.contains("journal_id"));
        assert!(columns.contains("due_date"));
        assert!(!columns.contains("end_date"));
    }
}
