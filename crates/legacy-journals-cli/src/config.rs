//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use legacy_journals_core::migration::driver::DEFAULT_PROGRESS_INTERVAL;
use legacy_journals_core::MigrationConfig;

/// Default SQLite database path.
pub const DEFAULT_DATABASE: &str = "./openproject.db";

/// Command-line arguments for the migration runner.
#[derive(Parser, Debug)]
#[command(name = "legacy-journals")]
#[command(version, about = "Migrate legacy journals into normalized journal tables", long_about = None)]
pub struct Args {
    /// Path to the SQLite database.
    #[arg(short, long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Table holding the legacy journals.
    #[arg(long, global = true, default_value = "legacy_journals")]
    pub legacy_table: String,

    /// Parent journal table.
    #[arg(long, global = true, default_value = "journals")]
    pub journals_table: String,

    /// Attachment side table.
    #[arg(long, global = true, default_value = "attachable_journals")]
    pub attachable_table: String,

    /// Custom value side table.
    #[arg(long, global = true, default_value = "customizable_journals")]
    pub customizable_table: String,

    /// Rows between progress lines. Set to 0 to disable.
    #[arg(long, global = true, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do with the database.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Validate, then migrate every legacy journal.
    Migrate,
    /// Only validate the legacy diff chains.
    Check,
    /// Create the legacy and journal tables if they are missing.
    InitSchema,
}

impl Args {
    /// Convert command-line arguments to a migration configuration.
    pub fn into_config(self) -> MigrationConfig {
        MigrationConfig::default()
            .with_legacy_table(self.legacy_table)
            .with_journals_table(self.journals_table)
            .with_attachable_table(self.attachable_table)
            .with_customizable_table(self.customizable_table)
            .with_progress_interval(self.progress_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library() {
        let args = Args::try_parse_from(["legacy-journals", "migrate"]).unwrap();
        assert_eq!(args.command, Command::Migrate);
        assert_eq!(args.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(args.into_config(), MigrationConfig::default());
    }

    #[test]
    fn test_flags_into_config() {
        let args = Args::try_parse_from([
            "legacy-journals",
            "check",
            "--database",
            "/tmp/op.db",
            "--legacy-table",
            "old_journals",
            "--progress-interval",
            "0",
        ])
        .unwrap();
        assert_eq!(args.command, Command::Check);
        assert_eq!(args.database, PathBuf::from("/tmp/op.db"));

        let config = args.into_config();
        assert_eq!(config.legacy_table, "old_journals");
        assert_eq!(config.journals_table, "journals");
        assert_eq!(config.progress_interval, 0);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["legacy-journals"]).is_err());
        let args = Args::try_parse_from(["legacy-journals", "-d", "x.db", "init-schema"]).unwrap();
        assert_eq!(args.command, Command::InitSchema);
    }
}
