//! Legacy journals runner - migrates a SQLite database in place.

mod config;
mod error;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, Command};
use error::Error;
use legacy_journals_core::{schema, MigrationDriver, SqliteStore};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legacy_journals=info,legacy_journals_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let command = args.command;
    let database = args.database.clone();
    let config = args.into_config();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %database.display(),
        legacy_table = %config.legacy_table,
        "configuration loaded"
    );

    // Only schema creation may create the database file.
    if command != Command::InitSchema && !database.exists() {
        return Err(Error::DatabaseNotFound(database));
    }
    let store = SqliteStore::open(&database)?;

    match command {
        Command::InitSchema => {
            schema::install(&store)?;
            tracing::info!("schema installed");
        }
        Command::Check => {
            let checked = MigrationDriver::new(&store, config).check()?;
            println!("{} legacy journals are consistent", checked);
        }
        Command::Migrate => {
            let report = MigrationDriver::new(&store, config).run()?;
            println!(
                "migrated {} of {} legacy journals ({} journals created, {} data rows inserted, {} updated)",
                report.migrated,
                report.total,
                report.journals_created,
                report.data_inserted,
                report.data_updated
            );
            for (legacy_type, amount) in &report.ignored {
                println!("ignored {} journals of type {}", amount, legacy_type);
            }
        }
    }

    Ok(())
}
