//! The anthology CLI: configuration checks, CSV import/export, and session
//! maintenance. The HTTP surface is a separate collaborator; this binary
//! drives the same services against a local database.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use anthology_common::{Error, Result, UserId};
use anthology_config::AppConfig;
use anthology_core::export::export_csv;
use anthology_core::import::CsvImporter;
use anthology_core::logging::{init_logging, LogConfig};
use anthology_core::session::SessionService;
use anthology_metadata::{MetadataClient, MetadataLookup};
use anthology_store::{schema, users, Db};

#[derive(Parser)]
#[command(name = "anthology", version, about = "Personal media catalog toolkit")]
struct Cli {
    /// Config file path (falls back to ANTHOLOGY_CONFIG, then defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file override.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and open the database.
    Check,
    /// Import a CSV catalog for an owner.
    Import {
        /// Owner email.
        #[arg(long)]
        owner: String,
        /// CSV file to import.
        file: PathBuf,
    },
    /// Export an owner's catalog as CSV.
    Export {
        /// Owner email.
        #[arg(long)]
        owner: String,
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Session maintenance.
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
}

#[derive(Subcommand)]
enum SessionsCommand {
    /// Delete expired sessions.
    Sweep,
}

fn main() -> ExitCode {
    init_logging(&LogConfig::from_env());
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = anthology_config::load(cli.config.as_deref())
        .map_err(|e| Error::validation(e.to_string()))?;
    if let Some(db_path) = cli.db {
        config.database.path = db_path;
    }

    match cli.command {
        Command::Check => check(&config),
        Command::Import { owner, file } => import(&config, &owner, &file),
        Command::Export { owner, output } => export(&config, &owner, output.as_deref()),
        Command::Sessions {
            command: SessionsCommand::Sweep,
        } => sweep(&config),
    }
}

fn open_db(config: &AppConfig) -> Result<Db> {
    Db::open(&config.database.path, config.database.busy_timeout_ms)
}

fn resolve_owner(db: &Db, email: &str) -> Result<UserId> {
    users::find_by_email(db.conn(), email)?
        .map(|user| user.id)
        .ok_or_else(|| Error::not_found("user"))
}

fn check(config: &AppConfig) -> Result<ExitCode> {
    let issues = anthology_config::validate(config);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("config: {issue}");
        }
        return Ok(ExitCode::from(2));
    }
    let db = open_db(config)?;
    drop(db);
    println!(
        "configuration ok; database schema at version {}",
        schema::SCHEMA_VERSION
    );
    Ok(ExitCode::SUCCESS)
}

fn import(config: &AppConfig, owner_email: &str, file: &PathBuf) -> Result<ExitCode> {
    let mut db = open_db(config)?;
    let owner = resolve_owner(&db, owner_email)?;

    let client = MetadataClient::new(
        &config.metadata.base_url,
        Duration::from_secs(config.metadata.timeout_secs),
    )
    .map_err(|e| Error::upstream(e.to_string()))?;
    let importer = CsvImporter::new(&config.import, Some(&client as &dyn MetadataLookup));

    let input = File::open(file)?;
    let summary = importer.import(&mut db, owner, input)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).map_err(|e| Error::storage(e.to_string()))?
    );
    Ok(ExitCode::SUCCESS)
}

fn export(config: &AppConfig, owner_email: &str, output: Option<&std::path::Path>) -> Result<ExitCode> {
    let mut db = open_db(config)?;
    let owner = resolve_owner(&db, owner_email)?;

    let written = match output {
        Some(path) => {
            let file = File::create(path)?;
            export_csv(&mut db, owner, file)?
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            let written = export_csv(&mut db, owner, &mut lock)?;
            lock.flush()?;
            written
        }
    };
    eprintln!("exported {written} items");
    Ok(ExitCode::SUCCESS)
}

fn sweep(config: &AppConfig) -> Result<ExitCode> {
    let mut db = open_db(config)?;
    let sessions = SessionService::new(&config.session);
    let swept = sessions.sweep_expired(&mut db)?;
    println!("swept {swept} expired sessions");
    Ok(ExitCode::SUCCESS)
}
