//! flagsync CLI - keeps a flag identifier collection in sync with a game server.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use flagsync::RecordFilter;
use tracing_subscriber::EnvFilter;

use crate::commands::list::OutputFormat;
use crate::config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "flagsync")]
#[command(version)]
#[command(about = "Periodically mirror a flag identifier catalog into a store")]
#[command(
    long_about = "flagsync polls a game server's flag identifier endpoint on a fixed \
schedule and mirrors every (service, team, round, flag id) entry into MongoDB or a \
SQL database, replacing stale copies of the same key on each cycle."
)]
#[command(after_long_help = r#"EXAMPLES
    Run the sync loop against the default local endpoint:
        $ flagsync run

    Sync once into a SQLite file:
        $ flagsync --store-uri sqlite://flagids.db?mode=rwc once

    Show what is stored for one service:
        $ flagsync list --service svc1 -o json

    Generate shell completions:
        $ flagsync completions bash > ~/.local/share/bash-completion/completions/flagsync

CONFIGURATION
    flagsync reads configuration from, in increasing priority:
      1. ~/.config/flagsync/config.toml (or $XDG_CONFIG_HOME/flagsync/config.toml)
      2. ./flagsync.toml
      3. The file named by --config
      4. Environment variables (FLAGSYNC_ prefix, `__` between section and key)
      5. MONGO_URI, FLAGID_DB, FLAGID_COLLECTION, FLAGID_URL
      6. Command-line flags

ENVIRONMENT VARIABLES
    FLAGSYNC_STORE__URI            Store connection string (default: mongodb://localhost:27017/)
    FLAGSYNC_STORE__DATABASE       MongoDB database (default: tulip)
    FLAGSYNC_STORE__COLLECTION     MongoDB collection (default: flagids)
    FLAGSYNC_SOURCE__URL           Catalog endpoint (default: http://localhost:8081/flagId)
    FLAGSYNC_SOURCE__TIMEOUT_SECS  Per-request timeout in seconds (default: 10)
    FLAGSYNC_SCHEDULE__MODE        `aligned` (default) or `fixed`
    FLAGSYNC_SCHEDULE__TICK_SECS   Tick length for aligned mode (default: 120)
    FLAGSYNC_SCHEDULE__OFFSET_SECS Offset into each tick (default: 5)
"#)]
struct Cli {
    /// Additional configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog endpoint URL
    #[arg(long, global = true)]
    source_url: Option<String>,

    /// Store connection string (mongodb://, sqlite://, postgres://)
    #[arg(long, global = true)]
    store_uri: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync loop until interrupted
    Run,
    /// Run a single sync cycle now
    Once,
    /// List stored flag identifiers
    List {
        /// Only show this service
        #[arg(short, long)]
        service: Option<String>,

        /// Only show this team
        #[arg(short, long)]
        team: Option<i64>,

        /// Only show this round
        #[arg(short, long)]
        round: Option<i64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations (SQL stores only)
    #[cfg(feature = "migrate")]
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

/// Create the parent directory of a SQLite database file.
fn prepare_sqlite_path(store_uri: &str) -> std::io::Result<()> {
    let Some(db_path) = config::sqlite_file_path(store_uri) else {
        return Ok(());
    };

    if db_path.is_relative() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("flagsync=info,flagsync_cli=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(Term::stderr().is_term())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle commands that don't touch the store first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.as_deref())?;
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(&Overrides {
        config_file: cli.config,
        source_url: cli.source_url,
        store_uri: cli.store_uri,
    })?;

    prepare_sqlite_path(&config.store.uri)?;

    match cli.command {
        Commands::Run => commands::run::handle_run(&config).await?,
        Commands::Once => commands::run::handle_once(&config).await?,
        Commands::List {
            service,
            team,
            round,
            output,
        } => {
            let filter = RecordFilter {
                service,
                team,
                round,
            };
            commands::list::handle_list(&config, filter, output).await?;
        }
        #[cfg(feature = "migrate")]
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &config.store.uri).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
