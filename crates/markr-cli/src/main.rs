mod config;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use markr_core::{aggregate_test, import_document};
use markr_server::ServeOptions;
use markr_store::SqliteStore;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "markr",
    version,
    about = "Ingest multiple-choice test results and serve score aggregates"
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Import a results document
    Import {
        /// XML file to read; stdin when omitted or "-"
        file: Option<PathBuf>,
    },

    /// Print aggregate statistics for a test as JSON
    Aggregate {
        /// Test identifier
        test_id: String,
    },

    /// List tests with stored results
    Tests,

    /// Show active configuration
    Config,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "markr", "markr")
        .map(|dirs| dirs.data_dir().join("results.db"))
        .unwrap_or_else(|| PathBuf::from("results.db"))
}

/// `--db` wins over `[store] path`, which wins over the platform default.
fn resolve_db_path(flag: Option<PathBuf>, cfg: &Config) -> PathBuf {
    flag.or_else(|| cfg.store.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn open_store(path: &Path) -> Result<SqliteStore> {
    SqliteStore::new(path).context("failed to open database")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;
    let db_path = resolve_db_path(cli.db, &cfg);

    match cli.command {
        Commands::Serve { listen } => cmd_serve(&db_path, &cfg, listen),
        Commands::Import { file } => cmd_import(&open_store(&db_path)?, file.as_deref()),
        Commands::Aggregate { test_id } => cmd_aggregate(&open_store(&db_path)?, &test_id),
        Commands::Tests => cmd_tests(&open_store(&db_path)?),
        Commands::Config => cmd_config(&cfg, &db_path),
    }
}

fn cmd_serve(db_path: &Path, cfg: &Config, listen: Option<String>) -> Result<()> {
    let store = open_store(db_path)?;
    let options = ServeOptions {
        listen: listen.unwrap_or_else(|| cfg.server.listen.clone()),
        max_body_bytes: cfg.server.max_body_bytes,
    };
    tracing::info!("using database {}", db_path.display());

    let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;
    runtime.block_on(markr_server::run_server(store, options))
}

fn read_document(file: Option<&Path>) -> Result<String> {
    match file {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn cmd_import(store: &SqliteStore, file: Option<&Path>) -> Result<()> {
    let xml = read_document(file)?;
    let summaries = import_document(store, &xml)?;
    for summary in &summaries {
        println!("Imported {summary}");
    }
    Ok(())
}

fn cmd_aggregate(store: &SqliteStore, test_id: &str) -> Result<()> {
    let result = aggregate_test(store, test_id)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_tests(store: &SqliteStore) -> Result<()> {
    let tests = store.list_tests()?;
    if tests.is_empty() {
        println!("No tests yet.");
        return Ok(());
    }

    println!("{:<30} Students", "Test");
    println!("{}", "-".repeat(40));
    for (test_id, count) in &tests {
        println!("{test_id:<30} {count}");
    }
    Ok(())
}

fn cmd_config(cfg: &Config, db_path: &Path) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[store]");
    println!(
        "  path = {}",
        cfg.store.path.as_deref().unwrap_or("(default platform path)")
    );
    println!("  resolved = {}", db_path.display());
    println!();
    println!("[server]");
    println!("  listen = {}", cfg.server.listen);
    println!("  max_body_bytes = {}", cfg.server.max_body_bytes);
    Ok(())
}
