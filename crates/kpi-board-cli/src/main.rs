// crates/kpi-board-cli/src/main.rs
// ============================================================================
// Module: KPI Board CLI Entry Point
// Description: Command dispatcher for serving, ingesting, and viewing KPIs.
// Purpose: Provide a localized CLI over the KPI Board crates.
// Dependencies: clap, kpi-board-cli, kpi-board-config, kpi-board-server, tokio
// ============================================================================

//! ## Overview
//! `kpi-board` runs the HTTP API (`serve`), loads the bulk file into the local
//! store (`ingest`), prints gauges (`board`), and checks configuration
//! (`config validate`). User-facing strings go through the i18n catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use kpi_board_cli::BoardFeed;
use kpi_board_cli::FeedSettings;
use kpi_board_cli::FeedSnapshot;
use kpi_board_cli::FeedSource;
use kpi_board_cli::i18n::Locale;
use kpi_board_cli::i18n::set_locale;
use kpi_board_cli::render::gauge_readings;
use kpi_board_cli::render::notice_message;
use kpi_board_cli::render::render_json;
use kpi_board_cli::render::render_table;
use kpi_board_cli::t;
use kpi_board_config::CONFIG_ENV_VAR;
use kpi_board_config::KpiBoardConfig;
use kpi_board_config::resolve_config_location;
use kpi_board_core::BandThresholds;
use kpi_board_core::SharedKpiStore;
use kpi_board_core::ingest_bulk_file;
use kpi_board_server::KpiIngestEvent;
use kpi_board_server::KpiServer;
use kpi_board_server::audit_sink_from_config;
use kpi_board_store_sqlite::SqliteKpiStore;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "KPI_BOARD_LANG";
/// Shortest delay between `board --watch` renders.
const MIN_WATCH_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "kpi-board", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `KPI_BOARD_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the KPI HTTP API.
    Serve(ServeCommand),
    /// Load the bulk JSON file into the local store.
    Ingest(IngestCommand),
    /// Print KPI gauges.
    Board(BoardCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `KPI_BOARD_CONFIG` or `kpi-board.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `ingest`.
#[derive(Args, Debug)]
struct IngestCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Bulk file to ingest instead of `source.file`.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

/// Arguments for `board`.
#[derive(Args, Debug)]
struct BoardCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print gauges as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Re-render on every cache expiry until interrupted.
    #[arg(long, action = ArgAction::SetTrue)]
    watch: bool,
    /// Read the local store only.
    #[arg(long, action = ArgAction::SetTrue)]
    offline: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// French.
    Fr,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Fr => Self::Fr,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    set_locale(resolve_locale(cli.lang, env_lang.as_deref())?);

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        write_stdout_line(&Cli::command().render_help().to_string())?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Ingest(command) => command_ingest(&command),
        Commands::Board(command) => command_board(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let bind = config.server.bind.clone();
    let source_file = config.source.file.clone();
    let server = KpiServer::from_config(config)
        .map_err(|err| CliError::new(t!("serve.init_failed", error = err)))?;
    if let Some(report) = server.seed_from_source() {
        write_stderr_line(&t!(
            "serve.seeded",
            kept = report.rows_kept,
            dropped = report.rows_dropped,
            path = source_file.display()
        ))?;
    }
    write_stderr_line(&t!("serve.listening", bind = bind))?;
    server.serve().await.map_err(|err| CliError::new(t!("serve.failed", error = err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `ingest` command.
fn command_ingest(command: &IngestCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let path = command.file.clone().unwrap_or_else(|| config.source.file.clone());
    let store = SqliteKpiStore::new(&config.store.sqlite_config())
        .map_err(|err| CliError::new(t!("store.open_failed", error = err)))?;
    let result = ingest_bulk_file(&path, config.source.max_file_bytes, &store);
    if let Ok(audit) = audit_sink_from_config(&config.server.audit) {
        audit.record_ingest(&KpiIngestEvent::from_result(&path, &result));
    }
    let report = result
        .map_err(|err| CliError::new(t!("ingest.failed", path = path.display(), error = err)))?;
    write_stdout_line(&t!(
        "ingest.summary",
        path = path.display(),
        read = report.rows_read,
        kept = report.rows_kept,
        dropped = report.rows_dropped
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `board` command.
async fn command_board(command: BoardCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let thresholds = config
        .board
        .thresholds()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let api_url = config.board.api_url();
    let mut feed = build_feed(&config, command.offline)?;
    let delay = feed.cache_ttl().max(MIN_WATCH_INTERVAL);
    let mut snapshot = feed.current().await;
    loop {
        emit_snapshot(snapshot, &thresholds, &api_url, &config.source.file, command.json)?;
        if !command.watch {
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        snapshot = feed.refresh().await;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config validate` command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let location = resolve_config_location(command.config.as_deref(), std::env::var(CONFIG_ENV_VAR).ok())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    KpiBoardConfig::load_from(&location)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let message = if location.path.exists() {
        t!("config.valid", path = location.path.display())
    } else {
        t!("config.defaults", path = location.path.display())
    };
    write_stdout_line(&message)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Board Helpers
// ============================================================================

/// Builds the board feed for online or offline mode.
fn build_feed(config: &KpiBoardConfig, offline: bool) -> CliResult<BoardFeed> {
    let cache_ttl = Duration::from_millis(config.board.cache_ttl_ms);
    if offline {
        let store = open_store(config)?;
        return Ok(BoardFeed::offline(store, config.store.read_limit, cache_ttl));
    }
    let mirror = if config.board.mirror_to_store {
        match open_store(config) {
            Ok(store) => Some(store),
            Err(err) => {
                write_stderr_line(&err.to_string())?;
                None
            }
        }
    } else {
        None
    };
    BoardFeed::online(FeedSettings::from_config(config), mirror)
        .map_err(|err| CliError::new(t!("board.feed_failed", error = err)))
}

/// Opens the configured `SQLite` store.
fn open_store(config: &KpiBoardConfig) -> CliResult<SharedKpiStore> {
    SqliteKpiStore::new(&config.store.sqlite_config())
        .map(SharedKpiStore::from_store)
        .map_err(|err| CliError::new(t!("store.open_failed", error = err)))
}

/// Writes notices and the source line to stderr, gauges to stdout.
fn emit_snapshot(
    snapshot: &FeedSnapshot,
    thresholds: &BandThresholds,
    api_url: &str,
    fallback_file: &Path,
    json: bool,
) -> CliResult<()> {
    for notice in &snapshot.notices {
        write_stderr_line(&notice_message(notice))?;
    }
    let source = match snapshot.source {
        FeedSource::Api => t!("board.source.api", url = api_url),
        FeedSource::File => t!("board.source.file", path = fallback_file.display()),
        FeedSource::Store => t!("board.source.store"),
    };
    write_stderr_line(&source)?;
    let readings = gauge_readings(&snapshot.records, thresholds);
    let output = if json {
        render_json(&readings).map_err(|err| CliError::new(t!("board.render_failed", error = err)))?
    } else {
        render_table(&readings)
    };
    write_stdout_line(&output)
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Loads configuration with the standard resolution rules.
fn load_config(path: Option<&Path>) -> CliResult<KpiBoardConfig> {
    KpiBoardConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(t!("output.write_failed", stream = "stdout", error = err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
        .map_err(|err| CliError::new(t!("output.write_failed", stream = "stderr", error = err)))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "{message}");
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod main_tests;
