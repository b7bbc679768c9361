// crates/kpi-board-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Entry Point Tests
// Description: Argument parsing and locale resolution tests.
// Purpose: Keep the command surface stable.
// Dependencies: clap
// ============================================================================

//! ## Overview
//! Parses representative command lines and checks locale precedence.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions."
)]

use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;
use kpi_board_cli::i18n::Locale;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::LangArg;
use super::resolve_locale;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn board_flags_parse() {
    let cli =
        Cli::try_parse_from(["kpi-board", "board", "--json", "--offline", "--config", "kb.toml"])
            .unwrap();
    let Some(Commands::Board(board)) = cli.command else {
        panic!("expected board command");
    };
    assert!(board.json);
    assert!(board.offline);
    assert!(!board.watch);
    assert_eq!(board.config, Some(PathBuf::from("kb.toml")));
}

#[test]
fn ingest_accepts_file_override() {
    let cli = Cli::try_parse_from(["kpi-board", "ingest", "--file", "data.json"]).unwrap();
    let Some(Commands::Ingest(ingest)) = cli.command else {
        panic!("expected ingest command");
    };
    assert_eq!(ingest.file, Some(PathBuf::from("data.json")));
    assert!(ingest.config.is_none());
}

#[test]
fn config_validate_and_global_flags_parse() {
    let cli =
        Cli::try_parse_from(["kpi-board", "config", "validate", "--lang", "fr", "--version"]).unwrap();
    assert!(cli.show_version);
    assert!(matches!(cli.lang, Some(LangArg::Fr)));
    assert!(matches!(cli.command, Some(Commands::Config {
        command: ConfigCommand::Validate(_)
    })));
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["kpi-board", "dashboard"]).is_err());
}

#[test]
fn locale_flag_overrides_environment() {
    assert_eq!(resolve_locale(Some(LangArg::En), Some("fr")).unwrap(), Locale::En);
    assert_eq!(resolve_locale(None, Some("fr_CA")).unwrap(), Locale::Fr);
    assert_eq!(resolve_locale(None, None).unwrap(), Locale::En);
    let err = resolve_locale(None, Some("de")).unwrap_err();
    assert!(err.to_string().contains("KPI_BOARD_LANG"));
}
