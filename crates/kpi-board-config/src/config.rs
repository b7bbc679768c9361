// crates/kpi-board-config/src/config.rs
// ============================================================================
// Module: KPI Board Configuration
// Description: Configuration loading and validation for KPI Board.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: kpi-board-core, kpi-board-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with size and path limits. The
//! path comes from the caller, else [`CONFIG_ENV_VAR`], else
//! [`DEFAULT_CONFIG_NAME`] in the working directory. Only the implicit default
//! file may be absent; an explicitly named file that is missing is an error.
//! Every section has defaults, so an empty file is a valid configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use kpi_board_core::BandThresholds;
use kpi_board_core::DEFAULT_GOOD_THRESHOLD;
use kpi_board_core::DEFAULT_WARN_THRESHOLD;
use kpi_board_core::MAX_BULK_FILE_BYTES;
use kpi_board_store_sqlite::SqliteStoreConfig;
use kpi_board_store_sqlite::SqliteStoreMode;
use kpi_board_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "kpi-board.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "KPI_BOARD_CONFIG";
/// Environment variable selecting the retrieval endpoint address.
pub const API_URL_ENV_VAR: &str = "KPI_BOARD_API_URL";
/// Retrieval endpoint used when neither env nor config name one.
pub const DEFAULT_API_URL: &str = "http://localhost:8501/api/kpis";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum accepted request body limit.
const MAX_BODY_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Maximum accepted bulk file limit.
const MAX_FILE_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Maximum rows returned by a single read.
const MAX_READ_LIMIT: usize = 1_000;
/// Maximum `SQLite` busy timeout in milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Minimum board HTTP timeout in milliseconds.
const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum board HTTP timeout in milliseconds.
const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Maximum board cache TTL in milliseconds.
const MAX_CACHE_TTL_MS: u64 = 3_600_000;
/// Maximum accepted URL length.
const MAX_URL_LENGTH: usize = 2048;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// KPI Board configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KpiBoardConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// KPI store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Bulk source file configuration.
    #[serde(default)]
    pub source: SourceConfig,
    /// Board (presentation consumer) configuration.
    #[serde(default)]
    pub board: BoardConfig,
}

/// Resolved location of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    /// File path.
    pub path: PathBuf,
    /// True when named by the caller or the environment.
    pub explicit: bool,
}

impl KpiBoardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let location = resolve_config_location(path, env::var(CONFIG_ENV_VAR).ok())?;
        Self::load_from(&location)
    }

    /// Loads configuration from a resolved location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit file is missing, the file is
    /// unreadable or malformed, or validation fails.
    pub fn load_from(location: &ConfigLocation) -> Result<Self, ConfigError> {
        validate_path(&location.path)?;
        let bytes = match fs::read(&location.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound && !location.explicit => {
                let mut config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", location.path.display())));
            }
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.source.validate()?;
        self.board.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind is invalid: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        self.audit.validate()
    }
}

/// Audit logging configuration for server requests and ingests.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// KPI store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Maximum records returned by reads.
    #[serde(default = "default_read_limit")]
    pub read_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_limit: default_read_limit(),
        }
    }
}

impl StoreConfig {
    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must not exceed {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        if self.read_limit == 0 || self.read_limit > MAX_READ_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "store.read_limit must be between 1 and {MAX_READ_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Bulk source file configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Bulk JSON file path.
    #[serde(default = "default_source_file")]
    pub file: PathBuf,
    /// Ingest the bulk file when the server starts.
    #[serde(default = "default_seed_on_startup")]
    pub seed_on_startup: bool,
    /// Maximum bulk file size in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            file: default_source_file(),
            seed_on_startup: default_seed_on_startup(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl SourceConfig {
    /// Validates source configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("source.file", &self.file.to_string_lossy())?;
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_FILE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "source.max_file_bytes must be between 1 and {MAX_FILE_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Board configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// Retrieval endpoint; [`API_URL_ENV_VAR`] takes precedence.
    #[serde(default)]
    pub api_url: Option<String>,
    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Cache lifetime of fetched records in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Lower bound of the good band.
    #[serde(default = "default_good_threshold")]
    pub good_threshold: f64,
    /// Lower bound of the warn band.
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,
    /// Write fetched records into the local store.
    #[serde(default = "default_mirror_to_store")]
    pub mirror_to_store: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            good_threshold: default_good_threshold(),
            warn_threshold: default_warn_threshold(),
            mirror_to_store: default_mirror_to_store(),
        }
    }
}

impl BoardConfig {
    /// Returns the validated band thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the thresholds are out of range
    /// or out of order.
    pub fn thresholds(&self) -> Result<BandThresholds, ConfigError> {
        BandThresholds::new(self.good_threshold, self.warn_threshold)
            .map_err(|err| ConfigError::Invalid(format!("board thresholds: {err}")))
    }

    /// Resolves the retrieval endpoint from the process environment.
    #[must_use]
    pub fn api_url(&self) -> String {
        self.resolve_api_url(env::var(API_URL_ENV_VAR).ok())
    }

    /// Resolves the retrieval endpoint: env value, then config, then default.
    ///
    /// Blank values count as absent.
    #[must_use]
    pub fn resolve_api_url(&self, env_value: Option<String>) -> String {
        env_value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                self.api_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Validates board configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.api_url {
            validate_url("board.api_url", url)?;
        }
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "board.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.cache_ttl_ms > MAX_CACHE_TTL_MS {
            return Err(ConfigError::Invalid(format!(
                "board.cache_ttl_ms must not exceed {MAX_CACHE_TTL_MS}"
            )));
        }
        self.thresholds()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config location from the caller, then the env value, then
/// the default filename.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the env value exceeds path limits.
pub fn resolve_config_location(
    path: Option<&Path>,
    env_value: Option<String>,
) -> Result<ConfigLocation, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigLocation {
            path: path.to_path_buf(),
            explicit: true,
        });
    }
    if let Some(env_path) = env_value.filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigLocation {
            path: PathBuf::from(env_path),
            explicit: true,
        });
    }
    Ok(ConfigLocation {
        path: PathBuf::from(DEFAULT_CONFIG_NAME),
        explicit: false,
    })
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an HTTP(S) URL string.
fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!("{field} must be an http or https url")));
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

/// Default max request body size.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default audit enabled flag.
const fn default_audit_enabled() -> bool {
    true
}

/// Default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from("kpi_database.db")
}

/// Default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default read limit.
const fn default_read_limit() -> usize {
    16
}

/// Default bulk file path.
fn default_source_file() -> PathBuf {
    PathBuf::from("kpi_data.json")
}

/// Default startup seeding flag.
const fn default_seed_on_startup() -> bool {
    true
}

/// Default bulk file size limit.
const fn default_max_file_bytes() -> usize {
    MAX_BULK_FILE_BYTES
}

/// Default board HTTP timeout.
const fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Default board cache TTL.
const fn default_cache_ttl_ms() -> u64 {
    10_000
}

/// Default good threshold.
const fn default_good_threshold() -> f64 {
    DEFAULT_GOOD_THRESHOLD
}

/// Default warn threshold.
const fn default_warn_threshold() -> f64 {
    DEFAULT_WARN_THRESHOLD
}

/// Default store mirroring flag.
const fn default_mirror_to_store() -> bool {
    true
}
