// crates/kpi-board-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite KPI Store
// Description: Durable KpiStore backed by a single SQLite table.
// Purpose: Replace and read KPI generations with transactional guarantees.
// Dependencies: kpi-board-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`KpiStore`] over the `kpis` table. The column
//! names (`kpi_name`, `rate`, `target`, `poids`, `obj`, `real`, `score`,
//! `timestamp`) match databases written by earlier dashboard releases, so an
//! existing `kpi_database.db` opens in place. Columns introduced later are
//! added with `ALTER TABLE ... ADD COLUMN` on open.
//!
//! A replace deletes and re-inserts every row inside one immediate
//! transaction. Readers on other connections observe either the previous or
//! the next generation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use kpi_board_core::IngestedAt;
use kpi_board_core::KpiRecord;
use kpi_board_core::KpiStore;
use kpi_board_core::StoreError;
use kpi_board_core::StoredKpi;
use kpi_board_core::unknown_name;
use kpi_board_core::validate_batch;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Table holding the current KPI generation.
pub const KPI_TABLE: &str = "kpis";
/// Default busy timeout (ms) for `SQLite` connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length for a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Columns present since the first schema; missing ones cannot be recovered.
const BASE_COLUMNS: &[&str] = &["kpi_name", "rate", "target", "poids", "obj", "real"];

/// Columns added after the first schema, with their `ADD COLUMN` definitions.
const EVOLVED_COLUMNS: &[(&str, &str)] = &[
    ("score", "REAL"),
    ("timestamp", "TEXT"),
    ("ingested_at", "INTEGER NOT NULL DEFAULT 0"),
];

/// Table definition for fresh databases.
const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS kpis (
    kpi_name TEXT,
    rate REAL,
    target REAL,
    poids REAL,
    obj REAL,
    real REAL,
    score REAL,
    timestamp TEXT,
    ingested_at INTEGER NOT NULL DEFAULT 0
);";

/// Insert statement for one record.
const INSERT_SQL: &str = "INSERT INTO kpis (kpi_name, rate, target, poids, obj, real, score, \
                          timestamp, ingested_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

/// Read statement for the most recent rows of the stored generation.
const RECENT_SQL: &str = "SELECT kpi_name, rate, target, poids, obj, real, score, ingested_at \
                          FROM kpis WHERE poids IS NOT NULL \
                          ORDER BY ingested_at DESC, rowid ASC LIMIT ?1";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode; readers never block on the writer.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` KPI store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with default pragmas for `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored data cannot be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Existing table lacks columns that cannot be added in place.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed KPI store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Every row of the stored generation shares one `ingested_at`.
#[derive(Clone)]
pub struct SqliteKpiStore {
    /// Connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Columns added when this store was opened.
    migrated_columns: Vec<&'static str>,
}

impl SqliteKpiStore {
    /// Opens (or creates) the store and evolves the schema in place.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the database
    /// cannot be opened, or an existing table cannot be evolved.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        let migrated_columns = initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            migrated_columns,
        })
    }

    /// Columns added to an existing table when the store was opened.
    #[must_use]
    pub fn migrated_columns(&self) -> &[&'static str] {
        &self.migrated_columns
    }

    /// Replaces the stored generation inside one transaction.
    fn replace_generation(&self, records: &[KpiRecord]) -> Result<IngestedAt, SqliteStoreError> {
        let ingested_at = IngestedAt::now();
        let timestamp = ingested_at.to_rfc3339();
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.execute("DELETE FROM kpis", params![])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        {
            let mut insert =
                tx.prepare(INSERT_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            for record in records {
                insert
                    .execute(params![
                        record.name,
                        record.rate,
                        record.target,
                        record.weight,
                        record.objective,
                        record.realized,
                        record.score,
                        timestamp,
                        ingested_at.as_unix_millis(),
                    ])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            }
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(ingested_at)
    }

    /// Reads up to `limit` rows of the stored generation.
    fn read_recent(&self, limit: usize) -> Result<Vec<StoredKpi>, SqliteStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let mut statement =
            guard.prepare(RECENT_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![limit], map_kpi_row)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
    }
}

impl KpiStore for SqliteKpiStore {
    fn replace_all(&self, records: &[KpiRecord]) -> Result<IngestedAt, StoreError> {
        validate_batch(records)?;
        self.replace_generation(records).map_err(StoreError::from)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredKpi>, StoreError> {
        self.read_recent(limit).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| StoreError::Store("mutex poisoned".to_string()))?;
        guard
            .query_row("SELECT 1", params![], |row| row.get::<_, i64>(0))
            .map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Creates the `kpis` table or adds missing columns to an existing one.
///
/// Returns the names of columns that were added.
fn initialize_schema(connection: &mut Connection) -> Result<Vec<&'static str>, SqliteStoreError> {
    let tx = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch(CREATE_TABLE_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let existing = table_columns(&tx)?;
    let missing_base: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .filter(|column| !existing.iter().any(|name| name == column))
        .collect();
    if !missing_base.is_empty() {
        return Err(SqliteStoreError::VersionMismatch(format!(
            "{KPI_TABLE} table lacks columns: {}",
            missing_base.join(", ")
        )));
    }
    let mut added = Vec::new();
    for (column, definition) in EVOLVED_COLUMNS {
        if existing.iter().any(|name| name == column) {
            continue;
        }
        tx.execute_batch(&format!("ALTER TABLE {KPI_TABLE} ADD COLUMN {column} {definition};"))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        added.push(*column);
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(added)
}

/// Lists the column names of the `kpis` table.
fn table_columns(connection: &Connection) -> Result<Vec<String>, SqliteStoreError> {
    let mut statement = connection
        .prepare("PRAGMA table_info(kpis)")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let names = statement
        .query_map(params![], |row| row.get::<_, String>(1))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    names.collect::<Result<Vec<_>, _>>().map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Maps one `kpis` row to a stored record.
fn map_kpi_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredKpi> {
    let name: Option<String> = row.get(0)?;
    Ok(StoredKpi {
        record: KpiRecord {
            name: name.unwrap_or_else(unknown_name),
            rate: row.get(1)?,
            target: row.get(2)?,
            weight: row.get(3)?,
            objective: row.get(4)?,
            realized: row.get(5)?,
            score: row.get(6)?,
        },
        ingested_at: IngestedAt::from_unix_millis(row.get(7)?),
    })
}
