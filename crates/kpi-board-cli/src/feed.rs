// crates/kpi-board-cli/src/feed.rs
// ============================================================================
// Module: Board Feed
// Description: Cached KPI snapshot for the board with API-to-file fallback.
// Purpose: Fetch records once per cache lifetime and mirror them locally.
// Dependencies: kpi-board-config, kpi-board-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`BoardFeed`] owns the board's view of the data. The first call to
//! [`BoardFeed::current`] loads a [`FeedSnapshot`]; later calls reuse it until
//! the cache lifetime elapses. [`BoardFeed::refresh`] reloads unconditionally.
//!
//! Online feeds issue a single `GET` against the retrieval endpoint. A
//! transport failure, non-2xx status, undecodable body, or empty list falls
//! back once to the bulk file. Snapshots hold at most `read_limit` records. Problems are carried as [`FeedNotice`] values on the
//! snapshot so the caller decides how to present them. Non-empty record sets
//! are mirrored into the local store when one is attached.
//!
//! Offline feeds read the local store only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use kpi_board_config::KpiBoardConfig;
use kpi_board_core::IngestError;
use kpi_board_core::KpiRecord;
use kpi_board_core::KpiStore;
use kpi_board_core::SharedKpiStore;
use kpi_board_core::normalize_rows;
use kpi_board_core::read_bulk_file;
use reqwest::Client;
use reqwest::redirect::Policy;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a retrieval endpoint response body.
pub const MAX_FEED_RESPONSE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Where a snapshot's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Retrieval endpoint.
    Api,
    /// Bulk file fallback.
    File,
    /// Local store (offline mode).
    Store,
}

/// User-visible condition raised while loading a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedNotice {
    /// The endpoint answered with an empty list.
    ApiEmpty,
    /// The endpoint call failed.
    ApiFailed(String),
    /// Records are being read from the bulk file instead.
    FileFallback(PathBuf),
    /// The bulk file does not exist.
    FileMissing(PathBuf),
    /// The bulk file failed to parse or normalize.
    FileInvalid(String),
    /// Writing records to the local store failed.
    MirrorFailed(String),
    /// Reading the local store failed.
    StoreFailed(String),
}

/// Records loaded by one feed cycle.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Loaded records.
    pub records: Vec<KpiRecord>,
    /// Origin of the records.
    pub source: FeedSource,
    /// Notices raised while loading.
    pub notices: Vec<FeedNotice>,
    /// Load time, for cache expiry.
    loaded_at: Instant,
}

impl FeedSnapshot {
    /// Creates a snapshot stamped with the current instant.
    fn new(records: Vec<KpiRecord>, source: FeedSource, notices: Vec<FeedNotice>) -> Self {
        Self {
            records,
            source,
            notices,
            loaded_at: Instant::now(),
        }
    }
}

/// Settings for an online feed.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Retrieval endpoint URL.
    pub api_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Snapshot lifetime.
    pub cache_ttl: Duration,
    /// Bulk file used as fallback.
    pub fallback_file: PathBuf,
    /// Maximum bulk file size.
    pub max_file_bytes: usize,
    /// Maximum records shown per snapshot.
    pub read_limit: usize,
}

impl FeedSettings {
    /// Derives feed settings from configuration and the process environment.
    #[must_use]
    pub fn from_config(config: &KpiBoardConfig) -> Self {
        Self {
            api_url: config.board.api_url(),
            request_timeout: Duration::from_millis(config.board.request_timeout_ms),
            cache_ttl: Duration::from_millis(config.board.cache_ttl_ms),
            fallback_file: config.source.file.clone(),
            max_file_bytes: config.source.max_file_bytes,
            read_limit: config.store.read_limit,
        }
    }
}

/// Upstream the feed loads from.
enum Upstream {
    /// Retrieval endpoint with bulk file fallback.
    Online {
        /// HTTP client with timeout and redirects disabled.
        client: Client,
        /// Endpoint and fallback settings.
        settings: FeedSettings,
        /// Store receiving fetched records.
        mirror: Option<SharedKpiStore>,
    },
    /// Local store only.
    Offline {
        /// Store to read.
        store: SharedKpiStore,
        /// Maximum records per read.
        read_limit: usize,
    },
}

// ============================================================================
// SECTION: Board Feed
// ============================================================================

/// Cached KPI snapshot source for the board.
pub struct BoardFeed {
    /// Upstream configuration.
    upstream: Upstream,
    /// Snapshot lifetime.
    cache_ttl: Duration,
    /// Current snapshot, if loaded.
    cached: Option<FeedSnapshot>,
}

impl BoardFeed {
    /// Creates an online feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Client`] when the HTTP client cannot be built.
    pub fn online(settings: FeedSettings, mirror: Option<SharedKpiStore>) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| FeedError::Client(err.to_string()))?;
        Ok(Self {
            cache_ttl: settings.cache_ttl,
            upstream: Upstream::Online {
                client,
                settings,
                mirror,
            },
            cached: None,
        })
    }

    /// Creates a feed that reads the local store only.
    #[must_use]
    pub const fn offline(store: SharedKpiStore, read_limit: usize, cache_ttl: Duration) -> Self {
        Self {
            upstream: Upstream::Offline {
                store,
                read_limit,
            },
            cache_ttl,
            cached: None,
        }
    }

    /// Returns the snapshot lifetime.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Returns true when no snapshot is loaded or the current one expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.cached.as_ref().is_none_or(|snapshot| snapshot.loaded_at.elapsed() >= self.cache_ttl)
    }

    /// Returns the cached snapshot, loading it first when absent or expired.
    pub async fn current(&mut self) -> &FeedSnapshot {
        let snapshot = match self.cached.take() {
            Some(snapshot) if snapshot.loaded_at.elapsed() < self.cache_ttl => snapshot,
            _ => self.load().await,
        };
        self.cached.insert(snapshot)
    }

    /// Reloads the snapshot regardless of cache state.
    pub async fn refresh(&mut self) -> &FeedSnapshot {
        let snapshot = self.load().await;
        self.cached.insert(snapshot)
    }

    /// Loads a fresh snapshot from the upstream.
    async fn load(&self) -> FeedSnapshot {
        match &self.upstream {
            Upstream::Online {
                client,
                settings,
                mirror,
            } => load_online(client, settings, mirror.as_ref()).await,
            Upstream::Offline {
                store,
                read_limit,
            } => load_offline(store, *read_limit),
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads from the endpoint, falling back to the bulk file once.
async fn load_online(
    client: &Client,
    settings: &FeedSettings,
    mirror: Option<&SharedKpiStore>,
) -> FeedSnapshot {
    let mut notices = Vec::new();
    match fetch_records(client, &settings.api_url).await {
        Ok(records) if !records.is_empty() => {
            mirror_records(mirror, &records, &mut notices);
            return FeedSnapshot::new(truncated(records, settings.read_limit), FeedSource::Api, notices);
        }
        Ok(_) => notices.push(FeedNotice::ApiEmpty),
        Err(err) => notices.push(FeedNotice::ApiFailed(err.to_string())),
    }
    notices.push(FeedNotice::FileFallback(settings.fallback_file.clone()));
    let records = match load_bulk_file(settings) {
        Ok(records) => {
            mirror_records(mirror, &records, &mut notices);
            truncated(records, settings.read_limit)
        }
        Err(IngestError::NotFound(_)) => {
            notices.push(FeedNotice::FileMissing(settings.fallback_file.clone()));
            Vec::new()
        }
        Err(err) => {
            notices.push(FeedNotice::FileInvalid(err.to_string()));
            Vec::new()
        }
    };
    FeedSnapshot::new(records, FeedSource::File, notices)
}

/// Keeps the first `limit` records.
fn truncated(mut records: Vec<KpiRecord>, limit: usize) -> Vec<KpiRecord> {
    records.truncate(limit);
    records
}

/// Reads the most recent records from the local store.
fn load_offline(store: &SharedKpiStore, read_limit: usize) -> FeedSnapshot {
    match run_blocking(|| store.recent(read_limit)) {
        Ok(rows) => FeedSnapshot::new(
            rows.into_iter().map(|row| row.record).collect(),
            FeedSource::Store,
            Vec::new(),
        ),
        Err(err) => {
            FeedSnapshot::new(Vec::new(), FeedSource::Store, vec![FeedNotice::StoreFailed(
                err.to_string(),
            )])
        }
    }
}

/// Issues one `GET` against the retrieval endpoint.
///
/// # Errors
///
/// Returns [`FeedError`] on transport failure, non-2xx status, oversized or
/// undecodable bodies.
pub async fn fetch_records(client: &Client, url: &str) -> Result<Vec<KpiRecord>, FeedError> {
    let response =
        client.get(url).send().await.map_err(|err| FeedError::Transport(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status {
            status: status.as_u16(),
        });
    }
    let body = read_response_body_with_limit(response, MAX_FEED_RESPONSE_BYTES).await?;
    serde_json::from_slice(&body).map_err(|err| FeedError::Decode(err.to_string()))
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_response_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| FeedError::Transport(err.to_string()))?
    {
        let next_total = body.len().saturating_add(chunk.len());
        if next_total > limit {
            return Err(FeedError::ResponseTooLarge {
                limit,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Reads and normalizes the bulk fallback file.
fn load_bulk_file(settings: &FeedSettings) -> Result<Vec<KpiRecord>, IngestError> {
    let rows = read_bulk_file(&settings.fallback_file, settings.max_file_bytes)?;
    Ok(normalize_rows(&rows)?.records)
}

/// Writes non-empty record sets to the mirror store.
fn mirror_records(
    mirror: Option<&SharedKpiStore>,
    records: &[KpiRecord],
    notices: &mut Vec<FeedNotice>,
) {
    let Some(store) = mirror else {
        return;
    };
    if records.is_empty() {
        return;
    }
    if let Err(err) = run_blocking(|| store.replace_all(records)) {
        notices.push(FeedNotice::MirrorFailed(err.to_string()));
    }
}

/// Runs a store call, shifting to a blocking context when available.
fn run_blocking<T>(operation: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(operation)
        }
        _ => operation(),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Board feed errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// HTTP client construction failed.
    #[error("http client error: {0}")]
    Client(String),
    /// Request failed before a response arrived.
    #[error("request failed: {0}")]
    Transport(String),
    /// Endpoint answered with a non-2xx status.
    #[error("http status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// Response body exceeded the size limit.
    #[error("response exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Maximum allowed bytes.
        limit: usize,
    },
    /// Response body was not a list of KPI records.
    #[error("invalid response body: {0}")]
    Decode(String),
}
