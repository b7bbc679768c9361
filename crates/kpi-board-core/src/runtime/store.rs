// crates/kpi-board-core/src/runtime/store.rs
// ============================================================================
// Module: KPI Board In-Memory Store
// Description: In-memory KPI store and shared store wrapper.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryKpiStore`] implements [`KpiStore`] for tests and offline use.
//! [`SharedKpiStore`] erases the backend behind an `Arc` so server and CLI
//! state can hold any implementation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::core::IngestedAt;
use crate::core::KpiRecord;
use crate::core::StoredKpi;
use crate::interfaces::KpiStore;
use crate::interfaces::StoreError;
use crate::interfaces::validate_batch;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// One stored generation.
#[derive(Debug, Default)]
struct Generation {
    /// Records in insertion order.
    records: Vec<KpiRecord>,
    /// Timestamp shared by every record.
    ingested_at: Option<IngestedAt>,
}

/// In-memory KPI store for tests and offline use.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKpiStore {
    /// Current generation protected by a mutex.
    generation: Arc<Mutex<Generation>>,
}

impl InMemoryKpiStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KpiStore for InMemoryKpiStore {
    fn replace_all(&self, records: &[KpiRecord]) -> Result<IngestedAt, StoreError> {
        validate_batch(records)?;
        let ingested_at = IngestedAt::now();
        let mut guard = self
            .generation
            .lock()
            .map_err(|_| StoreError::Store("kpi store mutex poisoned".to_string()))?;
        *guard = Generation {
            records: records.to_vec(),
            ingested_at: Some(ingested_at),
        };
        drop(guard);
        Ok(ingested_at)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredKpi>, StoreError> {
        let guard = self
            .generation
            .lock()
            .map_err(|_| StoreError::Store("kpi store mutex poisoned".to_string()))?;
        let Some(ingested_at) = guard.ingested_at else {
            return Ok(Vec::new());
        };
        Ok(guard
            .records
            .iter()
            .take(limit)
            .map(|record| StoredKpi {
                record: record.clone(),
                ingested_at,
            })
            .collect())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared KPI store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedKpiStore {
    /// Inner store implementation.
    inner: Arc<dyn KpiStore + Send + Sync>,
}

impl SharedKpiStore {
    /// Wraps a KPI store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl KpiStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn KpiStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl KpiStore for SharedKpiStore {
    fn replace_all(&self, records: &[KpiRecord]) -> Result<IngestedAt, StoreError> {
        self.inner.replace_all(records)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredKpi>, StoreError> {
        self.inner.recent(limit)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}
