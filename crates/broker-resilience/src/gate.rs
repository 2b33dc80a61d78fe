//! Concurrency gate bounding how many remote calls are in flight.
//!
//! Each [`GatePermit`] stands for one call. Permits are handed out in FIFO
//! order by the underlying tokio semaphore, so no waiter starves.

use broker_core::{BrokerError, BrokerResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// Fixed-size gate shared by every job of a batch.
#[derive(Debug)]
pub struct ConcurrencyGate {
    label: String,
    limit: usize,
    slots: Arc<Semaphore>,
    in_flight: Arc<InFlight>,
}

impl ConcurrencyGate {
    /// Gate admitting `limit` calls at once; zero is treated as one
    #[must_use]
    pub fn new(label: impl Into<String>, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            label: label.into(),
            limit,
            slots: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Label used in logs
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Configured limit
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for a free slot
    ///
    /// # Errors
    /// Returns `Internal` if the gate has been closed
    pub async fn acquire(&self) -> BrokerResult<GatePermit> {
        if self.slots.available_permits() == 0 {
            debug!(gate = %self.label, limit = self.limit, "Waiting for a free slot");
        }

        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| BrokerError::internal("concurrency gate closed"))?;

        let now = self.in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            _slot: slot,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Calls currently holding a slot
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.in_flight.current.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    /// Snapshot for logging
    #[must_use]
    pub fn stats(&self) -> GateStats {
        GateStats {
            limit: self.limit,
            active_requests: self.active_requests(),
            peak_in_flight: self.peak_in_flight(),
        }
    }
}

/// One occupied slot; dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _slot: OwnedSemaphorePermit,
    in_flight: Arc<InFlight>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Point-in-time view of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStats {
    /// Configured limit
    pub limit: usize,
    /// Calls holding a slot
    pub active_requests: usize,
    /// High-water mark
    pub peak_in_flight: usize,
}
