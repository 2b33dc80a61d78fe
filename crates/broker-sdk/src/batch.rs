//! Bounded-concurrency batch execution.
//!
//! Every job gets a pre-allocated output slot keyed by its input index, so
//! completion order never leaks into the result order.

use broker_core::{BrokerError, BrokerResult};
use broker_resilience::ConcurrencyGate;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob<I> {
    /// Output slot for this job
    pub index: usize,
    /// Job input
    pub input: I,
}

/// Index-aligned results of a batch.
#[derive(Debug)]
pub struct BatchReport<T> {
    results: Vec<BrokerResult<T>>,
}

impl<T> BatchReport<T> {
    /// Number of slots
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// `true` for an empty batch
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of failed slots
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }

    /// Number of successful slots
    pub fn succeeded(&self) -> usize {
        self.len() - self.failed()
    }

    /// `true` when every slot succeeded
    pub fn is_all_ok(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }

    /// Per-slot results
    pub fn results(&self) -> &[BrokerResult<T>] {
        &self.results
    }

    /// Consume into per-slot results
    pub fn into_results(self) -> Vec<BrokerResult<T>> {
        self.results
    }

    /// All values, or `BatchPartialFailure` if any slot failed
    ///
    /// # Errors
    /// Returns `BatchPartialFailure` with the failure count
    pub fn into_all_ok(self) -> BrokerResult<Vec<T>> {
        let total = self.len();
        let failed = self.failed();
        if failed > 0 {
            return Err(BrokerError::BatchPartialFailure { failed, total });
        }
        self.results.into_iter().collect()
    }
}

/// Runs batch jobs through a fixed-size concurrency gate.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    gate: Arc<ConcurrencyGate>,
}

impl BatchExecutor {
    /// Executor allowing at most `limit` jobs in flight
    pub fn new(limit: usize) -> Self {
        Self::with_gate(Arc::new(ConcurrencyGate::new("batch", limit)))
    }

    /// Executor sharing an existing gate
    pub fn with_gate(gate: Arc<ConcurrencyGate>) -> Self {
        Self { gate }
    }

    /// The concurrency gate
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run `job` over every input
    pub async fn run<I, T, F, Fut>(&self, inputs: Vec<I>, job: F) -> BatchReport<T>
    where
        F: Fn(BatchJob<I>) -> Fut,
        Fut: Future<Output = BrokerResult<T>>,
    {
        self.run_cancellable(inputs, &CancellationToken::new(), job)
            .await
    }

    /// Run `job` over every input; once `cancel` fires, pending and in-flight
    /// slots resolve to `Cancelled`
    pub async fn run_cancellable<I, T, F, Fut>(
        &self,
        inputs: Vec<I>,
        cancel: &CancellationToken,
        job: F,
    ) -> BatchReport<T>
    where
        F: Fn(BatchJob<I>) -> Fut,
        Fut: Future<Output = BrokerResult<T>>,
    {
        let total = inputs.len();
        let mut slots: Vec<Option<BrokerResult<T>>> = std::iter::repeat_with(|| None).take(total).collect();

        debug!(
            total,
            limit = self.gate.limit(),
            "Starting batch"
        );

        let job = &job;
        let mut pending: FuturesUnordered<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| async move {
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(BrokerError::Cancelled),
                    result = self.run_slot(BatchJob { index, input }, job) => result,
                };
                (index, result)
            })
            .collect();

        while let Some((index, result)) = pending.next().await {
            if let Err(e) = &result {
                warn!(slot = index, error = %e, "Batch job failed");
            }
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }

        let results: Vec<BrokerResult<T>> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(BrokerError::internal("batch slot never resolved"))))
            .collect();
        let report = BatchReport { results };

        let gate = self.gate.stats();
        info!(
            total,
            succeeded = report.succeeded(),
            failed = report.failed(),
            limit = gate.limit,
            peak_in_flight = gate.peak_in_flight,
            "Batch finished"
        );
        report
    }

    async fn run_slot<I, T, F, Fut>(&self, job_input: BatchJob<I>, job: &F) -> BrokerResult<T>
    where
        F: Fn(BatchJob<I>) -> Fut,
        Fut: Future<Output = BrokerResult<T>>,
    {
        let _permit = self.gate.acquire().await?;
        job(job_input).await
    }
}
