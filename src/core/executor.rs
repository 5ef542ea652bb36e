//! Enrichment front end: alerts in, enriched alerts out.
//!
//! The serial path sends the whole batch to the engine in one call. The
//! parallel path sends one single-request batch per alert on a worker pool
//! bounded by a semaphore; workers report back over a channel.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::domain::{Alert, Payload};

use super::engine::{BatchFailure, WorkflowEngine, WorkflowRequest};
use super::matcher::RuleMatcher;

/// Default number of in-flight engine calls on the parallel path
pub const DEFAULT_MAX_PARALLEL: usize = 5;

/// Enrichment errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("enrichment failed: {0}")]
    Engine(#[from] BatchFailure),

    #[error("enrichment of alert {index} failed: {source}")]
    Alert {
        index: usize,
        #[source]
        source: BatchFailure,
    },

    #[error("enrichment worker pool failed: {0}")]
    Pool(String),
}

/// Enriches batches of alerts
#[async_trait]
pub trait Executor: Send + Sync {
    async fn enrich(&self, alerts: Vec<Alert>) -> Result<Vec<Alert>, ExecutorError>;
}

/// Matches alerts to workflows and runs them through the engine
#[derive(Clone)]
pub struct SimpleExecutor {
    matcher: Arc<dyn RuleMatcher>,
    engine: Arc<dyn WorkflowEngine>,
    max_parallel: usize,
}

impl SimpleExecutor {
    pub fn new(matcher: Arc<dyn RuleMatcher>, engine: Arc<dyn WorkflowEngine>) -> Self {
        Self {
            matcher,
            engine,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Set the concurrency ceiling of the parallel path, clamped to
    /// `1..=Semaphore::MAX_PERMITS`
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// One request per alert, seeded with the alert's own fields
    pub fn build_requests(&self, alerts: &[Alert]) -> Vec<WorkflowRequest> {
        alerts
            .iter()
            .map(|alert| WorkflowRequest::new(self.matcher.match_alert(alert), alert.to_payload()))
            .collect()
    }

    /// Enrich alerts with at most `max_parallel` engine calls in flight
    ///
    /// All or nothing: if any alert fails, the whole call fails and results
    /// already produced are discarded. Results come back in input order.
    pub async fn enrich_parallel(&self, alerts: Vec<Alert>) -> Result<Vec<Alert>, ExecutorError> {
        let batch_id = Uuid::new_v4();
        let span = info_span!("enrich_parallel", %batch_id, alerts = alerts.len());

        self.dispatch_parallel(alerts).instrument(span).await
    }

    async fn dispatch_parallel(&self, alerts: Vec<Alert>) -> Result<Vec<Alert>, ExecutorError> {
        let requests = self.build_requests(&alerts);
        let total = requests.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let (tx, mut rx) = mpsc::channel::<(usize, Result<Vec<Payload>, BatchFailure>)>(total);

        for (index, request) in requests.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| ExecutorError::Pool(e.to_string()))?;

            let engine = Arc::clone(&self.engine);
            let tx = tx.clone();

            tokio::spawn(
                async move {
                    let result = engine.run(vec![request]).await;
                    drop(permit);
                    // The collector outlives every sender, so this only fails if it panicked.
                    let _ = tx.send((index, result)).await;
                }
                .instrument(info_span!("enrich_worker", index)),
            );
        }
        drop(tx);

        let mut results: Vec<Option<Alert>> = vec![None; total];
        let mut first_error: Option<ExecutorError> = None;

        while let Some((index, result)) = rx.recv().await {
            match result {
                Ok(mut payloads) => match payloads.pop() {
                    Some(payload) => results[index] = Some(Alert::from(payload)),
                    None => {
                        first_error.get_or_insert_with(|| {
                            ExecutorError::Pool(format!("no result for alert {index}"))
                        });
                    }
                },
                Err(failure) => {
                    if first_error.is_none() {
                        error!(index, error = %failure, "Alert enrichment failed");
                        first_error = Some(ExecutorError::Alert {
                            index,
                            source: failure,
                        });
                    } else {
                        debug!(index, error = %failure, "Further alert failure");
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let enriched = results
            .into_iter()
            .enumerate()
            .map(|(index, alert)| {
                alert.ok_or_else(|| {
                    ExecutorError::Pool(format!("worker for alert {index} exited without reporting"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = enriched.len(), "Alerts enriched");
        Ok(enriched)
    }
}

#[async_trait]
impl Executor for SimpleExecutor {
    async fn enrich(&self, alerts: Vec<Alert>) -> Result<Vec<Alert>, ExecutorError> {
        let batch_id = Uuid::new_v4();
        let span = info_span!("enrich", %batch_id, alerts = alerts.len());

        async move {
            let requests = self.build_requests(&alerts);
            debug!(?requests, "Built workflow requests");

            let results = self.engine.run(requests).await?;

            info!(count = results.len(), "Alerts enriched");
            Ok(results.into_iter().map(Alert::from).collect())
        }
        .instrument(span)
        .await
    }
}

/// Executor that always takes the parallel path
#[derive(Clone)]
pub struct ParallelExecutor {
    inner: SimpleExecutor,
}

impl ParallelExecutor {
    pub fn new(inner: SimpleExecutor) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Executor for ParallelExecutor {
    async fn enrich(&self, alerts: Vec<Alert>) -> Result<Vec<Alert>, ExecutorError> {
        self.inner.enrich_parallel(alerts).await
    }
}
