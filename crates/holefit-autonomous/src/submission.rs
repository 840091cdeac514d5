//! Submission of poses to the remote service.
//!
//! Submissions run on their own task, one at a time, so a slow or failing
//! endpoint never holds up solving workers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use holefit_config::SubmissionConfig;
use holefit_core::{Pose, ProblemId};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{OrchestratorError, Result};
use crate::puzzle::{SubmissionOutcome, SubmissionRecord};

/// What the service reports for an accepted pose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Service-side identifier, when the service returns one.
    pub id: Option<String>,
    /// Dislikes as scored by the service, when it reports them.
    pub dislikes: Option<u64>,
}

/// Remote endpoint that accepts poses.
///
/// Implementations classify failures as `SubmissionTransient` (retried) or
/// `SubmissionPermanent` (not retried). Submitting the same pose for the
/// same puzzle twice must be harmless.
pub trait Submitter: Send + Sync + 'static {
    fn submit(
        &self,
        puzzle: ProblemId,
        pose: &Pose,
    ) -> impl Future<Output = Result<SubmissionReceipt>> + Send;
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_millis),
            max_backoff: Duration::from_millis(config.max_backoff_millis),
        }
    }

    /// Wait before retry number `retry` (1-based): `initial * 2^(retry-1)`,
    /// capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Submits with retries, returning the record of the final outcome.
    ///
    /// Stops early without a further attempt once `cancel` is set.
    pub async fn submit<S: Submitter>(
        &self,
        submitter: &S,
        puzzle: ProblemId,
        pose: &Pose,
        cancel: &AtomicBool,
    ) -> SubmissionRecord {
        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            match submitter.submit(puzzle, pose).await {
                Ok(receipt) => {
                    info!(
                        event = "submission_accepted",
                        puzzle = %puzzle,
                        attempts = attempts,
                        id = ?receipt.id,
                    );
                    break SubmissionOutcome::Accepted {
                        dislikes: receipt.dislikes,
                    };
                }
                Err(err) if err.is_transient() => {
                    if attempts >= self.max_attempts || cancel.load(Ordering::Relaxed) {
                        warn!(
                            event = "submission_gave_up",
                            puzzle = %puzzle,
                            attempts = attempts,
                            error = %err,
                        );
                        break SubmissionOutcome::PendingRetry {
                            reason: err.to_string(),
                        };
                    }
                    let wait = self.backoff(attempts);
                    debug!(
                        event = "submission_retry",
                        puzzle = %puzzle,
                        attempt = attempts,
                        backoff_ms = wait.as_millis() as u64,
                        error = %err,
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => {
                    error!(
                        event = "submission_rejected",
                        puzzle = %puzzle,
                        attempts = attempts,
                        error = %err,
                    );
                    break SubmissionOutcome::Rejected {
                        reason: err.to_string(),
                    };
                }
            }
        };
        SubmissionRecord {
            puzzle,
            pose: pose.clone(),
            attempts,
            outcome,
            at: Utc::now(),
        }
    }
}

/// A pose waiting to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionJob {
    pub puzzle: ProblemId,
    pub pose: Pose,
}

/// Background task draining submission jobs in order.
#[derive(Debug)]
pub struct SubmissionQueue {
    jobs: mpsc::UnboundedSender<SubmissionJob>,
    worker: JoinHandle<()>,
}

impl SubmissionQueue {
    /// Spawns the queue task. Records of finished submissions arrive on the
    /// returned receiver.
    pub fn spawn<S: Submitter>(
        submitter: Arc<S>,
        policy: RetryPolicy,
        cancel: Arc<AtomicBool>,
    ) -> (Self, mpsc::UnboundedReceiver<SubmissionRecord>) {
        let (jobs, mut incoming) = mpsc::unbounded_channel::<SubmissionJob>();
        let (reports, records) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            // An identical resubmission reports the earlier acceptance.
            let mut accepted: HashMap<ProblemId, SubmissionRecord> = HashMap::new();
            while let Some(job) = incoming.recv().await {
                let record = match accepted.get(&job.puzzle) {
                    Some(previous) if previous.pose == job.pose => {
                        debug!(event = "submission_skipped", puzzle = %job.puzzle);
                        previous.clone()
                    }
                    _ => {
                        policy
                            .submit(submitter.as_ref(), job.puzzle, &job.pose, &cancel)
                            .await
                    }
                };
                if record.is_accepted() {
                    accepted.insert(job.puzzle, record.clone());
                }
                if reports.send(record).is_err() {
                    break;
                }
            }
        });

        (Self { jobs, worker }, records)
    }

    pub fn enqueue(&self, job: SubmissionJob) -> Result<()> {
        self.jobs
            .send(job)
            .map_err(|_| OrchestratorError::Worker("submission queue closed".to_string()))
    }

    /// Stops accepting jobs and waits for queued ones to finish.
    pub async fn close(self) -> Result<()> {
        drop(self.jobs);
        self.worker
            .await
            .map_err(|e| OrchestratorError::Worker(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

/// JSON-over-HTTP submitter.
///
/// POSTs the pose to `{endpoint}/api/problems/{id}/solutions` with a bearer
/// token. Network errors, 5xx and 429 are transient; any other non-success
/// status is a permanent rejection.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn url_for(&self, puzzle: ProblemId) -> String {
        format!("{}/api/problems/{}/solutions", self.endpoint, puzzle.0)
    }
}

/// Maps a non-success HTTP status to the error class it belongs to.
pub fn classify_status(status: u16, body: &str) -> OrchestratorError {
    let message = format!("HTTP {}: {}", status, body.trim());
    if status == 429 || status >= 500 {
        OrchestratorError::SubmissionTransient(message)
    } else {
        OrchestratorError::SubmissionPermanent(message)
    }
}

impl Submitter for HttpSubmitter {
    async fn submit(&self, puzzle: ProblemId, pose: &Pose) -> Result<SubmissionReceipt> {
        let response = self
            .client
            .post(self.url_for(puzzle))
            .bearer_auth(&self.token)
            .json(pose)
            .send()
            .await
            .map_err(|e| OrchestratorError::SubmissionTransient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }
        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| OrchestratorError::SubmissionTransient(e.to_string()))?;
        Ok(SubmissionReceipt {
            id: body.id,
            dislikes: None,
        })
    }
}

#[cfg(test)]
mod tests;
