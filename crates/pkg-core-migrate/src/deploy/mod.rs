//! Asynchronous deployment polling with bounded retries.
//!
//! Submitting a metadata package returns a job id; completion is observed
//! by polling. The poller owns the budgets: a fixed number of status
//! checks per submission, and a fixed number of submissions per request.
//! Failure messages are classified into retryable and non-retryable by
//! keyword, with the non-retryable keywords checked first so a message
//! matching both classes is treated as fatal.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::{DeployRequest, DeployStatus, DeploymentApi};
use crate::error::{MigrateError, Result};

/// Messages containing one of these never succeed on resubmission.
const FATAL_KEYWORDS: &[&str] = &["validation", "permission", "unauthorized", "limit"];

/// Messages containing one of these are assumed transient.
const RETRYABLE_KEYWORDS: &[&str] = &["timeout", "connection", "network"];

/// Polling and retry budgets.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between status checks.
    pub poll_interval: Duration,
    /// Status checks per submission before giving up.
    pub max_polls: usize,
    /// Submissions per request, counting the first.
    pub max_attempts: usize,
    /// Delay before resubmitting after a retryable failure.
    pub retry_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_polls: 20,
            max_attempts: 3,
            retry_delay: Duration::from_secs(30),
        }
    }
}

/// Classify a terminal failure message. Non-retryable keywords win over
/// retryable ones; unrecognized messages are non-retryable, so an unknown
/// failure mode is surfaced to the operator instead of retried blindly.
pub fn is_retryable_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    if FATAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    RETRYABLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Submits deployment jobs and polls them to a terminal state.
pub struct DeploymentPoller {
    api: Arc<dyn DeploymentApi>,
    config: PollerConfig,
}

impl DeploymentPoller {
    pub fn new(api: Arc<dyn DeploymentApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    /// Run a deployment to completion, resubmitting on retryable failures
    /// until the attempt budget is exhausted. Returns the job id of the
    /// successful attempt.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                info!(
                    package = %request.package_name,
                    attempt,
                    "resubmitting deployment"
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }

            let job_id = self.api.submit(request).await?;
            debug!(package = %request.package_name, job_id = %job_id, "deployment submitted");

            match self.poll_to_completion(&job_id).await {
                Ok(()) => {
                    info!(package = %request.package_name, job_id = %job_id, "deployment succeeded");
                    return Ok(job_id);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        package = %request.package_name,
                        job_id = %job_id,
                        error = %e,
                        "deployment failed, will retry"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(MigrateError::Deployment {
            message: "deployment attempts exhausted".to_string(),
            retryable: true,
        }))
    }

    /// Poll one job until it reaches a terminal state or the poll budget
    /// runs out. The first check happens immediately after submission;
    /// short jobs finish without waiting a full interval.
    async fn poll_to_completion(&self, job_id: &str) -> Result<()> {
        for poll in 1..=self.config.max_polls {
            if poll > 1 {
                tokio::time::sleep(self.config.poll_interval).await;
            }

            // Transport errors consume the poll budget rather than the
            // attempt budget: the job may still be running.
            let status = match self.api.check_status(job_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(job_id = %job_id, poll, error = %e, "status check failed");
                    continue;
                }
            };
            debug!(job_id = %job_id, poll, status = ?status, "deployment status");

            match status {
                DeployStatus::Succeeded => return Ok(()),
                DeployStatus::Failed { message } => {
                    let retryable = is_retryable_failure(&message);
                    return Err(MigrateError::Deployment { message, retryable });
                }
                DeployStatus::Canceled | DeployStatus::Canceling => {
                    return Err(MigrateError::Deployment {
                        message: format!("deployment {job_id} was canceled"),
                        retryable: false,
                    });
                }
                DeployStatus::Pending | DeployStatus::InProgress => {}
            }
        }

        Err(MigrateError::DeploymentTimeout {
            polls: self.config.max_polls,
        })
    }
}
