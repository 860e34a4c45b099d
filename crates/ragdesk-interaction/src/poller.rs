//! Upload task status polling.

use std::future::Future;
use std::sync::Arc;

use ragdesk_core::backend::{ChatBackend, StatusQuery};
use ragdesk_core::error::{RagDeskError, Result};
use ragdesk_core::upload::UploadStatusInfo;
use tokio::time::Instant;

use crate::retry::BackoffPolicy;

/// Polls `GET /upload/status/{task_id}` until the task settles.
///
/// - The first query goes out immediately; every non-terminal response or
///   transient failure is followed by the next backoff wait
/// - A 404 is a terminal `{failed, "not found"}` result, not an error
/// - Each delivered status reaches the callback exactly once, in order
#[derive(Clone)]
pub struct TaskPoller {
    backend: Arc<dyn ChatBackend>,
    policy: BackoffPolicy,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn ChatBackend>, policy: BackoffPolicy) -> Self {
        Self { backend, policy }
    }

    /// Polls until a terminal status and returns it.
    ///
    /// # Errors
    ///
    /// - `PollTimeout` after the policy timeout; a synthesized `{failed,
    ///   "timeout"}` status is delivered first
    /// - `PollNetwork` once transient failures exceed the consecutive limit
    /// - Any non-transient backend error as is
    pub async fn poll<F, Fut>(&self, task_id: &str, mut on_update: F) -> Result<UploadStatusInfo>
    where
        F: FnMut(UploadStatusInfo) -> Fut,
        Fut: Future<Output = ()>,
    {
        let started = Instant::now();
        let mut schedule = self.policy.schedule();
        let mut consecutive_failures = 0u32;
        let mut last_progress = 0u8;

        tracing::info!("Polling upload task {}", task_id);

        loop {
            if let Some(e) = self
                .check_timeout(task_id, started, last_progress, &mut on_update)
                .await
            {
                return Err(e);
            }

            match self.backend.upload_status(task_id).await {
                Ok(StatusQuery::Found(status)) => {
                    consecutive_failures = 0;
                    if let Some(progress) = status.progress {
                        last_progress = progress.min(100);
                    }
                    tracing::debug!(
                        task_id,
                        status = ?status.status,
                        progress = status.progress,
                        "Upload task status"
                    );
                    on_update(status.clone()).await;
                    if status.is_terminal() {
                        tracing::info!("Upload task {} finished: {:?}", task_id, status.status);
                        return Ok(status);
                    }
                }
                Ok(StatusQuery::NotFound) => return Ok(self.not_found(task_id, &mut on_update).await),
                Err(e) if e.is_http_not_found() => {
                    return Ok(self.not_found(task_id, &mut on_update).await);
                }
                Err(e) if e.is_transient() => {
                    consecutive_failures += 1;
                    if consecutive_failures > self.policy.max_consecutive_failures {
                        tracing::error!(
                            "Giving up on upload task {} after {} consecutive failures: {}",
                            task_id,
                            consecutive_failures,
                            e
                        );
                        return Err(RagDeskError::PollNetwork {
                            task_id: task_id.to_string(),
                            attempts: consecutive_failures,
                            message: e.to_string(),
                        });
                    }
                    tracing::warn!(
                        "Status query for {} failed ({}/{}): {}",
                        task_id,
                        consecutive_failures,
                        self.policy.max_consecutive_failures,
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            // A slow round trip must not add a full wait past the deadline
            if let Some(e) = self
                .check_timeout(task_id, started, last_progress, &mut on_update)
                .await
            {
                return Err(e);
            }
            tokio::time::sleep(schedule.next_delay()).await;
        }
    }

    /// Delivers the synthesized timeout status once the deadline has passed.
    async fn check_timeout<F, Fut>(
        &self,
        task_id: &str,
        started: Instant,
        last_progress: u8,
        on_update: &mut F,
    ) -> Option<RagDeskError>
    where
        F: FnMut(UploadStatusInfo) -> Fut,
        Fut: Future<Output = ()>,
    {
        let elapsed = started.elapsed();
        if elapsed < self.policy.timeout {
            return None;
        }
        let mut status = UploadStatusInfo::timeout(last_progress);
        status.task_id = Some(task_id.to_string());
        tracing::warn!("Upload task {} timed out after {:?}", task_id, elapsed);
        on_update(status).await;
        Some(RagDeskError::PollTimeout {
            task_id: task_id.to_string(),
            elapsed_secs: elapsed.as_secs(),
        })
    }

    async fn not_found<F, Fut>(&self, task_id: &str, on_update: &mut F) -> UploadStatusInfo
    where
        F: FnMut(UploadStatusInfo) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut status = UploadStatusInfo::not_found();
        status.task_id = Some(task_id.to_string());
        tracing::warn!("Upload task {} is unknown to the backend", task_id);
        on_update(status.clone()).await;
        status
    }
}
