/// Bounded worker pool for downloads.
///
/// Each submitted job runs on its own tokio task once a semaphore permit is
/// free, so long fetch-and-merge runs never occupy the HTTP acceptor. The
/// outcome comes back over a oneshot channel. Dropping the receiver (for
/// example when the client disconnects) does not cancel the job.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{oneshot, Mutex, Semaphore};
use tracing::{info, warn};

use crate::errors::{VidharborError, VidharborResult};

/// State of a tracked download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub job_id: String,
    pub label: String,
    pub status: JobState,
    pub enqueued_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub finished_at: Option<chrono::DateTime<Utc>>,
}

/// Handle to a submitted job.
pub struct JobHandle<T> {
    pub job_id: String,
    rx: oneshot::Receiver<VidharborResult<T>>,
}

impl<T> JobHandle<T> {
    /// Wait for the job to finish.
    pub async fn wait(self) -> VidharborResult<T> {
        self.rx.await.unwrap_or_else(|_| {
            Err(VidharborError::DownloadFailed {
                message: "download worker stopped unexpectedly".to_string(),
            })
        })
    }
}

pub struct DownloadQueue {
    semaphore: Arc<Semaphore>,
    jobs: Arc<Mutex<HashMap<String, TrackedJob>>>,
    max_concurrent: usize,
}

impl DownloadQueue {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            max_concurrent,
        }
    }

    /// Queue `job` and return a handle to its result.
    pub async fn submit<F, T>(&self, label: impl Into<String>, job: F) -> JobHandle<T>
    where
        F: Future<Output = VidharborResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let job_id = uuid::Uuid::new_v4().to_string();
        let label = label.into();

        self.jobs.lock().await.insert(
            job_id.clone(),
            TrackedJob {
                job_id: job_id.clone(),
                label: label.clone(),
                status: JobState::Queued,
                enqueued_at: Utc::now(),
                started_at: None,
                finished_at: None,
            },
        );
        info!("Job {} queued ({})", job_id, label);

        let (tx, rx) = oneshot::channel();
        let semaphore = self.semaphore.clone();
        let jobs = self.jobs.clone();
        let id = job_id.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    warn!("Semaphore closed for job {}", id);
                    Self::set_state(&jobs, &id, JobState::Failed).await;
                    return;
                }
            };

            Self::set_state(&jobs, &id, JobState::Running).await;
            info!("Job {} acquired slot, now running", id);

            let result = job.await;
            match &result {
                Ok(_) => {
                    Self::set_state(&jobs, &id, JobState::Done).await;
                    info!("Job {} completed, slot released", id);
                }
                Err(e) => {
                    Self::set_state(&jobs, &id, JobState::Failed).await;
                    warn!("Job {} failed: {}", id, e);
                }
            }

            if tx.send(result).is_err() {
                info!("Job {} finished after its requester went away", id);
            }
        });

        JobHandle { job_id, rx }
    }

    async fn set_state(jobs: &Mutex<HashMap<String, TrackedJob>>, job_id: &str, state: JobState) {
        if let Some(job) = jobs.lock().await.get_mut(job_id) {
            match state {
                JobState::Running => job.started_at = Some(Utc::now()),
                JobState::Done | JobState::Failed => job.finished_at = Some(Utc::now()),
                JobState::Queued => {}
            }
            job.status = state;
        }
    }

    pub async fn get_status(&self, job_id: &str) -> Option<TrackedJob> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    pub async fn stats(&self) -> QueueStats {
        let jobs = self.jobs.lock().await;
        let count = |state: JobState| jobs.values().filter(|j| j.status == state).count();
        QueueStats {
            max_concurrent: self.max_concurrent,
            running: count(JobState::Running),
            queued: count(JobState::Queued),
            completed: count(JobState::Done),
            failed: count(JobState::Failed),
            total_tracked: jobs.len(),
        }
    }

    /// Forget jobs that finished more than `max_age_secs` ago.
    pub async fn cleanup_old(&self, max_age_secs: i64) {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_secs);
        self.jobs.lock().await.retain(|_, j| match j.finished_at {
            Some(finished_at) => finished_at > cutoff,
            None => true,
        });
    }
}

/// Queue statistics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    pub max_concurrent: usize,
    pub running: usize,
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_tracked: usize,
}
