use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Boxed future run when a job fires.
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
/// Deferred job body; called at most once.
pub type JobFn = Box<dyn FnOnce() -> JobFuture + Send>;

/// Jobs are never scheduled closer than this, so a past run time still fires promptly.
const MIN_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// One-shot jobs keyed by a caller-chosen id. At most one job per id is pending.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queues `job` to run at `run_at`. Returns `false`, without queueing, when a job with the
    /// same id is already pending.
    async fn schedule(&self, job_id: &str, run_at: DateTime<Utc>, job: JobFn) -> Result<bool, QueueError>;

    /// Drops the pending job with this id. Returns whether one existed.
    async fn cancel(&self, job_id: &str) -> Result<bool, QueueError>;

    async fn is_pending(&self, job_id: &str) -> bool;

    async fn pending_jobs(&self) -> Vec<String>;
}

/// `JobQueue` on top of tokio-cron-scheduler one-shot jobs.
pub struct CronJobQueue {
    scheduler: JobScheduler,
    jobs: Arc<Mutex<HashMap<String, Uuid>>>,
}

impl CronJobQueue {
    pub async fn new() -> Result<Self, QueueError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| QueueError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn start(&self) -> Result<(), QueueError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| QueueError::Scheduler(e.to_string()))
    }

    pub async fn shutdown(&self) -> Result<(), QueueError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| QueueError::Scheduler(e.to_string()))
    }
}

#[async_trait]
impl JobQueue for CronJobQueue {
    async fn schedule(&self, job_id: &str, run_at: DateTime<Utc>, job: JobFn) -> Result<bool, QueueError> {
        // Held until the uuid is registered so a fast-firing job cannot miss its own entry.
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(job_id) {
            return Ok(false);
        }

        let delay = (run_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
            .max(MIN_DELAY);

        let slot = Arc::new(std::sync::Mutex::new(Some(job)));
        let registry = Arc::clone(&self.jobs);
        let key = job_id.to_string();

        let cron_job = Job::new_one_shot_async(delay, move |uuid, _l| {
            let slot = Arc::clone(&slot);
            let registry = Arc::clone(&registry);
            let key = key.clone();
            Box::pin(async move {
                {
                    let mut jobs = registry.lock().await;
                    if jobs.get(&key) == Some(&uuid) {
                        jobs.remove(&key);
                    }
                }
                let job = slot.lock().ok().and_then(|mut body| body.take());
                if let Some(job) = job {
                    job().await;
                }
            })
        })
        .map_err(|e| QueueError::Scheduler(e.to_string()))?;

        let uuid = self
            .scheduler
            .add(cron_job)
            .await
            .map_err(|e| QueueError::Scheduler(e.to_string()))?;
        jobs.insert(job_id.to_string(), uuid);

        tracing::debug!("Queued job {} ({}) to run in {}s", job_id, uuid, delay.as_secs());
        Ok(true)
    }

    async fn cancel(&self, job_id: &str) -> Result<bool, QueueError> {
        let uuid = self.jobs.lock().await.remove(job_id);
        match uuid {
            Some(uuid) => {
                self.scheduler
                    .remove(&uuid)
                    .await
                    .map_err(|e| QueueError::Scheduler(e.to_string()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn is_pending(&self, job_id: &str) -> bool {
        self.jobs.lock().await.contains_key(job_id)
    }

    async fn pending_jobs(&self) -> Vec<String> {
        self.jobs.lock().await.keys().cloned().collect()
    }
}
