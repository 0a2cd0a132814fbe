#![allow(clippy::unwrap_used, dead_code)]

use art_studio_bot::database::connection::DatabaseManager;
use art_studio_bot::services::notifier::{MessageSender, OutgoingMessage, SendError};
use art_studio_bot::services::reminder::{JobFn, JobQueue, QueueError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::{tempdir, TempDir};
use teloxide::{ApiError, RequestError};
use tokio::sync::Mutex;

pub async fn setup_test_db() -> (DatabaseManager, TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.to_string_lossy());

    let db = DatabaseManager::new(&db_url).await.unwrap();
    db.run_migrations().await.unwrap();
    (db, dir)
}

/// Job queue that only runs a job when the test fires it.
#[derive(Default)]
pub struct ManualQueue {
    jobs: Mutex<HashMap<String, (DateTime<Utc>, JobFn)>>,
}

impl ManualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run_at(&self, job_id: &str) -> Option<DateTime<Utc>> {
        self.jobs.lock().await.get(job_id).map(|(at, _)| *at)
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Removes the job and runs it, the way a fired one-shot job does. Returns `false` if absent.
    pub async fn fire(&self, job_id: &str) -> bool {
        let job = self.jobs.lock().await.remove(job_id);
        match job {
            Some((_, job)) => {
                job().await;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl JobQueue for ManualQueue {
    async fn schedule(&self, job_id: &str, run_at: DateTime<Utc>, job: JobFn) -> Result<bool, QueueError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(job_id) {
            return Ok(false);
        }
        jobs.insert(job_id.to_string(), (run_at, job));
        Ok(true)
    }

    async fn cancel(&self, job_id: &str) -> Result<bool, QueueError> {
        Ok(self.jobs.lock().await.remove(job_id).is_some())
    }

    async fn is_pending(&self, job_id: &str) -> bool {
        self.jobs.lock().await.contains_key(job_id)
    }

    async fn pending_jobs(&self) -> Vec<String> {
        self.jobs.lock().await.keys().cloned().collect()
    }
}

/// Sender that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(i64, OutgoingMessage)>>,
    failing: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<(i64, OutgoingMessage)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), SendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SendError::Telegram(RequestError::Api(ApiError::BotBlocked)));
        }
        self.sent.lock().await.push((chat_id, message));
        Ok(())
    }
}
