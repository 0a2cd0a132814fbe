//! # Reminder scheduling
//!
//! Payment and sign-up reminders share one engine, [`ReminderScheduler`], parameterised by a
//! [`ReminderPolicy`] that knows the key prefix, the attempt limit, when the next attempt is due
//! and what to say. Records live in a [`ReminderStore`]; timed callbacks live in a [`JobQueue`]
//! whose job ids equal the record keys, so each user has at most one pending job per kind.

pub mod payment;
pub mod queue;
pub mod record;
pub mod schedule;
pub mod signup;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::services::notifier::{MessageSender, OutgoingMessage};
use crate::utils::logging::{log_reminder_event, log_store_error};

pub use payment::{PaymentPolicy, PaymentReminders};
pub use queue::{CronJobQueue, JobFn, JobFuture, JobQueue, QueueError};
pub use record::{record_key, RecordError, ReminderRecord};
pub use signup::{SignupPolicy, SignupReminders};
pub use store::{MemoryReminderStore, RedisReminderStore, ReminderStore, StoreError};

/// Safety-net expiry on every stored record, counted from the record's next run.
pub const RECORD_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Store expiry for a record whose next attempt is due at `next_run`.
///
/// A record must outlive its own job, so the safety net starts when the job is due.
pub fn record_ttl(next_run: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    RECORD_TTL + (next_run - now).to_std().unwrap_or(Duration::ZERO)
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// What to do with a record the next time it is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Fire at `at`, sending the variant for `count`.
    Run { count: u32, at: DateTime<Utc> },
    /// Nothing left to send; drop the record.
    Expire,
}

#[async_trait]
pub trait ReminderPolicy: Send + Sync + 'static {
    /// Store key prefix, e.g. `payment:pending:`.
    fn prefix(&self) -> &'static str;

    /// Number of messages sent before the record is dropped.
    fn max_count(&self) -> u32;

    /// Rejects records that decode but lack what this kind needs.
    fn validate(&self, _record: &ReminderRecord) -> Result<(), RecordError> {
        Ok(())
    }

    async fn plan(&self, record: &ReminderRecord, now: DateTime<Utc>) -> Plan;

    /// Message for attempt `count`. `None` means the subject is gone and the record should go too.
    async fn message(&self, record: &ReminderRecord, count: u32) -> Option<OutgoingMessage>;
}

/// Outcome of [`ReminderScheduler::setup_reminders`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SetupReport {
    pub rescheduled: usize,
    pub removed: usize,
    pub already_pending: usize,
}

pub struct ReminderScheduler<P: ReminderPolicy> {
    policy: P,
    store: Arc<dyn ReminderStore>,
    queue: Arc<dyn JobQueue>,
    sender: Arc<dyn MessageSender>,
}

impl<P: ReminderPolicy> ReminderScheduler<P> {
    pub fn new(
        policy: P,
        store: Arc<dyn ReminderStore>,
        queue: Arc<dyn JobQueue>,
        sender: Arc<dyn MessageSender>,
    ) -> Arc<Self> {
        Arc::new(Self {
            policy,
            store,
            queue,
            sender,
        })
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn key(&self, user_id: i64) -> String {
        record_key(self.policy.prefix(), user_id)
    }

    /// Stores a fresh record and queues its first attempt.
    ///
    /// Returns `false` if a job for this user is already pending; nothing is changed then.
    pub async fn add(self: &Arc<Self>, record: ReminderRecord) -> Result<bool, ReminderError> {
        let key = self.key(record.user_id);
        if self.queue.is_pending(&key).await {
            log_reminder_event(&key, "already pending, add skipped");
            return Ok(false);
        }
        self.schedule_reminder(record).await
    }

    /// Reconciles persisted records with the (empty) job queue after a restart.
    pub async fn setup_reminders(self: &Arc<Self>) -> Result<SetupReport, ReminderError> {
        let mut report = SetupReport::default();
        let keys = self.store.keys(self.policy.prefix()).await?;

        for key in keys {
            if self.queue.is_pending(&key).await {
                report.already_pending += 1;
                continue;
            }

            let Some(fields) = self.store.load(&key).await? else {
                continue;
            };

            let record = ReminderRecord::from_fields(&fields)
                .and_then(|record| self.policy.validate(&record).map(|_| record));

            match record {
                Ok(record) if record.reminder_count < self.policy.max_count() => {
                    if self.schedule_reminder(record).await? {
                        report.rescheduled += 1;
                    } else {
                        report.removed += 1;
                    }
                }
                Ok(_) => {
                    log_reminder_event(&key, "attempts exhausted, removing stale record");
                    self.remove(&key).await?;
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::warn!("REMINDER: {} unreadable ({}), removing", key, e);
                    self.remove(&key).await?;
                    report.removed += 1;
                }
            }
        }

        tracing::info!(
            "REMINDER: setup for {} done - {} rescheduled, {} removed, {} already pending",
            self.policy.prefix(),
            report.rescheduled,
            report.removed,
            report.already_pending
        );
        Ok(report)
    }

    /// The stored record for `user_id`, if there is one that still decodes.
    pub async fn record(&self, user_id: i64) -> Result<Option<ReminderRecord>, ReminderError> {
        let key = self.key(user_id);
        let Some(fields) = self.store.load(&key).await? else {
            return Ok(None);
        };
        Ok(ReminderRecord::from_fields(&fields).ok())
    }

    /// Removes the record and any pending job. Safe to call when neither exists.
    pub async fn delete_reminder(&self, user_id: i64) -> Result<(), ReminderError> {
        let key = self.key(user_id);
        self.remove(&key).await
    }

    /// Runs attempt `current_count` for `user_id`. This is what a fired job executes.
    pub fn process_reminder(
        self: &Arc<Self>,
        user_id: i64,
        current_count: u32,
    ) -> BoxFuture<Result<(), ReminderError>> {
        let this = Arc::clone(self);
        Box::pin(async move { this.deliver(user_id, current_count).await })
    }

    async fn deliver(self: Arc<Self>, user_id: i64, current_count: u32) -> Result<(), ReminderError> {
        let key = self.key(user_id);

        // The record may have been deleted while the job was waiting.
        let Some(fields) = self.store.load(&key).await? else {
            log_reminder_event(&key, "record gone before delivery, skipping");
            return Ok(());
        };

        let mut record = match ReminderRecord::from_fields(&fields)
            .and_then(|record| self.policy.validate(&record).map(|_| record))
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("REMINDER: {} unreadable at delivery ({}), removing", key, e);
                return self.remove(&key).await;
            }
        };

        match self.policy.message(&record, current_count).await {
            Some(message) => {
                if let Err(e) = self.sender.send(user_id, message).await {
                    tracing::warn!(
                        "REMINDER: {} attempt {} could not be sent: {}",
                        key,
                        current_count,
                        e
                    );
                } else {
                    log_reminder_event(&key, &format!("attempt {current_count} sent"));
                }
            }
            None => {
                log_reminder_event(&key, "subject resolved, removing");
                return self.remove(&key).await;
            }
        }

        // A delete that ran while the message was in flight wins over the next attempt.
        if self.store.load(&key).await?.is_none() {
            log_reminder_event(&key, "record deleted during delivery, not rescheduling");
            return Ok(());
        }

        record.reminder_count = current_count + 1;
        record.last_reminded = Utc::now();

        if record.reminder_count < self.policy.max_count() {
            self.schedule_reminder(record).await?;
        } else {
            log_reminder_event(&key, "final attempt done, removing");
            self.remove(&key).await?;
        }
        Ok(())
    }

    /// Persists `record` with its next run time and queues the job.
    /// Returns `false` if the policy says there is nothing left to send (record removed).
    async fn schedule_reminder(self: &Arc<Self>, mut record: ReminderRecord) -> Result<bool, ReminderError> {
        let key = self.key(record.user_id);

        let (count, at) = match self.policy.plan(&record, Utc::now()).await {
            Plan::Run { count, at } if count < self.policy.max_count() => (count, at),
            _ => {
                log_reminder_event(&key, "no further slot, removing");
                self.remove(&key).await?;
                return Ok(false);
            }
        };

        record.reminder_count = count;
        record.next_run = Some(at);
        let ttl = record_ttl(at, Utc::now());
        if let Err(e) = self.store.save(&key, &record.to_fields(), ttl).await {
            log_store_error("save", &key, &e.to_string());
            return Err(e.into());
        }

        let this = Arc::clone(self);
        let user_id = record.user_id;
        let job: JobFn = Box::new(move || {
            Box::pin(async move {
                if let Err(e) = this.process_reminder(user_id, count).await {
                    tracing::error!("REMINDER: job for user {} failed: {}", user_id, e);
                }
            })
        });

        if self.queue.schedule(&key, at, job).await? {
            log_reminder_event(&key, &format!("attempt {count} queued for {at}"));
        } else {
            log_reminder_event(&key, "job already pending, not queued twice");
        }
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<(), ReminderError> {
        self.store.delete(key).await?;
        self.queue.cancel(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ttl_counts_from_next_run() {
        let now = Utc::now();

        assert_eq!(record_ttl(now, now), RECORD_TTL);
        assert_eq!(record_ttl(now - chrono::Duration::hours(1), now), RECORD_TTL);
        assert_eq!(
            record_ttl(now + chrono::Duration::days(6), now),
            RECORD_TTL + Duration::from_secs(6 * 24 * 60 * 60)
        );
    }
}
