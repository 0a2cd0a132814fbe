use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use super::schedule::signup_run_time;
use super::{Plan, RecordError, ReminderError, ReminderPolicy, ReminderRecord, ReminderScheduler};
use crate::database::models::Activity;
use crate::services::activities::ActivityRepository;
use crate::services::notifier::OutgoingMessage;
use crate::utils::datetime::format_datetime;

pub const SIGNUP_PREFIX: &str = "signup:pending:";
pub const MAX_SIGNUP_REMINDERS: u32 = 2;

pub type SignupReminders = ReminderScheduler<SignupPolicy>;

/// Two reminders before a dated activity: the day before and two hours before.
pub struct SignupPolicy {
    activities: ActivityRepository,
    tz: Tz,
}

impl SignupPolicy {
    pub fn new(activities: ActivityRepository, tz: Tz) -> Self {
        Self { activities, tz }
    }

    async fn linked_activity(&self, record: &ReminderRecord) -> Option<Activity> {
        let act_id = record.act_id?;
        match self.activities.get_activity_by_id(act_id).await {
            Ok(activity) => activity,
            Err(e) => {
                tracing::error!("REMINDER: could not load activity {}: {}", act_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl ReminderPolicy for SignupPolicy {
    fn prefix(&self) -> &'static str {
        SIGNUP_PREFIX
    }

    fn max_count(&self) -> u32 {
        MAX_SIGNUP_REMINDERS
    }

    fn validate(&self, record: &ReminderRecord) -> Result<(), RecordError> {
        record.act_id.map(|_| ()).ok_or(RecordError::MissingField("act_id"))
    }

    async fn plan(&self, record: &ReminderRecord, now: DateTime<Utc>) -> Plan {
        let Some(starts_at) = self.linked_activity(record).await.and_then(|a| a.starts_at) else {
            return Plan::Expire;
        };

        match signup_run_time(starts_at, record.reminder_count, now) {
            Some((count, at)) if count < MAX_SIGNUP_REMINDERS => Plan::Run { count, at },
            _ => Plan::Expire,
        }
    }

    async fn message(&self, record: &ReminderRecord, count: u32) -> Option<OutgoingMessage> {
        let activity = self.linked_activity(record).await?;
        let starts_at = activity.starts_at?;
        let when = format_datetime(&starts_at, self.tz);

        let text = match count {
            0 => format!(
                "📅 See you tomorrow! You are signed up for \"{}\" on {}.",
                activity.theme, when
            ),
            _ => format!(
                "⏳ \"{}\" starts in about two hours ({}). We are getting the easels ready!",
                activity.theme, when
            ),
        };
        Some(OutgoingMessage::text(text))
    }
}

impl ReminderScheduler<SignupPolicy> {
    /// Starts the pre-activity reminders for a fresh sign-up.
    pub async fn add_reminder(self: &Arc<Self>, user_id: i64, act_id: i64) -> Result<bool, ReminderError> {
        self.add(ReminderRecord::for_activity(user_id, act_id, Utc::now())).await
    }
}
