//! Sign-up lifecycle: confirmation, payment and cancellation, with the reminders and admin
//! notifications that go with each step.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

use crate::database::models::{Activity, LessonActivity, Signup, SignupStatus};
use crate::services::activities::ActivityRepository;
use crate::services::notifier::{Notifier, OutgoingMessage};
use crate::services::reminder::{PaymentReminders, SignupReminders};
use crate::services::users::UserDTO;
use crate::utils::logging::{log_database_error, log_database_operation};

#[derive(Debug, Error)]
pub enum SignupError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct SignupService {
    pool: SqlitePool,
    activities: ActivityRepository,
    payments: Arc<PaymentReminders>,
    reminders: Arc<SignupReminders>,
    notifier: Notifier,
}

impl SignupService {
    pub fn new(
        pool: SqlitePool,
        activities: ActivityRepository,
        payments: Arc<PaymentReminders>,
        reminders: Arc<SignupReminders>,
        notifier: Notifier,
    ) -> Self {
        Self {
            pool,
            activities,
            payments,
            reminders,
            notifier,
        }
    }

    /// Persists a confirmed draft and starts its reminders.
    ///
    /// Returns `None` if the activity disappeared or the draft no longer fits it.
    pub async fn confirm(&self, user: &UserDTO, draft: &LessonActivity) -> Result<Option<Signup>, SignupError> {
        let Some(activity) = self.activities.get_activity_by_id(draft.activity_id).await? else {
            return Ok(None);
        };
        if activity.activity_type != draft.activity_type || !draft.option.is_valid_for(activity.activity_type) {
            return Ok(None);
        }
        if draft.tickets > 1 && !activity.activity_type.allows_multiple_tickets() {
            return Ok(None);
        }

        log_database_operation("INSERT", "signups", Some(&format!("user={} activity={}", user.id, activity.id)));
        let signup = Signup::create(&self.pool, user.id, draft).await.map_err(|e| {
            log_database_error("INSERT", "signups", &e.to_string());
            e
        })?;

        // Reminder failures must not undo a persisted sign-up.
        if activity.starts_at.is_some_and(|start| start > Utc::now()) {
            if let Err(e) = self.reminders.add_reminder(user.id, activity.id).await {
                tracing::error!("REMINDER: sign-up reminder for user {} not scheduled: {}", user.id, e);
            }
        }
        if let Err(e) = self.payments.add_reminder(user.id).await {
            tracing::error!("REMINDER: payment reminder for user {} not scheduled: {}", user.id, e);
        }

        self.notifier
            .notify_admins(OutgoingMessage::text(new_signup_text(user, &activity, &signup)))
            .await;
        Ok(Some(signup))
    }

    /// Marks the user's latest pending sign-up paid. `None` if nothing was pending.
    pub async fn mark_paid(&self, user: &UserDTO) -> Result<Option<Signup>, SignupError> {
        let Some(mut signup) = Signup::latest_pending_by_user(&self.pool, user.id).await? else {
            return Ok(None);
        };
        if !Signup::mark_paid(&self.pool, signup.id).await? {
            return Ok(None);
        }
        signup.status = SignupStatus::Paid;
        self.release_reminders(user.id, None).await;

        self.notifier
            .notify_admins(OutgoingMessage::text(format!(
                "💳 {} ({}) reports payment for \"{}\", {} x{}",
                user.display_name(),
                user.phone.as_deref().unwrap_or("no phone"),
                signup.topic,
                signup.option.title(),
                signup.tickets
            )))
            .await;
        Ok(Some(signup))
    }

    /// Cancels one of the user's pending sign-ups. `false` if it is not theirs or not pending.
    pub async fn cancel(&self, user: &UserDTO, signup_id: i64) -> Result<bool, SignupError> {
        let Some(signup) = Signup::find_by_id(&self.pool, signup_id)
            .await?
            .filter(|s| s.user_id == user.id)
        else {
            return Ok(false);
        };
        if !Signup::cancel(&self.pool, signup_id).await? {
            return Ok(false);
        }

        self.release_reminders(user.id, Some(signup.activity_id)).await;

        self.notifier
            .notify_admins(OutgoingMessage::text(format!(
                "🚫 {} cancelled sign-up #{}",
                user.display_name(),
                signup_id
            )))
            .await;
        Ok(true)
    }

    /// Drops the reminders a resolved sign-up no longer needs.
    ///
    /// Reminders are kept per user, so the payment reminder stays while any sign-up is still
    /// unpaid, and the sign-up reminder goes only if it was for `cancelled_activity`. In that case
    /// the next upcoming booking takes it over. The status change is already committed, so
    /// failures here are logged and never reported to the caller.
    async fn release_reminders(&self, user_id: i64, cancelled_activity: Option<i64>) {
        let active = match Signup::find_active_by_user(&self.pool, user_id).await {
            Ok(active) => active,
            Err(e) => {
                log_database_error("SELECT", "signups", &e.to_string());
                return;
            }
        };

        if !active.iter().any(|s| s.status == SignupStatus::Pending) {
            if let Err(e) = self.payments.delete_reminder(user_id).await {
                tracing::error!("REMINDER: payment reminder for user {} not removed: {}", user_id, e);
            }
        }

        let Some(activity_id) = cancelled_activity else {
            return;
        };
        match self.reminders.record(user_id).await {
            Ok(Some(record)) if record.act_id == Some(activity_id) => {}
            Ok(_) => return,
            Err(e) => {
                tracing::error!("REMINDER: sign-up reminder for user {} not checked: {}", user_id, e);
                return;
            }
        }
        if let Err(e) = self.reminders.delete_reminder(user_id).await {
            tracing::error!("REMINDER: sign-up reminder for user {} not removed: {}", user_id, e);
            return;
        }

        for other in active.iter().filter(|s| s.activity_id != activity_id) {
            let upcoming = matches!(
                self.activities.get_activity_by_id(other.activity_id).await,
                Ok(Some(Activity { starts_at: Some(start), .. })) if start > Utc::now()
            );
            if !upcoming {
                continue;
            }
            match self.reminders.add_reminder(user_id, other.activity_id).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("REMINDER: sign-up reminder for user {} not moved: {}", user_id, e);
                    break;
                }
            }
        }
    }

    /// Pending and paid sign-ups, newest first.
    pub async fn active(&self, user_id: i64) -> Result<Vec<Signup>, SignupError> {
        Ok(Signup::find_active_by_user(&self.pool, user_id).await?)
    }
}

fn new_signup_text(user: &UserDTO, activity: &Activity, signup: &Signup) -> String {
    format!(
        "🆕 New sign-up #{}\n{} ({})\n{}: \"{}\"\n{} x{}",
        signup.id,
        user.display_name(),
        user.phone.as_deref().unwrap_or("no phone"),
        activity.activity_type.title(),
        activity.theme,
        signup.option.title(),
        signup.tickets
    )
}
