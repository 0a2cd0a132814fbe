use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use super::schedule::{adjust_to_business_hours, payment_run_time};
use super::{Plan, ReminderError, ReminderPolicy, ReminderRecord, ReminderScheduler};
use crate::bot::state::CallbackAction;
use crate::services::notifier::OutgoingMessage;

pub const PAYMENT_PREFIX: &str = "payment:pending:";
pub const MAX_PAYMENT_REMINDERS: u32 = 3;

/// Grace period before a reminder whose slot passed while the bot was down.
const CATCH_UP_DELAY_SECS: i64 = 30;

const PAYMENT_TEXTS: [&str; MAX_PAYMENT_REMINDERS as usize] = [
    "👋 Just a reminder: your sign-up is waiting for payment. Tap the button below once you have paid.",
    "🎨 Your place is still reserved, but we have not received your payment yet. Let us know when it is done!",
    "⏰ Last reminder about your payment. Unpaid places may be released to other guests soon.",
];

pub type PaymentReminders = ReminderScheduler<PaymentPolicy>;

/// Up to three nudges spaced 4h, 8h and 12h apart, inside studio business hours.
pub struct PaymentPolicy {
    tz: Tz,
}

impl PaymentPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[async_trait]
impl ReminderPolicy for PaymentPolicy {
    fn prefix(&self) -> &'static str {
        PAYMENT_PREFIX
    }

    fn max_count(&self) -> u32 {
        MAX_PAYMENT_REMINDERS
    }

    async fn plan(&self, record: &ReminderRecord, now: DateTime<Utc>) -> Plan {
        if record.reminder_count >= MAX_PAYMENT_REMINDERS {
            return Plan::Expire;
        }

        let mut at = payment_run_time(record.last_reminded, record.reminder_count, self.tz);
        if at <= now {
            at = adjust_to_business_hours(now + Duration::seconds(CATCH_UP_DELAY_SECS), self.tz);
        }
        Plan::Run {
            count: record.reminder_count,
            at,
        }
    }

    async fn message(&self, _record: &ReminderRecord, count: u32) -> Option<OutgoingMessage> {
        let text = PAYMENT_TEXTS
            .get(count as usize)
            .or(PAYMENT_TEXTS.last())?;
        Some(
            OutgoingMessage::text(*text)
                .with_button("✅ I have paid", CallbackAction::Paid.encode()),
        )
    }
}

impl ReminderScheduler<PaymentPolicy> {
    /// Starts the payment follow-up for a user who has not paid yet.
    pub async fn add_reminder(self: &Arc<Self>, user_id: i64) -> Result<bool, ReminderError> {
        self.add(ReminderRecord::new(user_id, Utc::now())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_plan_uses_backoff_from_last_reminder() {
        let policy = PaymentPolicy::new(chrono_tz::UTC);
        let last = Utc.with_ymd_and_hms(2030, 3, 4, 10, 0, 0).unwrap();
        let mut record = ReminderRecord::new(42, last);
        record.reminder_count = 1;

        let now = Utc.with_ymd_and_hms(2030, 3, 4, 10, 5, 0).unwrap();
        assert_eq!(
            policy.plan(&record, now).await,
            Plan::Run {
                count: 1,
                at: Utc.with_ymd_and_hms(2030, 3, 4, 18, 0, 0).unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_plan_catches_up_missed_slot() {
        let policy = PaymentPolicy::new(chrono_tz::UTC);
        let last = Utc.with_ymd_and_hms(2030, 3, 1, 10, 0, 0).unwrap();
        let record = ReminderRecord::new(42, last);

        let now = Utc.with_ymd_and_hms(2030, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(
            policy.plan(&record, now).await,
            Plan::Run {
                count: 0,
                at: now + Duration::seconds(CATCH_UP_DELAY_SECS)
            }
        );
    }

    #[tokio::test]
    async fn test_plan_expires_exhausted_record() {
        let policy = PaymentPolicy::new(chrono_tz::UTC);
        let mut record = ReminderRecord::new(42, Utc::now());
        record.reminder_count = MAX_PAYMENT_REMINDERS;
        assert_eq!(policy.plan(&record, Utc::now()).await, Plan::Expire);
    }

    #[tokio::test]
    async fn test_every_attempt_has_a_message_with_paid_button() {
        let policy = PaymentPolicy::new(chrono_tz::UTC);
        let record = ReminderRecord::new(42, Utc::now());
        for count in 0..MAX_PAYMENT_REMINDERS {
            let message = policy.message(&record, count).await.unwrap();
            assert_eq!(message.text, PAYMENT_TEXTS[count as usize]);
            assert_eq!(message.buttons.len(), 1);
            assert_eq!(message.buttons[0].1, "pay:done");
        }
    }
}
