#![allow(clippy::unwrap_used)]

mod common;

use art_studio_bot::database::connection::DatabaseManager;
use art_studio_bot::database::models::{
    Activity, ActivityType, LessonActivity, LessonOption, NewActivity, SignupStatus,
};
use art_studio_bot::services::activities::ActivityRepository;
use art_studio_bot::services::notifier::{MessageSender, Notifier};
use art_studio_bot::services::reminder::{
    JobQueue, MemoryReminderStore, PaymentPolicy, PaymentReminders, ReminderStore, SignupPolicy,
    SignupReminders, StoreError,
};
use art_studio_bot::services::signups::SignupService;
use art_studio_bot::services::users::UserDTO;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{setup_test_db, ManualQueue, RecordingSender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const ADMIN_ID: i64 = 100;

/// In-memory reminder store whose deletes can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryReminderStore,
    failing_deletes: AtomicBool,
}

#[async_trait]
impl ReminderStore for FlakyStore {
    async fn load(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        self.inner.load(key).await
    }

    async fn save(
        &self,
        key: &str,
        fields: &[(&'static str, String)],
        ttl: std::time::Duration,
    ) -> Result<(), StoreError> {
        self.inner.save(key, fields, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection reset",
            ))));
        }
        self.inner.delete(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys(prefix).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct Fixture {
    _db: DatabaseManager,
    _dir: TempDir,
    activities: ActivityRepository,
    store: Arc<FlakyStore>,
    queue: Arc<ManualQueue>,
    sender: Arc<RecordingSender>,
    service: SignupService,
}

async fn fixture() -> Fixture {
    let (db, dir) = setup_test_db().await;
    let activities = ActivityRepository::new(db.pool.clone());
    let store = Arc::new(FlakyStore::default());
    let queue = Arc::new(ManualQueue::new());
    let sender = Arc::new(RecordingSender::new());

    let dyn_store: Arc<dyn ReminderStore> = store.clone();
    let dyn_queue: Arc<dyn JobQueue> = queue.clone();
    let dyn_sender: Arc<dyn MessageSender> = sender.clone();

    let payments = PaymentReminders::new(
        PaymentPolicy::new(chrono_tz::UTC),
        Arc::clone(&dyn_store),
        Arc::clone(&dyn_queue),
        Arc::clone(&dyn_sender),
    );
    let reminders = SignupReminders::new(
        SignupPolicy::new(activities.clone(), chrono_tz::UTC),
        dyn_store,
        dyn_queue,
        Arc::clone(&dyn_sender),
    );
    let service = SignupService::new(
        db.pool.clone(),
        activities.clone(),
        payments,
        reminders,
        Notifier::new(dyn_sender, vec![ADMIN_ID]),
    );

    Fixture {
        _db: db,
        _dir: dir,
        activities,
        store,
        queue,
        sender,
        service,
    }
}

fn user(id: i64) -> UserDTO {
    UserDTO {
        id,
        nickname: Some("painter".to_string()),
        phone: Some("+79990001122".to_string()),
        first_name: Some("Anna".to_string()),
        last_name: None,
    }
}

async fn create_activity(
    f: &Fixture,
    activity_type: ActivityType,
    theme: &str,
    starts_in: Option<Duration>,
) -> Activity {
    f.activities
        .add_activity(NewActivity {
            activity_type,
            theme: theme.to_string(),
            description: String::new(),
            image_ref: None,
            starts_at: starts_in.map(|d| Utc::now() + d),
        })
        .await
        .unwrap()
        .unwrap()
}

fn draft(activity: &Activity, option: LessonOption, tickets: u8) -> LessonActivity {
    let mut draft = LessonActivity::new(activity.activity_type, activity.id, option, activity.theme.clone());
    draft.tickets = tickets;
    draft
}

#[tokio::test]
async fn test_confirm_persists_and_starts_payment_reminder() {
    let f = fixture().await;
    let lesson = create_activity(&f, ActivityType::Lesson, "Still life", None).await;

    let signup = f
        .service
        .confirm(&user(42), &draft(&lesson, LessonOption::FourLessonPass, 1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(signup.user_id, 42);
    assert_eq!(signup.status, SignupStatus::Pending);
    assert_eq!(signup.option, LessonOption::FourLessonPass);
    assert!(f.store.load("payment:pending:42").await.unwrap().is_some());
    // Undated activities get no pre-activity reminder.
    assert!(f.store.load("signup:pending:42").await.unwrap().is_none());

    let sent = f.sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ADMIN_ID);
    assert!(sent[0].1.text.contains("New sign-up"));
    assert!(sent[0].1.text.contains("Still life"));
}

#[tokio::test]
async fn test_confirm_dated_activity_schedules_both_reminders() {
    let f = fixture().await;
    let class = create_activity(&f, ActivityType::MassClass, "Van Gogh night", Some(Duration::days(3))).await;

    let signup = f
        .service
        .confirm(&user(42), &draft(&class, LessonOption::Ticket, 3))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(signup.tickets, 3);
    assert!(f.queue.is_pending("payment:pending:42").await);
    assert!(f.queue.is_pending("signup:pending:42").await);
}

#[tokio::test]
async fn test_confirm_rejects_drafts_that_do_not_fit() {
    let f = fixture().await;
    let lesson = create_activity(&f, ActivityType::Lesson, "Clouds", None).await;

    let wrong_option = draft(&lesson, LessonOption::Ticket, 1);
    assert!(f.service.confirm(&user(42), &wrong_option).await.unwrap().is_none());

    let too_many = draft(&lesson, LessonOption::SingleLesson, 2);
    assert!(f.service.confirm(&user(42), &too_many).await.unwrap().is_none());

    let mut gone = draft(&lesson, LessonOption::SingleLesson, 1);
    gone.activity_id = 9_999;
    assert!(f.service.confirm(&user(42), &gone).await.unwrap().is_none());

    assert!(f.service.active(42).await.unwrap().is_empty());
    assert_eq!(f.queue.len().await, 0);
}

#[tokio::test]
async fn test_mark_paid_stops_payment_reminders() {
    let f = fixture().await;
    let lesson = create_activity(&f, ActivityType::ChildStudio, "Dinosaurs", None).await;
    f.service
        .confirm(&user(42), &draft(&lesson, LessonOption::TrialClass, 1))
        .await
        .unwrap();

    let paid = f.service.mark_paid(&user(42)).await.unwrap().unwrap();
    assert_eq!(paid.status, SignupStatus::Paid);
    assert!(f.store.load("payment:pending:42").await.unwrap().is_none());
    assert!(!f.queue.is_pending("payment:pending:42").await);

    assert!(f.service.mark_paid(&user(42)).await.unwrap().is_none());
    assert!(f.sender.sent().await.iter().any(|(_, m)| m.text.contains("reports payment")));
}

#[tokio::test]
async fn test_cancel_requires_owner_and_pending_status() {
    let f = fixture().await;
    let class = create_activity(&f, ActivityType::EveningSketch, "Jazz band", Some(Duration::days(2))).await;
    let signup = f
        .service
        .confirm(&user(42), &draft(&class, LessonOption::DropIn, 1))
        .await
        .unwrap()
        .unwrap();

    assert!(!f.service.cancel(&user(43), signup.id).await.unwrap());
    assert!(f.service.cancel(&user(42), signup.id).await.unwrap());
    assert!(!f.service.cancel(&user(42), signup.id).await.unwrap());

    assert!(f.service.active(42).await.unwrap().is_empty());
    assert_eq!(f.queue.len().await, 0);
    assert!(f.store.keys("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_active_lists_newest_first() {
    let f = fixture().await;
    let first = create_activity(&f, ActivityType::Lesson, "Portrait", None).await;
    let second = create_activity(&f, ActivityType::MassClass, "Pottery", None).await;

    f.service
        .confirm(&user(42), &draft(&first, LessonOption::SingleLesson, 1))
        .await
        .unwrap();
    f.service
        .confirm(&user(42), &draft(&second, LessonOption::Ticket, 1))
        .await
        .unwrap();

    let active = f.service.active(42).await.unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].topic, "Pottery");
    assert_eq!(active[1].topic, "Portrait");
}

#[tokio::test]
async fn test_cancelling_one_booking_keeps_reminders_for_the_other() {
    let f = fixture().await;
    let first = create_activity(&f, ActivityType::MassClass, "Sunset", Some(Duration::days(3))).await;
    let second = create_activity(&f, ActivityType::MassClass, "Lilies", Some(Duration::days(5))).await;

    f.service
        .confirm(&user(42), &draft(&first, LessonOption::Ticket, 1))
        .await
        .unwrap();
    let other = f
        .service
        .confirm(&user(42), &draft(&second, LessonOption::Ticket, 1))
        .await
        .unwrap()
        .unwrap();

    assert!(f.service.cancel(&user(42), other.id).await.unwrap());

    assert!(f.queue.is_pending("payment:pending:42").await);
    assert!(f.queue.is_pending("signup:pending:42").await);
    let record = f.store.load("signup:pending:42").await.unwrap().unwrap();
    assert_eq!(record.get("act_id"), Some(&first.id.to_string()));
}

#[tokio::test]
async fn test_cancelling_reminded_booking_hands_reminder_to_next_one() {
    let f = fixture().await;
    let first = create_activity(&f, ActivityType::MassClass, "Harbour", Some(Duration::days(3))).await;
    let second = create_activity(&f, ActivityType::MassClass, "Orchard", Some(Duration::days(5))).await;

    let reminded = f
        .service
        .confirm(&user(42), &draft(&first, LessonOption::Ticket, 1))
        .await
        .unwrap()
        .unwrap();
    f.service
        .confirm(&user(42), &draft(&second, LessonOption::Ticket, 1))
        .await
        .unwrap();

    assert!(f.service.cancel(&user(42), reminded.id).await.unwrap());

    let record = f.store.load("signup:pending:42").await.unwrap().unwrap();
    assert_eq!(record.get("act_id"), Some(&second.id.to_string()));
    assert!(f.queue.is_pending("signup:pending:42").await);
    assert!(f.queue.is_pending("payment:pending:42").await);
}

#[tokio::test]
async fn test_payment_reminder_stays_while_another_booking_is_unpaid() {
    let f = fixture().await;
    let lesson = create_activity(&f, ActivityType::Lesson, "Birches", None).await;
    let class = create_activity(&f, ActivityType::MassClass, "Foxes", None).await;
    f.service
        .confirm(&user(42), &draft(&lesson, LessonOption::SingleLesson, 1))
        .await
        .unwrap();
    f.service
        .confirm(&user(42), &draft(&class, LessonOption::Ticket, 1))
        .await
        .unwrap();

    assert!(f.service.mark_paid(&user(42)).await.unwrap().is_some());
    assert!(f.queue.is_pending("payment:pending:42").await);

    assert!(f.service.mark_paid(&user(42)).await.unwrap().is_some());
    assert!(!f.queue.is_pending("payment:pending:42").await);
}

#[tokio::test]
async fn test_reminder_store_failure_does_not_hide_payment_or_cancellation() {
    let f = fixture().await;
    let lesson = create_activity(&f, ActivityType::Lesson, "Lighthouse", None).await;
    let class = create_activity(&f, ActivityType::MassClass, "Owls", Some(Duration::days(2))).await;
    f.service
        .confirm(&user(42), &draft(&lesson, LessonOption::SingleLesson, 1))
        .await
        .unwrap();
    let booked = f
        .service
        .confirm(&user(42), &draft(&class, LessonOption::Ticket, 1))
        .await
        .unwrap()
        .unwrap();
    f.store.failing_deletes.store(true, Ordering::SeqCst);

    assert!(f.service.cancel(&user(42), booked.id).await.unwrap());
    let paid = f.service.mark_paid(&user(42)).await.unwrap().unwrap();
    assert_eq!(paid.status, SignupStatus::Paid);

    let sent = f.sender.sent().await;
    assert!(sent.iter().any(|(to, m)| *to == ADMIN_ID && m.text.contains("cancelled sign-up")));
    assert!(sent.iter().any(|(to, m)| *to == ADMIN_ID && m.text.contains("reports payment")));
}
