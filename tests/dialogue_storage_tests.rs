#![allow(clippy::unwrap_used)]

mod common;

use art_studio_bot::bot::context::BotContext;
use art_studio_bot::bot::handlers::BotHandler;
use art_studio_bot::bot::state::{NewActivityDraft, State};
use art_studio_bot::config::Config;
use art_studio_bot::database::models::{ActivityType, LessonActivity, LessonOption};
use art_studio_bot::services::activities::ActivityRepository;
use art_studio_bot::services::notifier::{MessageSender, Notifier};
use art_studio_bot::services::reminder::{
    JobQueue, MemoryReminderStore, PaymentPolicy, PaymentReminders, ReminderStore, SignupPolicy,
    SignupReminders,
};
use art_studio_bot::services::signups::SignupService;
use art_studio_bot::services::users::{MemorySheet, UserRepository};
use common::{setup_test_db, ManualQueue, RecordingSender};
use std::sync::Arc;
use teloxide::dispatching::dialogue::{serializer::Json, SqliteStorage, Storage};
use teloxide::types::ChatId;
use tempfile::tempdir;

fn test_config() -> Config {
    Config {
        telegram_bot_token: "test_token".to_string(),
        database_url: "sqlite::memory:".to_string(),
        http_port: 0,
        admin_ids: vec![100],
        redis_url: None,
        spreadsheet: None,
        timezone: chrono_tz::Europe::Moscow,
        user_refresh_secs: 600,
        dialogue_db: None,
        payment_details: "Pay at the desk".to_string(),
    }
}

#[tokio::test]
async fn test_dialogue_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dialogues.sqlite");
    let path = path.to_str().unwrap();

    let mut draft = LessonActivity::new(ActivityType::MassClass, 4, LessonOption::Ticket, "Pottery".to_string());
    draft.tickets = 2;
    let state = State::Confirming { draft };

    {
        let storage = SqliteStorage::open(path, Json).await.unwrap();
        storage.update_dialogue(ChatId(42), state.clone()).await.unwrap();
    }

    let storage = SqliteStorage::open(path, Json).await.unwrap();
    let restored: Option<State> = storage.clone().get_dialogue(ChatId(42)).await.unwrap();
    assert_eq!(restored, Some(state));
    assert!(Storage::<State>::get_dialogue(storage, ChatId(7)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_draft_state_serializes() {
    let state = State::AdminNewStart {
        draft: NewActivityDraft {
            activity_type: ActivityType::EveningSketch,
            theme: "Dancers".to_string(),
            description: "Quick poses".to_string(),
            image_ref: Some("photo-file-id".to_string()),
        },
    };

    let json = serde_json::to_string(&state).unwrap();
    let back: State = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}

#[tokio::test]
async fn test_handler_schema_builds() {
    let (db, _dir) = setup_test_db().await;
    let store: Arc<dyn ReminderStore> = Arc::new(MemoryReminderStore::new());
    let queue: Arc<dyn JobQueue> = Arc::new(ManualQueue::new());
    let sender: Arc<dyn MessageSender> = Arc::new(RecordingSender::new());
    let config = test_config();

    let activities = ActivityRepository::new(db.pool.clone());
    let payments = PaymentReminders::new(
        PaymentPolicy::new(config.timezone),
        Arc::clone(&store),
        Arc::clone(&queue),
        Arc::clone(&sender),
    );
    let reminders = SignupReminders::new(
        SignupPolicy::new(activities.clone(), config.timezone),
        store,
        queue,
        Arc::clone(&sender),
    );
    let notifier = Notifier::new(sender, config.admin_ids.clone());
    let signups = SignupService::new(db.pool.clone(), activities.clone(), payments, reminders, notifier.clone());
    let users = UserRepository::load(Arc::new(MemorySheet::new())).await.unwrap();

    let ctx = Arc::new(BotContext {
        config,
        users,
        activities,
        signups,
        notifier,
    });
    assert!(ctx.is_admin(100));
    assert!(!ctx.is_admin(42));

    let handler = BotHandler::new(ctx);
    let _schema = handler.schema();
}
