//! # Art Studio Bot Main Entry Point
//!
//! Initializes logging and configuration, connects the database, reminder store and user sheet,
//! restores pending reminders, then runs the Telegram dispatcher next to the health server.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::{serializer::Json, ErasedStorage, InMemStorage, SqliteStorage, Storage};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use art_studio_bot::bot::commands::Command;
use art_studio_bot::bot::context::BotContext;
use art_studio_bot::bot::handlers::BotHandler;
use art_studio_bot::bot::state::State;
use art_studio_bot::config::Config;
use art_studio_bot::database::connection::DatabaseManager;
use art_studio_bot::services::activities::ActivityRepository;
use art_studio_bot::services::health::HealthService;
use art_studio_bot::services::notifier::{MessageSender, Notifier};
use art_studio_bot::services::reminder::{
    CronJobQueue, JobQueue, MemoryReminderStore, PaymentPolicy, PaymentReminders, RedisReminderStore,
    ReminderStore, SignupPolicy, SignupReminders,
};
use art_studio_bot::services::signups::SignupService;
use art_studio_bot::services::users::{GoogleSheet, MemorySheet, UserRepository, UserSheet};
use art_studio_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "art_studio_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Art Studio Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Time zone: {}",
        config.database_url, config.http_port, config.timezone
    );

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db = Arc::new(db_manager);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let sender: Arc<dyn MessageSender> = Arc::new(bot.clone());

    let store: Arc<dyn ReminderStore> = match &config.redis_url {
        Some(url) => {
            info!("Connecting to Redis reminder store");
            Arc::new(RedisReminderStore::connect(url).await?)
        }
        None => {
            tracing::warn!("REDIS_URL not set, reminders are kept in memory and lost on restart");
            Arc::new(MemoryReminderStore::new())
        }
    };

    let cron_queue = Arc::new(CronJobQueue::new().await?);
    cron_queue.start().await?;
    let queue: Arc<dyn JobQueue> = cron_queue.clone();

    let activities = ActivityRepository::new(db.pool.clone());
    let payments = PaymentReminders::new(
        PaymentPolicy::new(config.timezone),
        Arc::clone(&store),
        Arc::clone(&queue),
        Arc::clone(&sender),
    );
    let signup_reminders = SignupReminders::new(
        SignupPolicy::new(activities.clone(), config.timezone),
        Arc::clone(&store),
        Arc::clone(&queue),
        Arc::clone(&sender),
    );

    // A store outage at start-up only costs the reminders, not the bot.
    if let Err(e) = payments.setup_reminders().await {
        tracing::error!("Failed to restore payment reminders: {}", e);
    }
    if let Err(e) = signup_reminders.setup_reminders().await {
        tracing::error!("Failed to restore sign-up reminders: {}", e);
    }

    let sheet: Arc<dyn UserSheet> = match &config.spreadsheet {
        Some(spreadsheet) => {
            info!("Using Google Sheets user table '{}'", spreadsheet.worksheet);
            Arc::new(GoogleSheet::new(spreadsheet)?)
        }
        None => {
            tracing::warn!("No spreadsheet configured, users are kept in memory");
            Arc::new(MemorySheet::new())
        }
    };
    let users = UserRepository::load(sheet).await?;
    let refresh_task = users.spawn_periodic_refresh(Duration::from_secs(config.user_refresh_secs));

    let notifier = Notifier::new(Arc::clone(&sender), config.admin_ids.clone());
    let signups = SignupService::new(
        db.pool.clone(),
        activities.clone(),
        Arc::clone(&payments),
        Arc::clone(&signup_reminders),
        notifier.clone(),
    );

    let storage: Arc<ErasedStorage<State>> = match &config.dialogue_db {
        Some(path) => SqliteStorage::open(path, Json).await?.erase(),
        None => InMemStorage::<State>::new().erase(),
    };

    let ctx = Arc::new(BotContext {
        config: config.clone(),
        users: users.clone(),
        activities,
        signups,
        notifier,
    });
    let handler = BotHandler::new(ctx);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!("Could not register bot commands: {}", e);
    }

    let health_service = HealthService::new(Arc::clone(&db), Arc::clone(&store));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;
    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .dependencies(dptree::deps![storage])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    log_system_event("started", Some(&format!("{} admins", config.admin_ids.len())));

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    refresh_task.abort();
    if let Err(e) = cron_queue.shutdown().await {
        tracing::warn!("Error stopping job scheduler: {}", e);
    }
    users.sync().await;

    log_system_event("stopped", None);
    Ok(())
}
