use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use crate::database::connection::DatabaseManager;
use crate::services::reminder::ReminderStore;
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: ComponentHealth,
    pub reminder_store: ComponentHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_pool_size: Option<u32>,
}

#[derive(Clone)]
struct HealthState {
    db: Arc<DatabaseManager>,
    store: Arc<dyn ReminderStore>,
    started: DateTime<Utc>,
}

/// Health endpoints for the orchestrator: `/health` reports every component,
/// `/health/ready` gates traffic, `/health/live` only proves the process answers.
pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>, store: Arc<dyn ReminderStore>) -> Self {
        let state = HealthState {
            db,
            store,
            started: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(|| async { Json("alive") }))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state);

        Self { router }
    }
}

async fn timed_check<F, T, E>(check: F) -> (bool, u64)
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let started = std::time::Instant::now();
    let ok = check.await.is_ok();
    (ok, started.elapsed().as_millis() as u64)
}

impl ComponentHealth {
    fn new(ok: bool, response_time_ms: u64, connection_pool_size: Option<u32>) -> Self {
        Self {
            status: if ok { "healthy" } else { "unhealthy" }.to_string(),
            response_time_ms,
            connection_pool_size,
        }
    }
}

async fn health_check(State(state): State<HealthState>) -> Result<Json<HealthResponse>, StatusCode> {
    let (db_ok, db_ms) = timed_check(state.db.ping()).await;
    let (store_ok, store_ms) = timed_check(state.store.ping()).await;
    let healthy = db_ok && store_ok;

    let report = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: ComponentHealth::new(db_ok, db_ms, Some(state.db.pool.size())),
        reminder_store: ComponentHealth::new(store_ok, store_ms, None),
        uptime_seconds: (Utc::now() - state.started).num_seconds().max(0) as u64,
    };

    if !healthy {
        tracing::warn!(
            "SYSTEM: health check failed (database: {}, reminder store: {})",
            report.database.status,
            report.reminder_store.status
        );
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(report))
}

async fn readiness_check(State(state): State<HealthState>) -> Result<Json<&'static str>, StatusCode> {
    let ((db_ok, _), (store_ok, _)) = tokio::join!(timed_check(state.db.ping()), timed_check(state.store.ping()));
    if db_ok && store_ok {
        Ok(Json("ready"))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
