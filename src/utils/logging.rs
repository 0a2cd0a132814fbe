use tracing::{debug, error, info, warn};

/// Logs the start of an update handler with consistent format
pub fn log_handler_start(handler: &str, user: &str, user_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("HANDLER_START: {} by {}({}) - {}", handler, user, user_id, d),
        None => info!("HANDLER_START: {} by {}({})", handler, user, user_id),
    }
}

/// Logs handler errors with consistent format
pub fn log_handler_error(handler: &str, user_id: i64, error: &str) {
    error!("HANDLER_ERROR: {} for user {} - {}", handler, user_id, error);
}

/// Logs rejected user input
pub fn log_validation_error(field: &str, value: &str, error: &str, user_id: i64) {
    warn!(
        "VALIDATION_ERROR: field '{}' value '{}' invalid: {} - user {}",
        field, value, error, user_id
    );
}

/// Logs database operations with consistent format
pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

/// Logs database errors with consistent format
pub fn log_database_error(operation: &str, table: &str, error: &str) {
    error!("DB_ERROR: {} on {} failed: {}", operation, table, error);
}

pub fn log_reminder_event(key: &str, event: &str) {
    info!("REMINDER: {} - {}", key, event);
}

pub fn log_store_error(operation: &str, key: &str, error: &str) {
    error!("STORE_ERROR: {} on {} failed: {}", operation, key, error);
}

/// Logs system events with consistent format
pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
