use art_studio_bot::config::Config;
use std::env;
use std::sync::Mutex;

// Mutex to ensure config tests run sequentially to avoid environment variable conflicts
static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

const OPTIONAL_VARS: [&str; 10] = [
    "DATABASE_URL",
    "HTTP_PORT",
    "ADMIN_IDS",
    "REDIS_URL",
    "SPREADSHEET_ID",
    "SERVICE_ACCOUNT_FILE",
    "USERS_WORKSHEET",
    "STUDIO_TIMEZONE",
    "USER_REFRESH_SECS",
    "DIALOGUE_DB",
];

fn clear_env() {
    env::remove_var("TELEGRAM_BOT_TOKEN");
    env::remove_var("PAYMENT_DETAILS");
    for var in OPTIONAL_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_config_from_env_with_all_vars() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "test_token_123");
    env::set_var("DATABASE_URL", "sqlite:test.db");
    env::set_var("HTTP_PORT", "8080");
    env::set_var("ADMIN_IDS", "111, 222");
    env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
    env::set_var("SPREADSHEET_ID", "sheet-abc");
    env::set_var("SERVICE_ACCOUNT_FILE", "/etc/studio/account.json");
    env::set_var("USERS_WORKSHEET", "Clients");
    env::set_var("STUDIO_TIMEZONE", "Asia/Yekaterinburg");
    env::set_var("USER_REFRESH_SECS", "120");
    env::set_var("DIALOGUE_DB", "dialogues.sqlite");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "test_token_123");
    assert_eq!(config.database_url, "sqlite:test.db");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.admin_ids, vec![111, 222]);
    assert!(config.is_admin(222));
    assert!(!config.is_admin(333));
    assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    let spreadsheet = config.spreadsheet.unwrap();
    assert_eq!(spreadsheet.spreadsheet_id, "sheet-abc");
    assert_eq!(spreadsheet.worksheet, "Clients");
    assert_eq!(config.timezone, chrono_tz::Asia::Yekaterinburg);
    assert_eq!(config.user_refresh_secs, 120);
    assert_eq!(config.dialogue_db.as_deref(), Some("dialogues.sqlite"));

    clear_env();
}

#[test]
fn test_config_from_env_with_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "required_token");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "required_token");
    assert_eq!(config.database_url, "sqlite:./data/studio.db");
    assert_eq!(config.http_port, 3000);
    assert!(config.admin_ids.is_empty());
    assert!(config.redis_url.is_none());
    assert!(config.spreadsheet.is_none());
    assert_eq!(config.timezone, chrono_tz::Europe::Moscow);
    assert_eq!(config.user_refresh_secs, 600);
    assert!(config.dialogue_db.is_none());
    assert!(!config.payment_details.is_empty());

    clear_env();
}

#[test]
fn test_config_missing_required_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    let result = Config::from_env();
    assert!(result.is_err());

    let error_msg = result.unwrap_err().to_string();
    assert!(error_msg.contains("TELEGRAM_BOT_TOKEN must be set"));
}

#[test]
fn test_config_rejects_bad_values() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKEN", "token");

    env::set_var("HTTP_PORT", "not_a_port");
    assert!(Config::from_env().unwrap_err().to_string().contains("HTTP_PORT"));
    env::remove_var("HTTP_PORT");

    env::set_var("STUDIO_TIMEZONE", "Mars/Olympus");
    assert!(Config::from_env().unwrap_err().to_string().contains("STUDIO_TIMEZONE"));
    env::remove_var("STUDIO_TIMEZONE");

    env::set_var("ADMIN_IDS", "12,abc");
    assert!(Config::from_env().unwrap_err().to_string().contains("ADMIN_IDS"));
    env::remove_var("ADMIN_IDS");

    clear_env();
}

#[test]
fn test_spreadsheet_settings_must_come_together() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var("SPREADSHEET_ID", "sheet-only");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("SERVICE_ACCOUNT_FILE"));

    clear_env();
}
