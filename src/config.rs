use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/studio.db";
const DEFAULT_WORKSHEET: &str = "Users";
const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
const DEFAULT_PAYMENT_DETAILS: &str =
    "You can pay at the studio desk before the class or by bank transfer to the studio account.";

/// Google Sheets location of the user table.
#[derive(Debug, Clone)]
pub struct SpreadsheetConfig {
    pub spreadsheet_id: String,
    pub service_account_file: PathBuf,
    pub worksheet: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub admin_ids: Vec<i64>,
    pub redis_url: Option<String>,
    pub spreadsheet: Option<SpreadsheetConfig>,
    pub timezone: Tz,
    pub user_refresh_secs: u64,
    pub dialogue_db: Option<String>,
    pub payment_details: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let admin_ids = parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default())?;

        let spreadsheet = match (non_empty_var("SPREADSHEET_ID"), non_empty_var("SERVICE_ACCOUNT_FILE")) {
            (Some(spreadsheet_id), Some(file)) => Some(SpreadsheetConfig {
                spreadsheet_id,
                service_account_file: PathBuf::from(file),
                worksheet: non_empty_var("USERS_WORKSHEET")
                    .unwrap_or_else(|| DEFAULT_WORKSHEET.to_string()),
            }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "SPREADSHEET_ID and SERVICE_ACCOUNT_FILE must be set together"
                ))
            }
        };

        let tz_name = non_empty_var("STUDIO_TIMEZONE")
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid STUDIO_TIMEZONE: {}", tz_name))?;

        let user_refresh_secs = match non_empty_var("USER_REFRESH_SECS") {
            Some(value) => value.trim()
                .parse()
                .map_err(|_| anyhow!("Invalid USER_REFRESH_SECS"))?,
            None => 600,
        };

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            admin_ids,
            redis_url: non_empty_var("REDIS_URL"),
            spreadsheet,
            timezone,
            user_refresh_secs,
            dialogue_db: non_empty_var("DIALOGUE_DB"),
            payment_details: non_empty_var("PAYMENT_DETAILS")
                .unwrap_or_else(|| DEFAULT_PAYMENT_DETAILS.to_string()),
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// `DATABASE_URL`, or the default SQLite file. Used on its own by the migration tool.
pub fn database_url_from_env() -> String {
    non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses a comma separated list of Telegram ids. Blank entries are skipped.
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| anyhow!("Invalid ADMIN_IDS entry: {}", s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids("").unwrap(), Vec::<i64>::new());
        assert_eq!(parse_admin_ids("1, 2 ,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_admin_ids("5,,6,").unwrap(), vec![5, 6]);
        assert!(parse_admin_ids("1,abc").is_err());
    }
}
