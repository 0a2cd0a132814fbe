use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("invalid value for '{field}': {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Persisted follow-up state for one user and one reminder kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRecord {
    pub user_id: i64,
    pub reminder_count: u32,
    pub last_reminded: DateTime<Utc>,
    pub next_run: Option<DateTime<Utc>>,
    /// Activity the reminder is about; only sign-up reminders carry it.
    pub act_id: Option<i64>,
}

impl ReminderRecord {
    pub fn new(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            reminder_count: 0,
            last_reminded: now,
            next_run: None,
            act_id: None,
        }
    }

    pub fn for_activity(user_id: i64, act_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            act_id: Some(act_id),
            ..Self::new(user_id, now)
        }
    }

    /// Hash fields as stored in the key-value store. Timestamps are unix seconds.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("user_id", self.user_id.to_string()),
            ("reminder_count", self.reminder_count.to_string()),
            ("last_reminded", self.last_reminded.timestamp().to_string()),
        ];
        if let Some(next_run) = self.next_run {
            fields.push(("next_run", next_run.timestamp().to_string()));
        }
        if let Some(act_id) = self.act_id {
            fields.push(("act_id", act_id.to_string()));
        }
        fields
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, RecordError> {
        let user_id = parse_field::<i64>(fields, "user_id")?;
        let reminder_count = parse_field::<u32>(fields, "reminder_count")?;
        let last_reminded = timestamp_field(fields, "last_reminded")?;
        let next_run = match fields.get("next_run") {
            Some(_) => Some(timestamp_field(fields, "next_run")?),
            None => None,
        };
        let act_id = match fields.get("act_id") {
            Some(_) => Some(parse_field::<i64>(fields, "act_id")?),
            None => None,
        };

        Ok(Self {
            user_id,
            reminder_count,
            last_reminded,
            next_run,
            act_id,
        })
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<T, RecordError> {
    let raw = fields.get(name).ok_or(RecordError::MissingField(name))?;
    raw.trim().parse::<T>().map_err(|_| RecordError::InvalidField {
        field: name,
        value: raw.clone(),
    })
}

fn timestamp_field(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<DateTime<Utc>, RecordError> {
    let secs = parse_field::<i64>(fields, name)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| RecordError::InvalidField {
            field: name,
            value: secs.to_string(),
        })
}

/// Store key for a user under a kind prefix, e.g. `payment:pending:42`.
pub fn record_key(prefix: &str, user_id: i64) -> String {
    format!("{prefix}{user_id}")
}
