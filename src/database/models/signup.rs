use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::activity::{parse_timestamp, ActivityType};

/// Purchase option chosen during the sign-up dialog. Each activity type has its own set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonOption {
    SingleLesson,
    FourLessonPass,
    EightLessonPass,
    TrialClass,
    MonthlyPass,
    DropIn,
    Ticket,
}

impl LessonOption {
    pub fn for_type(activity_type: ActivityType) -> &'static [LessonOption] {
        match activity_type {
            ActivityType::Lesson => &[
                LessonOption::SingleLesson,
                LessonOption::FourLessonPass,
                LessonOption::EightLessonPass,
            ],
            ActivityType::ChildStudio => &[LessonOption::TrialClass, LessonOption::MonthlyPass],
            ActivityType::EveningSketch => &[LessonOption::DropIn],
            ActivityType::MassClass => &[LessonOption::Ticket],
        }
    }

    pub fn is_valid_for(&self, activity_type: ActivityType) -> bool {
        Self::for_type(activity_type).contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonOption::SingleLesson => "single",
            LessonOption::FourLessonPass => "pass4",
            LessonOption::EightLessonPass => "pass8",
            LessonOption::TrialClass => "trial",
            LessonOption::MonthlyPass => "monthly",
            LessonOption::DropIn => "dropin",
            LessonOption::Ticket => "ticket",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LessonOption::SingleLesson => "Single lesson",
            LessonOption::FourLessonPass => "Pass for 4 lessons",
            LessonOption::EightLessonPass => "Pass for 8 lessons",
            LessonOption::TrialClass => "Trial class",
            LessonOption::MonthlyPass => "Monthly pass",
            LessonOption::DropIn => "Drop-in session",
            LessonOption::Ticket => "Ticket",
        }
    }
}

impl fmt::Display for LessonOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(LessonOption::SingleLesson),
            "pass4" => Ok(LessonOption::FourLessonPass),
            "pass8" => Ok(LessonOption::EightLessonPass),
            "trial" => Ok(LessonOption::TrialClass),
            "monthly" => Ok(LessonOption::MonthlyPass),
            "dropin" => Ok(LessonOption::DropIn),
            "ticket" => Ok(LessonOption::Ticket),
            other => Err(format!("unknown lesson option '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupStatus {
    Pending,
    Paid,
    Cancelled,
}

impl SignupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupStatus::Pending => "pending",
            SignupStatus::Paid => "paid",
            SignupStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SignupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SignupStatus::Pending),
            "paid" => Ok(SignupStatus::Paid),
            "cancelled" => Ok(SignupStatus::Cancelled),
            other => Err(format!("unknown sign-up status '{other}'")),
        }
    }
}

/// A sign-up being assembled by the dialog. Lives in dialogue state until confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonActivity {
    pub activity_type: ActivityType,
    pub activity_id: i64,
    pub option: LessonOption,
    pub topic: String,
    pub tickets: u8,
    pub status: SignupStatus,
    pub created_at: DateTime<Utc>,
}

impl LessonActivity {
    pub fn new(activity_type: ActivityType, activity_id: i64, option: LessonOption, topic: String) -> Self {
        Self {
            activity_type,
            activity_id,
            option,
            topic,
            tickets: 1,
            status: SignupStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signup {
    pub id: i64,
    pub user_id: i64,
    pub activity_id: i64,
    pub activity_type: ActivityType,
    pub option: LessonOption,
    pub topic: String,
    pub tickets: i64,
    pub status: SignupStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SignupRow {
    id: i64,
    user_id: i64,
    activity_id: i64,
    activity_type: String,
    option: String,
    topic: String,
    tickets: i64,
    status: String,
    created_at: String,
}

impl TryFrom<SignupRow> for Signup {
    type Error = sqlx::Error;

    fn try_from(row: SignupRow) -> Result<Self, Self::Error> {
        let decode = |e: String| sqlx::Error::Decode(e.into());
        Ok(Signup {
            id: row.id,
            user_id: row.user_id,
            activity_id: row.activity_id,
            activity_type: row.activity_type.parse().map_err(decode)?,
            option: row.option.parse().map_err(decode)?,
            topic: row.topic,
            tickets: row.tickets,
            status: row.status.parse().map_err(decode)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, activity_id, activity_type, option, topic, tickets, status, created_at FROM signups";

impl Signup {
    /// Persists a confirmed dialog draft.
    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        draft: &LessonActivity,
    ) -> Result<Self, sqlx::Error> {
        let done = sqlx::query(
            r#"
            INSERT INTO signups (user_id, activity_id, activity_type, option, topic, tickets, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(draft.activity_id)
        .bind(draft.activity_type.as_str())
        .bind(draft.option.as_str())
        .bind(&draft.topic)
        .bind(i64::from(draft.tickets))
        .bind(draft.status.as_str())
        .bind(draft.created_at.to_rfc3339())
        .execute(pool)
        .await?;

        Self::find_by_id(pool, done.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, SignupRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.map(Signup::try_from).transpose()
    }

    /// Sign-ups of a user that are not cancelled, newest first.
    pub async fn find_active_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SignupRow>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? AND status != 'cancelled' ORDER BY id DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Signup::try_from).collect()
    }

    pub async fn find_pending_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SignupRow>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? AND status = 'pending' ORDER BY id DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Signup::try_from).collect()
    }

    pub async fn latest_pending_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        Ok(Self::find_pending_by_user(pool, user_id).await?.into_iter().next())
    }

    /// Marks a pending sign-up as paid. Returns `false` if there was nothing pending to mark.
    pub async fn mark_paid(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        Self::set_status(pool, id, SignupStatus::Paid).await
    }

    pub async fn cancel(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        Self::set_status(pool, id, SignupStatus::Cancelled).await
    }

    async fn set_status(
        pool: &sqlx::SqlitePool,
        id: i64,
        status: SignupStatus,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("UPDATE signups SET status = ? WHERE id = ? AND status = 'pending'")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await?;

        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_options() {
        for kind in ActivityType::ALL {
            assert!(!LessonOption::for_type(kind).is_empty());
        }
    }

    #[test]
    fn test_option_belongs_to_type() {
        assert!(LessonOption::FourLessonPass.is_valid_for(ActivityType::Lesson));
        assert!(!LessonOption::FourLessonPass.is_valid_for(ActivityType::MassClass));
        assert!(LessonOption::Ticket.is_valid_for(ActivityType::MassClass));
    }

    #[test]
    fn test_option_codes_parse_back() {
        for kind in ActivityType::ALL {
            for option in LessonOption::for_type(kind) {
                assert_eq!(option.as_str().parse::<LessonOption>().unwrap(), *option);
            }
        }
    }
}
