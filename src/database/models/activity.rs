use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// The four kinds of activity the studio runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Lesson,
    ChildStudio,
    EveningSketch,
    MassClass,
}

impl ActivityType {
    pub const ALL: [ActivityType; 4] = [
        ActivityType::Lesson,
        ActivityType::ChildStudio,
        ActivityType::EveningSketch,
        ActivityType::MassClass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Lesson => "lesson",
            ActivityType::ChildStudio => "child_studio",
            ActivityType::EveningSketch => "evening_sketch",
            ActivityType::MassClass => "mass_class",
        }
    }

    /// Human readable name used on buttons and cards.
    pub fn title(&self) -> &'static str {
        match self {
            ActivityType::Lesson => "🎨 Lessons",
            ActivityType::ChildStudio => "🧒 Child studio",
            ActivityType::EveningSketch => "🌙 Evening sketch",
            ActivityType::MassClass => "🖌 Master-classes",
        }
    }

    /// Whether a single sign-up may book several seats.
    pub fn allows_multiple_tickets(&self) -> bool {
        matches!(self, ActivityType::EveningSketch | ActivityType::MassClass)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(ActivityType::Lesson),
            "child_studio" => Ok(ActivityType::ChildStudio),
            "evening_sketch" => Ok(ActivityType::EveningSketch),
            "mass_class" => Ok(ActivityType::MassClass),
            other => Err(format!("unknown activity type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub activity_type: ActivityType,
    pub theme: String,
    pub description: String,
    pub image_ref: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields an admin supplies when creating an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub theme: String,
    pub description: String,
    pub image_ref: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: i64,
    activity_type: String,
    theme: String,
    description: String,
    image_ref: Option<String>,
    starts_at: Option<String>,
    created_at: String,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = sqlx::Error;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let activity_type = row.activity_type
            .parse::<ActivityType>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let starts_at = row.starts_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Activity {
            id: row.id,
            activity_type,
            theme: row.theme,
            description: row.description,
            image_ref: row.image_ref,
            starts_at,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// SQLite reports constraint violations as database errors whose message names the constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, activity_type, theme, description, image_ref, starts_at, created_at FROM activities";

impl Activity {
    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.map(Activity::try_from).transpose()
    }

    pub async fn find_by_type(
        pool: &sqlx::SqlitePool,
        activity_type: ActivityType,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_COLUMNS} WHERE activity_type = ? ORDER BY starts_at IS NULL, starts_at, theme"
        ))
        .bind(activity_type.as_str())
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }

    pub async fn find_all(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY activity_type, theme"
        ))
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }

    /// Inserts a new activity. Returns `None` when the theme is already taken for that type.
    pub async fn create(
        pool: &sqlx::SqlitePool,
        new: NewActivity,
    ) -> Result<Option<Self>, sqlx::Error> {
        let created_at = Utc::now().to_rfc3339();
        let starts_at = new.starts_at.map(|dt| dt.to_rfc3339());

        let result = sqlx::query(
            r#"
            INSERT INTO activities (activity_type, theme, description, image_ref, starts_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.activity_type.as_str())
        .bind(&new.theme)
        .bind(&new.description)
        .bind(&new.image_ref)
        .bind(&starts_at)
        .bind(&created_at)
        .execute(pool)
        .await;

        match result {
            Ok(done) => Self::find_by_id(pool, done.last_insert_rowid()).await,
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Renames an activity. Returns `false` if it does not exist or the new theme is taken.
    pub async fn update_theme(
        pool: &sqlx::SqlitePool,
        id: i64,
        theme: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE activities SET theme = ? WHERE id = ?")
            .bind(theme)
            .bind(id)
            .execute(pool)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn update_description(
        pool: &sqlx::SqlitePool,
        id: i64,
        description: &str,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("UPDATE activities SET description = ? WHERE id = ?")
            .bind(description)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(done.rows_affected() > 0)
    }

    pub async fn update_image(
        pool: &sqlx::SqlitePool,
        id: i64,
        image_ref: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("UPDATE activities SET image_ref = ? WHERE id = ?")
            .bind(image_ref)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(done.rows_affected() > 0)
    }

    pub async fn update_starts_at(
        pool: &sqlx::SqlitePool,
        id: i64,
        starts_at: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let starts_at = starts_at.map(|dt| dt.to_rfc3339());
        let done = sqlx::query("UPDATE activities SET starts_at = ? WHERE id = ?")
            .bind(starts_at)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(done.rows_affected() > 0)
    }

    pub async fn delete(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM activities WHERE id = ?")
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
    fn test_activity_type_string_forms() {
        for kind in ActivityType::ALL {
            assert_eq!(kind.as_str().parse::<ActivityType>().unwrap(), kind);
        }
        assert!("pottery".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_multiple_tickets_only_for_group_events() {
        assert!(!ActivityType::Lesson.allows_multiple_tickets());
        assert!(!ActivityType::ChildStudio.allows_multiple_tickets());
        assert!(ActivityType::EveningSketch.allows_multiple_tickets());
        assert!(ActivityType::MassClass.allows_multiple_tickets());
    }
}
