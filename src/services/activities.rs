//! Activity repository: SQLite rows behind a short-lived moka cache.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use sqlx::SqlitePool;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::database::models::{Activity, ActivityType, NewActivity};
use crate::utils::logging::log_database_operation;

/// Cached reads live this long unless a write invalidates them first.
pub const ACTIVITY_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
    by_id: Cache<i64, Option<Activity>>,
    by_type: Cache<ActivityType, Arc<Vec<Activity>>>,
    /// Bumped on every write; a read that saw an older value must not populate the cache.
    generation: Arc<AtomicU64>,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_ttl(pool, ACTIVITY_CACHE_TTL)
    }

    pub fn with_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        Self {
            pool,
            by_id: Cache::builder().max_capacity(1_000).time_to_live(ttl).build(),
            by_type: Cache::builder().max_capacity(16).time_to_live(ttl).build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get_activity_by_id(&self, id: i64) -> Result<Option<Activity>, sqlx::Error> {
        if let Some(cached) = self.by_id.get(&id).await {
            return Ok(cached);
        }
        let seen = self.generation.load(Ordering::Acquire);
        log_database_operation("SELECT", "activities", Some(&format!("id={id}")));
        let activity = Activity::find_by_id(&self.pool, id).await?;
        self.cache_if_current(&self.by_id, id, activity.clone(), seen).await;
        Ok(activity)
    }

    pub async fn get_activities_by_type(
        &self,
        activity_type: ActivityType,
    ) -> Result<Arc<Vec<Activity>>, sqlx::Error> {
        if let Some(cached) = self.by_type.get(&activity_type).await {
            return Ok(cached);
        }
        let seen = self.generation.load(Ordering::Acquire);
        log_database_operation("SELECT", "activities", Some(&format!("type={activity_type}")));
        let activities = Arc::new(Activity::find_by_type(&self.pool, activity_type).await?);
        self.cache_if_current(&self.by_type, activity_type, Arc::clone(&activities), seen)
            .await;
        Ok(activities)
    }

    pub async fn get_activity_by_theme(
        &self,
        activity_type: ActivityType,
        theme: &str,
    ) -> Result<Option<Activity>, sqlx::Error> {
        let activities = self.get_activities_by_type(activity_type).await?;
        Ok(activities.iter().find(|a| a.theme == theme).cloned())
    }

    /// Every activity, for the admin overview. Not cached.
    pub async fn get_activities(&self) -> Result<Vec<Activity>, sqlx::Error> {
        Activity::find_all(&self.pool).await
    }

    /// Returns `None` if the theme already exists for that type.
    pub async fn add_activity(&self, new: NewActivity) -> Result<Option<Activity>, sqlx::Error> {
        log_database_operation("INSERT", "activities", Some(&new.theme));
        let created = Activity::create(&self.pool, new).await?;
        self.invalidate();
        Ok(created)
    }

    pub async fn update_activity_theme(&self, id: i64, theme: &str) -> Result<bool, sqlx::Error> {
        let updated = Activity::update_theme(&self.pool, id, theme).await?;
        self.invalidate();
        Ok(updated)
    }

    pub async fn update_activity_description(&self, id: i64, description: &str) -> Result<bool, sqlx::Error> {
        let updated = Activity::update_description(&self.pool, id, description).await?;
        self.invalidate();
        Ok(updated)
    }

    pub async fn update_activity_image(&self, id: i64, image_ref: Option<&str>) -> Result<bool, sqlx::Error> {
        let updated = Activity::update_image(&self.pool, id, image_ref).await?;
        self.invalidate();
        Ok(updated)
    }

    pub async fn update_activity_start(
        &self,
        id: i64,
        starts_at: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let updated = Activity::update_starts_at(&self.pool, id, starts_at).await?;
        self.invalidate();
        Ok(updated)
    }

    pub async fn remove_activity(&self, id: i64) -> Result<bool, sqlx::Error> {
        log_database_operation("DELETE", "activities", Some(&format!("id={id}")));
        let removed = Activity::delete(&self.pool, id).await?;
        self.invalidate();
        Ok(removed)
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.by_id.invalidate_all();
        self.by_type.invalidate_all();
    }

    /// Caches a value read at generation `seen` unless a write has happened since.
    ///
    /// The second check covers a write that lands between the first check and the insert;
    /// a write after it is covered by that write's own `invalidate_all`.
    async fn cache_if_current<K, V>(&self, cache: &Cache<K, V>, key: K, value: V, seen: u64)
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if self.generation.load(Ordering::Acquire) != seen {
            return;
        }
        cache.insert(key.clone(), value).await;
        if self.generation.load(Ordering::Acquire) != seen {
            cache.invalidate(&key).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::database::connection::DatabaseManager;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_from_before_a_write_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("activities.db").display());
        let db = DatabaseManager::new(&url).await.unwrap();
        db.run_migrations().await.unwrap();
        let repo = ActivityRepository::new(db.pool.clone());

        let created = repo
            .add_activity(NewActivity {
                activity_type: ActivityType::Lesson,
                theme: "Old bridge".to_string(),
                description: String::new(),
                image_ref: None,
                starts_at: None,
            })
            .await
            .unwrap()
            .unwrap();

        // A reader fetched the row, then an admin renamed it before the reader cached it.
        let seen = repo.generation.load(Ordering::Acquire);
        let stale = Activity::find_by_id(&db.pool, created.id).await.unwrap();
        assert!(repo.update_activity_theme(created.id, "New bridge").await.unwrap());
        repo.cache_if_current(&repo.by_id, created.id, stale, seen).await;

        let fresh = repo.get_activity_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fresh.theme, "New bridge");
    }
}
