#![allow(clippy::unwrap_used)]

mod common;

use art_studio_bot::database::models::{ActivityType, NewActivity};
use art_studio_bot::services::activities::ActivityRepository;
use chrono::{Duration, Utc};
use common::setup_test_db;

fn new_activity(activity_type: ActivityType, theme: &str) -> NewActivity {
    NewActivity {
        activity_type,
        theme: theme.to_string(),
        description: format!("{theme} in oil"),
        image_ref: None,
        starts_at: None,
    }
}

#[tokio::test]
async fn test_add_and_fetch_activity() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());

    let created = repo
        .add_activity(new_activity(ActivityType::Lesson, "Still life"))
        .await
        .unwrap()
        .unwrap();

    let fetched = repo.get_activity_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.activity_type, ActivityType::Lesson);
    assert!(fetched.starts_at.is_none());

    let by_theme = repo
        .get_activity_by_theme(ActivityType::Lesson, "Still life")
        .await
        .unwrap();
    assert_eq!(by_theme.map(|a| a.id), Some(created.id));
}

#[tokio::test]
async fn test_duplicate_theme_per_type_is_rejected() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());

    assert!(repo.add_activity(new_activity(ActivityType::Lesson, "Clouds")).await.unwrap().is_some());
    assert!(repo.add_activity(new_activity(ActivityType::Lesson, "Clouds")).await.unwrap().is_none());
    // Same theme under another type is a different activity.
    assert!(repo.add_activity(new_activity(ActivityType::MassClass, "Clouds")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_by_type_sees_writes_through_cache() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());

    assert!(repo.get_activities_by_type(ActivityType::EveningSketch).await.unwrap().is_empty());

    let created = repo
        .add_activity(new_activity(ActivityType::EveningSketch, "Figures"))
        .await
        .unwrap()
        .unwrap();
    let listed = repo.get_activities_by_type(ActivityType::EveningSketch).await.unwrap();
    assert_eq!(listed.len(), 1);

    assert!(repo.update_activity_theme(created.id, "Figures in motion").await.unwrap());
    let listed = repo.get_activities_by_type(ActivityType::EveningSketch).await.unwrap();
    assert_eq!(listed[0].theme, "Figures in motion");

    assert!(repo.remove_activity(created.id).await.unwrap());
    assert!(repo.get_activities_by_type(ActivityType::EveningSketch).await.unwrap().is_empty());
    assert!(repo.get_activity_by_id(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_field_updates() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());
    let created = repo
        .add_activity(new_activity(ActivityType::ChildStudio, "Animals"))
        .await
        .unwrap()
        .unwrap();
    let starts_at = Utc::now() + Duration::days(7);

    assert!(repo.update_activity_description(created.id, "Drawing cats and dogs").await.unwrap());
    assert!(repo.update_activity_image(created.id, Some("file-123")).await.unwrap());
    assert!(repo.update_activity_start(created.id, Some(starts_at)).await.unwrap());

    let updated = repo.get_activity_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(updated.description, "Drawing cats and dogs");
    assert_eq!(updated.image_ref.as_deref(), Some("file-123"));
    assert_eq!(updated.starts_at.map(|t| t.timestamp()), Some(starts_at.timestamp()));

    assert!(repo.update_activity_image(created.id, None).await.unwrap());
    assert!(repo.get_activity_by_id(created.id).await.unwrap().unwrap().image_ref.is_none());
}

#[tokio::test]
async fn test_updates_on_missing_activity_report_false() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());

    assert!(!repo.update_activity_theme(999, "Nothing").await.unwrap());
    assert!(!repo.update_activity_description(999, "Nothing").await.unwrap());
    assert!(!repo.remove_activity(999).await.unwrap());
}

#[tokio::test]
async fn test_rename_to_taken_theme_fails() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());
    repo.add_activity(new_activity(ActivityType::Lesson, "Trees")).await.unwrap();
    let other = repo
        .add_activity(new_activity(ActivityType::Lesson, "Rivers"))
        .await
        .unwrap()
        .unwrap();

    assert!(!repo.update_activity_theme(other.id, "Trees").await.unwrap());
    assert_eq!(repo.get_activity_by_id(other.id).await.unwrap().unwrap().theme, "Rivers");
}

#[tokio::test]
async fn test_get_activities_lists_every_type() {
    let (db, _dir) = setup_test_db().await;
    let repo = ActivityRepository::new(db.pool.clone());
    for activity_type in ActivityType::ALL {
        repo.add_activity(new_activity(activity_type, "Open theme")).await.unwrap();
    }

    assert_eq!(repo.get_activities().await.unwrap().len(), ActivityType::ALL.len());
}
