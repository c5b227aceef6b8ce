use chrono::{Duration, TimeZone};
use shared::domain::{MessageId, WizardStep};

use super::*;

fn sample_user(id: i64, name: &str) -> User {
    User {
        id: UserId(id),
        first_name: name.to_string(),
        username: name.to_lowercase(),
    }
}

fn sample_event(owner: i64, title: &str, offset_hours: i64) -> NewEvent {
    let base = Utc.with_ymd_and_hms(2026, 9, 15, 9, 30, 0).single().expect("date");
    NewEvent {
        owner_id: UserId(owner),
        title: title.to_string(),
        description: "daily sync".to_string(),
        starts_at: base + Duration::hours(offset_hours),
        created_at: base,
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("eventbot_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("events.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn upsert_user_refreshes_existing_rows() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_user(&sample_user(1, "Alice"))
        .await
        .expect("insert");

    let renamed = User {
        first_name: "Alicia".to_string(),
        ..sample_user(1, "Alice")
    };
    storage.upsert_user(&renamed).await.expect("update");

    let stored = storage
        .user_by_id(UserId(1))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(stored.first_name, "Alicia");
}

#[tokio::test]
async fn missing_user_is_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.user_by_id(UserId(404)).await.expect("get").is_none());
}

#[tokio::test]
async fn inserts_and_fetches_events() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_event(&sample_event(1, "Standup", 0))
        .await
        .expect("insert");
    assert!(id.0 > 0);

    let event = storage
        .event_by_id(id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(event.title, "Standup");
    assert_eq!(event.owner_id, UserId(1));
    assert!(!event.archived);
    assert_eq!(
        event.starts_at,
        Utc.with_ymd_and_hms(2026, 9, 15, 9, 30, 0).single().expect("date")
    );
}

#[tokio::test]
async fn active_listing_orders_by_start_and_skips_archived() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let later = storage
        .insert_event(&sample_event(1, "Retro", 4))
        .await
        .expect("later");
    let earlier = storage
        .insert_event(&sample_event(1, "Standup", 1))
        .await
        .expect("earlier");
    let archived = storage
        .insert_event(&sample_event(1, "Old", 2))
        .await
        .expect("archived");

    assert!(storage.archive_event(archived).await.expect("archive"));

    let active = storage.list_active_events().await.expect("list");
    assert_eq!(
        active.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![earlier, later]
    );

    let archived_list = storage.list_archived_events().await.expect("archived list");
    assert_eq!(archived_list.len(), 1);
    assert_eq!(archived_list[0].id, archived);
}

#[tokio::test]
async fn lists_events_by_owner_only() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mine = storage
        .insert_event(&sample_event(1, "Standup", 0))
        .await
        .expect("mine");
    storage
        .insert_event(&sample_event(2, "Retro", 1))
        .await
        .expect("theirs");

    let owned = storage.events_by_owner(UserId(1)).await.expect("owned");
    assert_eq!(owned.iter().map(|e| e.id).collect::<Vec<_>>(), vec![mine]);
}

#[tokio::test]
async fn archive_is_idempotent_per_event() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_event(&sample_event(1, "Standup", 0))
        .await
        .expect("insert");

    assert!(storage.archive_event(id).await.expect("first"));
    assert!(!storage.archive_event(id).await.expect("second"));
}

#[tokio::test]
async fn delete_event_removes_event_and_registrations() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_user(&sample_user(2, "Bob"))
        .await
        .expect("user");
    let id = storage
        .insert_event(&sample_event(1, "Standup", 0))
        .await
        .expect("insert");
    storage
        .register(id, UserId(2), Utc::now())
        .await
        .expect("register");

    assert!(storage.delete_event(id).await.expect("delete"));
    assert!(storage.event_by_id(id).await.expect("get").is_none());
    assert!(!storage
        .is_registered(id, UserId(2))
        .await
        .expect("registered"));
    assert!(!storage.delete_event(id).await.expect("second delete"));
}

#[tokio::test]
async fn registration_toggles_and_lists_participants() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_user(&sample_user(2, "Bob"))
        .await
        .expect("user");
    let id = storage
        .insert_event(&sample_event(1, "Standup", 0))
        .await
        .expect("insert");

    assert!(!storage
        .is_registered(id, UserId(2))
        .await
        .expect("initial"));
    storage
        .register(id, UserId(2), Utc::now())
        .await
        .expect("register");
    // A duplicate registration is a no-op, not an error.
    storage
        .register(id, UserId(2), Utc::now())
        .await
        .expect("duplicate register");
    assert!(storage
        .is_registered(id, UserId(2))
        .await
        .expect("registered"));

    let participants = storage.participants(id).await.expect("participants");
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].user.first_name, "Bob");

    assert!(storage.unregister(id, UserId(2)).await.expect("unregister"));
    assert!(!storage
        .unregister(id, UserId(2))
        .await
        .expect("second unregister"));
}

#[tokio::test]
async fn paginates_participants_with_total_count() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_event(&sample_event(1, "Standup", 0))
        .await
        .expect("insert");

    for i in 0..5 {
        storage
            .upsert_user(&sample_user(10 + i, &format!("U{i}")))
            .await
            .expect("user");
        storage
            .register(id, UserId(10 + i), Utc::now() + Duration::seconds(i))
            .await
            .expect("register");
    }

    let (page, total) = storage.participants_page(id, 2, 2).await.expect("page");
    assert_eq!(total, 5);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].user.id, UserId(12));
}

#[tokio::test]
async fn wizard_state_round_trips_and_deletes() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let owner = UserId(7);

    assert!(storage.wizard_state(owner).await.expect("empty").is_none());

    let mut state = WizardState::new(owner, Utc::now());
    state.step = WizardStep::Description;
    state.draft.title = "Standup".to_string();
    state.active_message_id = Some(MessageId(99));
    storage
        .save_wizard_state(owner, &state)
        .await
        .expect("save");

    let loaded = storage
        .wizard_state(owner)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(loaded, state);

    // Overwrite wins over the previous blob.
    state.step = WizardStep::Date;
    storage
        .save_wizard_state(owner, &state)
        .await
        .expect("overwrite");
    let loaded = storage
        .wizard_state(owner)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(loaded.step, WizardStep::Date);

    storage.delete_wizard_state(owner).await.expect("delete");
    assert!(storage.wizard_state(owner).await.expect("gone").is_none());
}
