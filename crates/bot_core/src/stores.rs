//! Sqlite-backed implementations of the core's ports, bridging onto
//! [`storage::Storage`], plus the static admin-list privilege checker.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::domain::{Event, EventId, Participant, User, UserId, WizardState};
use storage::{NewEvent, Storage};

use crate::ports::{
    EventRepository, NewEventRecord, PrivilegeChecker, RegistrationRepository, UserRepository,
    WizardStateStore,
};

#[async_trait]
impl WizardStateStore for Storage {
    async fn get(&self, user_id: UserId) -> Result<Option<WizardState>> {
        self.wizard_state(user_id).await
    }

    async fn put(&self, user_id: UserId, state: &WizardState) -> Result<()> {
        self.save_wizard_state(user_id, state).await
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        self.delete_wizard_state(user_id).await
    }
}

#[async_trait]
impl EventRepository for Storage {
    async fn insert(&self, event: &NewEventRecord) -> Result<EventId> {
        self.insert_event(&NewEvent {
            owner_id: event.owner_id,
            title: event.title.clone(),
            description: event.description.clone(),
            starts_at: event.starts_at,
            created_at: event.created_at,
        })
        .await
    }

    async fn by_id(&self, event_id: EventId) -> Result<Option<Event>> {
        self.event_by_id(event_id).await
    }

    async fn list_active(&self) -> Result<Vec<Event>> {
        self.list_active_events().await
    }

    async fn list_archived(&self) -> Result<Vec<Event>> {
        self.list_archived_events().await
    }

    async fn delete(&self, event_id: EventId) -> Result<bool> {
        self.delete_event(event_id).await
    }

    async fn archive(&self, event_id: EventId) -> Result<bool> {
        self.archive_event(event_id).await
    }
}

#[async_trait]
impl RegistrationRepository for Storage {
    async fn register(&self, event_id: EventId, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
        Storage::register(self, event_id, user_id, at).await
    }

    async fn unregister(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        Storage::unregister(self, event_id, user_id).await
    }

    async fn is_registered(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        Storage::is_registered(self, event_id, user_id).await
    }

    async fn participants(&self, event_id: EventId) -> Result<Vec<Participant>> {
        Storage::participants(self, event_id).await
    }
}

#[async_trait]
impl UserRepository for Storage {
    async fn upsert(&self, user: &User) -> Result<()> {
        self.upsert_user(user).await
    }

    async fn by_id(&self, user_id: UserId) -> Result<Option<User>> {
        self.user_by_id(user_id).await
    }
}

/// Privilege check backed by a fixed id list from configuration.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    admins: Vec<UserId>,
}

impl AdminList {
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl PrivilegeChecker for AdminList {
    fn is_privileged(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }
}
