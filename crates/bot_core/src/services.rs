//! Domain services between the controller and the repositories.
//! Privilege and validation rules live here so every caller goes
//! through the same checks.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::domain::{Event, EventDraft, EventId, Participant, User, UserId};
use shared::error::DomainError;

use crate::ports::{
    EventRepository, NewEventRecord, PrivilegeChecker, RegistrationRepository, UserRepository,
};

#[derive(Clone)]
pub struct EventService {
    repo: Arc<dyn EventRepository>,
    privileges: Arc<dyn PrivilegeChecker>,
}

impl EventService {
    pub fn new(repo: Arc<dyn EventRepository>, privileges: Arc<dyn PrivilegeChecker>) -> Self {
        Self { repo, privileges }
    }

    pub async fn create(
        &self,
        owner_id: UserId,
        draft: &EventDraft,
        now: DateTime<Utc>,
    ) -> Result<EventId> {
        if !self.privileges.is_privileged(owner_id) {
            return Err(DomainError::PrivilegeDenied.into());
        }
        draft.validate()?;
        let starts_at = draft.starts_at.ok_or(DomainError::IncompleteDraft)?;

        self.repo
            .insert(&NewEventRecord {
                owner_id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                starts_at,
                created_at: now,
            })
            .await
    }

    pub async fn by_id(&self, event_id: EventId) -> Result<Option<Event>> {
        self.repo.by_id(event_id).await
    }

    pub async fn list_active(&self) -> Result<Vec<Event>> {
        self.repo.list_active().await
    }

    pub async fn list_archived(&self) -> Result<Vec<Event>> {
        self.repo.list_archived().await
    }

    pub async fn delete(&self, actor_id: UserId, event_id: EventId) -> Result<()> {
        if !self.privileges.is_privileged(actor_id) {
            return Err(DomainError::PrivilegeDenied.into());
        }
        if !self.repo.delete(event_id).await? {
            return Err(DomainError::EventNotFound.into());
        }
        Ok(())
    }

    pub async fn archive(&self, actor_id: UserId, event_id: EventId) -> Result<()> {
        if !self.privileges.is_privileged(actor_id) {
            return Err(DomainError::PrivilegeDenied.into());
        }
        if !self.repo.archive(event_id).await? {
            return Err(DomainError::EventNotFound.into());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RegistrationService {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
}

impl RegistrationService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
    ) -> Self {
        Self {
            events,
            registrations,
        }
    }

    /// Flips the user's registration. Returns the new membership state.
    pub async fn toggle(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if self.events.by_id(event_id).await?.is_none() {
            return Err(DomainError::EventNotFound.into());
        }

        if self.registrations.is_registered(event_id, user_id).await? {
            self.registrations.unregister(event_id, user_id).await?;
            Ok(false)
        } else {
            self.registrations.register(event_id, user_id, now).await?;
            Ok(true)
        }
    }

    pub async fn is_registered(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        self.registrations.is_registered(event_id, user_id).await
    }

    pub async fn participants(&self, event_id: EventId) -> Result<Vec<Participant>> {
        self.registrations.participants(event_id).await
    }
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(&self, user: &User) -> Result<()> {
        self.repo.upsert(user).await
    }

    pub async fn by_id(&self, user_id: UserId) -> Result<Option<User>> {
        self.repo.by_id(user_id).await
    }

    /// Best-effort display name; falls back to a neutral greeting.
    pub async fn display_name(&self, user_id: UserId) -> String {
        match self.repo.by_id(user_id).await {
            Ok(Some(user)) => user.display_name(),
            _ => "there".to_string(),
        }
    }
}
