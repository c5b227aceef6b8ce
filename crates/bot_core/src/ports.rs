use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{ChatId, Event, EventId, MessageId, Participant, User, UserId, WizardState},
    keyboard::InlineKeyboard,
};

/// Outcome of an edit/delete against a message the transport may no
/// longer have. A missing message is an expected condition, not an
/// error: the caller falls back to sending a fresh message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    MessageMissing,
}

/// Capability set the controller needs from the messaging transport.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId>;

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<EditOutcome>;

    async fn edit_keyboard(
        &self,
        chat: ChatId,
        message: MessageId,
        keyboard: InlineKeyboard,
    ) -> Result<EditOutcome>;

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<EditOutcome>;

    /// Ephemeral acknowledgement of a button press, visible only to
    /// the presser.
    async fn notify(&self, interaction_id: &str, text: &str) -> Result<()>;
}

/// One wizard state per user; `put` overwrites unconditionally.
#[async_trait]
pub trait WizardStateStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<WizardState>>;
    async fn put(&self, user_id: UserId, state: &WizardState) -> Result<()>;
    async fn delete(&self, user_id: UserId) -> Result<()>;
}

/// Insert form of an event handed to the repository.
#[derive(Debug, Clone)]
pub struct NewEventRecord {
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &NewEventRecord) -> Result<EventId>;
    async fn by_id(&self, event_id: EventId) -> Result<Option<Event>>;
    async fn list_active(&self) -> Result<Vec<Event>>;
    async fn list_archived(&self) -> Result<Vec<Event>>;
    /// Returns false when no such event existed.
    async fn delete(&self, event_id: EventId) -> Result<bool>;
    /// Returns false when the event was missing or already archived.
    async fn archive(&self, event_id: EventId) -> Result<bool>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn register(&self, event_id: EventId, user_id: UserId, at: DateTime<Utc>) -> Result<()>;
    async fn unregister(&self, event_id: EventId, user_id: UserId) -> Result<bool>;
    async fn is_registered(&self, event_id: EventId, user_id: UserId) -> Result<bool>;
    async fn participants(&self, event_id: EventId) -> Result<Vec<Participant>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn upsert(&self, user: &User) -> Result<()>;
    async fn by_id(&self, user_id: UserId) -> Result<Option<User>>;
}

/// Consulted before a wizard may start and again at finalize.
pub trait PrivilegeChecker: Send + Sync {
    fn is_privileged(&self, user_id: UserId) -> bool;
}
