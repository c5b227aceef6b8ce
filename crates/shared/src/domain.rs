use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(ChatId);
id_newtype!(MessageId);
id_newtype!(EventId);

/// Title limit, counted in Unicode scalar values rather than bytes.
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub username: String,
}

impl User {
    pub fn display_name(&self) -> String {
        if !self.first_name.is_empty() {
            self.first_name.clone()
        } else if !self.username.is_empty() {
            format!("@{}", self.username)
        } else {
            format!("user {}", self.id.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: User,
    pub registered_at: DateTime<Utc>,
}

/// A persisted event. Immutable once created; `archived` is the only
/// field that changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub archived: bool,
}

/// The event under construction inside a wizard. `starts_at` stays
/// empty until the time picker confirms a full date-time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub starts_at: Option<DateTime<Utc>>,
}

impl EventDraft {
    pub fn new(owner_id: UserId) -> Self {
        Self {
            owner_id,
            title: String::new(),
            description: String::new(),
            starts_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let title_chars = self.title.chars().count();
        if title_chars == 0 || title_chars > MAX_TITLE_CHARS {
            return Err(DomainError::InvalidTitle);
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(DomainError::InvalidDescription);
        }
        if self.starts_at.is_none() {
            return Err(DomainError::IncompleteDraft);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Title,
    Description,
    Date,
    Time,
    Confirm,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerStage {
    Hours,
    Minutes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePickerState {
    pub stage: PickerStage,
    pub temp_hours: Option<u32>,
    pub temp_minutes: Option<u32>,
    pub selected_time: Option<DateTime<Utc>>,
}

impl Default for TimePickerState {
    fn default() -> Self {
        Self {
            stage: PickerStage::Hours,
            temp_hours: None,
            temp_minutes: None,
            selected_time: None,
        }
    }
}

/// One in-flight creation wizard. Keyed by the owner's user id in the
/// state store; at most one exists per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: WizardStep,
    pub draft: EventDraft,
    #[serde(default)]
    pub time_picker: TimePickerState,
    pub selected_date: Option<NaiveDate>,
    pub active_message_id: Option<MessageId>,
    pub started_at: DateTime<Utc>,
}

impl WizardState {
    pub fn new(owner_id: UserId, started_at: DateTime<Utc>) -> Self {
        Self {
            step: WizardStep::Title,
            draft: EventDraft::new(owner_id),
            time_picker: TimePickerState::default(),
            selected_date: None,
            active_message_id: None,
            started_at,
        }
    }

    pub fn owner_id(&self) -> UserId {
        self.draft.owner_id
    }
}
