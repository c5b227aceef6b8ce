//! Conversation core of the event assistant.
//!
//! A [`Controller`] consumes inbound transport updates (free text and
//! button presses), drives the per-user event-creation wizard, and
//! talks to the outside world only through the port traits in
//! [`ports`]. All dependencies are constructor-injected so every piece
//! is testable against in-memory fakes.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use shared::{
    domain::{ChatId, MessageId, UserId},
    keyboard::InlineKeyboard,
    payload::CallbackPayload,
    update::{ButtonPress, InboundUpdate, TextMessage},
};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub mod calendar;
pub mod events;
pub mod ports;
pub mod services;
pub mod stores;
pub mod timepicker;
pub mod wizard;

pub use ports::{
    EditOutcome, EventRepository, MessageChannel, NewEventRecord, PrivilegeChecker,
    RegistrationRepository, UserRepository, WizardStateStore,
};
pub use services::{EventService, RegistrationService, UserService};
pub use stores::AdminList;

pub const PROMPT_TITLE: &str = "Enter the event title:";
pub const PROMPT_DESCRIPTION: &str = "Enter the event description:";
pub const PROMPT_DATE: &str = "Pick the event date:";
pub const PROMPT_TIME: &str = "Pick a time:";

pub const MSG_SESSION_EXPIRED: &str =
    "Your event-creation session has expired. Start again with /new_event";
pub const MSG_SAVE_ERROR: &str = "Failed to save your progress";
pub const MSG_TITLE_EMPTY: &str = "The title cannot be empty";
pub const MSG_TITLE_TOO_LONG: &str = "The title is too long (max 100 characters)";
pub const MSG_DESCRIPTION_TOO_LONG: &str = "The description is too long (max 500 characters)";
pub const MSG_INCOMPLETE_DATA: &str = "The event is missing required data";
pub const MSG_PRIVILEGED_ONLY: &str = "Only privileged users can create events";
pub const MSG_EVENT_SAVE_ERROR: &str = "Failed to save the event";
pub const MSG_CALENDAR_FORBIDDEN: &str = "This calendar belongs to another user";
pub const MSG_TIME_FORBIDDEN: &str = "Only the wizard owner can pick the time";
pub const MSG_NO_DATE_CHOSEN: &str = "No date chosen yet";
pub const MSG_TIME_INCOMPLETE: &str = "Pick an hour and a minute first";
pub const MSG_INVALID_TIME: &str = "Invalid time value";
pub const MSG_WIZARD_CANCELLED: &str = "Event creation cancelled";
pub const MSG_NOTHING_TO_CANCEL: &str = "Nothing to cancel";
pub const MSG_CANCEL_FAILED: &str = "Failed to cancel the current action";
pub const MSG_ACCESS_DENIED: &str = "Access denied";
pub const MSG_EVENT_GONE: &str = "This event no longer exists";
pub const MSG_REGISTRATION_FAILED: &str = "Registration failed";
pub const MSG_NO_PARTICIPANTS: &str = "No one has registered yet";
pub const MSG_EVENT_DELETED: &str = "Event deleted";
pub const MSG_EVENT_ARCHIVED: &str = "Event moved to the archive";
pub const MSG_NO_EVENTS: &str = "There are no events yet";
pub const MSG_NO_ARCHIVED_EVENTS: &str = "The archive is empty";
pub const MSG_EVENTS_LOAD_ERROR: &str = "Failed to load events";
pub const MSG_PARTICIPANTS_LOAD_ERROR: &str = "Failed to load participants";
pub const MSG_DELETE_FAILED: &str = "Failed to delete the event";
pub const MSG_ARCHIVE_FAILED: &str = "Failed to archive the event";

pub struct Controller {
    channel: Arc<dyn MessageChannel>,
    states: Arc<dyn WizardStateStore>,
    events: EventService,
    registrations: RegistrationService,
    users: UserService,
    privileges: Arc<dyn PrivilegeChecker>,
    // One guard per wizard owner; serializes each read-modify-write
    // cycle so a double-tap cannot interleave with itself.
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl Controller {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        states: Arc<dyn WizardStateStore>,
        events: EventService,
        registrations: RegistrationService,
        users: UserService,
        privileges: Arc<dyn PrivilegeChecker>,
    ) -> Self {
        Self {
            channel,
            states,
            events,
            registrations,
            users,
            privileges,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Single entry point. Domain failures are reported to the user
    /// and resolved here; only unclassified errors propagate so the
    /// caller can log and keep serving other users.
    pub async fn handle(&self, update: InboundUpdate) -> Result<()> {
        let subject = match &update {
            InboundUpdate::Text(msg) => msg.sender.id,
            InboundUpdate::Button(press) => {
                press.payload.wizard_owner().unwrap_or(press.presser.id)
            }
        };
        let lock = self.user_lock(subject).await;
        let _guard = lock.lock().await;

        match update {
            InboundUpdate::Text(msg) => self.handle_text(msg).await,
            InboundUpdate::Button(press) => self.handle_button(press).await,
        }
    }

    async fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn handle_text(&self, msg: TextMessage) -> Result<()> {
        if let Err(err) = self.users.record(&msg.sender).await {
            warn!(error = %err, user_id = msg.sender.id.0, "failed to record user");
        }

        match command_of(&msg.text) {
            Some("start") => self.handle_start(&msg).await,
            Some("help") => self.handle_help(&msg).await,
            Some("new_event") => self.start_wizard(&msg).await,
            Some("list_events") => self.list_events(&msg).await,
            Some("list_archived") => self.list_archived_events(&msg).await,
            Some("cancel") => self.cancel_command(&msg).await,
            Some(other) => {
                debug!(command = other, "ignoring unknown command");
                Ok(())
            }
            None => self.handle_wizard_input(&msg).await,
        }
    }

    async fn handle_button(&self, press: ButtonPress) -> Result<()> {
        match press.payload.clone() {
            CallbackPayload::Calendar { owner, action } => {
                self.handle_calendar(&press, owner, action).await
            }
            CallbackPayload::TimePicker { owner, action } => {
                self.handle_time_picker(&press, owner, action).await
            }
            CallbackPayload::Register { event_id } => {
                self.handle_register_toggle(&press, event_id).await
            }
            CallbackPayload::Participants { event_id } => {
                self.handle_participants(&press, event_id).await
            }
            CallbackPayload::ConfirmDelete { event_id } => {
                self.handle_confirm_delete(&press, event_id).await
            }
            CallbackPayload::DeleteEvent { event_id } => {
                self.handle_delete_event(&press, event_id).await
            }
            CallbackPayload::CancelDelete { event_id } => {
                self.handle_cancel_delete(&press, event_id).await
            }
            CallbackPayload::Archive { event_id } => {
                self.handle_archive_event(&press, event_id).await
            }
            CallbackPayload::Noop => Ok(()),
        }
    }

    async fn handle_start(&self, msg: &TextMessage) -> Result<()> {
        let name = self.users.display_name(msg.sender.id).await;
        let text = format!(
            "👋 Hi {name}! I help you manage scheduled events.\n\n\
             /new_event — create an event step by step\n\
             /list_events — browse events and register\n\
             /cancel — abort the current action\n\
             /help — full command reference"
        );
        self.channel.send_text(msg.chat_id, &text, None).await?;
        Ok(())
    }

    async fn handle_help(&self, msg: &TextMessage) -> Result<()> {
        let mut text = String::from(
            "📖 Commands\n\n\
             /list_events — all upcoming events with action buttons\n\
             /list_archived — past events moved to the archive\n\
             /cancel — abort the current action\n\
             /help — this reference\n\n\
             Use the buttons under each event to register or view participants.",
        );
        if self.privileges.is_privileged(msg.sender.id) {
            text.push_str(
                "\n\nPrivileged commands:\n\
                 /new_event — create an event (title → description → date → time)\n\
                 Archive and delete buttons appear under each event.",
            );
        }
        self.channel.send_text(msg.chat_id, &text, None).await?;
        Ok(())
    }

    pub(crate) fn is_privileged(&self, user_id: UserId) -> bool {
        self.privileges.is_privileged(user_id)
    }

    pub(crate) async fn send_error(&self, chat_id: ChatId, text: &str) {
        let text = format!("❌ {text}");
        if let Err(err) = self.channel.send_text(chat_id, &text, None).await {
            error!(error = %err, chat_id = chat_id.0, "failed to send error notice");
        }
    }

    pub(crate) async fn send_plain(&self, chat_id: ChatId, text: &str) {
        if let Err(err) = self.channel.send_text(chat_id, text, None).await {
            error!(error = %err, chat_id = chat_id.0, "failed to send message");
        }
    }

    pub(crate) async fn notify(&self, interaction_id: &str, text: &str) {
        if let Err(err) = self.channel.notify(interaction_id, text).await {
            error!(error = %err, "failed to send button acknowledgement");
        }
    }

    /// Edits the wizard's active message in place; a missing message
    /// (or a failing edit) falls back to sending a fresh one. Returns
    /// the id now showing the wizard UI.
    pub(crate) async fn show_wizard_message(
        &self,
        chat_id: ChatId,
        active: Option<MessageId>,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId> {
        if let Some(message_id) = active {
            match self
                .channel
                .edit_text(chat_id, message_id, text, keyboard.clone())
                .await
            {
                Ok(EditOutcome::Applied) => return Ok(message_id),
                Ok(EditOutcome::MessageMissing) => {
                    debug!(message_id = message_id.0, "active message gone, sending anew");
                }
                Err(err) => {
                    error!(error = %err, message_id = message_id.0, "edit failed, sending anew");
                }
            }
        }
        self.channel.send_text(chat_id, text, keyboard).await
    }
}

/// Extracts a leading `/command`, tolerating a `@botname` suffix.
fn command_of(text: &str) -> Option<&str> {
    let token = text.trim().split_whitespace().next()?;
    let command = token.strip_prefix('/')?;
    Some(command.split('@').next().unwrap_or(command))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
