//! Handlers for existing events: listing, registration toggling,
//! participants, deletion (two-step) and archiving.

use anyhow::Result;
use chrono::Utc;
use shared::{
    domain::{Event, EventId},
    error::DomainError,
    keyboard::{Button, InlineKeyboard},
    payload::CallbackPayload,
    update::{ButtonPress, TextMessage},
};
use tracing::{debug, error, info, warn};

use crate::{
    Controller, EditOutcome, MSG_ACCESS_DENIED, MSG_ARCHIVE_FAILED, MSG_DELETE_FAILED,
    MSG_EVENTS_LOAD_ERROR, MSG_EVENT_ARCHIVED, MSG_EVENT_DELETED, MSG_EVENT_GONE,
    MSG_NO_ARCHIVED_EVENTS, MSG_NO_EVENTS, MSG_NO_PARTICIPANTS, MSG_PARTICIPANTS_LOAD_ERROR,
    MSG_REGISTRATION_FAILED,
};

/// Participants shown in the ephemeral notice before switching to a
/// full message.
const NOTIFY_PARTICIPANT_LIMIT: usize = 10;
/// Rough transport text ceiling for the full participant list.
const LIST_CHAR_LIMIT: usize = 3000;

impl Controller {
    pub(crate) async fn list_events(&self, msg: &TextMessage) -> Result<()> {
        let events = match self.events.list_active().await {
            Ok(events) => events,
            Err(err) => {
                error!(error = %err, "failed to load events");
                self.send_error(msg.chat_id, MSG_EVENTS_LOAD_ERROR).await;
                return Ok(());
            }
        };

        if events.is_empty() {
            self.send_plain(msg.chat_id, MSG_NO_EVENTS).await;
            return Ok(());
        }

        let privileged = self.is_privileged(msg.sender.id);
        self.send_plain(
            msg.chat_id,
            "📋 Upcoming events\nUse the buttons under each event:",
        )
        .await;

        for event in events {
            let registered = match self
                .registrations
                .is_registered(event.id, msg.sender.id)
                .await
            {
                Ok(registered) => registered,
                Err(err) => {
                    warn!(error = %err, event_id = event.id.0, "failed to check registration");
                    continue;
                }
            };

            let author = match self.users.by_id(event.owner_id).await {
                Ok(Some(user)) => user.display_name(),
                _ => "unknown".to_string(),
            };

            let text = event_summary(&event, &author);
            let keyboard = self.event_buttons(event.id, registered, privileged);
            if let Err(err) = self
                .channel
                .send_text(msg.chat_id, &text, Some(keyboard))
                .await
            {
                warn!(error = %err, event_id = event.id.0, "failed to send event card");
            }
        }
        Ok(())
    }

    pub(crate) async fn list_archived_events(&self, msg: &TextMessage) -> Result<()> {
        let events = match self.events.list_archived().await {
            Ok(events) => events,
            Err(err) => {
                error!(error = %err, "failed to load archived events");
                self.send_error(msg.chat_id, MSG_EVENTS_LOAD_ERROR).await;
                return Ok(());
            }
        };

        if events.is_empty() {
            self.send_plain(msg.chat_id, MSG_NO_ARCHIVED_EVENTS).await;
            return Ok(());
        }

        let mut text = String::from("📦 Archived events\n");
        for event in &events {
            text.push('\n');
            text.push_str(&format!(
                "📌 {} — {} UTC",
                event.title,
                event.starts_at.format("%d.%m.%Y %H:%M")
            ));
            if text.len() > LIST_CHAR_LIMIT {
                text.push_str("\n⚠️ List shortened");
                break;
            }
        }
        self.send_plain(msg.chat_id, &text).await;
        Ok(())
    }

    /// Action row under an event card. Archive/delete only appear for
    /// privileged users.
    pub(crate) fn event_buttons(
        &self,
        event_id: EventId,
        is_registered: bool,
        privileged: bool,
    ) -> InlineKeyboard {
        let register_label = if is_registered {
            "✅ Registered"
        } else {
            "🎫 Register"
        };

        let mut row = vec![
            Button::new(register_label, CallbackPayload::Register { event_id }),
            Button::new("👥 Participants", CallbackPayload::Participants { event_id }),
        ];
        if privileged {
            row.push(Button::new("📦 Archive", CallbackPayload::Archive { event_id }));
            row.push(Button::new(
                "❌ Delete",
                CallbackPayload::ConfirmDelete { event_id },
            ));
        }

        let mut keyboard = InlineKeyboard::new();
        keyboard.push_row(row);
        keyboard
    }

    pub(crate) async fn handle_register_toggle(
        &self,
        press: &ButtonPress,
        event_id: EventId,
    ) -> Result<()> {
        if let Err(err) = self.users.record(&press.presser).await {
            warn!(error = %err, user_id = press.presser.id.0, "failed to record presser");
        }

        let registered = match self
            .registrations
            .toggle(event_id, press.presser.id, Utc::now())
            .await
        {
            Ok(registered) => registered,
            Err(err) => {
                if err.downcast_ref::<DomainError>() == Some(&DomainError::EventNotFound) {
                    self.notify(&press.interaction_id, MSG_EVENT_GONE).await;
                } else {
                    error!(error = %err, event_id = event_id.0, "registration toggle failed");
                    self.send_error(press.chat_id, MSG_REGISTRATION_FAILED).await;
                }
                return Ok(());
            }
        };

        let keyboard =
            self.event_buttons(event_id, registered, self.is_privileged(press.presser.id));
        self.restore_event_keyboard(press, keyboard).await;
        Ok(())
    }

    pub(crate) async fn handle_participants(
        &self,
        press: &ButtonPress,
        event_id: EventId,
    ) -> Result<()> {
        let participants = match self.registrations.participants(event_id).await {
            Ok(participants) => participants,
            Err(err) => {
                error!(error = %err, event_id = event_id.0, "failed to load participants");
                self.send_error(press.chat_id, MSG_PARTICIPANTS_LOAD_ERROR)
                    .await;
                return Ok(());
            }
        };

        if participants.is_empty() {
            self.notify(&press.interaction_id, MSG_NO_PARTICIPANTS).await;
            return Ok(());
        }

        let title = match self.events.by_id(event_id).await {
            Ok(Some(event)) => event.title,
            _ => "Event".to_string(),
        };

        let mut notice = format!("Participants of '{title}':\n");
        for (i, participant) in participants
            .iter()
            .take(NOTIFY_PARTICIPANT_LIMIT)
            .enumerate()
        {
            notice.push_str(&format!("{}. {}\n", i + 1, participant.user.display_name()));
        }
        if participants.len() > NOTIFY_PARTICIPANT_LIMIT {
            notice.push_str(&format!(
                "… and {} more",
                participants.len() - NOTIFY_PARTICIPANT_LIMIT
            ));
        }
        self.notify(&press.interaction_id, &notice).await;

        // The ephemeral notice is capped; large lists get a real message.
        if participants.len() > NOTIFY_PARTICIPANT_LIMIT {
            let mut full = format!("👥 Participants of \"{title}\":\n\n");
            for (i, participant) in participants.iter().enumerate() {
                full.push_str(&format!("{}. {}\n", i + 1, participant.user.display_name()));
                if full.len() > LIST_CHAR_LIMIT {
                    full.push_str("\n⚠️ List shortened");
                    break;
                }
            }
            self.send_plain(press.chat_id, &full).await;
        }
        Ok(())
    }

    pub(crate) async fn handle_confirm_delete(
        &self,
        press: &ButtonPress,
        event_id: EventId,
    ) -> Result<()> {
        if !self.is_privileged(press.presser.id) {
            self.notify(&press.interaction_id, MSG_ACCESS_DENIED).await;
            return Ok(());
        }

        let mut keyboard = InlineKeyboard::new();
        keyboard.push_row(vec![
            Button::new(
                "✅ Confirm deletion",
                CallbackPayload::DeleteEvent { event_id },
            ),
            Button::new("❌ Cancel", CallbackPayload::CancelDelete { event_id }),
        ]);
        self.restore_event_keyboard(press, keyboard).await;
        Ok(())
    }

    pub(crate) async fn handle_delete_event(
        &self,
        press: &ButtonPress,
        event_id: EventId,
    ) -> Result<()> {
        match self.events.delete(press.presser.id, event_id).await {
            Ok(()) => {
                info!(event_id = event_id.0, by = press.presser.id.0, "event deleted");
                self.notify(&press.interaction_id, MSG_EVENT_DELETED).await;
                self.remove_event_message(press).await;
            }
            Err(err) => match err.downcast_ref::<DomainError>() {
                Some(DomainError::PrivilegeDenied) => {
                    self.notify(&press.interaction_id, MSG_ACCESS_DENIED).await;
                }
                Some(DomainError::EventNotFound) => {
                    self.notify(&press.interaction_id, MSG_EVENT_GONE).await;
                }
                _ => {
                    error!(error = %err, event_id = event_id.0, "failed to delete event");
                    self.notify(&press.interaction_id, MSG_DELETE_FAILED).await;
                }
            },
        }
        Ok(())
    }

    /// Dual-purpose cancel for an existing event's confirmation
    /// dialog: put the normal action buttons back.
    pub(crate) async fn handle_cancel_delete(
        &self,
        press: &ButtonPress,
        event_id: EventId,
    ) -> Result<()> {
        let registered = match self
            .registrations
            .is_registered(event_id, press.presser.id)
            .await
        {
            Ok(registered) => registered,
            Err(err) => {
                warn!(error = %err, event_id = event_id.0, "failed to check registration");
                false
            }
        };

        let keyboard =
            self.event_buttons(event_id, registered, self.is_privileged(press.presser.id));
        self.restore_event_keyboard(press, keyboard).await;
        Ok(())
    }

    pub(crate) async fn handle_archive_event(
        &self,
        press: &ButtonPress,
        event_id: EventId,
    ) -> Result<()> {
        match self.events.archive(press.presser.id, event_id).await {
            Ok(()) => {
                info!(event_id = event_id.0, by = press.presser.id.0, "event archived");
                self.notify(&press.interaction_id, MSG_EVENT_ARCHIVED).await;
                self.remove_event_message(press).await;
            }
            Err(err) => match err.downcast_ref::<DomainError>() {
                Some(DomainError::PrivilegeDenied) => {
                    self.notify(&press.interaction_id, MSG_ACCESS_DENIED).await;
                }
                Some(DomainError::EventNotFound) => {
                    self.notify(&press.interaction_id, MSG_EVENT_GONE).await;
                }
                _ => {
                    error!(error = %err, event_id = event_id.0, "failed to archive event");
                    self.notify(&press.interaction_id, MSG_ARCHIVE_FAILED).await;
                }
            },
        }
        Ok(())
    }

    async fn restore_event_keyboard(&self, press: &ButtonPress, keyboard: InlineKeyboard) {
        match self
            .channel
            .edit_keyboard(press.chat_id, press.message_id, keyboard)
            .await
        {
            Ok(EditOutcome::Applied) => {}
            Ok(EditOutcome::MessageMissing) => {
                debug!(message_id = press.message_id.0, "event message gone");
            }
            Err(err) => {
                error!(error = %err, "failed to update event keyboard");
            }
        }
    }

    async fn remove_event_message(&self, press: &ButtonPress) {
        if let Err(err) = self
            .channel
            .delete_message(press.chat_id, press.message_id)
            .await
        {
            warn!(error = %err, message_id = press.message_id.0, "failed to delete event message");
        }
    }
}

fn event_summary(event: &Event, author: &str) -> String {
    format!(
        "📌 {}\n📝 {}\n⏰ {} UTC\n👤 Hosted by {author}",
        event.title,
        event.description,
        event.starts_at.format("%d.%m.%Y %H:%M"),
    )
}
