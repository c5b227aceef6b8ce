//! Wizard step handlers: free-text input, calendar and time-picker
//! callbacks, finalization, and cancellation.
//!
//! Handlers load the owner's state, compute the next state as an owned
//! value, perform channel calls, and persist once at the end. The
//! previously persisted state stays authoritative whenever a save
//! fails.

use anyhow::Result;
use chrono::Utc;
use shared::{
    domain::{
        ChatId, PickerStage, TimePickerState, WizardState, WizardStep, MAX_DESCRIPTION_CHARS,
        MAX_TITLE_CHARS,
    },
    error::DomainError,
    payload::{CalendarAction, TimePickerAction},
    update::{ButtonPress, TextMessage},
};
use tracing::{debug, error, warn};

use crate::{
    calendar, timepicker, Controller, EditOutcome, MSG_CALENDAR_FORBIDDEN, MSG_CANCEL_FAILED,
    MSG_DESCRIPTION_TOO_LONG, MSG_EVENT_SAVE_ERROR, MSG_INCOMPLETE_DATA, MSG_INVALID_TIME,
    MSG_NOTHING_TO_CANCEL, MSG_NO_DATE_CHOSEN, MSG_PRIVILEGED_ONLY, MSG_SAVE_ERROR,
    MSG_SESSION_EXPIRED, MSG_TIME_FORBIDDEN, MSG_TIME_INCOMPLETE, MSG_TITLE_EMPTY,
    MSG_TITLE_TOO_LONG, MSG_WIZARD_CANCELLED, PROMPT_DATE, PROMPT_DESCRIPTION, PROMPT_TIME,
    PROMPT_TITLE,
};

impl Controller {
    /// `/new_event`: privilege-gated; unconditionally replaces any
    /// wizard the user already had in flight.
    pub(crate) async fn start_wizard(&self, msg: &TextMessage) -> Result<()> {
        if !self.is_privileged(msg.sender.id) {
            self.send_error(msg.chat_id, MSG_PRIVILEGED_ONLY).await;
            return Ok(());
        }

        let message_id = self.channel.send_text(msg.chat_id, PROMPT_TITLE, None).await?;

        let mut state = WizardState::new(msg.sender.id, Utc::now());
        state.active_message_id = Some(message_id);
        self.persist_state(msg.chat_id, &state).await;
        Ok(())
    }

    /// Free text while a wizard is active. Stray text without a wizard
    /// is ignored.
    pub(crate) async fn handle_wizard_input(&self, msg: &TextMessage) -> Result<()> {
        let Some(state) = self.states.get(msg.sender.id).await? else {
            return Ok(());
        };

        match state.step {
            WizardStep::Title => self.title_step(msg, state).await,
            WizardStep::Description => self.description_step(msg, state).await,
            // Time is driven by picker buttons; free text here is stray.
            WizardStep::Date
            | WizardStep::Time
            | WizardStep::Confirm
            | WizardStep::Completed => {
                debug!(user_id = msg.sender.id.0, step = ?state.step, "ignoring stray text");
                Ok(())
            }
        }
    }

    async fn title_step(&self, msg: &TextMessage, mut state: WizardState) -> Result<()> {
        let text = msg.text.trim();
        let chars = text.chars().count();
        if chars == 0 {
            self.send_error(msg.chat_id, MSG_TITLE_EMPTY).await;
            return Ok(());
        }
        if chars > MAX_TITLE_CHARS {
            self.send_error(msg.chat_id, MSG_TITLE_TOO_LONG).await;
            return Ok(());
        }

        state.draft.title = text.to_string();
        state.step = WizardStep::Description;

        let message_id = self
            .show_wizard_message(msg.chat_id, state.active_message_id, PROMPT_DESCRIPTION, None)
            .await?;
        state.active_message_id = Some(message_id);

        self.persist_state(msg.chat_id, &state).await;
        Ok(())
    }

    async fn description_step(&self, msg: &TextMessage, mut state: WizardState) -> Result<()> {
        let text = msg.text.trim();
        if text.chars().count() > MAX_DESCRIPTION_CHARS {
            self.send_error(msg.chat_id, MSG_DESCRIPTION_TOO_LONG).await;
            return Ok(());
        }

        state.draft.description = text.to_string();
        state.step = WizardStep::Date;

        let today = Utc::now().date_naive();
        let keyboard = calendar::month_grid(today, None, today, state.owner_id());
        let message_id = self
            .show_wizard_message(
                msg.chat_id,
                state.active_message_id,
                PROMPT_DATE,
                Some(keyboard),
            )
            .await?;
        state.active_message_id = Some(message_id);

        self.persist_state(msg.chat_id, &state).await;
        Ok(())
    }

    pub(crate) async fn handle_calendar(
        &self,
        press: &ButtonPress,
        owner: shared::domain::UserId,
        action: CalendarAction,
    ) -> Result<()> {
        if press.presser.id != owner {
            debug!(
                presser = press.presser.id.0,
                owner = owner.0,
                "calendar pressed by non-owner"
            );
            self.notify(&press.interaction_id, MSG_CALENDAR_FORBIDDEN).await;
            return Ok(());
        }

        let Some(mut state) = self.states.get(owner).await? else {
            self.send_error(press.chat_id, MSG_SESSION_EXPIRED).await;
            return Ok(());
        };

        let today = Utc::now().date_naive();
        match action {
            CalendarAction::PrevMonth { reference } => {
                self.show_month(press, &state, calendar::prev_month(reference), today)
                    .await;
                Ok(())
            }
            CalendarAction::NextMonth { reference } => {
                self.show_month(press, &state, calendar::next_month(reference), today)
                    .await;
                Ok(())
            }
            CalendarAction::SelectDay { date } => {
                state.selected_date = Some(date);
                // Any previously composed time is stale once the day changes.
                state.draft.starts_at = None;
                self.enter_time_step(press, state).await
            }
            CalendarAction::Confirm => {
                if state.selected_date.is_none() {
                    self.notify(&press.interaction_id, MSG_NO_DATE_CHOSEN).await;
                    return Ok(());
                }
                self.enter_time_step(press, state).await
            }
        }
    }

    /// Month navigation: re-render in place, leaving the selection
    /// (and the persisted state) untouched.
    async fn show_month(
        &self,
        press: &ButtonPress,
        state: &WizardState,
        reference: chrono::NaiveDate,
        today: chrono::NaiveDate,
    ) {
        let keyboard = calendar::month_grid(reference, state.selected_date, today, state.owner_id());
        match self
            .channel
            .edit_keyboard(press.chat_id, press.message_id, keyboard)
            .await
        {
            Ok(EditOutcome::Applied) => {}
            Ok(EditOutcome::MessageMissing) => {
                debug!(message_id = press.message_id.0, "calendar message gone");
            }
            Err(err) => {
                error!(error = %err, "failed to re-render calendar");
            }
        }
    }

    /// Terminal calendar action: swap the same message over to the
    /// hour grid and persist the advanced state.
    async fn enter_time_step(&self, press: &ButtonPress, mut state: WizardState) -> Result<()> {
        state.step = WizardStep::Time;
        state.time_picker = TimePickerState::default();

        let keyboard = timepicker::time_grid(&state.time_picker, state.owner_id());
        let message_id = self
            .show_wizard_message(
                press.chat_id,
                Some(press.message_id),
                PROMPT_TIME,
                Some(keyboard),
            )
            .await?;
        state.active_message_id = Some(message_id);

        self.persist_state(press.chat_id, &state).await;
        Ok(())
    }

    pub(crate) async fn handle_time_picker(
        &self,
        press: &ButtonPress,
        owner: shared::domain::UserId,
        action: TimePickerAction,
    ) -> Result<()> {
        if press.presser.id != owner {
            debug!(
                presser = press.presser.id.0,
                owner = owner.0,
                "time picker pressed by non-owner"
            );
            self.notify(&press.interaction_id, MSG_TIME_FORBIDDEN).await;
            return Ok(());
        }

        let Some(mut state) = self.states.get(owner).await? else {
            self.send_error(press.chat_id, MSG_SESSION_EXPIRED).await;
            return Ok(());
        };

        match action {
            TimePickerAction::SelectHour { hour } => {
                if hour >= 24 {
                    self.notify(&press.interaction_id, MSG_INVALID_TIME).await;
                    return Ok(());
                }
                state.time_picker.temp_hours = Some(hour);
                state.time_picker.stage = PickerStage::Minutes;

                let keyboard = timepicker::time_grid(&state.time_picker, owner);
                self.edit_picker_keyboard(press, keyboard).await;
                self.persist_state(press.chat_id, &state).await;
                Ok(())
            }
            TimePickerAction::SelectMinute { minute } => {
                if minute >= 60 {
                    self.notify(&press.interaction_id, MSG_INVALID_TIME).await;
                    return Ok(());
                }
                let Some(hour) = state.time_picker.temp_hours else {
                    self.notify(&press.interaction_id, MSG_TIME_INCOMPLETE).await;
                    return Ok(());
                };
                let Some(date) = state.selected_date else {
                    self.send_error(press.chat_id, MSG_SESSION_EXPIRED).await;
                    return Ok(());
                };
                let Some(selected) = date.and_hms_opt(hour, minute, 0) else {
                    self.notify(&press.interaction_id, MSG_INVALID_TIME).await;
                    return Ok(());
                };

                state.time_picker.temp_minutes = Some(minute);
                state.time_picker.selected_time = Some(selected.and_utc());

                let text = format!("Selected time: {:02}:{:02}", hour, minute);
                let keyboard = timepicker::time_grid(&state.time_picker, owner);
                if let Err(err) = self
                    .channel
                    .edit_text(press.chat_id, press.message_id, &text, Some(keyboard))
                    .await
                {
                    error!(error = %err, "failed to show selected time");
                }
                self.persist_state(press.chat_id, &state).await;
                Ok(())
            }
            TimePickerAction::Confirm => {
                let Some(selected) = state.time_picker.selected_time else {
                    self.notify(&press.interaction_id, MSG_TIME_INCOMPLETE).await;
                    return Ok(());
                };
                state.draft.starts_at = Some(selected);
                state.step = WizardStep::Confirm;
                state.active_message_id = None;

                self.delete_picker_message(press).await;
                self.finalize(press.chat_id, &state).await
            }
            TimePickerAction::Cancel => {
                state.time_picker = TimePickerState::default();
                state.step = WizardStep::Date;

                self.delete_picker_message(press).await;

                let today = Utc::now().date_naive();
                let reference = state.selected_date.unwrap_or(today);
                let keyboard =
                    calendar::month_grid(reference, state.selected_date, today, owner);
                let message_id = self
                    .channel
                    .send_text(press.chat_id, PROMPT_DATE, Some(keyboard))
                    .await?;
                state.active_message_id = Some(message_id);

                self.persist_state(press.chat_id, &state).await;
                Ok(())
            }
        }
    }

    /// Validates the draft, persists the event, announces it, and
    /// clears the wizard. State is cleared even when the announcement
    /// fails; a failed create leaves the wizard resumable.
    pub(crate) async fn finalize(&self, chat_id: ChatId, state: &WizardState) -> Result<()> {
        let owner = state.owner_id();
        let (title_ok, starts_at) = (!state.draft.title.is_empty(), state.draft.starts_at);
        let Some(starts_at) = starts_at.filter(|_| title_ok) else {
            self.send_error(chat_id, MSG_INCOMPLETE_DATA).await;
            return Ok(());
        };

        let event_id = match self.events.create(owner, &state.draft, Utc::now()).await {
            Ok(id) => id,
            Err(err) => {
                if err.downcast_ref::<DomainError>() == Some(&DomainError::PrivilegeDenied) {
                    self.send_error(chat_id, MSG_PRIVILEGED_ONLY).await;
                } else {
                    error!(error = %err, user_id = owner.0, "failed to persist event");
                    self.send_error(chat_id, MSG_EVENT_SAVE_ERROR).await;
                }
                return Ok(());
            }
        };

        let text = format!(
            "🎉 Event created!\n\n\
             📌 {}\n\
             📝 {}\n\
             ⏰ {} UTC",
            state.draft.title,
            state.draft.description,
            starts_at.format("%d.%m.%Y %H:%M"),
        );
        let keyboard = self.event_buttons(event_id, false, self.is_privileged(owner));
        if let Err(err) = self
            .channel
            .send_text(chat_id, &text, Some(keyboard))
            .await
        {
            // The wizard is done either way; never resurface it over a
            // failed announcement.
            error!(error = %err, event_id = event_id.0, "failed to announce created event");
        }

        if let Err(err) = self.states.delete(owner).await {
            warn!(error = %err, user_id = owner.0, "failed to clear wizard state");
        }
        Ok(())
    }

    /// `/cancel` as a command: drop any in-flight wizard.
    pub(crate) async fn cancel_command(&self, msg: &TextMessage) -> Result<()> {
        let prior = match self.states.get(msg.sender.id).await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, user_id = msg.sender.id.0, "failed to load state on cancel");
                None
            }
        };

        if let Err(err) = self.states.delete(msg.sender.id).await {
            error!(error = %err, user_id = msg.sender.id.0, "failed to delete wizard state");
            self.send_error(msg.chat_id, MSG_CANCEL_FAILED).await;
            return Ok(());
        }

        let text = match prior.map(|s| s.step) {
            Some(
                WizardStep::Title | WizardStep::Description | WizardStep::Date | WizardStep::Time,
            ) => format!("🚫 {MSG_WIZARD_CANCELLED}"),
            Some(_) => "⚠️ Current action cancelled".to_string(),
            None => format!("⚠️ {MSG_NOTHING_TO_CANCEL}"),
        };
        self.send_plain(msg.chat_id, &text).await;
        Ok(())
    }

    /// Persists the computed state, reporting a save failure to the
    /// user. Returns whether the new state is now authoritative.
    pub(crate) async fn persist_state(&self, chat_id: ChatId, state: &WizardState) -> bool {
        match self.states.put(state.owner_id(), state).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    error = %err,
                    user_id = state.owner_id().0,
                    "failed to persist wizard state"
                );
                self.send_error(chat_id, MSG_SAVE_ERROR).await;
                false
            }
        }
    }

    async fn edit_picker_keyboard(&self, press: &ButtonPress, keyboard: shared::keyboard::InlineKeyboard) {
        match self
            .channel
            .edit_keyboard(press.chat_id, press.message_id, keyboard)
            .await
        {
            Ok(EditOutcome::Applied) => {}
            Ok(EditOutcome::MessageMissing) => {
                debug!(message_id = press.message_id.0, "picker message gone");
            }
            Err(err) => {
                error!(error = %err, "failed to re-render time picker");
            }
        }
    }

    async fn delete_picker_message(&self, press: &ButtonPress) {
        match self
            .channel
            .delete_message(press.chat_id, press.message_id)
            .await
        {
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, message_id = press.message_id.0, "failed to delete picker");
            }
        }
    }
}
