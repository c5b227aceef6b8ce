//! End-to-end acceptance of the creation wizard against the real
//! sqlite-backed stores; only the message channel is faked.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc, Mutex,
};

use anyhow::Result;
use async_trait::async_trait;
use bot_core::{
    AdminList, Controller, EditOutcome, EventService, MessageChannel, PrivilegeChecker,
    RegistrationService, UserService,
};
use chrono::{NaiveDate, TimeZone, Utc};
use shared::{
    domain::{ChatId, MessageId, User, UserId},
    keyboard::InlineKeyboard,
    payload::{CalendarAction, CallbackPayload, TimePickerAction},
    update::{ButtonPress, InboundUpdate, TextMessage},
};
use storage::Storage;

const CHAT: ChatId = ChatId(500);

#[derive(Default)]
struct RecordingChannel {
    next_id: AtomicI64,
    sent: Mutex<Vec<(String, Option<InlineKeyboard>)>>,
    notices: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send_text(
        &self,
        _chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId> {
        self.sent
            .lock()
            .expect("lock")
            .push((text.to_string(), keyboard));
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit_text(
        &self,
        _chat: ChatId,
        _message: MessageId,
        _text: &str,
        _keyboard: Option<InlineKeyboard>,
    ) -> Result<EditOutcome> {
        Ok(EditOutcome::Applied)
    }

    async fn edit_keyboard(
        &self,
        _chat: ChatId,
        _message: MessageId,
        _keyboard: InlineKeyboard,
    ) -> Result<EditOutcome> {
        Ok(EditOutcome::Applied)
    }

    async fn delete_message(&self, _chat: ChatId, _message: MessageId) -> Result<EditOutcome> {
        Ok(EditOutcome::Applied)
    }

    async fn notify(&self, _interaction_id: &str, text: &str) -> Result<()> {
        self.notices.lock().expect("lock").push(text.to_string());
        Ok(())
    }
}

fn participant(id: i64, name: &str) -> User {
    User {
        id: UserId(id),
        first_name: name.to_string(),
        username: name.to_lowercase(),
    }
}

async fn controller(admins: &[i64]) -> (Controller, Arc<Storage>, Arc<RecordingChannel>) {
    let storage = Arc::new(Storage::new("sqlite::memory:").await.expect("db"));
    let channel = Arc::new(RecordingChannel::default());
    let privileges: Arc<dyn PrivilegeChecker> =
        Arc::new(AdminList::new(admins.iter().map(|&id| UserId(id))));

    let controller = Controller::new(
        channel.clone(),
        storage.clone(),
        EventService::new(storage.clone(), privileges.clone()),
        RegistrationService::new(storage.clone(), storage.clone()),
        UserService::new(storage.clone()),
        privileges,
    );
    (controller, storage, channel)
}

fn text(sender: &User, text: &str) -> InboundUpdate {
    InboundUpdate::Text(TextMessage {
        sender: sender.clone(),
        chat_id: CHAT,
        text: text.to_string(),
    })
}

fn button(presser: &User, message_id: i64, payload: CallbackPayload) -> InboundUpdate {
    InboundUpdate::Button(ButtonPress {
        presser: presser.clone(),
        chat_id: CHAT,
        message_id: MessageId(message_id),
        interaction_id: format!("cb-{}", presser.id.0),
        payload,
    })
}

#[tokio::test]
async fn standup_scenario_creates_one_event_and_clears_state() {
    let (controller, storage, channel) = controller(&[1]).await;
    let alice = participant(1, "Alice");

    controller
        .handle(text(&alice, "/new_event"))
        .await
        .expect("start");
    controller
        .handle(text(&alice, "Standup"))
        .await
        .expect("title");
    controller
        .handle(text(&alice, "daily sync"))
        .await
        .expect("description");

    let state = storage
        .wizard_state(alice.id)
        .await
        .expect("load")
        .expect("state");
    let wizard_message = state.active_message_id.expect("active message").0;

    let day = NaiveDate::from_ymd_opt(2026, 9, 15).expect("date");
    controller
        .handle(button(
            &alice,
            wizard_message,
            CallbackPayload::Calendar {
                owner: alice.id,
                action: CalendarAction::SelectDay { date: day },
            },
        ))
        .await
        .expect("select day");
    controller
        .handle(button(
            &alice,
            wizard_message,
            CallbackPayload::TimePicker {
                owner: alice.id,
                action: TimePickerAction::SelectHour { hour: 9 },
            },
        ))
        .await
        .expect("hour");
    controller
        .handle(button(
            &alice,
            wizard_message,
            CallbackPayload::TimePicker {
                owner: alice.id,
                action: TimePickerAction::SelectMinute { minute: 30 },
            },
        ))
        .await
        .expect("minute");
    controller
        .handle(button(
            &alice,
            wizard_message,
            CallbackPayload::TimePicker {
                owner: alice.id,
                action: TimePickerAction::Confirm,
            },
        ))
        .await
        .expect("confirm");

    let events = storage.list_active_events().await.expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Standup");
    assert_eq!(events[0].description, "daily sync");
    assert_eq!(
        events[0].starts_at,
        Utc.with_ymd_and_hms(2026, 9, 15, 9, 30, 0).single().expect("date")
    );

    assert!(storage
        .wizard_state(alice.id)
        .await
        .expect("load")
        .is_none());

    let announcements = channel.sent.lock().expect("lock").clone();
    assert!(announcements
        .iter()
        .any(|(text, keyboard)| text.contains("Event created") && keyboard.is_some()));
}

#[tokio::test]
async fn foreign_press_is_denied_and_registration_round_trips() {
    let (controller, storage, channel) = controller(&[1]).await;
    let alice = participant(1, "Alice");
    let bob = participant(2, "Bob");

    controller
        .handle(text(&alice, "/new_event"))
        .await
        .expect("start");
    controller
        .handle(text(&alice, "Standup"))
        .await
        .expect("title");
    controller
        .handle(text(&alice, "daily sync"))
        .await
        .expect("description");

    let before = storage
        .wizard_state(alice.id)
        .await
        .expect("load")
        .expect("state");

    // Bob pokes Alice's calendar: denied, state untouched.
    controller
        .handle(button(
            &bob,
            before.active_message_id.expect("message").0,
            CallbackPayload::Calendar {
                owner: alice.id,
                action: CalendarAction::SelectDay {
                    date: NaiveDate::from_ymd_opt(2026, 9, 15).expect("date"),
                },
            },
        ))
        .await
        .expect("foreign press");

    assert_eq!(channel.notices.lock().expect("lock").len(), 1);
    let after = storage
        .wizard_state(alice.id)
        .await
        .expect("load")
        .expect("state");
    assert_eq!(after, before);

    // Meanwhile registration on a finished event works for Bob.
    let event_id = storage
        .insert_event(&storage::NewEvent {
            owner_id: alice.id,
            title: "Retro".to_string(),
            description: String::new(),
            starts_at: Utc.with_ymd_and_hms(2026, 9, 20, 17, 0, 0).single().expect("date"),
            created_at: Utc::now(),
        })
        .await
        .expect("event");

    controller
        .handle(button(
            &bob,
            77,
            CallbackPayload::Register { event_id },
        ))
        .await
        .expect("register");
    assert!(storage
        .is_registered(event_id, bob.id)
        .await
        .expect("registered"));

    controller
        .handle(button(
            &bob,
            77,
            CallbackPayload::Register { event_id },
        ))
        .await
        .expect("unregister");
    assert!(!storage
        .is_registered(event_id, bob.id)
        .await
        .expect("registered"));
}
