//! A terminal-backed `MessageChannel`: messages print to stdout and
//! each interactive button gets a numeric handle that the REPL turns
//! back into a button press.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use bot_core::{EditOutcome, MessageChannel};
use shared::{
    domain::{ChatId, MessageId},
    keyboard::InlineKeyboard,
    payload::CallbackPayload,
};

#[derive(Default)]
pub struct ConsoleChannel {
    next_message_id: AtomicI64,
    live_messages: Mutex<HashSet<i64>>,
    buttons: Mutex<Vec<(MessageId, CallbackPayload)>>,
}

impl ConsoleChannel {
    /// Resolves a printed `[n]` handle back into its message/payload.
    pub fn button(&self, index: usize) -> Option<(MessageId, CallbackPayload)> {
        self.buttons.lock().expect("lock").get(index).cloned()
    }

    fn print_keyboard(&self, message_id: MessageId, keyboard: &InlineKeyboard) {
        let mut buttons = self.buttons.lock().expect("lock");
        for row in &keyboard.rows {
            let mut line = String::from("   ");
            for button in row {
                if button.payload == CallbackPayload::Noop {
                    line.push_str(&format!("{:^12}", button.label));
                } else {
                    line.push_str(&format!("[{}]{:^10}", buttons.len(), button.label));
                    buttons.push((message_id, button.payload.clone()));
                }
            }
            println!("{line}");
        }
    }
}

#[async_trait]
impl MessageChannel for ConsoleChannel {
    async fn send_text(
        &self,
        _chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId> {
        let message_id = MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.live_messages.lock().expect("lock").insert(message_id.0);

        println!("── message #{} ──", message_id.0);
        println!("{text}");
        if let Some(keyboard) = &keyboard {
            self.print_keyboard(message_id, keyboard);
        }
        Ok(message_id)
    }

    async fn edit_text(
        &self,
        _chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<EditOutcome> {
        if !self.live_messages.lock().expect("lock").contains(&message.0) {
            return Ok(EditOutcome::MessageMissing);
        }

        println!("── message #{} (edited) ──", message.0);
        println!("{text}");
        if let Some(keyboard) = &keyboard {
            self.print_keyboard(message, keyboard);
        }
        Ok(EditOutcome::Applied)
    }

    async fn edit_keyboard(
        &self,
        _chat: ChatId,
        message: MessageId,
        keyboard: InlineKeyboard,
    ) -> Result<EditOutcome> {
        if !self.live_messages.lock().expect("lock").contains(&message.0) {
            return Ok(EditOutcome::MessageMissing);
        }

        println!("── message #{} (keyboard updated) ──", message.0);
        self.print_keyboard(message, &keyboard);
        Ok(EditOutcome::Applied)
    }

    async fn delete_message(&self, _chat: ChatId, message: MessageId) -> Result<EditOutcome> {
        if self.live_messages.lock().expect("lock").remove(&message.0) {
            println!("── message #{} deleted ──", message.0);
            Ok(EditOutcome::Applied)
        } else {
            Ok(EditOutcome::MessageMissing)
        }
    }

    async fn notify(&self, _interaction_id: &str, text: &str) -> Result<()> {
        println!("(notice) {text}");
        Ok(())
    }
}
