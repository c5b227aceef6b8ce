use serde::{Deserialize, Serialize};

use crate::payload::CallbackPayload;

/// Transport-neutral inline keyboard. Adapters serialize button
/// payloads at the wire boundary; the core only handles typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<Button>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub payload: CallbackPayload,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: CallbackPayload) -> Self {
        Self {
            label: label.into(),
            payload,
        }
    }

    /// Non-interactive cell: weekday header, padding, month label.
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self::new(label, CallbackPayload::Noop)
    }
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: Vec<Button>) {
        self.rows.push(row);
    }

    /// All interactive buttons in render order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows
            .iter()
            .flatten()
            .filter(|b| b.payload != CallbackPayload::Noop)
    }
}
