use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChatId, MessageId, User},
    payload::CallbackPayload,
};

/// One inbound event from the messaging transport. Each update is
/// independent; any correlation happens through the wizard state store
/// and the payloads themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum InboundUpdate {
    Text(TextMessage),
    Button(ButtonPress),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub sender: User,
    pub chat_id: ChatId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPress {
    pub presser: User,
    pub chat_id: ChatId,
    /// The message the pressed button is attached to.
    pub message_id: MessageId,
    /// Opaque transport handle for ephemeral acknowledgements.
    pub interaction_id: String,
    pub payload: CallbackPayload,
}
