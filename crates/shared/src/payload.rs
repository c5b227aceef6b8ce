use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{EventId, UserId},
    error::PayloadError,
};

/// Current version of the wire envelope. Decoding rejects anything
/// else instead of guessing at field positions.
pub const PAYLOAD_VERSION: u8 = 1;

/// Structured callback payload carried in button data. Wizard-facing
/// variants always embed the wizard owner so the controller can gate
/// presses in shared chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CallbackPayload {
    Calendar {
        owner: UserId,
        action: CalendarAction,
    },
    TimePicker {
        owner: UserId,
        action: TimePickerAction,
    },
    Register {
        event_id: EventId,
    },
    Participants {
        event_id: EventId,
    },
    ConfirmDelete {
        event_id: EventId,
    },
    DeleteEvent {
        event_id: EventId,
    },
    CancelDelete {
        event_id: EventId,
    },
    Archive {
        event_id: EventId,
    },
    /// Placeholder for non-interactive cells (weekday labels, padding).
    Noop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CalendarAction {
    /// `reference` is the month currently displayed, not the selected day.
    PrevMonth { reference: NaiveDate },
    NextMonth { reference: NaiveDate },
    SelectDay { date: NaiveDate },
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TimePickerAction {
    SelectHour { hour: u32 },
    SelectMinute { minute: u32 },
    Confirm,
    Cancel,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    #[serde(flatten)]
    payload: CallbackPayload,
}

impl CallbackPayload {
    /// Owner embedded in the payload, if this is a wizard-interactive
    /// variant.
    pub fn wizard_owner(&self) -> Option<UserId> {
        match self {
            CallbackPayload::Calendar { owner, .. }
            | CallbackPayload::TimePicker { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<String, PayloadError> {
        let envelope = Envelope {
            v: PAYLOAD_VERSION,
            payload: self.clone(),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn decode(raw: &str) -> Result<Self, PayloadError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        if envelope.v != PAYLOAD_VERSION {
            return Err(PayloadError::UnsupportedVersion(envelope.v));
        }
        Ok(envelope.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_calendar_payloads() {
        let payload = CallbackPayload::Calendar {
            owner: UserId(42),
            action: CalendarAction::SelectDay {
                date: NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
            },
        };
        let raw = payload.encode().expect("encode");
        assert_eq!(CallbackPayload::decode(&raw).expect("decode"), payload);
    }

    #[test]
    fn round_trips_time_picker_payloads() {
        for action in [
            TimePickerAction::SelectHour { hour: 23 },
            TimePickerAction::SelectMinute { minute: 45 },
            TimePickerAction::Confirm,
            TimePickerAction::Cancel,
        ] {
            let payload = CallbackPayload::TimePicker {
                owner: UserId(1),
                action,
            };
            let raw = payload.encode().expect("encode");
            assert_eq!(CallbackPayload::decode(&raw).expect("decode"), payload);
        }
    }

    #[test]
    fn rejects_unknown_envelope_versions() {
        let raw = r#"{"v":9,"type":"noop"}"#;
        match CallbackPayload::decode(raw) {
            Err(PayloadError::UnsupportedVersion(9)) => {}
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(CallbackPayload::decode("calendar:select:15").is_err());
    }
}
