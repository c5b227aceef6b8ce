//! Hour/minute picker keyboards. Pure construction, same contract as
//! the calendar generator.

use shared::{
    domain::{PickerStage, TimePickerState, UserId},
    keyboard::{Button, InlineKeyboard},
    payload::{CallbackPayload, TimePickerAction},
};

pub const CONFIRM_LABEL: &str = "✅ Done";
pub const CANCEL_LABEL: &str = "❌ Cancel";

/// Minute buttons are quantized; free-form minutes are not offered.
pub const MINUTE_CHOICES: [u32; 4] = [0, 15, 30, 45];

const HOURS_PER_ROW: usize = 4;

pub fn time_grid(picker: &TimePickerState, owner: UserId) -> InlineKeyboard {
    let mut keyboard = InlineKeyboard::new();

    match picker.stage {
        PickerStage::Hours => {
            let mut row: Vec<Button> = Vec::new();
            for hour in 0..24u32 {
                row.push(Button::new(
                    format!("{hour:02}"),
                    CallbackPayload::TimePicker {
                        owner,
                        action: TimePickerAction::SelectHour { hour },
                    },
                ));
                if row.len() == HOURS_PER_ROW {
                    keyboard.push_row(std::mem::take(&mut row));
                }
            }
        }
        PickerStage::Minutes => {
            keyboard.push_row(
                MINUTE_CHOICES
                    .iter()
                    .map(|&minute| {
                        Button::new(
                            format!("{minute:02}"),
                            CallbackPayload::TimePicker {
                                owner,
                                action: TimePickerAction::SelectMinute { minute },
                            },
                        )
                    })
                    .collect(),
            );
        }
    }

    keyboard.push_row(vec![
        Button::new(
            CONFIRM_LABEL,
            CallbackPayload::TimePicker {
                owner,
                action: TimePickerAction::Confirm,
            },
        ),
        Button::new(
            CANCEL_LABEL,
            CallbackPayload::TimePicker {
                owner,
                action: TimePickerAction::Cancel,
            },
        ),
    ]);

    keyboard
}
