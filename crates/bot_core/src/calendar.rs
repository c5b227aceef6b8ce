//! Month-grid date picker. Pure keyboard construction; the controller
//! owns all side effects.

use chrono::{Datelike, Months, NaiveDate};
use shared::{
    domain::UserId,
    keyboard::{Button, InlineKeyboard},
    payload::{CalendarAction, CallbackPayload},
};

pub const PREV_LABEL: &str = "◀️";
pub const NEXT_LABEL: &str = "▶️";
pub const CONFIRM_LABEL: &str = "Done";
pub const SELECTED_MARK: &str = "✅";
pub const TODAY_MARK: &str = "🟢";

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const DAYS_PER_ROW: usize = 7;

/// Renders the calendar for the month containing `reference`.
///
/// Monday-first grid, left-padded with placeholders so day 1 sits
/// under its weekday. The selected day gets a marker; today is marked
/// only while nothing is selected. Navigation payloads carry the
/// reference month being paged from, and every interactive payload
/// embeds `owner`.
pub fn month_grid(
    reference: NaiveDate,
    selected: Option<NaiveDate>,
    today: NaiveDate,
    owner: UserId,
) -> InlineKeyboard {
    let reference = month_start(reference);
    let mut keyboard = InlineKeyboard::new();

    keyboard.push_row(vec![
        Button::new(
            PREV_LABEL,
            CallbackPayload::Calendar {
                owner,
                action: CalendarAction::PrevMonth { reference },
            },
        ),
        Button::placeholder(reference.format("%B %Y").to_string()),
        Button::new(
            NEXT_LABEL,
            CallbackPayload::Calendar {
                owner,
                action: CalendarAction::NextMonth { reference },
            },
        ),
    ]);

    keyboard.push_row(
        WEEKDAY_LABELS
            .iter()
            .map(|label| Button::placeholder(*label))
            .collect(),
    );

    let mut row: Vec<Button> = Vec::new();
    for _ in 0..reference.weekday().num_days_from_monday() {
        row.push(Button::placeholder(" "));
    }

    for day in reference
        .iter_days()
        .take_while(|d| d.month() == reference.month())
    {
        let number = day.day();
        let label = if selected == Some(day) {
            format!("{SELECTED_MARK} {number}")
        } else if selected.is_none() && day == today {
            format!("{TODAY_MARK} {number}")
        } else {
            number.to_string()
        };

        row.push(Button::new(
            label,
            CallbackPayload::Calendar {
                owner,
                action: CalendarAction::SelectDay { date: day },
            },
        ));

        if row.len() == DAYS_PER_ROW {
            keyboard.push_row(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        keyboard.push_row(row);
    }

    keyboard.push_row(vec![Button::new(
        CONFIRM_LABEL,
        CallbackPayload::Calendar {
            owner,
            action: CalendarAction::Confirm,
        },
    )]);

    keyboard
}

pub fn next_month(reference: NaiveDate) -> NaiveDate {
    let reference = month_start(reference);
    reference
        .checked_add_months(Months::new(1))
        .unwrap_or(reference)
}

pub fn prev_month(reference: NaiveDate) -> NaiveDate {
    let reference = month_start(reference);
    reference
        .checked_sub_months(Months::new(1))
        .unwrap_or(reference)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn day_buttons(keyboard: &InlineKeyboard) -> Vec<&Button> {
        keyboard
            .rows
            .iter()
            .flatten()
            .filter(|b| {
                matches!(
                    b.payload,
                    CallbackPayload::Calendar {
                        action: CalendarAction::SelectDay { .. },
                        ..
                    }
                )
            })
            .collect()
    }

    #[test]
    fn pads_first_row_to_the_correct_weekday() {
        // 2026-01-01 is a Thursday: three placeholder cells before it.
        let keyboard = month_grid(date(2026, 1, 15), None, date(2026, 1, 15), UserId(1));
        let first_grid_row = &keyboard.rows[2];
        let blanks = first_grid_row
            .iter()
            .take_while(|b| b.payload == CallbackPayload::Noop)
            .count();
        assert_eq!(blanks, 3);
        assert_eq!(first_grid_row.len(), 7);
    }

    #[test]
    fn renders_every_day_of_the_month_once() {
        let keyboard = month_grid(date(2026, 1, 1), None, date(2026, 6, 1), UserId(1));
        assert_eq!(day_buttons(&keyboard).len(), 31);
        let keyboard = month_grid(date(2026, 2, 1), None, date(2026, 6, 1), UserId(1));
        assert_eq!(day_buttons(&keyboard).len(), 28);
    }

    #[test]
    fn marks_selected_day_and_suppresses_today_marker() {
        let today = date(2026, 3, 10);
        let selected = date(2026, 3, 15);
        let keyboard = month_grid(today, Some(selected), today, UserId(1));

        let labels: Vec<&str> = day_buttons(&keyboard)
            .iter()
            .map(|b| b.label.as_str())
            .collect();
        assert!(labels.contains(&"✅ 15"));
        assert!(!labels.iter().any(|l| l.starts_with(TODAY_MARK)));
    }

    #[test]
    fn marks_today_only_while_nothing_is_selected() {
        let today = date(2026, 3, 10);
        let keyboard = month_grid(today, None, today, UserId(1));
        let labels: Vec<&str> = day_buttons(&keyboard)
            .iter()
            .map(|b| b.label.as_str())
            .collect();
        assert!(labels.contains(&"🟢 10"));
    }

    #[test]
    fn every_interactive_payload_carries_the_owner() {
        let owner = UserId(42);
        let keyboard = month_grid(date(2026, 5, 1), None, date(2026, 5, 1), owner);
        for button in keyboard.buttons() {
            assert_eq!(button.payload.wizard_owner(), Some(owner));
        }
    }

    #[test]
    fn navigation_payloads_carry_the_reference_month() {
        let keyboard = month_grid(date(2026, 5, 20), None, date(2026, 5, 1), UserId(1));
        match &keyboard.rows[0][0].payload {
            CallbackPayload::Calendar {
                action: CalendarAction::PrevMonth { reference },
                ..
            } => assert_eq!(*reference, date(2026, 5, 1)),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn month_shift_round_trips_across_year_boundaries() {
        let december = date(2025, 12, 1);
        assert_eq!(next_month(december), date(2026, 1, 1));
        assert_eq!(prev_month(next_month(december)), december);

        let january = date(2026, 1, 31);
        assert_eq!(prev_month(january), date(2025, 12, 1));
        assert_eq!(next_month(prev_month(january)), date(2026, 1, 1));
    }

    #[test]
    fn prev_then_next_renders_an_identical_grid() {
        let owner = UserId(3);
        let today = date(2026, 7, 4);
        for reference in [date(2026, 7, 1), date(2026, 1, 1), date(2025, 12, 1)] {
            let original = month_grid(reference, None, today, owner);
            let round_trip = month_grid(prev_month(next_month(reference)), None, today, owner);
            assert_eq!(round_trip, original);
        }
    }

    #[test]
    fn confirm_row_is_last() {
        let keyboard = month_grid(date(2026, 5, 1), None, date(2026, 5, 1), UserId(1));
        let last = keyboard.rows.last().expect("rows");
        assert_eq!(last.len(), 1);
        assert!(matches!(
            last[0].payload,
            CallbackPayload::Calendar {
                action: CalendarAction::Confirm,
                ..
            }
        ));
    }
}
