// libs/appointment-cell/src/services/slots.rs
use tracing::debug;

use shared_models::TimeOfDay;

use crate::models::{AppointmentSettings, TimeSlotLabel};

/// Lays out the day's slot labels.
///
/// Starts at `working_start` and steps by `duration_minutes` while the
/// cursor is before `working_end`. Labels whose start falls inside the break
/// `[break_start, break_end)` are skipped; the cursor is not realigned to the
/// end of the break. A slot may start just before closing and run past it.
pub fn generate_slots(
    working_start: TimeOfDay,
    working_end: TimeOfDay,
    break_window: Option<(TimeOfDay, TimeOfDay)>,
    duration_minutes: u32,
) -> Vec<TimeSlotLabel> {
    if duration_minutes == 0 || working_start >= working_end {
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut cursor = Some(working_start);

    while let Some(time) = cursor {
        if time >= working_end {
            break;
        }
        if !in_break(time, break_window) {
            slots.push(TimeSlotLabel::new(time));
        }
        cursor = time.checked_add_minutes(duration_minutes);
    }

    debug!(
        "Generated {} slots of {} minutes between {} and {}",
        slots.len(),
        duration_minutes,
        working_start,
        working_end
    );
    slots
}

pub fn slots_for_settings(settings: &AppointmentSettings, duration_minutes: u32) -> Vec<TimeSlotLabel> {
    generate_slots(
        settings.working_hours_start,
        settings.working_hours_end,
        settings.break_window(),
        duration_minutes,
    )
}

pub fn in_break(time: TimeOfDay, break_window: Option<(TimeOfDay, TimeOfDay)>) -> bool {
    matches!(break_window, Some((start, end)) if start <= time && time < end)
}
