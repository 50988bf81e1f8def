//! Conflict-free trigger slots for new schedules.

use chrono::Weekday;
use leadscout_core::{Fingerprint, Schedule, SlotTime};
use thiserror::Error;

/// Number of consecutive minutes probed before giving up.
pub const MAX_SLOT_ATTEMPTS: usize = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("no free slot on {day} within 60 minutes of {requested}")]
    NoAvailableSlot { day: Weekday, requested: SlotTime },
}

fn occupied(existing: &[Schedule], day: Weekday, slot: SlotTime, fingerprint: &Fingerprint) -> bool {
    existing
        .iter()
        .any(|s| s.slot == slot && s.runs_on(day) && &s.fingerprint() == fingerprint)
}

/// First slot at or after `requested` on `day` with no schedule sharing
/// `fingerprint`. Probes minute by minute; 59 wraps into the next hour and
/// 23:59 into 00:00.
///
/// # Errors
///
/// Returns [`SlotError::NoAvailableSlot`] when all [`MAX_SLOT_ATTEMPTS`]
/// probed minutes are taken.
pub fn find_free_slot(
    existing: &[Schedule],
    day: Weekday,
    requested: SlotTime,
    fingerprint: &Fingerprint,
) -> Result<SlotTime, SlotError> {
    let mut slot = requested;
    for _ in 0..MAX_SLOT_ATTEMPTS {
        if !occupied(existing, day, slot, fingerprint) {
            return Ok(slot);
        }
        slot = slot.next_minute();
    }
    Err(SlotError::NoAvailableSlot { day, requested })
}
