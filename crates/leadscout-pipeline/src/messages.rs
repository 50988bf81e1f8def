//! Human-readable text for every terminal outcome.

use chrono::Weekday;
use leadscout_core::{weekday_name, SlotTime};

use crate::orchestrator::RunTally;

#[must_use]
pub fn run_complete(description: &str, tally: &RunTally) -> String {
    let mut text = format!(
        "✅ Scrape complete for *{description}*: {} rows from {} records.",
        tally.rows, tally.found
    );
    if tally.verified > 0 {
        text = format!("{text} {} verified emails.", tally.verified);
    }
    text
}

#[must_use]
pub fn no_data(description: &str, slot: Option<SlotTime>) -> String {
    match slot {
        Some(slot) => format!("⚠️ No data found for {description} at {slot}."),
        None => format!("⚠️ No data found for {description}."),
    }
}

#[must_use]
pub fn run_failed(description: &str, reason: &str) -> String {
    format!("❌ Scrape failed for {description}: {reason}")
}

#[must_use]
pub fn no_slot(day: Weekday, requested: SlotTime) -> String {
    format!(
        "⛔ No free time found for {} starting at {requested}.",
        weekday_name(day)
    )
}

#[must_use]
pub fn verified_ready(rows: usize, valid: usize) -> String {
    format!("📬 Verified leads ready: {valid} valid emails across {rows} rows.")
}
