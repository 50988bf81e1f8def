//! Reshapes raw source records into one exported row per distinct email.
//!
//! Order is source record order, then slot order (1, 2, 3). Email dedup is
//! exact and case-sensitive across the whole call: the first occurrence wins.
//! A record that emits no email row still gets one fallback row.

use std::collections::HashSet;

use leadscout_core::{EmailSlot, NormalizedRow, PhoneMode, RawRecord, EMAIL_SLOTS};

use crate::area_codes::AreaCodeTable;

/// Phone values that count as "no phone" for the `without_phone` filter.
const ABSENT_PHONE_SENTINELS: &[&str] = &["", "n/a", "na", "none", "-", "--"];

/// `true` when `phone`, trimmed and lower-cased, is empty or a sentinel.
#[must_use]
pub fn is_absent_phone(phone: &str) -> bool {
    let p = phone.trim().to_lowercase();
    ABSENT_PHONE_SENTINELS.contains(&p.as_str())
}

/// Normalizes `records` into rows.
///
/// 1. `without_phone` drops records carrying a real phone number.
/// 2. Each non-empty email slot not seen earlier in this call yields a row.
/// 3. A record that emitted no row in step 2 yields one fallback row.
///
/// `area_codes` is `None` when enrichment is off; rows then carry `""`.
#[must_use]
pub fn normalize(
    records: &[RawRecord],
    phone_mode: &PhoneMode,
    area_codes: Option<&AreaCodeTable>,
) -> Vec<NormalizedRow> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        if matches!(phone_mode, PhoneMode::WithoutPhone) && !is_absent_phone(&record.phone()) {
            continue;
        }

        let area_code = area_codes
            .map(|table| table.lookup(&record.postal_code()).to_owned())
            .unwrap_or_default();

        let mut emitted = false;
        for slot in (1..=EMAIL_SLOTS).filter_map(|n| record.email_slot(n)) {
            if seen.insert(slot.email.clone()) {
                rows.push(row_for(record, &area_code, Some(&slot)));
                emitted = true;
            }
        }

        if !emitted {
            rows.push(row_for(record, &area_code, None));
        }
    }

    rows
}

fn row_for(record: &RawRecord, area_code: &str, slot: Option<&EmailSlot>) -> NormalizedRow {
    let (email, title, first, last) = match slot {
        Some(s) => (
            s.email.clone(),
            s.title.clone(),
            s.first_name.clone(),
            s.last_name.clone(),
        ),
        None => Default::default(),
    };
    NormalizedRow {
        business: record.business_columns(),
        enrich_area_codes: area_code.to_owned(),
        email,
        email_title: title,
        email_first_name: first,
        email_last_name: last,
        is_email_valid: false,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
