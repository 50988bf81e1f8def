//! Request and response shapes for the places search endpoint.
//!
//! The endpoint answers `{"data": [...]}` where each element is a free-form
//! business object. A missing `data` key is treated as an empty page.

use chrono::NaiveDate;
use leadscout_core::{PhoneMode, RawRecord, SourceFilters};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub data: Vec<RawRecord>,
}

/// One page request against the places endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacesQuery {
    pub filters: SourceFilters,
    pub phone_mode: PhoneMode,
    pub limit: u32,
    pub skip: u64,
}

impl PlacesQuery {
    /// Query parameters in request order. Empty optional filters are omitted.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let f = &self.filters;
        let mut params: Vec<(&'static str, String)> = vec![
            ("cc", f.country.clone()),
            ("city", f.city.clone()),
            ("state", f.state.clone()),
        ];
        if !f.postal_code.trim().is_empty() {
            params.push(("postalCode", f.postal_code.trim().to_string()));
        }
        if !f.business_type.trim().is_empty() {
            params.push(("type", f.business_type.trim().to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        params.push(("skip", self.skip.to_string()));
        params.push(("businessStatus", f.business_status.clone()));
        params.push(("emailAndPhone", self.phone_mode.source_filter().to_string()));
        if let Some(from) = f.added_from {
            params.push(("addedFrom", epoch_seconds(from).to_string()));
        }
        if let Some(to) = f.added_to {
            params.push(("addedTo", epoch_seconds(to).to_string()));
        }
        if let Some(number) = self.phone_mode.phone_number() {
            params.push(("phoneNumber", number.to_string()));
        }
        params
    }
}

/// Seconds since the Unix epoch at UTC midnight of `date`.
#[must_use]
pub fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}
