//! Raw source records and the flattened rows the pipeline exports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Business columns carried through from the source record into every row.
pub const BUSINESS_COLUMNS: &[&str] = &[
    "display_name",
    "types",
    "type",
    "country_code",
    "state",
    "city",
    "county",
    "street",
    "postal_code",
    "address",
    "latitude",
    "longitude",
    "phone",
    "phone_type",
    "linkedin",
    "facebook",
    "twitter",
    "instagram",
    "tiktok",
    "whatsapp",
    "youtube",
    "site",
    "site_generator",
    "photo",
    "photos_count",
    "rating",
    "rating_history",
    "reviews",
    "reviews_link",
    "range",
    "business_status",
    "business_status_history",
    "booking_appointment_link",
    "menu_link",
    "verified",
    "owner_title",
    "located_in",
    "os_id",
    "google_id",
    "place_id",
    "cid",
    "gmb_link",
    "located_os_id",
    "working_hours",
    "area_service",
    "about",
    "corp_name",
    "corp_employees",
    "corp_revenue",
    "corp_founded_year",
    "corp_is_public",
    "added_at",
    "updated_at",
];

/// Number of numbered email slots a source record may carry.
pub const EMAIL_SLOTS: usize = 3;

/// One business entity as returned by the source API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

/// The email companions found in one numbered slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSlot {
    pub email: String,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
}

impl RawRecord {
    /// String value of `name`; numbers and booleans are rendered, null and
    /// missing fields become `""`.
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        value_text(self.0.get(name))
    }

    #[must_use]
    pub fn phone(&self) -> String {
        self.text("phone")
    }

    #[must_use]
    pub fn postal_code(&self) -> String {
        self.text("postal_code")
    }

    /// Slot `n` (1-based). The email is trimmed; `None` when it is empty.
    #[must_use]
    pub fn email_slot(&self, n: usize) -> Option<EmailSlot> {
        let email = self.text(&format!("email_{n}")).trim().to_string();
        if email.is_empty() {
            return None;
        }
        Some(EmailSlot {
            email,
            title: self.text(&format!("email_{n}_title")),
            first_name: self.text(&format!("email_{n}_first_name")),
            last_name: self.text(&format!("email_{n}_last_name")),
        })
    }

    /// The fixed business column set, missing columns defaulted to `""`.
    #[must_use]
    pub fn business_columns(&self) -> Map<String, Value> {
        BUSINESS_COLUMNS
            .iter()
            .map(|col| {
                let value = match self.0.get(*col) {
                    Some(Value::Null) | None => Value::String(String::new()),
                    Some(v) => v.clone(),
                };
                ((*col).to_string(), value)
            })
            .collect()
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One exported row: business columns plus exactly one (possibly empty) email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    #[serde(flatten)]
    pub business: Map<String, Value>,
    #[serde(default)]
    pub enrich_area_codes: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_title: String,
    #[serde(default)]
    pub email_first_name: String,
    #[serde(default)]
    pub email_last_name: String,
    #[serde(with = "flag", default)]
    pub is_email_valid: bool,
}

impl NormalizedRow {
    /// Business column as text (`""` when absent).
    #[must_use]
    pub fn column(&self, name: &str) -> String {
        value_text(self.business.get(name))
    }

    #[must_use]
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }
}

/// `"TRUE"`/`"FALSE"` on the wire; a JSON bool is accepted on input.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "TRUE" } else { "FALSE" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Text(String),
        }

        match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => Ok(b),
            Flag::Text(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
        }
    }
}
