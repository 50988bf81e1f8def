//! Job configuration types: filters, pagination, phone mode, credentials and
//! the resolved [`JobSpec`] a single pipeline run consumes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Phone-presence filter for a job.
///
/// Serialized with a `phone_filter` tag so it flattens into job payloads as
/// `{"phone_filter": "specific_number", "phone_number": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phone_filter", rename_all = "snake_case")]
pub enum PhoneMode {
    #[default]
    WithPhone,
    WithoutPhone,
    #[serde(alias = "enter_phone")]
    SpecificNumber { phone_number: String },
}

impl PhoneMode {
    /// Parse a filter name plus optional number.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPhoneFilter`] for an unknown filter name, or
    /// [`CoreError::MissingPhoneNumber`] when `specific_number` has no number.
    pub fn parse(filter: &str, phone_number: Option<&str>) -> Result<Self, CoreError> {
        match filter {
            "with_phone" => Ok(Self::WithPhone),
            "without_phone" => Ok(Self::WithoutPhone),
            "specific_number" | "enter_phone" => {
                let number = phone_number.map(str::trim).unwrap_or_default();
                if number.is_empty() {
                    return Err(CoreError::MissingPhoneNumber);
                }
                Ok(Self::SpecificNumber {
                    phone_number: number.to_string(),
                })
            }
            other => Err(CoreError::InvalidPhoneFilter(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WithPhone => "with_phone",
            Self::WithoutPhone => "without_phone",
            Self::SpecificNumber { .. } => "specific_number",
        }
    }

    /// Value of the source API's `emailAndPhone` parameter.
    #[must_use]
    pub fn source_filter(&self) -> &'static str {
        match self {
            Self::WithPhone | Self::SpecificNumber { .. } => "with_phone",
            Self::WithoutPhone => "without_phone",
        }
    }

    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        match self {
            Self::SpecificNumber { phone_number } => Some(phone_number),
            _ => None,
        }
    }
}

/// Search filters forwarded to the source API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFilters {
    pub country: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub business_type: String,
    pub business_status: String,
    pub added_from: Option<NaiveDate>,
    pub added_to: Option<NaiveDate>,
}

impl SourceFilters {
    /// Human-readable summary, e.g. `"restaurant in Leeds, England"`.
    #[must_use]
    pub fn describe(&self) -> String {
        let business = if self.business_type.trim().is_empty() {
            "businesses"
        } else {
            self.business_type.trim()
        };
        let place = [self.city.trim(), self.state.trim(), self.postal_code.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = if place.is_empty() {
            business.to_string()
        } else {
            format!("{business} in {place}")
        };
        if !self.country.trim().is_empty() {
            out = format!("{out} ({})", self.country.trim());
        }
        out
    }
}

/// Skip-cursor pagination: `page_count` requests of `page_size` records,
/// starting at `skip = start_page * page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page_size: u32,
    pub page_count: u32,
    pub start_page: u32,
}

impl Pagination {
    /// Skip offsets for every page, in request order.
    #[must_use]
    pub fn offsets(&self) -> Vec<u64> {
        let size = u64::from(self.page_size);
        (0..self.page_count)
            .map(|i| (u64::from(self.start_page) + u64::from(i)) * size)
            .collect()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyCredentials {
    pub bot_token: String,
    pub channel_id: String,
}

impl std::fmt::Debug for NotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyCredentials")
            .field("bot_token", &"[redacted]")
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCredentials {
    pub api_key: String,
    pub list_id: String,
    pub campaign_id: String,
}

impl std::fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("api_key", &"[redacted]")
            .field("list_id", &self.list_id)
            .field("campaign_id", &self.campaign_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputNaming {
    pub json_file_name: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            json_file_name: "business-data.json".to_string(),
        }
    }
}

/// Job fields persisted with a schedule or queued job. Credentials that are
/// absent here are filled from the settings blob when the job is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(flatten)]
    pub filters: SourceFilters,
    #[serde(flatten)]
    pub phone_mode: PhoneMode,
    #[serde(default)]
    pub enrich_area_codes: bool,
    #[serde(default)]
    pub verify_emails: bool,
    #[serde(default)]
    pub connect_cold_email: bool,
    #[serde(default)]
    pub upload: Option<UploadCredentials>,
    #[serde(default)]
    pub notify: Option<NotifyCredentials>,
    #[serde(default)]
    pub json_file_name: Option<String>,
}

impl JobTemplate {
    #[must_use]
    pub fn output_naming(&self) -> OutputNaming {
        match self.json_file_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => OutputNaming {
                json_file_name: name.to_string(),
            },
            _ => OutputNaming::default(),
        }
    }
}

/// Fully resolved configuration for one pipeline run.
#[derive(Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub source_api_key: String,
    pub filters: SourceFilters,
    pub pagination: Pagination,
    pub phone_mode: PhoneMode,
    pub enrich_area_codes: bool,
    pub verify_emails: bool,
    pub verifier_api_key: Option<String>,
    pub notify: Option<NotifyCredentials>,
    pub upload_enabled: bool,
    pub upload: Option<UploadCredentials>,
    pub output: OutputNaming,
}

impl JobSpec {
    #[must_use]
    pub fn filter_description(&self) -> String {
        self.filters.describe()
    }
}

impl std::fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSpec")
            .field("source_api_key", &"[redacted]")
            .field("filters", &self.filters)
            .field("pagination", &self.pagination)
            .field("phone_mode", &self.phone_mode)
            .field("enrich_area_codes", &self.enrich_area_codes)
            .field("verify_emails", &self.verify_emails)
            .field(
                "verifier_api_key",
                &self.verifier_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("notify", &self.notify)
            .field("upload_enabled", &self.upload_enabled)
            .field("upload", &self.upload)
            .field("output", &self.output)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::InvalidJobStatus(other.to_string())),
        }
    }
}

/// A one-time job row from the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedJob {
    pub id: i64,
    pub public_id: Uuid,
    pub status: JobStatus,
    pub template: JobTemplate,
    pub record_limit: i32,
    pub skip_times: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_mode_accepts_enter_phone_alias() {
        let mode: PhoneMode = serde_json::from_value(serde_json::json!({
            "phone_filter": "enter_phone",
            "phone_number": "+44 113 000"
        }))
        .unwrap();
        assert_eq!(
            mode,
            PhoneMode::SpecificNumber {
                phone_number: "+44 113 000".to_string()
            }
        );
        assert_eq!(mode.source_filter(), "with_phone");
        assert_eq!(mode.phone_number(), Some("+44 113 000"));
    }

    #[test]
    fn phone_mode_parse_requires_number() {
        assert_eq!(
            PhoneMode::parse("specific_number", Some("  ")),
            Err(CoreError::MissingPhoneNumber)
        );
        assert_eq!(
            PhoneMode::parse("sometimes", None),
            Err(CoreError::InvalidPhoneFilter("sometimes".to_string()))
        );
        assert_eq!(
            PhoneMode::parse("without_phone", None),
            Ok(PhoneMode::WithoutPhone)
        );
    }

    #[test]
    fn pagination_offsets_start_at_start_page() {
        let p = Pagination {
            page_size: 100,
            page_count: 3,
            start_page: 2,
        };
        assert_eq!(p.offsets(), vec![200, 300, 400]);

        let direct = Pagination {
            page_size: 50,
            page_count: 2,
            start_page: 0,
        };
        assert_eq!(direct.offsets(), vec![0, 50]);
    }

    #[test]
    fn job_template_flattens_filters_and_phone_mode() {
        let template: JobTemplate = serde_json::from_value(serde_json::json!({
            "country": "GB",
            "city": "Leeds",
            "business_type": "plumber",
            "phone_filter": "without_phone",
            "verify_emails": true
        }))
        .unwrap();
        assert_eq!(template.filters.city, "Leeds");
        assert_eq!(template.phone_mode, PhoneMode::WithoutPhone);
        assert!(template.verify_emails);
        assert!(template.upload.is_none());
        assert_eq!(template.output_naming().json_file_name, "business-data.json");
    }

    #[test]
    fn describe_renders_type_and_place() {
        let filters = SourceFilters {
            country: "GB".to_string(),
            city: "Leeds".to_string(),
            state: "England".to_string(),
            business_type: "plumber".to_string(),
            ..SourceFilters::default()
        };
        assert_eq!(filters.describe(), "plumber in Leeds, England (GB)");
        assert_eq!(SourceFilters::default().describe(), "businesses");
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = NotifyCredentials {
            bot_token: "xoxb-secret".to_string(),
            channel_id: "C123".to_string(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("xoxb-secret"));
        assert!(debug.contains("C123"));
    }

    #[test]
    fn job_status_round_trips_through_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("no_results".parse::<JobStatus>().is_err());
    }
}
