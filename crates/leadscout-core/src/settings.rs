//! Shared credentials blob stored under [`SETTINGS_KEY`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::job::{NotifyCredentials, UploadCredentials};

pub const SETTINGS_KEY: &str = "scraperSettings";

/// Stand-in for a secret in API responses.
pub const REDACTED: &str = "********";

/// Credentials shared by every job. Loaded once per run and passed down.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targetron_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub million_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instantly_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instantly_list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instantly_campaign_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub from_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "blank_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub to_date: Option<NaiveDate>,
    /// Keys this version does not interpret, kept so a write does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn blank_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Settings {
    #[must_use]
    pub fn source_api_key(&self) -> Option<String> {
        non_blank(self.targetron_api_key.as_ref())
    }

    #[must_use]
    pub fn verifier_api_key(&self) -> Option<String> {
        non_blank(self.million_api_key.as_ref())
    }

    /// Notification credentials, when both token and channel are set.
    #[must_use]
    pub fn notify_credentials(&self) -> Option<NotifyCredentials> {
        Some(NotifyCredentials {
            bot_token: non_blank(self.slack_bot_token.as_ref())?,
            channel_id: non_blank(self.slack_channel_id.as_ref())?,
        })
    }

    /// Upload credentials, when key, list and campaign are all set.
    #[must_use]
    pub fn upload_credentials(&self) -> Option<UploadCredentials> {
        Some(UploadCredentials {
            api_key: non_blank(self.instantly_api_key.as_ref())?,
            list_id: non_blank(self.instantly_list_id.as_ref())?,
            campaign_id: non_blank(self.instantly_campaign_id.as_ref())?,
        })
    }

    /// Copy with every secret replaced by a fixed marker, for API reads.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        Self {
            targetron_api_key: mask(&self.targetron_api_key),
            million_api_key: mask(&self.million_api_key),
            slack_bot_token: mask(&self.slack_bot_token),
            instantly_api_key: mask(&self.instantly_api_key),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "[redacted]" } else { "None" };
        f.debug_struct("Settings")
            .field("targetron_api_key", &set(&self.targetron_api_key))
            .field("million_api_key", &set(&self.million_api_key))
            .field("slack_bot_token", &set(&self.slack_bot_token))
            .field("slack_channel_id", &self.slack_channel_id)
            .field("instantly_api_key", &set(&self.instantly_api_key))
            .field("instantly_list_id", &self.instantly_list_id)
            .field("instantly_campaign_id", &self.instantly_campaign_id)
            .field("from_date", &self.from_date)
            .field("to_date", &self.to_date)
            .finish_non_exhaustive()
    }
}
