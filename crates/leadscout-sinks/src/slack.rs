//! Slack Web API notifier: `chat.postMessage` and the external file upload
//! flow (`files.getUploadURLExternal` → upload → `files.completeUploadExternal`).

use std::time::Duration;

use leadscout_core::NotifyCredentials;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::SinkError;

/// Common envelope of every Web API response.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
}

pub struct SlackClient {
    client: Client,
    base_url: String,
}

impl SlackClient {
    /// `base_url` is the Web API root, e.g. `https://slack.com/api`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Posts a markdown text message to the configured channel.
    ///
    /// # Errors
    ///
    /// [`SinkError::Api`] on `ok: false`, otherwise transport or parse errors.
    pub async fn post_message(
        &self,
        creds: &NotifyCredentials,
        text: &str,
    ) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(&creds.bot_token)
            .json(&json!({
                "channel": creds.channel_id,
                "text": text,
                "mrkdwn": true,
            }))
            .send()
            .await?;
        Self::envelope("chat.postMessage", response).await?;
        Ok(())
    }

    /// Uploads `bytes` as `filename` and shares it in the channel.
    ///
    /// # Errors
    ///
    /// [`SinkError::Api`] when any step answers `ok: false`, or
    /// [`SinkError::UnexpectedStatus`] when the upload URL rejects the bytes.
    pub async fn post_file(
        &self,
        creds: &NotifyCredentials,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), SinkError> {
        let length = bytes.len().to_string();
        let response = self
            .client
            .post(self.method_url("files.getUploadURLExternal"))
            .bearer_auth(&creds.bot_token)
            .form(&[("filename", filename), ("length", length.as_str())])
            .send()
            .await?;
        let ticket = Self::envelope("files.getUploadURLExternal", response).await?;
        let (Some(upload_url), Some(file_id)) = (ticket.upload_url, ticket.file_id) else {
            return Err(SinkError::Api {
                method: "files.getUploadURLExternal".to_owned(),
                error: "response missing upload_url or file_id".to_owned(),
            });
        };

        let upload = self
            .client
            .post(&upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        if !upload.status().is_success() {
            return Err(SinkError::UnexpectedStatus {
                status: upload.status().as_u16(),
                context: "file upload URL".to_owned(),
            });
        }

        let response = self
            .client
            .post(self.method_url("files.completeUploadExternal"))
            .bearer_auth(&creds.bot_token)
            .json(&json!({
                "files": [{ "id": file_id, "title": filename }],
                "channel_id": creds.channel_id,
            }))
            .send()
            .await?;
        Self::envelope("files.completeUploadExternal", response).await?;

        tracing::debug!(filename, file_id = %file_id, "file shared to channel");
        Ok(())
    }

    async fn envelope(method: &str, response: reqwest::Response) -> Result<ApiEnvelope, SinkError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::UnexpectedStatus {
                status: status.as_u16(),
                context: method.to_owned(),
            });
        }
        let body = response.text().await?;
        let envelope: ApiEnvelope =
            serde_json::from_str(&body).map_err(|e| SinkError::Deserialize {
                context: method.to_owned(),
                source: e,
            })?;
        if !envelope.ok {
            return Err(SinkError::Api {
                method: method.to_owned(),
                error: envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }
        Ok(envelope)
    }
}
