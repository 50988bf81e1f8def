//! HTTP client for the email verification API.
//!
//! Single lookups are spaced at least [`SINGLE_CALL_SPACING`] apart. A batch
//! call fans out up to [`MAX_BATCH_SIZE`] lookups concurrently; batch pacing
//! across calls is the caller's concern.

use std::time::Duration;

use reqwest::{Client, Url};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::VerifierError;
use crate::types::VerifyResponse;
use crate::verdict::EmailVerdict;

/// Per-call cap for [`EmailVerifierClient::verify_batch`].
pub const MAX_BATCH_SIZE: usize = 25;

/// Minimum gap between successive single-email lookups.
pub const SINGLE_CALL_SPACING: Duration = Duration::from_millis(300);

/// Upstream-side lookup timeout in seconds, sent as the `timeout` parameter.
const LOOKUP_TIMEOUT_SECS: &str = "10";

/// Client for the verification API.
///
/// Use [`EmailVerifierClient::new`] with the configured base URL; tests point
/// it at a wiremock server.
pub struct EmailVerifierClient {
    client: Client,
    endpoint: Url,
    single_spacing: Duration,
    last_single_call: Mutex<Option<Instant>>,
}

impl EmailVerifierClient {
    /// # Errors
    ///
    /// Returns [`VerifierError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`VerifierError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, VerifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/api/v3/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised).map_err(|e| VerifierError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            endpoint,
            single_spacing: SINGLE_CALL_SPACING,
            last_single_call: Mutex::new(None),
        })
    }

    /// Overrides the single-call spacing. Values below the default are raised to it.
    #[must_use]
    pub fn with_single_call_spacing(mut self, spacing: Duration) -> Self {
        self.single_spacing = spacing.max(SINGLE_CALL_SPACING);
        self
    }

    /// Verifies one address, waiting out the single-call spacing first.
    ///
    /// # Errors
    ///
    /// - [`VerifierError::Unauthorized`] when the key is rejected.
    /// - [`VerifierError::Api`] when the API answers with an error message.
    /// - [`VerifierError::Http`] / [`VerifierError::UnexpectedStatus`] on transport failure.
    /// - [`VerifierError::Deserialize`] when the body is not a verdict.
    pub async fn verify_email(
        &self,
        api_key: &str,
        email: &str,
    ) -> Result<EmailVerdict, VerifierError> {
        {
            let mut last = self.last_single_call.lock().await;
            if let Some(previous) = *last {
                let ready_at = previous + self.single_spacing;
                if Instant::now() < ready_at {
                    tokio::time::sleep_until(ready_at).await;
                }
            }
            *last = Some(Instant::now());
        }
        self.lookup(api_key, email).await
    }

    /// Verifies up to [`MAX_BATCH_SIZE`] addresses concurrently.
    ///
    /// Verdicts follow input order. A lookup that fails for any reason other
    /// than a rejected key yields an invalid verdict for that address.
    ///
    /// # Errors
    ///
    /// - [`VerifierError::BatchTooLarge`] when `emails` exceeds the cap.
    /// - [`VerifierError::Unauthorized`] when any lookup reports a rejected key.
    pub async fn verify_batch(
        &self,
        api_key: &str,
        emails: &[String],
    ) -> Result<Vec<EmailVerdict>, VerifierError> {
        if emails.len() > MAX_BATCH_SIZE {
            return Err(VerifierError::BatchTooLarge {
                len: emails.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let results =
            futures::future::join_all(emails.iter().map(|email| self.lookup(api_key, email)))
                .await;

        let mut verdicts = Vec::with_capacity(emails.len());
        for (email, result) in emails.iter().zip(results) {
            match result {
                Ok(verdict) => verdicts.push(verdict),
                Err(err @ VerifierError::Unauthorized(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(email = %email, error = %err, "email lookup failed, marking invalid");
                    verdicts.push(EmailVerdict::rejected(email));
                }
            }
        }
        Ok(verdicts)
    }

    async fn lookup(&self, api_key: &str, email: &str) -> Result<EmailVerdict, VerifierError> {
        let url = self.lookup_url(api_key, email);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(VerifierError::Unauthorized(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(VerifierError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: VerifyResponse =
            serde_json::from_str(&body).map_err(|e| VerifierError::Deserialize {
                context: "email lookup".to_owned(),
                source: e,
            })?;

        if let Some(message) = parsed.error.as_deref().filter(|m| !m.trim().is_empty()) {
            if parsed.result.is_none() {
                return Err(classify_api_error(message));
            }
        }

        Ok(EmailVerdict::from_response(email, &parsed))
    }

    fn lookup_url(&self, api_key: &str, email: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("api", api_key)
            .append_pair("email", email)
            .append_pair("timeout", LOOKUP_TIMEOUT_SECS);
        url
    }
}

/// Key and credit problems are reported in the body with a 200 status.
fn classify_api_error(message: &str) -> VerifierError {
    let lower = message.to_lowercase();
    if lower.contains("api key") || lower.contains("apikey") || lower.contains("unauthori") {
        VerifierError::Unauthorized(message.to_owned())
    } else {
        VerifierError::Api(message.to_owned())
    }
}
