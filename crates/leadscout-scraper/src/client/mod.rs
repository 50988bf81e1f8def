//! HTTP client for the places search endpoint (`GET /data/places`).

use std::time::Duration;

use leadscout_core::RawRecord;
use reqwest::Client;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;
use crate::types::{PlacesQuery, PlacesResponse};

const PLACES_PATH: &str = "/data/places";

/// HTTP client for the places search endpoint.
///
/// Handles rate limiting (429), rejected keys (401/403), not-found (404) and
/// other non-2xx responses as typed errors. Transient errors are retried with
/// exponential back-off and jitter up to `max_retries` additional attempts.
pub struct PlacesClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PlacesClient {
    /// Creates a `PlacesClient` with configured timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches one page of records. An empty page is `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries exhausted.
    /// - [`ScraperError::Unauthorized`]: HTTP 401/403 (not retried).
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status (5xx retried).
    /// - [`ScraperError::Http`]: network or TLS failure after all retries exhausted.
    /// - [`ScraperError::Deserialize`]: body is not a places response (not retried).
    pub async fn fetch_page(
        &self,
        api_key: &str,
        query: &PlacesQuery,
    ) -> Result<Vec<RawRecord>, ScraperError> {
        let url = self.places_url(query)?;

        let response = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header("X-API-KEY", api_key)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .header(reqwest::header::CACHE_CONTROL, "no-store")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(0);
                    return Err(ScraperError::RateLimited {
                        domain: response
                            .url()
                            .host_str()
                            .unwrap_or_default()
                            .to_owned(),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(ScraperError::Unauthorized {
                        status: status.as_u16(),
                        url: strip_query(&url),
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound {
                        url: strip_query(&url),
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: strip_query(&url),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<PlacesResponse>(&body).map_err(|e| {
                    ScraperError::Deserialize {
                        context: format!("places page (skip={})", query.skip),
                        source: e,
                    }
                })
            }
        })
        .await?;

        tracing::debug!(
            skip = query.skip,
            limit = query.limit,
            records = response.data.len(),
            "fetched places page"
        );
        Ok(response.data)
    }

    /// Builds the places URL with every query parameter encoded.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if the base URL does not parse.
    fn places_url(&self, query: &PlacesQuery) -> Result<String, ScraperError> {
        let base = format!("{}{PLACES_PATH}", self.base_url);
        let mut url = reqwest::Url::parse(&base).map_err(|e| ScraperError::InvalidBaseUrl {
            base_url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.params() {
                pairs.append_pair(key, &value);
            }
        }
        Ok(url.to_string())
    }
}

/// URL without its query string, for error messages.
fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_owned()
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
