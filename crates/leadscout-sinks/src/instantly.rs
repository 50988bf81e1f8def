//! Cold-outreach lead uploader (`POST /api/v2/leads`, one request per lead).
//!
//! Leads are sent in chunks of [`UPLOAD_CONCURRENCY`] concurrent requests;
//! chunks run one after another. A failed lead never aborts its siblings.

use std::time::Duration;

use futures::future::join_all;
use leadscout_core::UploadCredentials;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SinkError;

/// In-flight requests per chunk.
pub const UPLOAD_CONCURRENCY: usize = 3;

const LEADS_PATH: &str = "/api/v2/leads";

/// `true` when `email` contains `@` and no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.contains('@') && !email.chars().any(char::is_whitespace)
}

/// One lead as the pipeline hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub phone: String,
    pub website: String,
    pub custom_variables: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct LeadPayload<'a> {
    list_id: &'a str,
    campaign: &'a str,
    email: &'a str,
    company_name: &'a str,
    phone: &'a str,
    website: &'a str,
    personalization: String,
    first_name: &'a str,
    last_name: &'a str,
    custom_variables: Map<String, Value>,
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

impl Lead {
    fn payload<'a>(&'a self, creds: &'a UploadCredentials) -> LeadPayload<'a> {
        let mut custom = self.custom_variables.clone();
        custom.insert(
            "display_name".to_owned(),
            Value::String(or_na(&self.company_name).to_owned()),
        );
        custom.insert(
            "first_name".to_owned(),
            Value::String(self.first_name.clone()),
        );
        custom.insert("last_name".to_owned(), Value::String(self.last_name.clone()));
        LeadPayload {
            list_id: &creds.list_id,
            campaign: &creds.campaign_id,
            email: &self.email,
            company_name: or_na(&self.company_name),
            phone: or_na(&self.phone),
            website: or_na(&self.website),
            personalization: format!("Hello {}, I wanted to connect.", greeting_name(&self.first_name)),
            first_name: &self.first_name,
            last_name: &self.last_name,
            custom_variables: custom,
        }
    }
}

fn greeting_name(first_name: &str) -> &str {
    match first_name.trim() {
        "" | "Unknown" => "there",
        name => name,
    }
}

/// Emails partitioned by outcome, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

enum LeadResult {
    Pending,
    Invalid,
    Accepted,
    Rejected,
    Transport,
}

pub struct InstantlyClient {
    client: Client,
    leads_url: String,
}

impl InstantlyClient {
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
            leads_url: format!("{}{LEADS_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// Uploads `leads`, returning which emails were accepted.
    ///
    /// Syntactically invalid emails are counted as failed without a request.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] only when at least one request was
    /// attempted and every attempted request failed at the transport level.
    pub async fn upload_leads(
        &self,
        creds: &UploadCredentials,
        leads: &[Lead],
    ) -> Result<UploadOutcome, SinkError> {
        let mut results: Vec<LeadResult> = leads
            .iter()
            .map(|lead| {
                if is_valid_email(&lead.email) {
                    LeadResult::Pending
                } else {
                    LeadResult::Invalid
                }
            })
            .collect();
        let valid: Vec<usize> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| matches!(r, LeadResult::Pending).then_some(i))
            .collect();

        for chunk in valid.chunks(UPLOAD_CONCURRENCY) {
            let sent = join_all(chunk.iter().map(|&i| self.add_lead(creds, &leads[i]))).await;
            for (&i, result) in chunk.iter().zip(sent) {
                results[i] = result;
            }
        }

        let attempted = valid.len();
        let transport_failures = results
            .iter()
            .filter(|r| matches!(r, LeadResult::Transport))
            .count();
        let mut outcome = UploadOutcome::default();
        for (lead, result) in leads.iter().zip(&results) {
            match result {
                LeadResult::Accepted => outcome.succeeded.push(lead.email.clone()),
                _ => outcome.failed.push(lead.email.clone()),
            }
        }

        if attempted > 0 && transport_failures == attempted {
            return Err(SinkError::Unavailable { attempted });
        }

        tracing::info!(
            uploaded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "lead upload finished"
        );
        Ok(outcome)
    }

    async fn add_lead(&self, creds: &UploadCredentials, lead: &Lead) -> LeadResult {
        let sent = self
            .client
            .post(&self.leads_url)
            .bearer_auth(&creds.api_key)
            .json(&lead.payload(creds))
            .send()
            .await;
        match sent {
            Ok(response) if response.status().is_success() => LeadResult::Accepted,
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(email = %lead.email, status, body = %body, "lead rejected");
                LeadResult::Rejected
            }
            Err(e) => {
                tracing::warn!(email = %lead.email, error = %e, "lead upload request failed");
                LeadResult::Transport
            }
        }
    }
}
