//! One pipeline run: fetch, normalize, persist, verify, notify, upload.
//!
//! Only the fetch stage can fail a run. Every later stage degrades: its
//! failure is logged, recorded as a [`StageWarning`] and the run continues.

use serde::Serialize;
use serde_json::{Map, Value};

use leadscout_core::{JobSpec, NormalizedRow};
use leadscout_scraper::normalize;
use leadscout_sinks::Lead;

use crate::fetch::fetch_pages;
use crate::messages;
use crate::services::Services;
use crate::verify::{apply_verdicts, verify_emails, VerifyPolicy};
use crate::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Filtering,
    Enriching,
    PersistingRaw,
    Verifying,
    Notifying,
    Uploading,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Enriching => "enriching",
            Self::PersistingRaw => "persisting_raw",
            Self::Verifying => "verifying",
            Self::Notifying => "notifying",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageWarning {
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    /// Raw records returned by the source.
    pub found: usize,
    pub rows: usize,
    pub verified: usize,
    pub notified: bool,
    pub uploaded: usize,
    pub upload_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub rows: Vec<NormalizedRow>,
    pub tally: RunTally,
    pub warnings: Vec<StageWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// The source returned no records. Nothing downstream ran.
    NoData,
}

#[derive(Clone)]
pub struct Orchestrator {
    services: Services,
    verify_policy: VerifyPolicy,
}

struct Warnings(Vec<StageWarning>);

impl Warnings {
    fn push(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %stage, %message, "stage degraded");
        self.0.push(StageWarning { stage, message });
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "entering stage");
}

impl Orchestrator {
    #[must_use]
    pub fn new(services: Services, verify_policy: VerifyPolicy) -> Self {
        Self {
            services,
            verify_policy,
        }
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    #[must_use]
    pub fn verify_policy(&self) -> VerifyPolicy {
        self.verify_policy
    }

    /// Runs `spec` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Fetch`] when any source page fails. No later
    /// stage produces an error.
    #[tracing::instrument(skip_all, fields(filters = %spec.filter_description()))]
    pub async fn run(&self, spec: &JobSpec) -> Result<RunOutcome, PipelineError> {
        let mut warnings = Warnings(Vec::new());
        let mut tally = RunTally::default();

        enter(Stage::Fetching);
        let records = match fetch_pages(
            self.services.source.as_ref(),
            &spec.source_api_key,
            &spec.filters,
            spec.pagination,
            &spec.phone_mode,
        )
        .await
        {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(stage = %Stage::Failed, error = %err, "fetch failed");
                return Err(PipelineError::Fetch(err));
            }
        };
        if records.is_empty() {
            tracing::info!("source returned no records");
            return Ok(RunOutcome::NoData);
        }
        tally.found = records.len();

        enter(Stage::Filtering);
        let area_codes = if spec.enrich_area_codes {
            enter(Stage::Enriching);
            if self.services.area_codes.is_empty() {
                warnings.push(Stage::Enriching, "area code table is empty");
            }
            Some(self.services.area_codes.as_ref())
        } else {
            None
        };
        let mut rows = normalize(&records, &spec.phone_mode, area_codes);
        tally.rows = rows.len();

        enter(Stage::PersistingRaw);
        match self.services.snapshots.insert_snapshot(&rows).await {
            Ok(id) => tracing::debug!(snapshot_id = id, "stored unverified snapshot"),
            Err(err) => warnings.push(
                Stage::PersistingRaw,
                format!("snapshot not stored: {err}"),
            ),
        }

        if spec.verify_emails {
            enter(Stage::Verifying);
            self.verify(spec, &mut rows, &mut warnings).await;
        }
        tally.verified = rows.iter().filter(|r| r.is_email_valid).count();

        if let Some(creds) = &spec.notify {
            enter(Stage::Notifying);
            let text = messages::run_complete(&spec.filter_description(), &tally);
            match self.services.notifier.post_message(creds, &text).await {
                Ok(()) => tally.notified = true,
                Err(err) => warnings.push(Stage::Notifying, format!("message not sent: {err}")),
            }
            match serde_json::to_vec_pretty(&rows) {
                Ok(bytes) => {
                    if let Err(err) = self
                        .services
                        .notifier
                        .post_file(creds, bytes, &spec.output.json_file_name)
                        .await
                    {
                        warnings.push(Stage::Notifying, format!("attachment not sent: {err}"));
                    }
                }
                Err(err) => {
                    warnings.push(Stage::Notifying, format!("rows not serialized: {err}"));
                }
            }
        }

        if spec.upload_enabled {
            enter(Stage::Uploading);
            self.upload(spec, &rows, &mut tally, &mut warnings).await;
        }

        enter(Stage::Done);
        tracing::info!(
            found = tally.found,
            rows = tally.rows,
            verified = tally.verified,
            uploaded = tally.uploaded,
            warnings = warnings.0.len(),
            "run complete"
        );
        Ok(RunOutcome::Completed(RunReport {
            rows,
            tally,
            warnings: warnings.0,
        }))
    }

    async fn verify(&self, spec: &JobSpec, rows: &mut [NormalizedRow], warnings: &mut Warnings) {
        let Some(api_key) = spec.verifier_api_key.as_deref() else {
            warnings.push(Stage::Verifying, "no verifier API key; emails left unverified");
            return;
        };
        let emails: Vec<String> = rows
            .iter()
            .filter(|r| r.has_email())
            .map(|r| r.email.clone())
            .collect();
        if emails.is_empty() {
            return;
        }

        let report = verify_emails(
            self.services.verifier.as_ref(),
            api_key,
            &emails,
            self.verify_policy,
        )
        .await;
        apply_verdicts(rows, &report);

        if report.failed_batches > 0 {
            warnings.push(
                Stage::Verifying,
                format!("{} of {} batches failed", report.failed_batches, report.batches),
            );
        }
        if report.stopped_early {
            warnings.push(Stage::Verifying, "deadline reached before all emails were checked");
        }
    }

    async fn upload(
        &self,
        spec: &JobSpec,
        rows: &[NormalizedRow],
        tally: &mut RunTally,
        warnings: &mut Warnings,
    ) {
        let Some(creds) = &spec.upload else {
            warnings.push(Stage::Uploading, "upload enabled without credentials");
            return;
        };
        let leads = leads_from_rows(rows);
        if leads.is_empty() {
            return;
        }

        match self.services.leads.upload_leads(creds, &leads).await {
            Ok(outcome) => {
                tally.uploaded = outcome.succeeded.len();
                tally.upload_failed = outcome.failed.len();
                if !outcome.failed.is_empty() {
                    warnings.push(
                        Stage::Uploading,
                        format!("{} leads rejected", outcome.failed.len()),
                    );
                }
            }
            Err(err) => {
                tally.upload_failed = leads.len();
                warnings.push(Stage::Uploading, format!("upload failed: {err}"));
            }
        }
    }
}

fn or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

/// Leads for every verified row whose email contains `@`, in row order.
#[must_use]
pub fn leads_from_rows(rows: &[NormalizedRow]) -> Vec<Lead> {
    rows.iter()
        .filter(|row| row.is_email_valid && row.email.contains('@'))
        .map(|row| {
            let mut custom = Map::new();
            for (key, column) in [
                ("company", "display_name"),
                ("phone", "phone"),
                ("city", "city"),
                ("country", "country_code"),
                ("website", "site"),
            ] {
                custom.insert(key.to_string(), Value::String(row.column(column)));
            }
            Lead {
                email: row.email.clone(),
                first_name: or_unknown(&row.email_first_name),
                last_name: or_unknown(&row.email_last_name),
                company_name: row.column("display_name"),
                phone: row.column("phone"),
                website: row.column("site"),
                custom_variables: custom,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
