use std::sync::Arc;

use leadscout_core::AppConfig;
use leadscout_scraper::{AreaCodeTable, PlacesClient, ScraperError};
use leadscout_sinks::{InstantlyClient, SinkError, SlackClient};
use leadscout_verifier::{EmailVerifierClient, VerifierError};
use thiserror::Error;

use crate::adapters::PgStore;
use crate::ports::{
    EmailVerifier, JobQueue, LeadSink, Notifier, RecordSource, ScheduleStore, SettingsStore,
    SnapshotStore,
};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("source client: {0}")]
    Source(#[from] ScraperError),
    #[error("verifier client: {0}")]
    Verifier(#[from] VerifierError),
    #[error("sink client: {0}")]
    Sink(#[from] SinkError),
}

/// Everything a run, tick or queue pass talks to.
#[derive(Clone)]
pub struct Services {
    pub source: Arc<dyn RecordSource>,
    pub verifier: Arc<dyn EmailVerifier>,
    pub notifier: Arc<dyn Notifier>,
    pub leads: Arc<dyn LeadSink>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub queue: Arc<dyn JobQueue>,
    pub area_codes: Arc<AreaCodeTable>,
}

impl Services {
    /// Builds the HTTP clients from `config` and wires every store port to
    /// `store`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if any HTTP client cannot be constructed.
    pub fn from_config(
        config: &AppConfig,
        store: PgStore,
        area_codes: AreaCodeTable,
    ) -> Result<Self, SetupError> {
        let source = PlacesClient::new(
            &config.source_api_url,
            config.http_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )?;
        let verifier = EmailVerifierClient::new(
            &config.verifier_api_url,
            config.http_timeout_secs,
            &config.user_agent,
        )?;
        let notifier = SlackClient::new(
            &config.slack_api_url,
            config.http_timeout_secs,
            &config.user_agent,
        )?;
        let leads = InstantlyClient::new(
            &config.instantly_api_url,
            config.http_timeout_secs,
            &config.user_agent,
        )?;
        let store = Arc::new(store);

        Ok(Self {
            source: Arc::new(source),
            verifier: Arc::new(verifier),
            notifier: Arc::new(notifier),
            leads: Arc::new(leads),
            snapshots: store.clone(),
            settings: store.clone(),
            schedules: store.clone(),
            queue: store,
            area_codes: Arc::new(area_codes),
        })
    }
}
