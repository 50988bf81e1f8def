//! Re-verification of stored snapshots.

use serde::Serialize;

use crate::messages;
use crate::services::Services;
use crate::verify::{apply_verdicts, verify_emails, VerifyPolicy};
use crate::DispatchError;

pub const VERIFIED_FILE_NAME: &str = "verified-business-data.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverifyReport {
    pub snapshot_id: i64,
    pub rows: usize,
    pub valid: usize,
    pub stopped_early: bool,
    pub notified: bool,
}

/// Verifies the oldest unverified snapshot and marks it verified.
///
/// Returns `Ok(None)` when every snapshot is already verified. When notify
/// credentials are configured the verified rows are posted as an attachment.
///
/// # Errors
///
/// - [`DispatchError::MissingVerifierKey`] when settings hold no verifier key.
/// - [`DispatchError::Store`] when the snapshot cannot be read or written.
pub async fn reverify_next_snapshot(
    services: &Services,
    policy: VerifyPolicy,
) -> Result<Option<ReverifyReport>, DispatchError> {
    let settings = services.settings.load_settings().await?;
    let api_key = settings
        .verifier_api_key()
        .ok_or(DispatchError::MissingVerifierKey)?;

    let Some(mut snapshot) = services.snapshots.oldest_unverified().await? else {
        tracing::debug!("no unverified snapshots");
        return Ok(None);
    };

    let emails: Vec<String> = snapshot
        .rows
        .iter()
        .filter(|r| r.has_email())
        .map(|r| r.email.clone())
        .collect();
    let verification = verify_emails(services.verifier.as_ref(), &api_key, &emails, policy).await;
    apply_verdicts(&mut snapshot.rows, &verification);
    services
        .snapshots
        .mark_verified(snapshot.id, &snapshot.rows)
        .await?;

    let valid = snapshot.rows.iter().filter(|r| r.is_email_valid).count();
    let mut report = ReverifyReport {
        snapshot_id: snapshot.id,
        rows: snapshot.rows.len(),
        valid,
        stopped_early: verification.stopped_early,
        notified: false,
    };

    if let Some(creds) = settings.notify_credentials() {
        let text = messages::verified_ready(report.rows, valid);
        let sent = match services.notifier.post_message(&creds, &text).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "verified-leads message failed");
                false
            }
        };
        match serde_json::to_vec_pretty(&snapshot.rows) {
            Ok(bytes) => {
                if let Err(err) = services
                    .notifier
                    .post_file(&creds, bytes, VERIFIED_FILE_NAME)
                    .await
                {
                    tracing::warn!(error = %err, "verified-leads attachment failed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "verified rows not serialized"),
        }
        report.notified = sent;
    }

    tracing::info!(
        snapshot_id = report.snapshot_id,
        rows = report.rows,
        valid = report.valid,
        "snapshot re-verified"
    );
    Ok(Some(report))
}
