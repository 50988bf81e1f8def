//! Batched email verification under a wall-clock budget.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use leadscout_core::{AppConfig, NormalizedRow};
use leadscout_verifier::MAX_BATCH_SIZE;
use tokio::time::Instant;

use crate::ports::EmailVerifier;

/// Minimum pause between two batch calls.
pub const MIN_BATCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    pub batch_size: usize,
    pub batch_delay: Duration,
    /// Time allowed for the whole stage, counted from its start.
    pub budget: Duration,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            batch_delay: MIN_BATCH_DELAY,
            budget: Duration::from_millis(9_500),
        }
    }
}

impl VerifyPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            batch_delay: Duration::from_millis(config.verify_batch_delay_ms).max(MIN_BATCH_DELAY),
            budget: Duration::from_millis(config.verify_budget_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Every requested address; `false` unless a batch accepted it.
    pub verdicts: HashMap<String, bool>,
    pub batches: usize,
    pub failed_batches: usize,
    pub stopped_early: bool,
}

impl VerificationReport {
    #[must_use]
    pub fn is_valid(&self, email: &str) -> bool {
        self.verdicts.get(email).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.verdicts.values().filter(|v| **v).count()
    }
}

/// Verifies `emails` in batches, never failing.
///
/// Duplicates and empty strings are skipped. Batches hold at most
/// `policy.batch_size` addresses and are separated by `policy.batch_delay`.
/// A batch that errors marks its addresses invalid and the loop moves on.
/// The deadline (`policy.budget` from the call) is checked before each batch
/// and also bounds the batch in flight; once it passes, the remaining
/// addresses stay invalid and `stopped_early` is set.
pub async fn verify_emails(
    verifier: &dyn EmailVerifier,
    api_key: &str,
    emails: &[String],
    policy: VerifyPolicy,
) -> VerificationReport {
    let deadline = Instant::now() + policy.budget;
    let mut seen = HashSet::new();
    let unique: Vec<String> = emails
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty() && seen.insert(*e))
        .map(str::to_string)
        .collect();

    let mut report = VerificationReport {
        verdicts: unique.iter().map(|e| (e.clone(), false)).collect(),
        ..VerificationReport::default()
    };

    for (index, batch) in unique.chunks(policy.batch_size.clamp(1, MAX_BATCH_SIZE)).enumerate() {
        if index > 0 {
            let resume_at = Instant::now() + policy.batch_delay;
            if resume_at >= deadline {
                report.stopped_early = true;
                break;
            }
            tokio::time::sleep_until(resume_at).await;
        }
        if Instant::now() >= deadline {
            report.stopped_early = true;
            break;
        }

        report.batches += 1;
        match tokio::time::timeout_at(deadline, verifier.verify_batch(api_key, batch)).await {
            Ok(Ok(verdicts)) => {
                for verdict in verdicts {
                    if let Some(slot) = report.verdicts.get_mut(&verdict.email) {
                        *slot = verdict.is_email_valid;
                    }
                }
            }
            Ok(Err(err)) => {
                report.failed_batches += 1;
                tracing::warn!(batch = index, size = batch.len(), error = %err, "verification batch failed, marking invalid");
            }
            Err(_) => {
                report.failed_batches += 1;
                report.stopped_early = true;
                tracing::warn!(batch = index, size = batch.len(), "verification deadline reached mid-batch");
                break;
            }
        }
    }

    if report.stopped_early {
        tracing::warn!(
            verified = report.batches - report.failed_batches,
            total = unique.len(),
            "verification stopped at deadline; remaining emails left invalid"
        );
    }
    report
}

/// Writes verdicts onto rows. Rows whose email has no verdict become invalid.
pub fn apply_verdicts(rows: &mut [NormalizedRow], report: &VerificationReport) {
    for row in rows {
        row.is_email_valid = row.has_email() && report.is_valid(row.email.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeVerifier;

    fn emails(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{i}@example.test")).collect()
    }

    #[tokio::test]
    async fn thirty_emails_take_two_spaced_batches() {
        let verifier = FakeVerifier::accepting_all();
        let start = std::time::Instant::now();

        let report = verify_emails(&verifier, "key", &emails(30), VerifyPolicy::default()).await;

        let calls = verifier.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1.len(), 25);
        assert_eq!(calls[1].1.len(), 5);
        assert!(calls[1].0.duration_since(calls[0].0) >= Duration::from_millis(500));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(report.batches, 2);
        assert_eq!(report.valid_count(), 30);
        assert!(!report.stopped_early);
    }

    #[tokio::test]
    async fn failed_batch_marks_its_emails_invalid_and_continues() {
        let verifier = FakeVerifier::accepting_all().failing_call(0);
        let policy = VerifyPolicy {
            batch_size: 2,
            ..VerifyPolicy::default()
        };

        let report = verify_emails(&verifier, "key", &emails(3), policy).await;

        assert_eq!(report.batches, 2);
        assert_eq!(report.failed_batches, 1);
        assert!(!report.is_valid("user0@example.test"));
        assert!(!report.is_valid("user1@example.test"));
        assert!(report.is_valid("user2@example.test"));
    }

    #[tokio::test]
    async fn deadline_bounds_in_flight_batch() {
        let verifier = FakeVerifier::accepting_all().with_delay(Duration::from_secs(5));
        let policy = VerifyPolicy {
            budget: Duration::from_millis(100),
            ..VerifyPolicy::default()
        };
        let start = std::time::Instant::now();

        let report = verify_emails(&verifier, "key", &emails(30), policy).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(report.stopped_early);
        assert_eq!(report.batches, 1);
        assert_eq!(report.valid_count(), 0);
        assert_eq!(report.verdicts.len(), 30);
    }

    #[tokio::test]
    async fn deadline_is_checked_before_next_batch() {
        let verifier = FakeVerifier::accepting_all();
        let policy = VerifyPolicy {
            batch_size: 10,
            batch_delay: Duration::from_millis(500),
            budget: Duration::from_millis(300),
        };

        let report = verify_emails(&verifier, "key", &emails(20), policy).await;

        assert_eq!(verifier.calls().len(), 1);
        assert!(report.stopped_early);
        assert_eq!(report.valid_count(), 10);
    }

    #[tokio::test]
    async fn duplicates_and_blanks_are_skipped() {
        let verifier = FakeVerifier::accepting(&["a@x.test"]);
        let input = vec![
            "a@x.test".to_string(),
            " ".to_string(),
            "a@x.test".to_string(),
            "b@x.test".to_string(),
        ];

        let report = verify_emails(&verifier, "key", &input, VerifyPolicy::default()).await;

        assert_eq!(verifier.calls()[0].1, vec!["a@x.test", "b@x.test"]);
        assert!(report.is_valid("a@x.test"));
        assert!(!report.is_valid("b@x.test"));
        assert_eq!(report.verdicts.len(), 2);
    }
}
