use serde::Serialize;

use crate::types::VerifyResponse;

const ACCEPTED_RESULTS: &[&str] = &["ok", "valid", "catch_all"];
const REJECTED_QUALITY: &str = "risky";

/// `true` iff `result` (lower-cased) is `ok`, `valid` or `catch_all` and
/// `quality` (lower-cased) is not `risky`.
#[must_use]
pub fn is_accepted_verdict(result: Option<&str>, quality: Option<&str>) -> bool {
    let accepted = result
        .map(|r| r.trim().to_lowercase())
        .is_some_and(|r| ACCEPTED_RESULTS.contains(&r.as_str()));
    let risky = quality.is_some_and(|q| q.trim().eq_ignore_ascii_case(REJECTED_QUALITY));
    accepted && !risky
}

/// Verdict for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailVerdict {
    pub email: String,
    pub result: Option<String>,
    pub quality: Option<String>,
    pub is_email_valid: bool,
}

impl EmailVerdict {
    #[must_use]
    pub fn from_response(email: &str, response: &VerifyResponse) -> Self {
        Self {
            email: email.to_owned(),
            result: response.result.clone(),
            quality: response.quality.clone(),
            is_email_valid: is_accepted_verdict(
                response.result.as_deref(),
                response.quality.as_deref(),
            ),
        }
    }

    /// Fail-closed verdict for an address whose lookup did not complete.
    #[must_use]
    pub fn rejected(email: &str) -> Self {
        Self {
            email: email.to_owned(),
            result: None,
            quality: None,
            is_email_valid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_neutral_is_accepted() {
        assert!(is_accepted_verdict(Some("valid"), Some("neutral")));
    }

    #[test]
    fn valid_risky_is_rejected() {
        assert!(!is_accepted_verdict(Some("valid"), Some("risky")));
        assert!(!is_accepted_verdict(Some("ok"), Some("RISKY")));
    }

    #[test]
    fn invalid_is_rejected_regardless_of_quality() {
        for quality in [None, Some("good"), Some("neutral"), Some("risky")] {
            assert!(!is_accepted_verdict(Some("invalid"), quality));
        }
    }

    #[test]
    fn accepted_results_are_case_insensitive() {
        assert!(is_accepted_verdict(Some("OK"), None));
        assert!(is_accepted_verdict(Some("Catch_All"), Some("good")));
        assert!(!is_accepted_verdict(Some("unknown"), None));
        assert!(!is_accepted_verdict(None, Some("good")));
    }

    #[test]
    fn rejected_verdict_is_invalid() {
        let v = EmailVerdict::rejected("a@x.test");
        assert!(!v.is_email_valid);
        assert_eq!(v.email, "a@x.test");
    }
}
