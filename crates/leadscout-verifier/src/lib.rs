//! Client for the email verification API.
//!
//! The accepted-verdict predicate lives in [`verdict`] and is the only place
//! that decides whether an upstream answer counts as a valid address.

pub mod client;
pub mod error;
pub mod types;
pub mod verdict;

pub use client::{EmailVerifierClient, MAX_BATCH_SIZE, SINGLE_CALL_SPACING};
pub use error::VerifierError;
pub use types::VerifyResponse;
pub use verdict::{is_accepted_verdict, EmailVerdict};
