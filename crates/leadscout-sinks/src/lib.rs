//! Downstream sinks: the chat notifier and the cold-outreach lead uploader.

pub mod error;
pub mod instantly;
pub mod slack;

pub use error::SinkError;
pub use instantly::{is_valid_email, InstantlyClient, Lead, UploadOutcome, UPLOAD_CONCURRENCY};
pub use slack::SlackClient;
