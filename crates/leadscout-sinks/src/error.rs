use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Slack Web API answered `ok: false`.
    #[error("{method} failed: {error}")]
    Api { method: String, error: String },

    #[error("unexpected HTTP status {status} from {context}")]
    UnexpectedStatus { status: u16, context: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Every attempted upload failed at the transport level.
    #[error("upload endpoint unavailable: all {attempted} requests failed")]
    Unavailable { attempted: usize },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
