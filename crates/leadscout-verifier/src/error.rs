use thiserror::Error;

/// Errors returned by the verification API client.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the key. Fails a whole batch.
    #[error("verification API rejected the API key: {0}")]
    Unauthorized(String),

    /// The API answered with an `error` message instead of a verdict.
    #[error("verification API error: {0}")]
    Api(String),

    #[error("unexpected HTTP status {status} from verification API")]
    UnexpectedStatus { status: u16 },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("batch of {len} emails exceeds the per-call cap of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("invalid verifier base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
