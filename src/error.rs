use thiserror::Error;

/// Errors surfaced by the Reflect transport and dispatcher.
#[derive(Error, Debug)]
pub enum ReflectError {
    /// An operation needing credentials ran without an access token.
    #[error("Not authenticated. Use the 'authenticate' tool first.")]
    AuthRequired,

    /// The token endpoint rejected the authorization code.
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Non-2xx response from the Reflect API.
    #[error("Reflect API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No graph_id provided and no default graph configured")]
    MissingGraph,

    /// A response did not match the expected record schema.
    #[error("Invalid {record} response: {reason}")]
    Validation { record: &'static str, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection-level failure before any HTTP status was received.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ReflectError>;
