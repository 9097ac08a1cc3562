use thiserror::Error;

/// Failure of a single call against one provider
///
/// These never reach the caller on their own: the client wraps whichever
/// failure it ends up reporting in [`Error::Api`].
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network or connection failure, including timeouts
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider answered 2xx but the body carried an error object
    #[error("{0}")]
    Api(String),

    /// Body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Response decoded fine but held no choices
    #[error("response contained no choices")]
    EmptyResponse,

    /// Failure while reading an open stream
    #[error("stream error: {0}")]
    Stream(String),

    /// Scripted failure from the mock transport
    #[error("{0}")]
    Mock(String),
}

/// Represents errors that can occur in the quietenable client
#[derive(Error, Debug)]
pub enum Error {
    /// Any provider failure that was not recovered by the fallback
    #[error("QuietEnable API error: {0}")]
    Api(#[source] ProviderError),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Error::Api(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("invalid base url: {err}"))
    }
}

/// A Result type that uses our Error type
pub type Result<T> = std::result::Result<T, Error>;
