//! Error types for leader election

/// Errors raised by a coordination service client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, timeout, TLS)
    #[error("Coordination service request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Coordination service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded
    #[error("Invalid response from coordination service: {0}")]
    InvalidResponse(String),

    /// The service is unreachable (used by in-process collaborators)
    #[error("Coordination service unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Http(error)
    }
}

/// Errors that can occur during leader election
#[derive(Debug, thiserror::Error)]
pub enum ElectionError {
    /// The election was configured inconsistently and never started
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// A coordination service call failed and aborted the election
    #[error("Coordination service call '{operation}' failed: {source}")]
    Coordination {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    /// The service whose tags should be updated is not registered
    #[error("Service '{service}' doesn't exist")]
    ServiceNotFound { service: String },
}

impl ElectionError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a client error with the name of the failed operation
    pub fn coordination(operation: &'static str, source: ClientError) -> Self {
        Self::Coordination { operation, source }
    }

    /// Whether this error was raised before any coordination call was made
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Result type for election operations
pub type Result<T> = std::result::Result<T, ElectionError>;

/// Result type for coordination client calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;
