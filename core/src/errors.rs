use thiserror::Error;

/// Shown when a failure carries no human-readable explanation at all.
pub const GENERIC_APOLOGY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// Trip Agent client errors
#[derive(Error, Debug)]
pub enum TripAgentError {
    /// Detected locally, e.g. a 2xx reply without a usable `response`.
    #[error("{0}")]
    Validation(String),

    /// The remote side answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Request { status: u16, detail: Option<String> },

    /// The transport gave up before any status was received.
    #[error("{0}")]
    Network(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl TripAgentError {
    /// Detail string supplied by the server in its error body, if any.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            TripAgentError::Request {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => Some(detail.as_str()),
            _ => None,
        }
    }

    /// The most specific explanation available for display in the transcript:
    /// server detail first, then this error's own message, then a fixed apology.
    pub fn user_message(&self) -> String {
        if let Some(detail) = self.server_detail() {
            return detail.to_string();
        }
        let own = self.to_string();
        if own.trim().is_empty() {
            GENERIC_APOLOGY.to_string()
        } else {
            own
        }
    }
}

/// Result type for Trip Agent operations
pub type TripAgentResult<T> = Result<T, TripAgentError>;
