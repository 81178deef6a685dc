use thiserror::Error;

/// Failures of the solver transport. A response with
/// `solution_found == false` is not an error.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response was received (connect failure, timeout, broken body stream)
    #[error("solver service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-2xx status
    #[error("solver service returned HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// The service answered 2xx but the body is not a valid response
    #[error("malformed solver response: {reason}")]
    Protocol { reason: String },

    /// The request could not be encoded
    #[error("failed to encode solve request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GatewayError {
    /// True when the service could not be reached or failed on its side,
    /// which callers may treat as "solver unavailable"
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Protocol { .. } | Self::Encode(_) => false,
        }
    }
}
