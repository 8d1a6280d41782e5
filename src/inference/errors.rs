use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("policy server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response from policy server: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("inference worker failed: {0}")]
    Worker(String),
}

impl InferenceError {
    /// Connection problems and server-side failures may go away on a retry;
    /// malformed requests and responses will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Transport(_) => true,
            InferenceError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
