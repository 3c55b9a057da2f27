use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Failures of a single dialogue-server round trip.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("dialogue server unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("dialogue server answered HTTP {0}")]
    Status(StatusCode),

    #[error("malformed dialogue response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("dialogue response carries no output")]
    MissingOutput,
}

impl DialogueError {
    /// True when the server answered but the answer is unusable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, DialogueError::Decode(_) | DialogueError::MissingOutput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    Transport,
    Protocol,
}

/// Cloneable summary of a failed call, as it travels through the kernel inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub class: FailureClass,
    pub message: String,
}

impl CallFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self { class: FailureClass::Transport, message: message.into() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self { class: FailureClass::Protocol, message: message.into() }
    }
}

impl From<DialogueError> for CallFailure {
    fn from(err: DialogueError) -> Self {
        let class = if err.is_protocol() {
            FailureClass::Protocol
        } else {
            FailureClass::Transport
        };
        Self { class, message: err.to_string() }
    }
}
