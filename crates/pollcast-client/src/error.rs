use pollcast_core::error::CoreError;
use thiserror::Error;

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("You have already voted on this poll.")]
    AlreadyVoted,
    /// The BFF answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("An unknown error occurred.")]
    Unknown,
}

impl ClientError {
    /// Text suitable for showing next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::AlreadyVoted | ClientError::Validation(_) => self.to_string(),
            ClientError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            ClientError::Api { .. } | ClientError::Transport(_) | ClientError::Unknown => {
                UNKNOWN_ERROR_MESSAGE.to_string()
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<CoreError> for ClientError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(_) => ClientError::Validation(e.to_string()),
            CoreError::Unauthorized => ClientError::Api {
                status: 401,
                message: "Unauthorized".to_string(),
            },
            CoreError::Config(_) => ClientError::Unknown,
        }
    }
}
