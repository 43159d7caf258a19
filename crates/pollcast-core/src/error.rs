use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more human-readable validation issues.
    #[error("{}", .0.join(". "))]
    Validation(Vec<String>),
    #[error("invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),
    #[error("unauthorized")]
    Unauthorized,
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(vec![message.into()])
    }
}
