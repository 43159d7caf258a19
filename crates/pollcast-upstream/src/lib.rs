//! Client for the remote poll API that the BFF fronts.

pub mod client;

pub use client::{UpstreamClient, Voter};

use pollcast_models::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The remote API answered with a non-success status.
    #[error("upstream returned {status}: {}", .body.describe())]
    Status { status: u16, body: ErrorBody },
    #[error("upstream http error: {0}")]
    Http(String),
    #[error("invalid upstream response: {0}")]
    Decode(String),
    #[error("invalid upstream url: {0}")]
    Url(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
