use serde::{Deserialize, Serialize};

/// Sentinel duration meaning "close the poll now".
pub const CLOSE_NOW: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoll {
    pub prompt: String,
    pub options: Vec<String>,
    /// Poll lifetime in seconds.
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePoll {
    pub is_archived: bool,
}

/// New lifetime for a poll. Encoded on the wire as a plain integer where
/// `-1` closes the poll immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DurationUpdate {
    CloseNow,
    Seconds(u64),
}

#[derive(Debug, thiserror::Error)]
#[error("duration must be greater than 0 or -1 to close now")]
pub struct InvalidDuration;

impl TryFrom<i64> for DurationUpdate {
    type Error = InvalidDuration;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            CLOSE_NOW => Ok(DurationUpdate::CloseNow),
            n if n >= 1 => Ok(DurationUpdate::Seconds(n as u64)),
            _ => Err(InvalidDuration),
        }
    }
}

impl From<DurationUpdate> for i64 {
    fn from(update: DurationUpdate) -> Self {
        match update {
            DurationUpdate::CloseNow => CLOSE_NOW,
            DurationUpdate::Seconds(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePollDuration {
    pub duration: DurationUpdate,
}

/// Duration the remote service settled on after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationUpdated {
    pub duration: u64,
}
