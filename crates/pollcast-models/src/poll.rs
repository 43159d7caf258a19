use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub poll_id: String,
    pub user_id: String,
    pub prompt: String,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
    /// Poll lifetime in seconds, counted from `created_at`.
    pub duration: u64,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub option_id: String,
    pub poll_id: String,
    pub text: String,
    /// Time of the last vote counted for this option.
    pub updated_at: DateTime<Utc>,
    pub votes: u64,
    pub is_my_vote: bool,
}

/// A poll without its options, as listed by "my polls" and carried by
/// `pollModified` pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub poll_id: String,
    pub user_id: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub duration: u64,
    pub is_archived: bool,
}

/// Acknowledgment for a cast vote. The vote is counted asynchronously and its
/// outcome is published on the `vote/{request_id}` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAccepted {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub request_id: String,
}

impl Poll {
    pub fn expires_at(&self) -> DateTime<Utc> {
        expiry(self.created_at, self.duration)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// The option the current viewer voted for, if any.
    pub fn my_vote(&self) -> Option<&PollOption> {
        self.options.iter().find(|o| o.is_my_vote)
    }

    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.option_id == option_id)
    }

    pub fn option_mut(&mut self, option_id: &str) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.option_id == option_id)
    }

    pub fn summary(&self) -> PollSummary {
        PollSummary {
            poll_id: self.poll_id.clone(),
            user_id: self.user_id.clone(),
            prompt: self.prompt.clone(),
            created_at: self.created_at,
            duration: self.duration,
            is_archived: self.is_archived,
        }
    }

    /// Overwrite every scalar field with `summary`, keeping the options.
    pub fn apply_summary(&mut self, summary: &PollSummary) {
        self.user_id = summary.user_id.clone();
        self.prompt = summary.prompt.clone();
        self.created_at = summary.created_at;
        self.duration = summary.duration;
        self.is_archived = summary.is_archived;
    }
}

impl PollSummary {
    pub fn expires_at(&self) -> DateTime<Utc> {
        expiry(self.created_at, self.duration)
    }
}

fn expiry(created_at: DateTime<Utc>, duration: u64) -> DateTime<Utc> {
    let secs = i64::try_from(duration).unwrap_or(i64::MAX);
    created_at
        .checked_add_signed(Duration::try_seconds(secs).unwrap_or(Duration::MAX))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
