use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::poll::PollSummary;

/// A push channel topic: `poll/{pollId}` or `vote/{requestId}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    Poll(String),
    Vote(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFamily {
    Poll,
    Vote,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid topic: {0}")]
pub struct InvalidTopic(pub String);

impl Topic {
    pub fn poll(poll_id: impl Into<String>) -> Self {
        Topic::Poll(poll_id.into())
    }

    pub fn vote(request_id: impl Into<String>) -> Self {
        Topic::Vote(request_id.into())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (prefix, id) = raw.split_once('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        match prefix {
            "poll" => Some(Topic::Poll(id.to_string())),
            "vote" => Some(Topic::Vote(id.to_string())),
            _ => None,
        }
    }

    pub fn family(&self) -> TopicFamily {
        match self {
            Topic::Poll(_) => TopicFamily::Poll,
            Topic::Vote(_) => TopicFamily::Vote,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Topic::Poll(id) | Topic::Vote(id) => id,
        }
    }

    /// Whether `message` may legitimately be delivered on this topic.
    ///
    /// Vote payloads carry no request id, so vote topics only check the
    /// message kind.
    pub fn accepts(&self, message: &PushMessage) -> bool {
        if message.family() != self.family() {
            return false;
        }
        match self {
            Topic::Poll(poll_id) => message.poll_id() == poll_id,
            Topic::Vote(_) => true,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Poll(id) => write!(f, "poll/{id}"),
            Topic::Vote(id) => write!(f, "vote/{id}"),
        }
    }
}

impl TryFrom<String> for Topic {
    type Error = InvalidTopic;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Topic::parse(&value).ok_or(InvalidTopic(value))
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounted {
    pub poll_id: String,
    pub option_id: String,
    pub updated_at: DateTime<Utc>,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSucceeded {
    pub voter_id: String,
    pub poll_id: String,
    pub option_id: String,
    pub vote_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteFailed {
    pub error: String,
    pub poll_id: String,
    pub option_id: String,
}

/// Payload published on a push topic, encoded as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum PushMessage {
    VoteCounted(VoteCounted),
    PollModified(PollSummary),
    VoteSucceeded(VoteSucceeded),
    VoteFailed(VoteFailed),
}

impl PushMessage {
    pub fn family(&self) -> TopicFamily {
        match self {
            PushMessage::VoteCounted(_) | PushMessage::PollModified(_) => TopicFamily::Poll,
            PushMessage::VoteSucceeded(_) | PushMessage::VoteFailed(_) => TopicFamily::Vote,
        }
    }

    pub fn poll_id(&self) -> &str {
        match self {
            PushMessage::VoteCounted(data) => &data.poll_id,
            PushMessage::PollModified(data) => &data.poll_id,
            PushMessage::VoteSucceeded(data) => &data.poll_id,
            PushMessage::VoteFailed(data) => &data.poll_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PushMessage::VoteCounted(_) => "voteCounted",
            PushMessage::PollModified(_) => "pollModified",
            PushMessage::VoteSucceeded(_) => "voteSucceeded",
            PushMessage::VoteFailed(_) => "voteFailed",
        }
    }
}

/// A message addressed to a topic. Used both by the push ingest endpoint and
/// as the gateway's server-to-client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub topic: Topic,
    pub payload: PushMessage,
}

/// Client-to-gateway frame on the realtime socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum GatewayCommand {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
}
