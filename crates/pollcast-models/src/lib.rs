pub mod error;
pub mod poll;
pub mod push;
pub mod request;

pub use error::ErrorBody;
pub use poll::{Poll, PollOption, PollSummary, VoteAccepted};
pub use push::{GatewayCommand, PushEnvelope, PushMessage, Topic, TopicFamily};
pub use request::{ArchivePoll, CreatePoll, DurationUpdate, DurationUpdated, UpdatePollDuration};
