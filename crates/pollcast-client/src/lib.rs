//! Client-side poll synchronization: a shared cache of polls, optimistic
//! mutations against the BFF, and reconciliation of push notifications.

pub mod api;
pub mod error;
pub mod realtime;
pub mod store;
pub mod sync;

pub use api::{HttpPollsApi, PollsApi};
pub use error::ClientError;
pub use realtime::{RealtimeClient, TopicSubscriber};
pub use store::{PollStore, QueryKey};
pub use sync::{OutstandingVote, PollSync};

use pollcast_core::Limits;

/// A poll lifetime offered when creating or extending a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationPreset {
    pub label: &'static str,
    pub seconds: u64,
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

pub const DURATION_PRESETS: &[DurationPreset] = &[
    DurationPreset { label: "1 minute", seconds: MINUTE },
    DurationPreset { label: "5 minutes", seconds: 5 * MINUTE },
    DurationPreset { label: "15 minutes", seconds: 15 * MINUTE },
    DurationPreset { label: "30 minutes", seconds: 30 * MINUTE },
    DurationPreset { label: "1 hour", seconds: HOUR },
    DurationPreset { label: "2 hours", seconds: 2 * HOUR },
    DurationPreset { label: "6 hours", seconds: 6 * HOUR },
    DurationPreset { label: "12 hours", seconds: 12 * HOUR },
    DurationPreset { label: "1 day", seconds: DAY },
    DurationPreset { label: "2 days", seconds: 2 * DAY },
    DurationPreset { label: "3 days", seconds: 3 * DAY },
    DurationPreset { label: "1 week", seconds: 7 * DAY },
];

/// Presets that fall inside the configured duration bounds.
pub fn duration_presets(limits: &Limits) -> impl Iterator<Item = DurationPreset> + '_ {
    DURATION_PRESETS
        .iter()
        .copied()
        .filter(|p| (limits.min_duration..=limits.max_duration).contains(&p.seconds))
}
