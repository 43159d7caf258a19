use crate::api::PollsApi;
use crate::error::ClientError;
use crate::realtime::TopicSubscriber;
use crate::store::{PollStore, QueryKey};
use chrono::{DateTime, Utc};
use pollcast_core::error::CoreError;
use pollcast_core::validation::{validate_create_poll, validate_duration_update};
use pollcast_core::Limits;
use pollcast_models::push::{VoteCounted, VoteFailed, VoteSucceeded};
use pollcast_models::{
    CreatePoll, DurationUpdate, Poll, PollSummary, PushEnvelope, PushMessage, Topic, VoteAccepted,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// A vote the server accepted but has not yet counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingVote {
    pub poll_id: String,
    pub option_id: String,
    /// Vote count the option showed before the optimistic increment.
    previous_votes: u64,
    /// `updatedAt` of the option when the vote was cast. A later value means
    /// a server count has been applied since.
    counted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct VoteTracker {
    /// Keyed by request id.
    outstanding: HashMap<String, OutstandingVote>,
    /// Last vote failure per poll id, kept until the view takes it.
    failures: HashMap<String, String>,
}

/// Keeps the [`PollStore`] in step with the BFF and the push channel.
///
/// User mutations are applied to the store before the request is sent. When
/// the request fails only the fields the mutation touched are put back, so
/// pushes that landed in the meantime survive. Pushes are applied as they
/// arrive, with a per-option `updatedAt` check discarding stale counts.
pub struct PollSync<A, S> {
    api: A,
    subscriber: S,
    store: PollStore,
    limits: Limits,
    votes: Mutex<VoteTracker>,
}

impl<A: PollsApi, S: TopicSubscriber> PollSync<A, S> {
    pub fn new(api: A, subscriber: S, store: PollStore, limits: Limits) -> Self {
        Self {
            api,
            subscriber,
            store,
            limits,
            votes: Mutex::new(VoteTracker::default()),
        }
    }

    pub fn store(&self) -> &PollStore {
        &self.store
    }

    fn votes(&self) -> MutexGuard<'_, VoteTracker> {
        match self.votes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The cached poll, fetched when missing or invalidated.
    pub async fn poll(&self, poll_id: &str) -> Result<Poll, ClientError> {
        if let Some(poll) = self.store.fresh_poll(poll_id) {
            return Ok(poll);
        }
        let poll = self.api.get_poll(poll_id).await?;
        self.store.set_poll(poll.clone());
        Ok(poll)
    }

    pub async fn my_polls(&self) -> Result<Vec<PollSummary>, ClientError> {
        if let Some(polls) = self.store.fresh_my_polls() {
            return Ok(polls);
        }
        let polls = self.api.my_polls().await?;
        self.store.set_my_polls(polls.clone());
        Ok(polls)
    }

    pub async fn create(&self, body: CreatePoll) -> Result<Poll, ClientError> {
        validate_create_poll(&self.limits, &body)?;

        let result = self.api.create_poll(&body).await;
        self.store.invalidate(&QueryKey::MyPolls);
        let poll = result?;
        tracing::debug!("created poll {}", poll.poll_id);
        self.store.set_poll(poll.clone());
        Ok(poll)
    }

    /// Cast the viewer's vote for `option_id`.
    ///
    /// The option is counted optimistically; the final outcome arrives on the
    /// returned request id's vote topic, which this subscribes to.
    pub async fn vote(&self, poll_id: &str, option_id: &str) -> Result<VoteAccepted, ClientError> {
        self.poll(poll_id).await?;

        let (previous_votes, counted_at) = self
            .store
            .update_poll(poll_id, |poll| {
                if poll.my_vote().is_some() {
                    return Err(ClientError::AlreadyVoted);
                }
                let option = poll
                    .option_mut(option_id)
                    .ok_or_else(|| CoreError::validation("Option does not belong to this poll"))?;
                let pending = (option.votes, option.updated_at);
                option.votes += 1;
                option.is_my_vote = true;
                Ok(pending)
            })
            .ok_or(ClientError::Unknown)??;

        let accepted = match self.api.vote(poll_id, option_id).await {
            Ok(accepted) => accepted,
            Err(e) => {
                self.undo_vote(poll_id, option_id, previous_votes, counted_at);
                return Err(e);
            }
        };

        self.votes().outstanding.insert(
            accepted.request_id.clone(),
            OutstandingVote {
                poll_id: poll_id.to_string(),
                option_id: option_id.to_string(),
                previous_votes,
                counted_at,
            },
        );
        self.subscriber.subscribe(&Topic::vote(&accepted.request_id));
        self.store.invalidate(&QueryKey::MyPolls);
        Ok(accepted)
    }

    /// Take back an optimistic vote. The count is only reset when no server
    /// count has landed on the option since the vote was cast.
    fn undo_vote(
        &self,
        poll_id: &str,
        option_id: &str,
        previous_votes: u64,
        counted_at: DateTime<Utc>,
    ) -> bool {
        self.store
            .update_poll(poll_id, |poll| {
                if let Some(option) = poll.option_mut(option_id) {
                    option.is_my_vote = false;
                    if option.updated_at == counted_at {
                        option.votes = previous_votes;
                    }
                }
            })
            .is_some()
    }

    pub async fn archive(&self, poll_id: &str, is_archived: bool) -> Result<(), ClientError> {
        let was_archived = self.store.update_poll(poll_id, |poll| {
            std::mem::replace(&mut poll.is_archived, is_archived)
        });

        if let Err(e) = self.api.archive_poll(poll_id, is_archived).await {
            if let Some(was_archived) = was_archived {
                self.store
                    .update_poll(poll_id, |poll| poll.is_archived = was_archived);
            }
            return Err(e);
        }

        self.store.invalidate(&QueryKey::MyPolls);
        Ok(())
    }

    /// Change a poll's lifetime. Returns the duration the server settled on.
    pub async fn update_duration(
        &self,
        poll_id: &str,
        duration: DurationUpdate,
    ) -> Result<u64, ClientError> {
        validate_duration_update(&self.limits, duration)?;

        let now = Utc::now();
        let previous = self.store.update_poll(poll_id, |poll| {
            let optimistic = match duration {
                DurationUpdate::Seconds(seconds) => seconds,
                DurationUpdate::CloseNow => elapsed_seconds(poll.created_at, now),
            };
            std::mem::replace(&mut poll.duration, optimistic)
        });

        let updated = match self.api.update_duration(poll_id, duration).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(previous) = previous {
                    self.store
                        .update_poll(poll_id, |poll| poll.duration = previous);
                }
                return Err(e);
            }
        };

        self.store
            .update_poll(poll_id, |poll| poll.duration = updated.duration);
        self.store.invalidate(&QueryKey::MyPolls);
        Ok(updated.duration)
    }

    pub async fn close_now(&self, poll_id: &str) -> Result<u64, ClientError> {
        self.update_duration(poll_id, DurationUpdate::CloseNow).await
    }

    /// Receive live counts and edits for a poll.
    pub fn watch(&self, poll_id: &str) {
        self.subscriber.subscribe(&Topic::poll(poll_id));
    }

    pub fn unwatch(&self, poll_id: &str) {
        self.subscriber.unsubscribe(&Topic::poll(poll_id));
    }

    /// Apply one push message. Returns whether the store changed.
    pub fn handle_push(&self, topic: &Topic, message: PushMessage) -> bool {
        if !topic.accepts(&message) {
            tracing::warn!(
                "ignoring {} push on unrelated topic {topic}",
                message.kind()
            );
            return false;
        }

        match message {
            PushMessage::VoteCounted(counted) => self.apply_vote_counted(&counted),
            PushMessage::PollModified(summary) => {
                self.store.update_summary(&summary);
                self.store
                    .update_poll(&summary.poll_id, |poll| poll.apply_summary(&summary))
                    .is_some()
            }
            PushMessage::VoteSucceeded(succeeded) => self.apply_vote_succeeded(topic, &succeeded),
            PushMessage::VoteFailed(failed) => self.apply_vote_failed(topic, &failed),
        }
    }

    fn apply_vote_counted(&self, counted: &VoteCounted) -> bool {
        let applied = self.store.update_poll(&counted.poll_id, |poll| {
            match poll.option_mut(&counted.option_id) {
                Some(option) if counted.updated_at > option.updated_at => {
                    option.votes = counted.votes;
                    option.updated_at = counted.updated_at;
                    true
                }
                Some(_) => false,
                None => {
                    tracing::warn!(
                        "voteCounted for unknown option {} of poll {}",
                        counted.option_id,
                        counted.poll_id
                    );
                    false
                }
            }
        });
        applied == Some(true)
    }

    /// Take the outstanding vote a vote-topic push settles, if the push
    /// matches it.
    fn settle(&self, topic: &Topic, poll_id: &str, option_id: &str) -> Option<OutstandingVote> {
        let settled = {
            let mut votes = self.votes();
            let matches = votes
                .outstanding
                .get(topic.id())
                .map(|vote| vote.poll_id == poll_id && vote.option_id == option_id);
            match matches {
                None => {
                    tracing::debug!("no outstanding vote for {topic}");
                    None
                }
                Some(false) => {
                    tracing::warn!(
                        "vote outcome on {topic} names {poll_id}/{option_id}, which was not voted for"
                    );
                    return None;
                }
                Some(true) => votes.outstanding.remove(topic.id()),
            }
        };
        self.subscriber.unsubscribe(topic);
        settled
    }

    fn apply_vote_succeeded(&self, topic: &Topic, succeeded: &VoteSucceeded) -> bool {
        if self
            .settle(topic, &succeeded.poll_id, &succeeded.option_id)
            .is_none()
        {
            return false;
        }
        self.store
            .update_poll(&succeeded.poll_id, |poll| {
                if let Some(option) = poll.option_mut(&succeeded.option_id) {
                    option.is_my_vote = true;
                }
            })
            .is_some()
    }

    fn apply_vote_failed(&self, topic: &Topic, failed: &VoteFailed) -> bool {
        let Some(vote) = self.settle(topic, &failed.poll_id, &failed.option_id) else {
            return false;
        };
        tracing::debug!("vote on {} failed: {}", failed.poll_id, failed.error);
        self.votes()
            .failures
            .insert(failed.poll_id.clone(), failed.error.clone());

        self.undo_vote(
            &failed.poll_id,
            &failed.option_id,
            vote.previous_votes,
            vote.counted_at,
        )
    }

    /// The most recent vote failure reported for a poll, cleared on read.
    pub fn take_vote_failure(&self, poll_id: &str) -> Option<String> {
        self.votes().failures.remove(poll_id)
    }

    pub fn outstanding_votes(&self) -> Vec<OutstandingVote> {
        self.votes().outstanding.values().cloned().collect()
    }

    /// Refetch a poll after the push channel may have missed messages.
    ///
    /// The fetched copy replaces the cached one. An outstanding vote the
    /// server already shows as the viewer's is settled; one it does not show
    /// yet stays outstanding and keeps its `isMyVote` flag.
    pub async fn resync(&self, poll_id: &str) -> Result<Poll, ClientError> {
        let mut poll = self.api.get_poll(poll_id).await?;

        let settled = {
            let mut votes = self.votes();
            let mut settled = Vec::new();
            for (request_id, vote) in votes.outstanding.iter_mut() {
                if vote.poll_id != poll_id {
                    continue;
                }
                let Some(option) = poll.option_mut(&vote.option_id) else {
                    continue;
                };
                if option.is_my_vote {
                    settled.push(request_id.clone());
                } else {
                    option.is_my_vote = true;
                    vote.previous_votes = option.votes;
                    vote.counted_at = option.updated_at;
                }
            }
            for request_id in &settled {
                votes.outstanding.remove(request_id);
            }
            settled
        };
        for request_id in settled {
            self.subscriber.unsubscribe(&Topic::vote(request_id));
        }

        self.store.set_poll(poll.clone());
        Ok(poll)
    }

    /// Apply pushes until the channel closes.
    pub async fn run(&self, mut pushes: mpsc::UnboundedReceiver<PushEnvelope>) {
        while let Some(envelope) = pushes.recv().await {
            self.handle_push(&envelope.topic, envelope.payload);
        }
    }
}

fn elapsed_seconds(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - created_at).num_seconds()).unwrap_or(0)
}
