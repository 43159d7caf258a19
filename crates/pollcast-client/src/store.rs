use pollcast_models::{Poll, PollSummary};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Identifies one cached view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Poll(String),
    MyPolls,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    stale: bool,
}

impl<T> Entry<T> {
    fn fresh(value: T) -> Self {
        Self { value, stale: false }
    }
}

#[derive(Debug, Default)]
struct Inner {
    polls: HashMap<String, Entry<Poll>>,
    my_polls: Option<Entry<Vec<PollSummary>>>,
}

/// Shared cache of polls and of the signed-in user's poll list.
///
/// Every mutation replaces whole values under the write lock, so readers
/// never see a half-applied change. Invalidated entries stay readable until
/// they are refetched.
#[derive(Debug, Clone, Default)]
pub struct PollStore {
    inner: Arc<RwLock<Inner>>,
}

impl PollStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The cached poll, stale or not.
    pub fn poll(&self, poll_id: &str) -> Option<Poll> {
        self.read().polls.get(poll_id).map(|e| e.value.clone())
    }

    /// The cached poll unless it has been invalidated.
    pub fn fresh_poll(&self, poll_id: &str) -> Option<Poll> {
        self.read()
            .polls
            .get(poll_id)
            .filter(|e| !e.stale)
            .map(|e| e.value.clone())
    }

    pub fn set_poll(&self, poll: Poll) {
        self.write()
            .polls
            .insert(poll.poll_id.clone(), Entry::fresh(poll));
    }

    /// Apply `f` to the cached poll atomically.
    ///
    /// Returns `f`'s output, or `None` when the poll is not cached.
    pub fn update_poll<R>(&self, poll_id: &str, f: impl FnOnce(&mut Poll) -> R) -> Option<R> {
        let mut inner = self.write();
        let entry = inner.polls.get_mut(poll_id)?;
        Some(f(&mut entry.value))
    }

    pub fn my_polls(&self) -> Option<Vec<PollSummary>> {
        self.read().my_polls.as_ref().map(|e| e.value.clone())
    }

    pub fn fresh_my_polls(&self) -> Option<Vec<PollSummary>> {
        self.read()
            .my_polls
            .as_ref()
            .filter(|e| !e.stale)
            .map(|e| e.value.clone())
    }

    pub fn set_my_polls(&self, polls: Vec<PollSummary>) {
        self.write().my_polls = Some(Entry::fresh(polls));
    }

    /// Replace the listed summary with the same poll id, if present.
    pub fn update_summary(&self, summary: &PollSummary) -> bool {
        let mut inner = self.write();
        let Some(entry) = inner.my_polls.as_mut() else {
            return false;
        };
        match entry.value.iter_mut().find(|p| p.poll_id == summary.poll_id) {
            Some(listed) => {
                *listed = summary.clone();
                true
            }
            None => false,
        }
    }

    /// Mark a view stale so the next read refetches it.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.write();
        match key {
            QueryKey::Poll(poll_id) => {
                if let Some(entry) = inner.polls.get_mut(poll_id) {
                    entry.stale = true;
                }
            }
            QueryKey::MyPolls => {
                if let Some(entry) = inner.my_polls.as_mut() {
                    entry.stale = true;
                }
            }
        }
    }

    /// True when the view is missing or invalidated.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let inner = self.read();
        match key {
            QueryKey::Poll(poll_id) => inner.polls.get(poll_id).is_none_or(|e| e.stale),
            QueryKey::MyPolls => inner.my_polls.as_ref().is_none_or(|e| e.stale),
        }
    }
}
