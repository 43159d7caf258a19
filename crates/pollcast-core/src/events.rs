use pollcast_models::{PushEnvelope, Topic};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Topic-based fan-out for push messages.
///
/// Every gateway connection registers a session and subscribes to topics;
/// `publish` hands a copy of the envelope to each session subscribed to its
/// topic. Sessions that fall behind lose the oldest messages.
#[derive(Clone)]
pub struct TopicBus {
    capacity: usize,
    sessions: Arc<RwLock<HashMap<String, SessionSubscription>>>,
}

#[derive(Clone)]
struct SessionSubscription {
    topics: HashSet<Topic>,
    sender: broadcast::Sender<PushEnvelope>,
}

impl TopicBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionSubscription>> {
        match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SessionSubscription>> {
        match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register_session(&self, session_id: impl Into<String>) -> broadcast::Receiver<PushEnvelope> {
        let (sender, receiver) = broadcast::channel(self.capacity.max(16));
        let subscription = SessionSubscription {
            topics: HashSet::new(),
            sender,
        };
        self.write().insert(session_id.into(), subscription);
        receiver
    }

    pub fn unregister_session(&self, session_id: &str) {
        self.write().remove(session_id);
    }

    /// Returns false when the session is unknown.
    pub fn subscribe(&self, session_id: &str, topic: Topic) -> bool {
        match self.write().get_mut(session_id) {
            Some(subscription) => {
                subscription.topics.insert(topic);
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe(&self, session_id: &str, topic: &Topic) {
        if let Some(subscription) = self.write().get_mut(session_id) {
            subscription.topics.remove(topic);
        }
    }

    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    /// Deliver `envelope` to every session subscribed to its topic and return
    /// how many sessions it was handed to.
    pub fn publish(&self, envelope: PushEnvelope) -> usize {
        let senders: Vec<broadcast::Sender<PushEnvelope>> = {
            let sessions = self.read();
            sessions
                .values()
                .filter(|subscription| subscription.topics.contains(&envelope.topic))
                .map(|subscription| subscription.sender.clone())
                .collect()
        };

        let mut delivered = 0;
        for sender in senders {
            if sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }
        tracing::debug!(
            topic = %envelope.topic,
            kind = envelope.payload.kind(),
            delivered,
            "push published"
        );
        delivered
    }
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new(256)
    }
}
