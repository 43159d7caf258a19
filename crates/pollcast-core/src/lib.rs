pub mod auth;
pub mod error;
pub mod events;
pub mod limits;
pub mod validation;

use pollcast_upstream::UpstreamClient;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Notify;

pub use limits::Limits;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub upstream: UpstreamClient,
    pub topic_bus: events::TopicBus,
    pub shutdown: Arc<Notify>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub limits: Limits,
    /// HS256 secret the session tokens are signed with.
    pub session_secret: String,
    /// Provider account ids allowed to sign in. `None` disables the check.
    pub whitelist: Option<HashSet<String>>,
    /// Shared key the remote service's publishers present to `/api/push`.
    pub publish_key: String,
    /// Browser origins allowed to open the realtime gateway.
    pub allowed_origins: Vec<String>,
    pub realtime: RealtimeSettings,
}

/// Push channel connection details handed to browsers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RealtimeSettings {
    pub endpoint: String,
    pub authorizer_name: String,
}

impl AppConfig {
    pub fn is_whitelisted(&self, sub: &str) -> bool {
        match &self.whitelist {
            Some(users) => users.contains(sub),
            None => true,
        }
    }
}

impl AppState {
    pub fn new(config: AppConfig, upstream: UpstreamClient) -> Self {
        Self {
            config,
            upstream,
            topic_bus: events::TopicBus::default(),
            shutdown: Arc::new(Notify::new()),
        }
    }
}
