use crate::error::ClientError;
use pollcast_models::{
    ArchivePoll, CreatePoll, DurationUpdate, DurationUpdated, Poll, PollSummary,
    UpdatePollDuration, VoteAccepted,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// The BFF operations the sync layer needs.
#[allow(async_fn_in_trait)]
pub trait PollsApi: Send + Sync {
    async fn get_poll(&self, poll_id: &str) -> Result<Poll, ClientError>;

    async fn my_polls(&self) -> Result<Vec<PollSummary>, ClientError>;

    async fn create_poll(&self, body: &CreatePoll) -> Result<Poll, ClientError>;

    /// Cast a vote. The outcome is published later on `vote/{requestId}`.
    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<VoteAccepted, ClientError>;

    async fn archive_poll(&self, poll_id: &str, is_archived: bool) -> Result<(), ClientError>;

    async fn update_duration(
        &self,
        poll_id: &str,
        duration: DurationUpdate,
    ) -> Result<DurationUpdated, ClientError>;
}

/// Error body written by the BFF.
#[derive(Debug, Deserialize)]
struct BffError {
    message: String,
}

/// [`PollsApi`] over HTTP against the BFF's `/api/polls` routes.
#[derive(Debug, Clone)]
pub struct HttpPollsApi {
    http: Client,
    base_url: Url,
    session: Option<String>,
}

impl HttpPollsApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::Validation(format!("invalid base url: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::Validation(format!(
                "expected an http(s) base url, got {base_url}"
            )));
        }
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("pollcast-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    /// Send requests with this session token as a bearer credential.
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = Some(token.into());
        self
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation(format!("invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "polls"])
            .extend(segments);
        tracing::debug!("bff request: {} {}", method, url.path());
        let request = self.http.request(method, url);
        Ok(match &self.session {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }
}

impl PollsApi for HttpPollsApi {
    async fn get_poll(&self, poll_id: &str) -> Result<Poll, ClientError> {
        decode(send(self.request(Method::GET, &[poll_id])?).await?).await
    }

    async fn my_polls(&self) -> Result<Vec<PollSummary>, ClientError> {
        decode(send(self.request(Method::GET, &[])?).await?).await
    }

    async fn create_poll(&self, body: &CreatePoll) -> Result<Poll, ClientError> {
        decode(send(self.request(Method::POST, &[])?.json(body)).await?).await
    }

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<VoteAccepted, ClientError> {
        decode(send(self.request(Method::POST, &[poll_id, option_id])?).await?).await
    }

    async fn archive_poll(&self, poll_id: &str, is_archived: bool) -> Result<(), ClientError> {
        let request = self
            .request(Method::DELETE, &[poll_id])?
            .json(&ArchivePoll { is_archived });
        send(request).await?;
        Ok(())
    }

    async fn update_duration(
        &self,
        poll_id: &str,
        duration: DurationUpdate,
    ) -> Result<DurationUpdated, ClientError> {
        let request = self
            .request(Method::PATCH, &[poll_id])?
            .json(&UpdatePollDuration { duration });
        decode(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    let resp = request
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<BffError>(&text)
        .map(|body| body.message)
        .unwrap_or_default();
    tracing::debug!("bff request failed with {}: {}", status.as_u16(), message);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    resp.json().await.map_err(|e| {
        tracing::warn!("undecodable bff response: {e}");
        ClientError::Unknown
    })
}
