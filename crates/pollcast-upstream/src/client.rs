use crate::UpstreamError;
use pollcast_models::{
    ArchivePoll, CreatePoll, DurationUpdated, ErrorBody, Poll, PollSummary, UpdatePollDuration,
    VoteAccepted,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_IP_HEADER: &str = "x-user-ip";

/// Who is casting a vote.
#[derive(Debug, Clone, Copy)]
pub enum Voter<'a> {
    /// Signed-in voter, identified upstream by their id token.
    Authenticated { id_token: &'a str },
    /// Anonymous voter, identified upstream by client IP.
    Anonymous { user_ip: &'a str },
}

/// HTTP client for the remote poll API.
///
/// Requests are sent once; failures are reported to the caller as-is.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(base_url: &str) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url).map_err(|e| UpstreamError::Url(e.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(UpstreamError::Url(format!(
                "expected an http(s) base url, got {base_url}"
            )));
        }
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("pollcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Http(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch a poll. Signed-in viewers go through the private route so the
    /// response carries their `isMyVote` flags.
    pub async fn get_poll(&self, poll_id: &str, id_token: Option<&str>) -> Result<Poll, UpstreamError> {
        let request = match id_token {
            Some(token) => self.request(Method::GET, &["polls", poll_id])?.bearer_auth(token),
            None => self.request(Method::GET, &["public", "polls", poll_id])?,
        };
        decode(send(request).await?).await
    }

    pub async fn create_poll(&self, body: &CreatePoll, id_token: &str) -> Result<Poll, UpstreamError> {
        let request = self
            .request(Method::POST, &["polls"])?
            .bearer_auth(id_token)
            .json(body);
        decode(send(request).await?).await
    }

    pub async fn update_duration(
        &self,
        poll_id: &str,
        body: &UpdatePollDuration,
        id_token: &str,
    ) -> Result<DurationUpdated, UpstreamError> {
        let request = self
            .request(Method::PATCH, &["polls", poll_id])?
            .bearer_auth(id_token)
            .json(body);
        decode(send(request).await?).await
    }

    /// Archive or unarchive a poll. The remote API answers 204.
    pub async fn archive_poll(
        &self,
        poll_id: &str,
        body: &ArchivePoll,
        id_token: &str,
    ) -> Result<(), UpstreamError> {
        let request = self
            .request(Method::DELETE, &["polls", poll_id])?
            .bearer_auth(id_token)
            .json(body);
        send(request).await?;
        Ok(())
    }

    pub async fn vote(
        &self,
        poll_id: &str,
        option_id: &str,
        voter: Voter<'_>,
    ) -> Result<VoteAccepted, UpstreamError> {
        let request = match voter {
            Voter::Authenticated { id_token } => self
                .request(Method::POST, &["polls", poll_id, option_id])?
                .bearer_auth(id_token),
            Voter::Anonymous { user_ip } => self
                .request(Method::POST, &["public", "polls", poll_id, option_id])?
                .header(USER_IP_HEADER, user_ip),
        };
        decode(send(request).await?).await
    }

    /// List the signed-in user's polls. A `null` body means no polls.
    pub async fn my_polls(&self, id_token: &str) -> Result<Vec<PollSummary>, UpstreamError> {
        let request = self.request(Method::GET, &["polls"])?.bearer_auth(id_token);
        let polls: Option<Vec<PollSummary>> = decode(send(request).await?).await?;
        Ok(polls.unwrap_or_default())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, UpstreamError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("upstream request: {} {}", method, url.path());
        Ok(self.http.request(method, url))
    }
}

async fn send(request: RequestBuilder) -> Result<Response, UpstreamError> {
    let resp = request
        .send()
        .await
        .map_err(|e| UpstreamError::Http(e.to_string()))?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
        message: status
            .canonical_reason()
            .unwrap_or("Upstream error")
            .to_string(),
        cause: Some(text.trim().to_string()).filter(|t| !t.is_empty()),
    });
    tracing::warn!(
        "upstream request failed with {}: {}",
        status.as_u16(),
        body.describe()
    );
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, UpstreamError> {
    resp.json()
        .await
        .map_err(|e| UpstreamError::Decode(e.to_string()))
}
