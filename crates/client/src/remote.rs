//! Assist service HTTP client.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sidekick_protocol::{
    AskReply, AskRequest, CreatePageRequest, CreateSessionResponse, CreateVideoRequest,
    HealthResponse, PageContent,
};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Default assist service endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Release calls run during panel teardown; a hung endpoint must not stall
/// the sweep, so they get a much shorter budget than chat turns.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the assist service's HTTP surface.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base: String,
}

impl RemoteClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        // Validate eagerly so a bad --base-url fails at startup, not on the
        // first release attempt during a sweep.
        Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidUrl(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issues a single release request for `session_id`.
    ///
    /// Success is any 2xx status. No retry happens here; retry policy, if
    /// any, belongs to the caller.
    pub async fn release(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/clear/{}", self.base, session_id);
        let response = self
            .http
            .delete(&url)
            .timeout(RELEASE_TIMEOUT)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        check_status(url, response).await?;
        debug!(target: "sk.remote", session = session_id, "release accepted");
        Ok(())
    }

    /// Creates a session seeded with page content. Returns the session id.
    pub async fn create_page_session(&self, page: PageContent) -> Result<String> {
        let response: CreateSessionResponse = self
            .post_json("page", &CreatePageRequest { page_data: page })
            .await?;
        Ok(response.session_id)
    }

    /// Creates a session seeded with a YouTube transcript. Returns the session id.
    ///
    /// The service answers 4xx when no transcript exists for the video; that
    /// surfaces as [`Error::Rejected`] with the service's message.
    pub async fn create_video_session(&self, video_id: &str) -> Result<String> {
        let response: CreateSessionResponse = self
            .post_json(
                "youtube",
                &CreateVideoRequest {
                    video_id: video_id.to_string(),
                },
            )
            .await?;
        Ok(response.session_id)
    }

    /// Exchanges one chat turn against an existing session.
    ///
    /// A 404 means the service no longer knows the session (e.g. it was
    /// cleared or the service restarted).
    pub async fn ask(&self, session_id: &str, message: &str) -> Result<AskReply> {
        self.post_json(
            "ask",
            &AskRequest {
                session_id: session_id.to_string(),
                message: message.to_string(),
            },
        )
        .await
    }

    /// Probes the service's health endpoint.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let response = check_status(url.clone(), response).await?;
        response
            .json()
            .await
            .map_err(|source| Error::Decode { url, source })
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{}", self.base, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let response = check_status(url.clone(), response).await?;
        response
            .json()
            .await
            .map_err(|source| Error::Decode { url, source })
    }
}

/// Maps a non-success status to [`Error::Rejected`], extracting the service's
/// human-readable message when the body carries one.
async fn check_status(url: String, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // The service varies its error key by endpoint: `message` on session
    // creation and clear, `error` on internal failures, `reply` on unknown
    // sessions.
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            ["message", "error", "reply"]
                .iter()
                .find_map(|key| body.get(key).and_then(|v| v.as_str()).map(str::to_owned))
        });

    Err(Error::Rejected {
        url,
        status: status.as_u16(),
        message,
    })
}
