use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::{DashError, Result};
use crate::types::{
    ErrorBody, PostCommentResponse, PrRef, PullRequest, RawPullRequest, RequestTestsPayload,
    RequestTestsResponse,
};

pub const LIST_FALLBACK: &str = "Failed to load pull requests";
pub const REQUEST_TESTS_FALLBACK: &str = "Failed to request tests";
pub const POST_COMMENT_FALLBACK: &str = "Failed to post comment";

/// The dashboard backend. GitHub access and comment generation happen behind it.
#[async_trait]
pub trait DashboardApi: Send + Sync + std::fmt::Debug {
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>>;

    /// Ask the backend for a generated comment; nothing is posted yet.
    async fn request_tests(&self, target: &PrRef) -> Result<String>;

    /// Post `comment` unchanged to the PR. Returns the comment URL when the backend reports one.
    async fn post_comment(&self, target: &PrRef, comment: &str) -> Result<Option<String>>;
}

pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("testreq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T> {
        let url = self.api_url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        read_json(response, fallback).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.api_url(path);
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        read_json(response, fallback).await
    }
}

/// Decode a success body, or turn a non-OK response into `DashError::Server`
/// carrying the server's `detail` (or `fallback` when there is none).
async fn read_json<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .filter(|detail| !detail.is_empty());
        warn!(%status, ?detail, "backend returned an error");
        return Err(DashError::Server(
            detail.unwrap_or_else(|| fallback.to_string()),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| DashError::Decode(e.to_string()))
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
        let raw: Vec<RawPullRequest> = self.get_json("/pull-requests", LIST_FALLBACK).await?;
        Ok(raw.into_iter().map(PullRequest::from).collect())
    }

    async fn request_tests(&self, target: &PrRef) -> Result<String> {
        let payload = RequestTestsPayload::new(target);
        let response: RequestTestsResponse = self
            .post_json("/request-tests", &payload, REQUEST_TESTS_FALLBACK)
            .await?;
        Ok(response.comment)
    }

    async fn post_comment(&self, target: &PrRef, comment: &str) -> Result<Option<String>> {
        let payload = RequestTestsPayload::new(target).with_comment(comment);
        let response: PostCommentResponse = self
            .post_json("/post-comment", &payload, POST_COMMENT_FALLBACK)
            .await?;
        Ok(response.comment_url)
    }
}
