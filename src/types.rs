use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
}

/// Pull request as returned by `GET /api/pull-requests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub user: User,
    pub repository: Repository,
    #[serde(rename = "hasTests", default, skip_serializing_if = "Option::is_none")]
    pub has_tests: Option<bool>,
}

/// Pull request as shown in the list, with owner/repo resolved for the API calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub url: String,
    pub user: User,
    pub repository: Repository,
    pub has_tests: Option<bool>,
    pub owner: String,
    pub repo: String,
}

impl From<RawPullRequest> for PullRequest {
    fn from(raw: RawPullRequest) -> Self {
        // Same as `full_name.split('/')[0]`: no slash yields the whole name.
        let owner = raw
            .repository
            .full_name
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let repo = raw.repository.name.clone();

        Self {
            id: raw.id,
            number: raw.number,
            title: raw.title,
            url: raw.html_url.clone(),
            html_url: raw.html_url,
            user: raw.user,
            repository: raw.repository,
            has_tests: raw.has_tests,
            owner,
            repo,
        }
    }
}

impl PullRequest {
    pub fn target(&self) -> PrRef {
        PrRef {
            id: self.id,
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            number: self.number,
        }
    }
}

/// Identifies the PR a request-tests flow is acting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    pub id: u64,
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl fmt::Display for PrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Body of `POST /api/request-tests` and `POST /api/post-comment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestTestsPayload<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    #[serde(rename = "prNumber")]
    pub pr_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<&'a str>,
}

impl<'a> RequestTestsPayload<'a> {
    pub fn new(target: &'a PrRef) -> Self {
        Self {
            owner: &target.owner,
            repo: &target.repo,
            pr_number: target.number,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: &'a str) -> Self {
        self.comment = Some(comment);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestTestsResponse {
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostCommentResponse {
    #[serde(default)]
    pub comment_url: Option<String>,
}

/// Error body returned alongside a non-OK status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Whether the PR already touches test files, as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestBadge {
    Present,
    Missing,
    Unknown,
}

impl From<Option<bool>> for TestBadge {
    fn from(has_tests: Option<bool>) -> Self {
        match has_tests {
            Some(true) => TestBadge::Present,
            Some(false) => TestBadge::Missing,
            None => TestBadge::Unknown,
        }
    }
}

impl fmt::Display for TestBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestBadge::Present => write!(f, "✓ tests"),
            TestBadge::Missing => write!(f, "✗ no tests"),
            TestBadge::Unknown => write!(f, "? tests"),
        }
    }
}
