use crate::error::DashError;
use crate::types::PullRequest;

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    Tick,
    Resize(u16, u16),
    ScrollUp,
    ScrollDown,
    GoToTop,
    GoToBottom,

    // PR list
    LoadPullRequests,
    PullRequestsLoaded(Vec<PullRequest>, u64),
    PullRequestsFailed(String, u64),
    Refresh,

    // Request-tests flow
    RequestTests,
    PreviewReady { pr_id: u64, comment: String },
    RequestFailed { pr_id: u64, message: String },
    CancelPreview,
    ConfirmPost,
    CommentPosted { pr_id: u64, comment_url: Option<String> },
    PostFailed { pr_id: u64, message: String },
    CloseModal,

    // Polish
    OpenInBrowser,
    YankUrl,

    Error(String),
    None,
}

impl From<DashError> for Action {
    fn from(err: DashError) -> Self {
        Action::Error(err.to_string())
    }
}
