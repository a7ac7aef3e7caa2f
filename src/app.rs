use std::collections::HashMap;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::action::Action;
use crate::api::DashboardApi;
use crate::error::DashError;
use crate::flow::{FlowState, RequestFlow};
use crate::modal::ModalState;
use crate::tui::Event;
use crate::types::{PrRef, PullRequest};
use crate::ui;

pub const POSTED_MESSAGE: &str = "Comment posted successfully! Check the PR on GitHub.";

/// Which overlay currently owns the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Preview,
    Modal,
}

pub struct App {
    pub pull_requests: Vec<PullRequest>,
    pub selected: usize,
    /// First load, before any list has arrived
    pub loading: bool,
    pub refreshing: bool,
    pub flow: RequestFlow,
    /// Last request-tests failure per PR id, shown inline under the row
    pub row_errors: HashMap<u64, String>,
    pub status_message: Option<String>,
    pub error: Option<String>,
    pub show_test_badges: bool,
    pub tick: usize,
    /// Terminal size, used to bound popup scrolling
    pub viewport: Rect,
    pub should_quit: bool,
    load_id: u64,
    api: Arc<dyn DashboardApi>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        action_tx: mpsc::UnboundedSender<Action>,
        show_test_badges: bool,
    ) -> Self {
        Self {
            pull_requests: Vec::new(),
            selected: 0,
            loading: true,
            refreshing: false,
            flow: RequestFlow::default(),
            row_errors: HashMap::new(),
            status_message: None,
            error: None,
            show_test_badges,
            tick: 0,
            viewport: Rect::default(),
            should_quit: false,
            load_id: 0,
            api,
            action_tx,
        }
    }

    pub fn focus(&self) -> Focus {
        if self.flow.preview().is_some() {
            Focus::Preview
        } else if !self.flow.is_idle() {
            Focus::Modal
        } else {
            Focus::List
        }
    }

    pub fn modal(&self) -> ModalState {
        ModalState::from_flow(&self.flow)
    }

    pub fn selected_pr(&self) -> Option<&PullRequest> {
        self.pull_requests.get(self.selected)
    }

    /// Whether the flow is currently acting on this PR.
    pub fn is_busy(&self, pr_id: u64) -> bool {
        self.flow.target().is_some_and(|t| t.id == pr_id) && self.flow.in_flight()
    }

    /// Last row the preview or success modal may scroll to at the current size.
    fn scroll_limit(&self) -> usize {
        match self.flow.state() {
            FlowState::Previewing { comment, .. } | FlowState::Posting { comment, .. } => {
                ui::preview_max_scroll(comment, self.viewport)
            }
            FlowState::Done { .. } => ui::modal_max_scroll(&self.modal(), self.viewport),
            _ => 0,
        }
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init => Action::LoadPullRequests,
            Event::Tick => Action::Tick,
            Event::Key(key) => self.handle_key(key),
            Event::Resize(width, height) => Action::Resize(width, height),
            Event::Render => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        match self.focus() {
            Focus::Preview => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Action::ConfirmPost,
                KeyCode::Char('n') | KeyCode::Esc => Action::CancelPreview,
                KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
                KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
                _ => Action::None,
            },
            Focus::Modal => match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Action::CloseModal,
                KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
                KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
                _ => Action::None,
            },
            Focus::List => match key.code {
                KeyCode::Char('q') => Action::Quit,
                KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
                KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
                KeyCode::Char('g') | KeyCode::Home => Action::GoToTop,
                KeyCode::Char('G') | KeyCode::End => Action::GoToBottom,
                KeyCode::Char('r') => Action::Refresh,
                KeyCode::Char('t') | KeyCode::Enter => Action::RequestTests,
                KeyCode::Char('o') => Action::OpenInBrowser,
                KeyCode::Char('y') => Action::YankUrl,
                _ => Action::None,
            },
        }
    }

    pub fn update(&mut self, action: Action) {
        if matches!(
            action,
            Action::ScrollUp
                | Action::ScrollDown
                | Action::GoToTop
                | Action::GoToBottom
                | Action::Refresh
                | Action::RequestTests
                | Action::OpenInBrowser
                | Action::YankUrl
        ) {
            self.error = None;
            self.status_message = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            Action::Resize(width, height) => {
                self.viewport = Rect::new(0, 0, width, height);
                let limit = self.scroll_limit();
                self.flow.clamp_scroll(limit);
            }
            Action::ScrollUp => {
                if self.flow.scrollable() {
                    let limit = self.scroll_limit();
                    self.flow.scroll_by(-1, limit);
                } else if self.flow.is_idle() && self.selected > 0 {
                    self.selected -= 1;
                }
            }
            Action::ScrollDown => {
                if self.flow.scrollable() {
                    let limit = self.scroll_limit();
                    self.flow.scroll_by(1, limit);
                } else if self.flow.is_idle()
                    && !self.pull_requests.is_empty()
                    && self.selected < self.pull_requests.len() - 1
                {
                    self.selected += 1;
                }
            }
            Action::GoToTop => {
                self.selected = 0;
            }
            Action::GoToBottom => {
                self.selected = self.pull_requests.len().saturating_sub(1);
            }

            // PR list
            Action::LoadPullRequests => {
                self.loading = true;
                self.spawn_load_pull_requests();
            }
            Action::Refresh => {
                if self.refreshing || self.loading {
                    return;
                }
                self.refreshing = true;
                self.spawn_load_pull_requests();
            }
            Action::PullRequestsLoaded(prs, load_id) => {
                if load_id != self.load_id {
                    return;
                }
                self.loading = false;
                self.refreshing = false;
                self.row_errors
                    .retain(|id, _| prs.iter().any(|pr| pr.id == *id));
                self.pull_requests = prs;
                self.selected = self
                    .selected
                    .min(self.pull_requests.len().saturating_sub(1));
            }
            Action::PullRequestsFailed(msg, load_id) => {
                if load_id != self.load_id {
                    return;
                }
                error!(error = %msg, "failed to load pull requests");
                self.loading = false;
                self.refreshing = false;
            }

            // Request-tests flow
            Action::RequestTests => {
                if !self.flow.is_idle() {
                    return;
                }
                let Some(target) = self.selected_pr().map(PullRequest::target) else {
                    return;
                };
                if self.flow.begin_request(target.clone()) {
                    self.row_errors.remove(&target.id);
                    self.spawn_request_tests(target);
                }
            }
            Action::PreviewReady { pr_id, comment } => {
                self.flow.preview_ready(pr_id, comment);
            }
            Action::RequestFailed { pr_id, message } | Action::PostFailed { pr_id, message } => {
                if self.flow.fail(pr_id, message.clone()) {
                    if let FlowState::Failed { target, stage, .. } = self.flow.state() {
                        warn!(pr = %target, ?stage, error = %message, "request-tests flow failed");
                    }
                    self.row_errors.insert(pr_id, message);
                }
            }
            Action::CancelPreview => {
                self.flow.cancel_preview();
            }
            Action::ConfirmPost => {
                if let Some((target, comment)) = self.flow.confirm() {
                    self.spawn_post_comment(target, comment);
                }
            }
            Action::CommentPosted { pr_id, comment_url } => {
                if self.flow.posted(pr_id, comment_url) {
                    if let FlowState::Done {
                        target,
                        comment_url,
                        ..
                    } = self.flow.state()
                    {
                        info!(pr = %target, url = ?comment_url, "comment posted");
                    }
                    self.status_message = Some(POSTED_MESSAGE.to_string());
                    self.refreshing = true;
                    self.spawn_load_pull_requests();
                }
            }
            Action::CloseModal => {
                self.flow.dismiss();
            }

            // Polish
            Action::OpenInBrowser => {
                if let Some(pr) = self.selected_pr() {
                    let url = pr.url.clone();
                    if let Err(e) = open::that_detached(&url) {
                        self.error = Some(format!("Failed to open {}: {}", url, e));
                    }
                }
            }
            Action::YankUrl => {
                if let Some(pr) = self.selected_pr() {
                    let url = pr.url.clone();
                    match copy_to_clipboard(&url) {
                        Ok(()) => self.status_message = Some(format!("Copied {}", url)),
                        Err(e) => self.update(Action::from(e)),
                    }
                }
            }

            Action::Error(msg) => {
                self.error = Some(msg);
            }
            Action::None => {}
        }
    }

    fn spawn_load_pull_requests(&mut self) {
        self.load_id += 1;
        let load_id = self.load_id;
        let tx = self.action_tx.clone();
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            match api.list_pull_requests().await {
                Ok(prs) => {
                    tx.send(Action::PullRequestsLoaded(prs, load_id)).ok();
                }
                Err(e) => {
                    tx.send(Action::PullRequestsFailed(e.to_string(), load_id))
                        .ok();
                }
            }
        });
    }

    fn spawn_request_tests(&self, target: PrRef) {
        let tx = self.action_tx.clone();
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            info!(pr = %target, "requesting tests");
            match api.request_tests(&target).await {
                Ok(comment) => {
                    tx.send(Action::PreviewReady {
                        pr_id: target.id,
                        comment,
                    })
                    .ok();
                }
                Err(e) => {
                    tx.send(Action::RequestFailed {
                        pr_id: target.id,
                        message: e.to_string(),
                    })
                    .ok();
                }
            }
        });
    }

    fn spawn_post_comment(&self, target: PrRef, comment: String) {
        let tx = self.action_tx.clone();
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            info!(pr = %target, "posting comment");
            match api.post_comment(&target, &comment).await {
                Ok(comment_url) => {
                    tx.send(Action::CommentPosted {
                        pr_id: target.id,
                        comment_url,
                    })
                    .ok();
                }
                Err(e) => {
                    tx.send(Action::PostFailed {
                        pr_id: target.id,
                        message: e.to_string(),
                    })
                    .ok();
                }
            }
        });
    }
}

fn copy_to_clipboard(text: &str) -> Result<(), DashError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| DashError::Clipboard(e.to_string()))?;
    clipboard
        .set_text(text)
        .map_err(|e| DashError::Clipboard(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::types::{Repository, User};

    pub(crate) fn pr(id: u64, title: &str) -> PullRequest {
        PullRequest {
            id,
            number: id + 100,
            title: title.to_string(),
            html_url: format!("https://github.com/acme/widgets/pull/{}", id + 100),
            url: format!("https://github.com/acme/widgets/pull/{}", id + 100),
            user: User {
                login: format!("dev{}", id),
            },
            repository: Repository {
                name: "widgets".to_string(),
                full_name: "acme/widgets".to_string(),
            },
            has_tests: None,
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
        }
    }

    #[derive(Debug, Default)]
    pub(crate) struct FakeApi {
        pub prs: Mutex<Vec<PullRequest>>,
        pub list_error: Mutex<Option<String>>,
        pub request_result: Mutex<Option<std::result::Result<String, String>>>,
        pub post_error: Mutex<Option<String>>,
        pub list_calls: AtomicUsize,
        pub request_calls: AtomicUsize,
        pub posted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DashboardApi for FakeApi {
        async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = self.list_error.lock().unwrap().clone() {
                return Err(DashError::Network(msg));
            }
            Ok(self.prs.lock().unwrap().clone())
        }

        async fn request_tests(&self, _target: &PrRef) -> Result<String> {
            self.request_calls.fetch_add(1, Ordering::SeqCst);
            match self.request_result.lock().unwrap().clone() {
                Some(Ok(comment)) => Ok(comment),
                Some(Err(detail)) => Err(DashError::Server(detail)),
                None => Ok("default preview".to_string()),
            }
        }

        async fn post_comment(&self, _target: &PrRef, comment: &str) -> Result<Option<String>> {
            self.posted.lock().unwrap().push(comment.to_string());
            match self.post_error.lock().unwrap().clone() {
                Some(detail) => Err(DashError::Server(detail)),
                None => Ok(None),
            }
        }
    }

    struct Harness {
        app: App,
        api: Arc<FakeApi>,
        rx: mpsc::UnboundedReceiver<Action>,
    }

    impl Harness {
        fn new(api: FakeApi) -> Self {
            let api = Arc::new(api);
            let (tx, rx) = mpsc::unbounded_channel();
            let app = App::new(api.clone(), tx, true);
            Self { app, api, rx }
        }

        /// Feed the next action produced by a background task back into the app.
        async fn pump(&mut self) -> Action {
            let action = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("background task should report back")
                .expect("channel open");
            self.app.update(action.clone());
            action
        }

        async fn loaded(api: FakeApi) -> Self {
            let mut h = Self::new(api);
            h.app.update(Action::LoadPullRequests);
            h.pump().await;
            h
        }
    }

    fn api_with(prs: Vec<PullRequest>) -> FakeApi {
        let api = FakeApi::default();
        *api.prs.lock().unwrap() = prs;
        api
    }

    #[tokio::test]
    async fn initial_load_populates_list() {
        let h = Harness::loaded(api_with(vec![pr(1, "a"), pr(2, "b")])).await;
        assert!(!h.app.loading);
        assert_eq!(h.app.pull_requests.len(), 2);
    }

    #[tokio::test]
    async fn load_failure_keeps_list_and_clears_loading() {
        let api = api_with(vec![pr(1, "a")]);
        let mut h = Harness::loaded(api).await;

        *h.api.list_error.lock().unwrap() = Some("down".to_string());
        h.app.update(Action::Refresh);
        assert!(h.app.refreshing);
        h.pump().await;

        assert!(!h.app.refreshing);
        assert_eq!(h.app.pull_requests.len(), 1);
        assert!(h.app.error.is_none());
    }

    #[tokio::test]
    async fn refresh_is_ignored_while_in_flight() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a")])).await;
        h.app.update(Action::Refresh);
        h.app.update(Action::Refresh);
        h.pump().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(h.api.list_calls.load(Ordering::SeqCst), 2);
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let mut h = Harness::new(api_with(vec![pr(1, "a")]));
        h.app.update(Action::LoadPullRequests);
        h.app.update(Action::PullRequestsLoaded(vec![pr(9, "old")], 0));
        assert!(h.app.loading);
        assert!(h.app.pull_requests.is_empty());
        h.pump().await;
        assert_eq!(h.app.pull_requests[0].id, 1);
    }

    #[tokio::test]
    async fn selection_is_clamped_when_list_shrinks() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a"), pr(2, "b"), pr(3, "c")])).await;
        h.app.update(Action::GoToBottom);
        assert_eq!(h.app.selected, 2);

        *h.api.prs.lock().unwrap() = vec![pr(1, "a")];
        h.app.update(Action::Refresh);
        h.pump().await;
        assert_eq!(h.app.selected, 0);
    }

    #[tokio::test]
    async fn request_preview_confirm_post_refresh() {
        let api = api_with(vec![pr(1, "a")]);
        *api.request_result.lock().unwrap() = Some(Ok("Hey @dev1\n  add tests\n".to_string()));
        let mut h = Harness::loaded(api).await;

        h.app.update(Action::RequestTests);
        assert_eq!(h.app.focus(), Focus::Modal);
        assert!(h.app.is_busy(1));
        h.pump().await;

        assert_eq!(h.app.focus(), Focus::Preview);
        assert_eq!(h.app.flow.preview(), Some("Hey @dev1\n  add tests\n"));

        h.app.update(Action::ConfirmPost);
        h.pump().await;

        assert_eq!(
            h.api.posted.lock().unwrap().as_slice(),
            ["Hey @dev1\n  add tests\n".to_string()]
        );
        assert!(matches!(h.app.flow.state(), FlowState::Done { .. }));
        assert_eq!(h.app.status_message.as_deref(), Some(POSTED_MESSAGE));

        // The post triggers a list refresh
        assert!(h.app.refreshing);
        assert!(matches!(h.pump().await, Action::PullRequestsLoaded(..)));
        assert_eq!(h.api.list_calls.load(Ordering::SeqCst), 2);

        h.app.update(Action::CloseModal);
        assert_eq!(h.app.focus(), Focus::List);
    }

    #[tokio::test]
    async fn duplicate_request_is_not_sent() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a"), pr(2, "b")])).await;

        h.app.update(Action::RequestTests);
        h.app.update(Action::RequestTests);
        h.app.update(Action::ScrollDown);
        h.app.update(Action::RequestTests);
        h.pump().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(h.api.request_calls.load(Ordering::SeqCst), 1);
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_key_is_inert_while_modal_is_up() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a")])).await;
        h.app.update(Action::RequestTests);

        let key = KeyEvent::from(KeyCode::Char('t'));
        assert!(matches!(h.app.handle_event(Event::Key(key)), Action::None));
    }

    #[tokio::test]
    async fn cancel_preview_makes_no_call() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a")])).await;
        h.app.update(Action::RequestTests);
        h.pump().await;

        h.app.update(Action::CancelPreview);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(h.app.flow.is_idle());
        assert!(h.api.posted.lock().unwrap().is_empty());
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_failure_shows_detail_inline_and_in_modal() {
        let api = api_with(vec![pr(1, "a")]);
        *api.request_result.lock().unwrap() =
            Some(Err("No files found in the pull request".to_string()));
        let mut h = Harness::loaded(api).await;

        h.app.update(Action::RequestTests);
        h.pump().await;

        let modal = h.app.modal();
        assert_eq!(
            modal.error.as_deref(),
            Some("No files found in the pull request")
        );
        assert_eq!(
            h.app.row_errors.get(&1).map(String::as_str),
            Some("No files found in the pull request")
        );

        // Closing the modal keeps the inline error until the next attempt
        h.app.update(Action::CloseModal);
        assert!(h.app.flow.is_idle());
        assert!(h.app.row_errors.contains_key(&1));

        *h.api.request_result.lock().unwrap() = Some(Ok("ok".to_string()));
        h.app.update(Action::RequestTests);
        assert!(!h.app.row_errors.contains_key(&1));
    }

    #[tokio::test]
    async fn post_failure_surfaces_detail() {
        let api = api_with(vec![pr(1, "a")]);
        *api.post_error.lock().unwrap() = Some("Failed to post comment: 403".to_string());
        let mut h = Harness::loaded(api).await;

        h.app.update(Action::RequestTests);
        h.pump().await;
        h.app.update(Action::ConfirmPost);
        h.pump().await;

        assert_eq!(
            h.app.modal().error.as_deref(),
            Some("Failed to post comment: 403")
        );
        assert_eq!(h.api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn modal_cannot_be_closed_while_requesting() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a")])).await;
        h.app.update(Action::RequestTests);
        h.app.update(Action::CloseModal);
        assert!(h.app.flow.in_flight());
    }

    #[tokio::test]
    async fn preview_keys_map_to_confirm_and_cancel() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a")])).await;
        h.app.update(Action::RequestTests);
        h.pump().await;

        let yes = KeyEvent::from(KeyCode::Char('y'));
        let esc = KeyEvent::from(KeyCode::Esc);
        assert!(matches!(h.app.handle_event(Event::Key(yes)), Action::ConfirmPost));
        assert!(matches!(h.app.handle_event(Event::Key(esc)), Action::CancelPreview));
    }

    #[tokio::test]
    async fn only_q_quits_from_the_list() {
        let h = Harness::loaded(api_with(vec![pr(1, "a")])).await;

        let esc = KeyEvent::from(KeyCode::Esc);
        let q = KeyEvent::from(KeyCode::Char('q'));
        assert!(matches!(h.app.handle_event(Event::Key(esc)), Action::None));
        assert!(matches!(h.app.handle_event(Event::Key(q)), Action::Quit));
    }

    #[tokio::test]
    async fn resize_updates_viewport() {
        let mut h = Harness::loaded(api_with(vec![pr(1, "a")])).await;
        let action = h.app.handle_event(Event::Resize(120, 40));
        assert!(matches!(action, Action::Resize(120, 40)));

        h.app.update(action);
        assert_eq!(h.app.viewport, Rect::new(0, 0, 120, 40));
    }

    #[tokio::test]
    async fn request_with_empty_list_does_nothing() {
        let mut h = Harness::loaded(FakeApi::default()).await;
        h.app.update(Action::RequestTests);
        assert!(h.app.flow.is_idle());
        assert_eq!(h.api.request_calls.load(Ordering::SeqCst), 0);
    }
}
