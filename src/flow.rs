//! The request-tests workflow for a single pull request.
//!
//! `Idle → Requesting → Previewing → Posting → Done`, with `Failed` reachable
//! from `Requesting` and `Posting`. Only one flow runs at a time; every
//! transition that does not apply to the current state is rejected, which is
//! what keeps a second request from going out while one is in flight.

use crate::types::PrRef;

/// Which network step a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Requesting {
        target: PrRef,
    },
    Previewing {
        target: PrRef,
        comment: String,
    },
    Posting {
        target: PrRef,
        comment: String,
    },
    Done {
        target: PrRef,
        comment: String,
        comment_url: Option<String>,
    },
    Failed {
        target: PrRef,
        stage: Stage,
        message: String,
    },
}

impl FlowState {
    /// Short label for the status bar while a call is outstanding.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            FlowState::Requesting { .. } => Some("Requesting tests..."),
            FlowState::Posting { .. } => Some("Posting comment..."),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFlow {
    state: FlowState,
    /// Top row of the preview or success comment; kept within the last limit given
    scroll: usize,
}

impl RequestFlow {
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, FlowState::Idle)
    }

    /// A network call for this flow is outstanding.
    pub fn in_flight(&self) -> bool {
        matches!(
            self.state,
            FlowState::Requesting { .. } | FlowState::Posting { .. }
        )
    }

    pub fn target(&self) -> Option<&PrRef> {
        match &self.state {
            FlowState::Idle => None,
            FlowState::Requesting { target }
            | FlowState::Previewing { target, .. }
            | FlowState::Posting { target, .. }
            | FlowState::Done { target, .. }
            | FlowState::Failed { target, .. } => Some(target),
        }
    }

    /// The comment under review, while the preview popup is up.
    pub fn preview(&self) -> Option<&str> {
        match &self.state {
            FlowState::Previewing { comment, .. } | FlowState::Posting { comment, .. } => {
                Some(comment)
            }
            _ => None,
        }
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// The preview and the posted comment can be scrolled.
    pub fn scrollable(&self) -> bool {
        matches!(
            self.state,
            FlowState::Previewing { .. } | FlowState::Posting { .. } | FlowState::Done { .. }
        )
    }

    /// Move by `delta` rows, never past `max`.
    pub fn scroll_by(&mut self, delta: isize, max: usize) {
        if self.scrollable() {
            self.scroll = self.scroll.saturating_add_signed(delta).min(max);
        }
    }

    /// Pull the scroll back inside `max`, e.g. after the terminal shrank.
    pub fn clamp_scroll(&mut self, max: usize) {
        self.scroll = self.scroll.min(max);
    }

    /// `Idle → Requesting`. Returns false if another flow is active.
    pub fn begin_request(&mut self, target: PrRef) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = FlowState::Requesting { target };
        true
    }

    /// `Requesting → Previewing`, keeping the comment exactly as received.
    pub fn preview_ready(&mut self, pr_id: u64, comment: String) -> bool {
        match std::mem::take(&mut self.state) {
            FlowState::Requesting { target } if target.id == pr_id => {
                self.scroll = 0;
                self.state = FlowState::Previewing { target, comment };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// `Previewing → Idle`. The preview is dropped.
    pub fn cancel_preview(&mut self) -> bool {
        if matches!(self.state, FlowState::Previewing { .. }) {
            self.state = FlowState::Idle;
            self.scroll = 0;
            true
        } else {
            false
        }
    }

    /// `Previewing → Posting`. Returns the target and the comment to send.
    pub fn confirm(&mut self) -> Option<(PrRef, String)> {
        match std::mem::take(&mut self.state) {
            FlowState::Previewing { target, comment } => {
                let out = (target.clone(), comment.clone());
                self.state = FlowState::Posting { target, comment };
                Some(out)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// `Posting → Done`.
    pub fn posted(&mut self, pr_id: u64, comment_url: Option<String>) -> bool {
        match std::mem::take(&mut self.state) {
            FlowState::Posting { target, comment } if target.id == pr_id => {
                self.scroll = 0;
                self.state = FlowState::Done {
                    target,
                    comment,
                    comment_url,
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// `Requesting | Posting → Failed`.
    pub fn fail(&mut self, pr_id: u64, message: String) -> bool {
        let stage = match &self.state {
            FlowState::Requesting { target } if target.id == pr_id => Stage::Request,
            FlowState::Posting { target, .. } if target.id == pr_id => Stage::Post,
            _ => return false,
        };
        if let FlowState::Requesting { target } | FlowState::Posting { target, .. } =
            std::mem::take(&mut self.state)
        {
            self.scroll = 0;
            self.state = FlowState::Failed {
                target,
                stage,
                message,
            };
        }
        true
    }

    /// `Done | Failed → Idle`. In-flight states cannot be dismissed.
    pub fn dismiss(&mut self) -> bool {
        if matches!(self.state, FlowState::Done { .. } | FlowState::Failed { .. }) {
            self.state = FlowState::Idle;
            true
        } else {
            false
        }
    }
}
