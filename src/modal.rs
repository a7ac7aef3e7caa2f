use crate::flow::{FlowState, RequestFlow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalStatus {
    Loading,
    Error,
    Success,
}

/// What the status modal shows. Derived from the flow on every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalState {
    pub is_open: bool,
    pub status: ModalStatus,
    pub comment: Option<String>,
    pub error: Option<String>,
}

impl ModalState {
    pub fn closed() -> Self {
        Self {
            is_open: false,
            status: ModalStatus::Loading,
            comment: None,
            error: None,
        }
    }

    pub fn from_flow(flow: &RequestFlow) -> Self {
        match flow.state() {
            FlowState::Requesting { .. } => Self {
                is_open: true,
                status: ModalStatus::Loading,
                comment: None,
                error: None,
            },
            FlowState::Done { comment, .. } => Self {
                is_open: true,
                status: ModalStatus::Success,
                comment: Some(comment.clone()),
                error: None,
            },
            FlowState::Failed { message, .. } => Self {
                is_open: true,
                status: ModalStatus::Error,
                comment: None,
                error: Some(message.clone()),
            },
            // The preview popup owns these
            FlowState::Idle | FlowState::Previewing { .. } | FlowState::Posting { .. } => {
                Self::closed()
            }
        }
    }

    pub fn title(&self) -> &'static str {
        match self.status {
            ModalStatus::Loading => "Requesting Tests...",
            ModalStatus::Success => "Comment Posted Successfully",
            ModalStatus::Error => "Error Requesting Tests",
        }
    }

    pub fn footer(&self) -> &'static str {
        match self.status {
            ModalStatus::Loading => "Please wait...",
            ModalStatus::Success | ModalStatus::Error => "Close",
        }
    }
}
