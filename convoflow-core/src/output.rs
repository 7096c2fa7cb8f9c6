use crate::node::QuestionOption;
use convoflow_context::{ExecutionSession, ExecutionTrace};
use serde::{Deserialize, Serialize};

/// 输出项
///
/// Something a run produced for the user or for observability, in the
/// order it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Output {
    Message {
        node_id: String,
        text: String,
    },
    Question {
        node_id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<QuestionOption>,
    },
    Transfer {
        node_id: String,
        text: String,
    },
    Typing {
        node_id: String,
        seconds: f64,
    },
    /// Trace notice, not meant for the end user.
    System {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        text: String,
    },
}

impl Output {
    pub fn system(node_id: &str, text: impl Into<String>) -> Self {
        Output::System {
            node_id: Some(node_id.to_string()),
            text: text.into(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Output::Message { text, .. }
            | Output::Question { text, .. }
            | Output::Transfer { text, .. }
            | Output::System { text, .. } => Some(text),
            Output::Typing { .. } => None,
        }
    }

    /// Messages, questions and handoff notices are shown to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Output::Message { .. }
                | Output::Question { .. }
                | Output::Transfer { .. }
        )
    }
}

/// 运行结束原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Halted on a question; the next inbound message resumes the run.
    AwaitingInput,
    /// Reached an `end` node.
    Ended,
    /// Reached a `transfer` node.
    Transferred,
    /// Ran out of graph: no outgoing connection or a dangling reference.
    EndOfGraph,
    /// Stopped by the step budget; the caller should flag the session.
    StepBudgetExceeded { budget: usize },
}

impl Termination {
    pub fn is_completed(&self) -> bool {
        !matches!(self, Termination::AwaitingInput)
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, Termination::StepBudgetExceeded { .. })
    }
}

/// 执行结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub responses: Vec<Output>,
    pub session_state: ExecutionSession,
    pub completed: bool,
    pub termination: Termination,
    /// Executor invocations spent in this run.
    pub steps: usize,
    pub trace: ExecutionTrace,
}

impl ExecutionResult {
    pub fn is_abnormal(&self) -> bool {
        self.termination.is_abnormal()
    }

    pub fn is_waiting(&self) -> bool {
        self.session_state.waiting_for_input
    }

    /// Texts of the user-visible outputs.
    pub fn messages(&self) -> Vec<&str> {
        self.responses
            .iter()
            .filter(|o| o.is_user_visible())
            .filter_map(Output::text)
            .collect()
    }
}
