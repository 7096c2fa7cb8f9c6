//! # Convoflow Logger
//!
//! Subscriber setup and structured summaries of finished runs.

use convoflow_context::{ExecutionTrace, StepOutcome};
use convoflow_core::{ExecutionResult, Output, Termination};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读
    #[default]
    Pretty,
    /// 每行一个 JSON 对象
    Json,
}

/// Logger for Convoflow runs
pub struct Logger {
    pub trace_id: String,
}

impl Logger {
    /// Create a new logger
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger bound to the trace id of a run
    pub fn with_trace_id(trace_id: String) -> Self {
        Self { trace_id }
    }

    /// Logger bound to `result`'s trace id.
    pub fn for_run(result: &ExecutionResult) -> Self {
        Self::with_trace_id(result.trace.trace_id.clone())
    }

    /// Initialize the global subscriber, honouring `RUST_LOG` (default `info`).
    pub fn init_tracing() {
        Self::init_tracing_with(LogFormat::Pretty);
    }

    /// Does nothing when a global subscriber is already installed.
    pub fn init_tracing_with(format: LogFormat) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let installed = match format {
            LogFormat::Pretty => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        if installed.is_err() {
            debug!("tracing subscriber already installed");
        }
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        info!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        warn!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        error!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log run summary
    pub fn log_run_summary(&self, result: &ExecutionResult) {
        let summary = RunSummary::from(result);
        let termination = summary.termination.as_str();

        if result.is_abnormal() {
            error!(
                trace_id = %self.trace_id,
                termination,
                steps = summary.steps,
                failed = summary.failed_steps,
                responses = summary.responses,
                "Run aborted"
            );
        } else {
            info!(
                trace_id = %self.trace_id,
                termination,
                completed = summary.completed,
                steps = summary.steps,
                failed = summary.failed_steps,
                responses = summary.responses,
                user_visible = summary.user_visible,
                variables = summary.variables,
                waiting_on = ?summary.waiting_on,
                "Run summary"
            );
        }

        for error in &result.trace.errors {
            warn!(trace_id = %self.trace_id, "Run error: {}", error);
        }
    }

    /// Log step execution details
    pub fn log_step_details(&self, trace: &ExecutionTrace) {
        for record in &trace.steps {
            let duration_ms = record.duration.as_millis();
            match record.outcome {
                StepOutcome::Failed => {
                    error!(
                        trace_id = %self.trace_id,
                        step = record.step,
                        node_id = %record.node_id,
                        kind = %record.node_kind,
                        duration_ms,
                        error = %record.detail.as_deref().unwrap_or("Unknown error"),
                        "Step failed"
                    );
                }
                StepOutcome::Running => {
                    warn!(
                        trace_id = %self.trace_id,
                        step = record.step,
                        node_id = %record.node_id,
                        "Step never finished"
                    );
                }
                outcome => {
                    info!(
                        trace_id = %self.trace_id,
                        step = record.step,
                        node_id = %record.node_id,
                        kind = %record.node_kind,
                        outcome = ?outcome,
                        duration_ms,
                        detail = ?record.detail,
                        "Step finished"
                    );
                }
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// 运行摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub trace_id: String,
    pub termination: String,
    pub completed: bool,
    pub steps: usize,
    pub failed_steps: usize,
    pub responses: usize,
    pub user_visible: usize,
    pub variables: usize,
    pub waiting_on: Option<String>,
}

impl From<&ExecutionResult> for RunSummary {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            trace_id: result.trace.trace_id.clone(),
            termination: termination_label(&result.termination).to_string(),
            completed: result.completed,
            steps: result.steps,
            failed_steps: result.trace.count(StepOutcome::Failed),
            responses: result.responses.len(),
            user_visible: result
                .responses
                .iter()
                .filter(|o| Output::is_user_visible(o))
                .count(),
            variables: result.session_state.variables.len(),
            waiting_on: result.session_state.awaiting_node().map(str::to_string),
        }
    }
}

fn termination_label(termination: &Termination) -> &'static str {
    match termination {
        Termination::AwaitingInput => "awaiting_input",
        Termination::Ended => "ended",
        Termination::Transferred => "transferred",
        Termination::EndOfGraph => "end_of_graph",
        Termination::StepBudgetExceeded { .. } => "step_budget_exceeded",
    }
}
