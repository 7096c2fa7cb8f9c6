use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Per-run record of which nodes executed and how each step ended.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionTrace {
    pub trace_id: String,
    pub steps: Vec<StepRecord>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based step index within the run
    pub step: usize,
    pub node_id: String,
    pub node_kind: String,
    pub outcome: StepOutcome,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip)]
    started_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Running,
    Continue,
    Jump,
    Halt,
    Terminate,
    Failed,
}

impl Default for ExecutionTrace {
    fn default() -> Self {
        Self::new_with_trace_id(Uuid::new_v4().to_string())
    }
}

impl ExecutionTrace {
    pub fn new_with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            steps: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn start_step(&mut self, node_id: &str, node_kind: &str) {
        let step = self.steps.len() + 1;
        self.steps.push(StepRecord {
            step,
            node_id: node_id.to_string(),
            node_kind: node_kind.to_string(),
            outcome: StepOutcome::Running,
            duration: Duration::default(),
            detail: None,
            started_at: Some(Instant::now()),
        });

        tracing::debug!(trace_id = %self.trace_id, step, node_id = %node_id, kind = %node_kind, "step starting");
    }

    /// Closes the most recent running step for `node_id`.
    pub fn end_step(
        &mut self,
        node_id: &str,
        outcome: StepOutcome,
        detail: Option<String>,
    ) {
        let trace_id = self.trace_id.clone();
        if let Some(record) = self
            .steps
            .iter_mut()
            .rev()
            .find(|r| r.node_id == node_id && r.outcome == StepOutcome::Running)
        {
            record.duration = record
                .started_at
                .map(|start| start.elapsed())
                .unwrap_or_default();
            record.outcome = outcome;

            match outcome {
                StepOutcome::Failed => {
                    tracing::warn!(trace_id = %trace_id, step = record.step, node_id = %node_id, duration_ms = ?record.duration, detail = ?detail, "step failed");
                }
                _ => {
                    tracing::debug!(trace_id = %trace_id, step = record.step, node_id = %node_id, outcome = ?outcome, duration_ms = ?record.duration, "step finished");
                }
            }
            record.detail = detail;
        }
    }

    pub fn record_error(&mut self, node_id: &str, message: &str) {
        self.errors
            .push(format!("[{}] {}: {}", self.trace_id, node_id, message));
    }

    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Node ids in execution order.
    pub fn path(&self) -> Vec<&str> {
        self.steps.iter().map(|r| r.node_id.as_str()).collect()
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
