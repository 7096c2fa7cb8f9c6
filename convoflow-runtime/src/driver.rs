//! # Convoflow Runtime - 执行驱动
//!
//! Walks a flow graph for one inbound message: resumes a parked question or
//! cold-starts from the trigger, runs node executors until a question halts
//! the chain, a terminal node ends it, the graph runs out, or the step
//! budget is spent.

use crate::nodes::Control;
use convoflow_context::{ExecutionSession, ExecutionTrace, StepOutcome};
use convoflow_core::{
    ActionDispatcher, AiAdapter, ExecutionResult, FlowDefinition, Output,
    Termination, Unconfigured, WebhookAdapter,
};
use serde::{Deserialize, Serialize};

/// 驱动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 单次运行最多执行的节点数
    pub max_steps: usize,
    /// webhook 默认超时（毫秒）
    pub default_webhook_timeout_ms: u64,
    /// AI 调用超时（毫秒）
    pub ai_timeout_ms: u64,
    /// delay 节点处理方式
    pub delay_policy: DelayPolicy,
    /// delay 节点最长等待（秒）
    pub max_delay_seconds: f64,
    /// AI 调用失败时回复给用户的文本
    pub ai_fallback_message: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            default_webhook_timeout_ms: 10_000,
            ai_timeout_ms: 30_000,
            delay_policy: DelayPolicy::Sleep,
            max_delay_seconds: 30.0,
            ai_fallback_message: None,
        }
    }
}

impl DriverConfig {
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn delay_policy(mut self, policy: DelayPolicy) -> Self {
        self.delay_policy = policy;
        self
    }

    pub fn ai_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.ai_fallback_message = Some(message.into());
        self
    }
}

/// delay 节点处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayPolicy {
    /// 真实等待（受 max_delay_seconds 限制）
    #[default]
    Sleep,
    /// 只输出 typing 信号，不等待
    Skip,
}

/// 流程执行驱动
///
/// Holds configuration and the integration adapters; carries no state from
/// one run to the next, so one driver can serve every conversation.
#[derive(Debug, Clone, Default)]
pub struct FlowDriver<W = Unconfigured, A = Unconfigured, D = Unconfigured> {
    pub(crate) config: DriverConfig,
    pub(crate) webhook: W,
    pub(crate) ai: A,
    pub(crate) actions: D,
}

impl FlowDriver {
    /// 创建使用默认配置、未接入外部集成的驱动
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DriverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

impl<W, A, D> FlowDriver<W, A, D> {
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn with_webhook<W2>(self, webhook: W2) -> FlowDriver<W2, A, D> {
        FlowDriver {
            config: self.config,
            webhook,
            ai: self.ai,
            actions: self.actions,
        }
    }

    pub fn with_ai<A2>(self, ai: A2) -> FlowDriver<W, A2, D> {
        FlowDriver {
            config: self.config,
            webhook: self.webhook,
            ai,
            actions: self.actions,
        }
    }

    pub fn with_actions<D2>(self, actions: D2) -> FlowDriver<W, A, D2> {
        FlowDriver {
            config: self.config,
            webhook: self.webhook,
            ai: self.ai,
            actions,
        }
    }
}

impl<W, A, D> FlowDriver<W, A, D>
where
    W: WebhookAdapter,
    A: AiAdapter,
    D: ActionDispatcher,
{
    /// Processes one inbound message.
    ///
    /// `session` is the stored state of the conversation, `None` for a new
    /// one. The updated session comes back inside the result; nothing is
    /// retained here. Every failure mode resolves to a well-formed result.
    #[tracing::instrument(level = "info", skip(self, flow, session, inbound), fields(flow = %flow.id, slug = %flow.slug))]
    pub async fn run(
        &self,
        flow: &FlowDefinition,
        session: Option<ExecutionSession>,
        inbound: &str,
    ) -> ExecutionResult {
        let mut session = session.unwrap_or_default();
        let trace = ExecutionTrace::default();

        let resumed_question = session
            .awaiting_node()
            .and_then(|id| flow.node(id))
            .and_then(|node| node.as_question().map(|q| (node, q)));

        let (origin, entry) = match resumed_question {
            Some((node, question)) => {
                let answer = question.resolve_answer(inbound);
                tracing::info!(trace_id = %trace.trace_id, node_id = %node.id, variable = %question.variable, "resuming after answer");
                if !question.variable.is_empty() {
                    session.variables.set(question.variable.clone(), answer);
                }
                (
                    Some(node.id.clone()),
                    flow.next_node_id(&node.id).map(str::to_string),
                )
            }
            None => {
                if let Some(stale) = session.awaiting_node() {
                    tracing::warn!(trace_id = %trace.trace_id, node_id = %stale, "session waits on a missing or non-question node, restarting flow");
                }
                session.variables.merge_defaults(&flow.variables);
                match flow.start_node() {
                    Some(start) => {
                        tracing::info!(trace_id = %trace.trace_id, start = %start.id, "cold start");
                        (
                            Some(start.id.clone()),
                            flow.next_node_id(&start.id).map(str::to_string),
                        )
                    }
                    None => {
                        tracing::warn!(trace_id = %trace.trace_id, "flow has no nodes");
                        (None, None)
                    }
                }
            }
        };

        self.walk(flow, session, origin, entry, trace).await
    }

    /// Chain walking from `entry` until a halting condition.
    async fn walk(
        &self,
        flow: &FlowDefinition,
        mut session: ExecutionSession,
        origin: Option<String>,
        entry: Option<String>,
        mut trace: ExecutionTrace,
    ) -> ExecutionResult {
        let budget = self.config.max_steps;
        let mut responses: Vec<Output> = Vec::new();
        let mut last_node = origin;
        let mut next = entry;
        let mut steps = 0usize;

        let termination = loop {
            let Some(node_id) = next.take() else {
                session.release_at(last_node.take());
                break Termination::EndOfGraph;
            };
            let Some(node) = flow.node(&node_id) else {
                tracing::warn!(trace_id = %trace.trace_id, node_id = %node_id, "reference to unknown node, ending run");
                trace.record_error(&node_id, "unknown node");
                session.release_at(last_node.take());
                break Termination::EndOfGraph;
            };
            if steps >= budget {
                tracing::error!(trace_id = %trace.trace_id, node_id = %node_id, budget, "step budget exceeded, aborting run");
                trace.record_error(&node_id, "step budget exceeded");
                session.release_at(Some(node_id));
                break Termination::StepBudgetExceeded { budget };
            }

            steps += 1;
            trace.start_step(&node.id, node.kind_name());
            let report = self
                .execute_node(node, &mut session.variables, &mut responses)
                .await;
            if let Some(error) = &report.error {
                trace.record_error(&node.id, error);
            }
            let outcome = match (&report.control, report.error.is_some()) {
                (_, true) => StepOutcome::Failed,
                (Control::Continue, _) => StepOutcome::Continue,
                (Control::Jump(_), _) => StepOutcome::Jump,
                (Control::Halt, _) => StepOutcome::Halt,
                (Control::Terminate(_), _) => StepOutcome::Terminate,
            };
            trace.end_step(&node.id, outcome, report.detail.or(report.error));

            match report.control {
                Control::Continue => {
                    next = flow.next_node_id(&node.id).map(str::to_string);
                }
                Control::Jump(target) => {
                    next = Some(target);
                }
                Control::Halt => {
                    session.halt_at(node.id.clone());
                    break Termination::AwaitingInput;
                }
                Control::Terminate(termination) => {
                    session.release_at(Some(node.id.clone()));
                    break termination;
                }
            }
            last_node = Some(node.id.clone());
        };

        tracing::info!(
            trace_id = %trace.trace_id,
            termination = ?termination,
            steps,
            responses = responses.len(),
            "run finished"
        );

        ExecutionResult {
            responses,
            completed: termination.is_completed(),
            session_state: session,
            termination,
            steps,
            trace,
        }
    }
}
