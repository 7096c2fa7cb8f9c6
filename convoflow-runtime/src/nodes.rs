//! Node executors.
//!
//! Each executor sees the node, the variable store and the output buffer of
//! the current run, and tells the driver where the chain goes next.

use crate::driver::{DelayPolicy, FlowDriver};
use convoflow_context::{evaluate_condition, interpolate, interpolate_value, VariableStore};
use convoflow_core::{
    ActionDispatcher, ActionNode, ActionRequest, AiAdapter, AiRequest,
    AiResponseNode, ConditionBranch, ConditionNode, DelayNode,
    IntegrationError, Node, NodeKind, Output, QuestionNode, Termination,
    WebhookAdapter, WebhookNode, WebhookRequest,
};
use std::time::Duration;

/// Where the chain goes after a node ran.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Control {
    /// Follow the node's first outgoing connection.
    Continue,
    /// Go to the given node id.
    Jump(String),
    /// Park the session on this node until the next inbound message.
    Halt,
    /// Stop the run.
    Terminate(Termination),
}

/// 单步执行报告
#[derive(Debug)]
pub(crate) struct StepReport {
    pub control: Control,
    pub detail: Option<String>,
    pub error: Option<String>,
}

impl StepReport {
    fn control(control: Control) -> Self {
        Self {
            control,
            detail: None,
            error: None,
        }
    }

    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn failed(mut self, error: &IntegrationError) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

impl<W, A, D> FlowDriver<W, A, D>
where
    W: WebhookAdapter,
    A: AiAdapter,
    D: ActionDispatcher,
{
    pub(crate) async fn execute_node(
        &self,
        node: &Node,
        vars: &mut VariableStore,
        out: &mut Vec<Output>,
    ) -> StepReport {
        match &node.kind {
            NodeKind::Trigger => StepReport::control(Control::Continue),
            NodeKind::Message(message) => {
                out.push(Output::Message {
                    node_id: node.id.clone(),
                    text: interpolate(&message.content, vars),
                });
                StepReport::control(Control::Continue)
            }
            NodeKind::Question(question) => self.ask(node, question, vars, out),
            NodeKind::Condition(condition) => {
                self.branch(node, condition, vars, out)
            }
            NodeKind::Action(action) => {
                self.dispatch_action(node, action, vars, out).await
            }
            NodeKind::Webhook(webhook) => {
                self.call_webhook(node, webhook, vars, out).await
            }
            NodeKind::AiResponse(ai) => self.complete_ai(node, ai, vars, out).await,
            NodeKind::Delay(delay) => self.pause(node, delay, out).await,
            NodeKind::Transfer(transfer) => {
                out.push(Output::Transfer {
                    node_id: node.id.clone(),
                    text: interpolate(&transfer.content, vars),
                });
                StepReport::control(Control::Terminate(Termination::Transferred))
            }
            NodeKind::End => StepReport::control(Control::Terminate(Termination::Ended)),
        }
    }

    fn ask(
        &self,
        node: &Node,
        question: &QuestionNode,
        vars: &VariableStore,
        out: &mut Vec<Output>,
    ) -> StepReport {
        out.push(Output::Question {
            node_id: node.id.clone(),
            text: interpolate(&question.content, vars),
            options: question.options.clone(),
        });
        StepReport::control(Control::Halt)
    }

    /// 条件分支：首个匹配者生效，else 恒匹配
    fn branch(
        &self,
        node: &Node,
        condition: &ConditionNode,
        vars: &VariableStore,
        out: &mut Vec<Output>,
    ) -> StepReport {
        let matched = condition.conditions.iter().find(|branch| match branch {
            ConditionBranch::If { expression, .. } => {
                evaluate_condition(expression, vars)
            }
            ConditionBranch::Else { .. } => true,
        });

        match matched {
            Some(branch) => {
                let target = branch.goto().to_string();
                StepReport::control(Control::Jump(target.clone()))
                    .detail(format!("goto {}", target))
            }
            None => {
                tracing::warn!(node_id = %node.id, "no condition matched, following default connection");
                out.push(Output::system(
                    &node.id,
                    "no condition matched, following default connection",
                ));
                StepReport::control(Control::Continue).detail("fallthrough")
            }
        }
    }

    async fn dispatch_action(
        &self,
        node: &Node,
        action: &ActionNode,
        vars: &VariableStore,
        out: &mut Vec<Output>,
    ) -> StepReport {
        out.push(Output::system(&node.id, format!("action: {}", action.action)));
        let request = ActionRequest {
            action: action.action.clone(),
            payload: interpolate_value(&action.payload, vars),
        };
        self.actions.dispatch(request).await;
        StepReport::control(Control::Continue).detail(action.action.clone())
    }

    async fn call_webhook(
        &self,
        node: &Node,
        webhook: &WebhookNode,
        vars: &mut VariableStore,
        out: &mut Vec<Output>,
    ) -> StepReport {
        let timeout_ms = webhook
            .timeout_ms
            .unwrap_or(self.config.default_webhook_timeout_ms);
        let request = WebhookRequest {
            url: interpolate(&webhook.url, vars),
            method: webhook.method.trim().to_uppercase(),
            headers: webhook
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), interpolate(value, vars)))
                .collect(),
            body: webhook.body.as_ref().map(|body| interpolate_value(body, vars)),
            timeout_ms,
        };
        tracing::info!(node_id = %node.id, method = %request.method, url = %request.url, "calling webhook");

        let outcome = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.webhook.call(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(IntegrationError::Timeout { timeout_ms }),
        };

        match outcome {
            Ok(response) => {
                let detail = format!("status {}", response.status);
                if !webhook.variable.is_empty() {
                    vars.set(webhook.variable.clone(), response.to_variable());
                }
                StepReport::control(Control::Continue).detail(detail)
            }
            Err(error) => {
                tracing::warn!(node_id = %node.id, error = %error, "webhook call failed, continuing");
                if !webhook.variable.is_empty() {
                    vars.set(webhook.variable.clone(), error.failure_marker());
                }
                out.push(Output::system(&node.id, format!("webhook failed: {}", error)));
                StepReport::control(Control::Continue).failed(&error)
            }
        }
    }

    async fn complete_ai(
        &self,
        node: &Node,
        ai: &AiResponseNode,
        vars: &mut VariableStore,
        out: &mut Vec<Output>,
    ) -> StepReport {
        let timeout_ms = self.config.ai_timeout_ms;
        let request = AiRequest {
            system_prompt: interpolate(&ai.system_prompt, vars),
            user_prompt: interpolate(&ai.user_prompt, vars),
            model: ai.model.clone(),
            temperature: ai.temperature,
            max_tokens: ai.max_tokens,
        };

        let outcome = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.ai.complete(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(IntegrationError::Timeout { timeout_ms }),
        };

        match outcome {
            Ok(response) => {
                if !ai.variable.is_empty() {
                    vars.set(ai.variable.clone(), response.text.clone());
                }
                out.push(Output::Message {
                    node_id: node.id.clone(),
                    text: response.text,
                });
                StepReport::control(Control::Continue)
            }
            Err(error) => {
                tracing::warn!(node_id = %node.id, error = %error, "ai completion failed, continuing");
                if !ai.variable.is_empty() {
                    vars.set(ai.variable.clone(), error.failure_marker());
                }
                out.push(Output::system(&node.id, format!("ai response failed: {}", error)));
                if let Some(fallback) = &self.config.ai_fallback_message {
                    out.push(Output::Message {
                        node_id: node.id.clone(),
                        text: interpolate(fallback, vars),
                    });
                }
                StepReport::control(Control::Continue).failed(&error)
            }
        }
    }

    async fn pause(&self, node: &Node, delay: &DelayNode, out: &mut Vec<Output>) -> StepReport {
        if delay.typing_indicator {
            out.push(Output::Typing {
                node_id: node.id.clone(),
                seconds: delay.seconds,
            });
        }

        let seconds = if delay.seconds.is_finite() && delay.seconds > 0.0 {
            delay.seconds.min(self.config.max_delay_seconds.max(0.0))
        } else {
            0.0
        };
        if self.config.delay_policy == DelayPolicy::Sleep && seconds > 0.0 {
            match Duration::try_from_secs_f64(seconds) {
                Ok(wait) => tokio::time::sleep(wait).await,
                Err(e) => {
                    tracing::warn!(node_id = %node.id, seconds, error = %e, "delay out of range, not sleeping");
                }
            }
        }
        StepReport::control(Control::Continue).detail(format!("{}s", seconds))
    }
}
