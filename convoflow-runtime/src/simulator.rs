//! Scripted conversations against a flow, for authoring and tests.

use crate::driver::FlowDriver;
use convoflow_context::ExecutionSession;
use convoflow_core::{
    ActionDispatcher, AiAdapter, ExecutionResult, FlowDefinition, Termination,
    WebhookAdapter,
};
use serde::Serialize;

/// 一轮对话
#[derive(Debug, Clone, Serialize)]
pub struct SimulationTurn {
    pub inbound: String,
    pub result: ExecutionResult,
}

/// 模拟结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub turns: Vec<SimulationTurn>,
    pub final_session: ExecutionSession,
    pub completed: bool,
    pub termination: Option<Termination>,
}

impl Simulation {
    /// One line per inbound message and per user-visible output.
    pub fn transcript(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for turn in &self.turns {
            lines.push(format!("> {}", turn.inbound));
            lines.extend(turn.result.messages().into_iter().map(|m| format!("< {}", m)));
        }
        lines
    }

    /// Texts of every user-visible output, across all turns.
    pub fn messages(&self) -> Vec<&str> {
        self.turns
            .iter()
            .flat_map(|turn| turn.result.messages())
            .collect()
    }
}

impl<W, A, D> FlowDriver<W, A, D>
where
    W: WebhookAdapter,
    A: AiAdapter,
    D: ActionDispatcher,
{
    /// Feeds `inputs` one by one, threading the session between runs.
    /// Stops early once a run completes; leftover inputs are ignored.
    pub async fn simulate<I, S>(&self, flow: &FlowDefinition, inputs: I) -> Simulation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut session: Option<ExecutionSession> = None;
        let mut turns = Vec::new();
        let mut termination = None;

        for inbound in inputs {
            let inbound = inbound.into();
            let result = self.run(flow, session.take(), &inbound).await;
            session = Some(result.session_state.clone());
            let done = result.completed;
            termination = Some(result.termination.clone());
            turns.push(SimulationTurn { inbound, result });
            if done {
                break;
            }
        }

        let final_session = session.unwrap_or_default();
        let completed = termination.as_ref().is_some_and(Termination::is_completed);
        tracing::debug!(flow = %flow.id, turns = turns.len(), completed, "simulation finished");

        Simulation {
            turns,
            final_session,
            completed,
            termination,
        }
    }
}
