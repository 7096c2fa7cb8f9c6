//! # Convoflow Core
//!
//! Flow definitions, the node model, run outputs and the contracts for the
//! integrations a run may call.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod flow;
mod integration;
mod node;
mod output;

pub use flow::{Connection, FlowDefinition, TriggerConfig, TriggerKind};
pub use integration::{
    ActionDispatcher, ActionRequest, AiAdapter, AiRequest, AiResponse,
    IntegrationError, Unconfigured, WebhookAdapter, WebhookRequest,
    WebhookResponse,
};
pub use node::{
    ActionNode, AiResponseNode, ConditionBranch, ConditionNode, DelayNode,
    MessageNode, Node, NodeKind, QuestionNode, QuestionOption, TransferNode,
    WebhookNode,
};
pub use output::{ExecutionResult, Output, Termination};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        Connection, ExecutionResult, FlowDefinition, Node, NodeKind, Output,
        Termination,
    };
    pub use convoflow_context::{ExecutionSession, VariableStore};
}
