//! # Convoflow - Conversational Flow Engine
//!
//! Convoflow executes chatbot flows authored as node graphs. Each inbound
//! message advances the conversation until the bot asks a question, hands
//! off to a human, reaches an end node or runs out of graph. State between
//! messages lives in an [`ExecutionSession`](context::ExecutionSession)
//! that the caller stores.
//!
//! ## Features
//!
//! - `runtime` (default): the execution driver and simulator
//! - `yaml` (default): YAML/JSON flow loading, validation, engine settings
//! - `http` (default): reqwest-backed webhook adapter
//! - `logger` (default): tracing setup and run summaries
//!
//! ## Quick Start
//!
//! ```rust
//! use convoflow::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let flow = FlowDefinition::new("hello")
//!         .with_node(Node::new("start", NodeKind::Trigger))
//!         .with_node(Node::new(
//!             "greet",
//!             NodeKind::Message(MessageNode { content: "Hola {{name}}".into() }),
//!         ))
//!         .with_variable("name", "Ana")
//!         .connect("start", "greet");
//!
//!     let result = FlowDriver::new().run(&flow, None, "hi").await;
//!     assert_eq!(result.messages(), vec!["Hola Ana"]);
//!     assert!(result.completed);
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export core functionality
pub use convoflow_context as context;
pub use convoflow_core::*;

#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use convoflow_runtime as runtime;

#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub use convoflow_yaml as yaml;

#[cfg(feature = "logger")]
#[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
pub use convoflow_logger as logger;

/// Prelude module for easy imports
pub mod prelude {
    pub use convoflow_core::prelude::*;
    pub use convoflow_core::{
        ConditionBranch, MessageNode, QuestionNode, QuestionOption,
    };

    #[cfg(feature = "runtime")]
    #[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
    pub use convoflow_runtime::{
        DelayPolicy, DriverConfig, FlowDriver, Simulation,
    };

    #[cfg(feature = "http")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http")))]
    pub use convoflow_runtime::ReqwestWebhookAdapter;

    #[cfg(feature = "yaml")]
    #[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
    pub use convoflow_yaml::prelude::*;

    #[cfg(feature = "logger")]
    #[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
    pub use convoflow_logger::{LogFormat, Logger};
}
