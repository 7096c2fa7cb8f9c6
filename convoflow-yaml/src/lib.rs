//! # Convoflow YAML
//!
//! Loading flow definitions from YAML/JSON, linting them, and reading the
//! engine settings file.

mod loader;
mod settings;
mod validator;

pub use loader::FlowLoader;
pub use settings::*;
pub use validator::{FlowValidator, Severity, ValidationIssue, ValidationReport};

/// Prelude module for YAML functionality
pub mod prelude {
    pub use crate::{EngineSettings, FlowLoader, FlowValidator, ValidationReport};
}
