use crate::VariableStore;
use serde::{Deserialize, Serialize};

/// 会话执行状态
///
/// The persisted position of one conversation inside a flow. The engine
/// receives it by value and hands an updated copy back; it never keeps a
/// reference between invocations. The serialized shape
/// (`currentNodeId`, `variables`, `waitingForInput`) is the contract with
/// the session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSession {
    /// 当前节点ID
    #[serde(default)]
    pub current_node_id: Option<String>,
    /// 会话变量
    #[serde(default)]
    pub variables: VariableStore,
    /// 是否等待用户输入
    #[serde(default)]
    pub waiting_for_input: bool,
}

impl ExecutionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(variables: VariableStore) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    /// Node id the session is parked on, if it is waiting for an answer.
    pub fn awaiting_node(&self) -> Option<&str> {
        if self.waiting_for_input {
            self.current_node_id.as_deref()
        } else {
            None
        }
    }

    /// Parks the session on `node_id` until the next inbound message.
    pub fn halt_at(&mut self, node_id: impl Into<String>) {
        self.current_node_id = Some(node_id.into());
        self.waiting_for_input = true;
    }

    /// Marks the automated part of the conversation as no longer waiting.
    pub fn release_at(&mut self, node_id: Option<String>) {
        self.current_node_id = node_id;
        self.waiting_for_input = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_contract_shape() {
        let mut session = ExecutionSession::new();
        session.variables.set("budget", "high");
        session.halt_at("budget_question");

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            json!({
                "currentNodeId": "budget_question",
                "variables": { "budget": "high" },
                "waitingForInput": true
            })
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let session: ExecutionSession =
            serde_json::from_value(json!({})).unwrap();
        assert_eq!(session, ExecutionSession::default());
        assert_eq!(session.awaiting_node(), None);
    }

    #[test]
    fn test_awaiting_node_requires_flag() {
        let mut session = ExecutionSession::new();
        session.halt_at("q1");
        assert_eq!(session.awaiting_node(), Some("q1"));

        session.release_at(Some("end".to_string()));
        assert_eq!(session.awaiting_node(), None);
        assert_eq!(session.current_node_id.as_deref(), Some("end"));
    }

    #[test]
    fn test_loads_from_yaml_store_dump() {
        let yaml = r#"
currentNodeId: ask_name
waitingForInput: true
variables:
  name: Ana
  score: 7
"#;
        let session: ExecutionSession = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(session.awaiting_node(), Some("ask_name"));
        assert_eq!(session.variables.get("score"), Some(&json!(7)));
    }
}
