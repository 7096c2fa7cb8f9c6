use crate::node::{Node, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 流程定义
///
/// Owned by the persistence layer and lent to the engine for the duration
/// of a run. The engine only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    /// 数据库主键可能是数字
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub trigger_config: TriggerConfig,
    /// 默认变量，冷启动时写入会话
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// 有向连接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }
}

/// 触发配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    #[serde(default, rename = "type")]
    pub kind: TriggerKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// 任意消息
    #[default]
    Any,
    /// 关键词匹配
    Keyword,
    /// 仅手动启动
    Manual,
}

impl TriggerConfig {
    /// Whether `inbound` should start this flow for a new conversation.
    pub fn matches(&self, inbound: &str) -> bool {
        match self.kind {
            TriggerKind::Any => true,
            TriggerKind::Manual => false,
            TriggerKind::Keyword => {
                let text = inbound.to_lowercase();
                self.keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .any(|k| !k.is_empty() && text.contains(&k))
            }
        }
    }
}

impl FlowDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            id,
            ..Self::default()
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn connect(mut self, from: &str, to: &str) -> Self {
        self.connections.push(Connection::new(from, to));
        self
    }

    pub fn with_variable(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(key.to_string(), value.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.slug)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The first `trigger` node, falling back to the first node listed.
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind, NodeKind::Trigger))
            .or_else(|| self.nodes.first())
    }

    /// Connections leaving `node_id`, in list order.
    pub fn outgoing<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.from == node_id)
    }

    /// Target of the first connection leaving `node_id`. Ties between
    /// several outgoing edges are broken by list order.
    pub fn next_node_id(&self, node_id: &str) -> Option<&str> {
        self.connections
            .iter()
            .find(|c| c.from == node_id)
            .map(|c| c.to.as_str())
    }
}
