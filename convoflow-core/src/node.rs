use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 流程节点
///
/// The `type` field of the JSON document selects the [`NodeKind`] variant;
/// the remaining fields are the variant's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 节点ID（流程内唯一）
    pub id: String,
    /// 编辑器中显示的名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// 节点类型及其负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// 流程入口
    Trigger,
    /// 文本消息
    Message(MessageNode),
    /// 提问并等待回答
    Question(QuestionNode),
    /// 条件分支
    Condition(ConditionNode),
    /// 外部动作
    Action(ActionNode),
    /// HTTP 回调
    Webhook(WebhookNode),
    /// AI 生成回复
    AiResponse(AiResponseNode),
    /// 延迟
    Delay(DelayNode),
    /// 转人工
    Transfer(TransferNode),
    /// 结束
    End,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Message(_) => "message",
            NodeKind::Question(_) => "question",
            NodeKind::Condition(_) => "condition",
            NodeKind::Action(_) => "action",
            NodeKind::Webhook(_) => "webhook",
            NodeKind::AiResponse(_) => "ai_response",
            NodeKind::Delay(_) => "delay",
            NodeKind::Transfer(_) => "transfer",
            NodeKind::End => "end",
        }
    }
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.kind, NodeKind::Trigger)
    }

    pub fn as_question(&self) -> Option<&QuestionNode> {
        match &self.kind {
            NodeKind::Question(q) => Some(q),
            _ => None,
        }
    }

    /// Variable this node writes, if any.
    pub fn target_variable(&self) -> Option<&str> {
        let variable = match &self.kind {
            NodeKind::Question(q) => &q.variable,
            NodeKind::Webhook(w) => &w.variable,
            NodeKind::AiResponse(a) => &a.variable,
            _ => return None,
        };
        (!variable.is_empty()).then_some(variable.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageNode {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNode {
    #[serde(default)]
    pub content: String,
    /// 回答写入的变量名
    #[serde(default)]
    pub variable: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
}

impl QuestionNode {
    /// Maps an inbound answer to the value to store.
    ///
    /// Labels match case-insensitively (ignoring surrounding whitespace),
    /// values match exactly. Without a matching option the raw text is kept.
    pub fn resolve_answer(&self, answer: &str) -> String {
        let trimmed = answer.trim();
        let folded = trimmed.to_lowercase();
        self.options
            .iter()
            .find(|opt| {
                opt.label.trim().to_lowercase() == folded
                    || opt.stored_value() == answer
            })
            .map(|opt| opt.stored_value().to_string())
            .unwrap_or_else(|| answer.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    #[serde(default)]
    pub value: String,
}

impl QuestionOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The value stored on selection; falls back to the label when no
    /// explicit value was authored.
    pub fn stored_value(&self) -> &str {
        if self.value.is_empty() {
            &self.label
        } else {
            &self.value
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    /// 有序分支，首个匹配者生效
    #[serde(default)]
    pub conditions: Vec<ConditionBranch>,
}

/// One entry of a condition node: `{ "if": "...", "goto": "..." }` or
/// `{ "else": true, "goto": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBranch", into = "RawBranch")]
pub enum ConditionBranch {
    If { expression: String, goto: String },
    Else { goto: String },
}

impl ConditionBranch {
    pub fn goto(&self) -> &str {
        match self {
            ConditionBranch::If { goto, .. } | ConditionBranch::Else { goto } => {
                goto
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawBranch {
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
    #[serde(rename = "else", default, skip_serializing_if = "is_false")]
    otherwise: bool,
    #[serde(default)]
    goto: String,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl From<RawBranch> for ConditionBranch {
    fn from(raw: RawBranch) -> Self {
        // an entry with neither key keeps an empty expression, which never matches
        match (raw.otherwise, raw.expression) {
            (true, _) => ConditionBranch::Else { goto: raw.goto },
            (false, expression) => ConditionBranch::If {
                expression: expression.unwrap_or_default(),
                goto: raw.goto,
            },
        }
    }
}

impl From<ConditionBranch> for RawBranch {
    fn from(branch: ConditionBranch) -> Self {
        match branch {
            ConditionBranch::If { expression, goto } => RawBranch {
                expression: Some(expression),
                otherwise: false,
                goto,
            },
            ConditionBranch::Else { goto } => RawBranch {
                expression: None,
                otherwise: true,
                goto,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    pub action: String,
    /// 负载模板，字符串叶子会被插值
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNode {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// 超时（毫秒），缺省时使用驱动配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub variable: String,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponseNode {
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub variable: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayNode {
    #[serde(default)]
    pub seconds: f64,
    #[serde(default)]
    pub typing_indicator: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferNode {
    #[serde(default)]
    pub content: String,
}
