//! Contracts for the side effects a run can trigger.
//!
//! The engine builds fully interpolated requests and hands them to the
//! adapters supplied by the caller. Adapters never see the session.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Webhook 请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value stored under the webhook node's variable once a response
    /// arrived. `ok` mirrors a 2xx status.
    pub fn to_variable(&self) -> Value {
        json!({ "ok": self.is_success(), "status": self.status, "body": self.body })
    }
}

/// AI 补全请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub text: String,
}

/// 动作分发请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// 集成调用失败
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("call timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("{0} integration is not configured")]
    NotConfigured(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
}

impl IntegrationError {
    /// Stable machine-readable kind, also used in the failure marker.
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrationError::Timeout { .. } => "timeout",
            IntegrationError::NotConfigured(_) => "not_configured",
            IntegrationError::Transport(_) => "transport",
            IntegrationError::Provider(_) => "provider",
        }
    }

    /// Value stored under the node's variable when the call fails, so that
    /// later condition nodes can branch on `<var>.ok` or `<var>.error`.
    pub fn failure_marker(&self) -> Value {
        json!({ "ok": false, "error": self.kind(), "message": self.to_string() })
    }
}

/// Performs the HTTP call of a `webhook` node.
pub trait WebhookAdapter {
    fn call(
        &self,
        request: WebhookRequest,
    ) -> impl Future<Output = Result<WebhookResponse, IntegrationError>> + Send;
}

/// Performs the completion call of an `ai_response` node.
pub trait AiAdapter {
    fn complete(
        &self,
        request: AiRequest,
    ) -> impl Future<Output = Result<AiResponse, IntegrationError>> + Send;
}

/// Receives the side effect of an `action` node. Fire and forget.
pub trait ActionDispatcher {
    fn dispatch(&self, request: ActionRequest) -> impl Future<Output = ()> + Send;
}

impl<T: WebhookAdapter + Send + Sync> WebhookAdapter for Arc<T> {
    async fn call(
        &self,
        request: WebhookRequest,
    ) -> Result<WebhookResponse, IntegrationError> {
        (**self).call(request).await
    }
}

impl<T: AiAdapter + Send + Sync> AiAdapter for Arc<T> {
    async fn complete(
        &self,
        request: AiRequest,
    ) -> Result<AiResponse, IntegrationError> {
        (**self).complete(request).await
    }
}

impl<T: ActionDispatcher + Send + Sync> ActionDispatcher for Arc<T> {
    async fn dispatch(&self, request: ActionRequest) {
        (**self).dispatch(request).await
    }
}

/// Stand-in for integrations the caller did not wire up. Webhook and AI
/// calls fail with [`IntegrationError::NotConfigured`]; actions are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl WebhookAdapter for Unconfigured {
    async fn call(
        &self,
        _request: WebhookRequest,
    ) -> Result<WebhookResponse, IntegrationError> {
        Err(IntegrationError::NotConfigured("webhook".to_string()))
    }
}

impl AiAdapter for Unconfigured {
    async fn complete(
        &self,
        _request: AiRequest,
    ) -> Result<AiResponse, IntegrationError> {
        Err(IntegrationError::NotConfigured("ai".to_string()))
    }
}

impl ActionDispatcher for Unconfigured {
    async fn dispatch(&self, request: ActionRequest) {
        tracing::debug!(action = %request.action, "no action dispatcher configured, dropping action");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_marker_shape() {
        let err = IntegrationError::Timeout { timeout_ms: 1500 };
        assert_eq!(
            err.failure_marker(),
            json!({
                "ok": false,
                "error": "timeout",
                "message": "call timed out after 1500 ms"
            })
        );
        assert_eq!(
            IntegrationError::NotConfigured("ai".into()).kind(),
            "not_configured"
        );
    }

    #[test]
    fn test_success_variable_shape() {
        let response = WebhookResponse {
            status: 201,
            body: json!({ "id": 7 }),
        };
        assert_eq!(
            response.to_variable(),
            json!({ "ok": true, "status": 201, "body": { "id": 7 } })
        );

        let rejected = WebhookResponse {
            status: 422,
            body: json!("bad phone"),
        };
        assert_eq!(rejected.to_variable()["ok"], json!(false));
    }

    #[tokio::test]
    async fn test_unconfigured_adapters() {
        let request = WebhookRequest {
            url: "https://example.test".into(),
            method: "GET".into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 100,
        };
        let err = Unconfigured.call(request).await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");

        let shared = Arc::new(Unconfigured);
        let err = shared
            .complete(AiRequest {
                system_prompt: String::new(),
                user_prompt: "hi".into(),
                model: None,
                temperature: None,
                max_tokens: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, IntegrationError::NotConfigured("ai".into()));

        Unconfigured
            .dispatch(ActionRequest {
                action: "noop".into(),
                payload: Value::Null,
            })
            .await;
    }
}
