//! reqwest-backed [`WebhookAdapter`].

use convoflow_core::{IntegrationError, WebhookAdapter, WebhookRequest, WebhookResponse};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// HTTP webhook 适配器
#[derive(Debug, Clone, Default)]
pub struct ReqwestWebhookAdapter {
    client: reqwest::Client,
}

impl ReqwestWebhookAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl WebhookAdapter for ReqwestWebhookAdapter {
    async fn call(
        &self,
        request: WebhookRequest,
    ) -> Result<WebhookResponse, IntegrationError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            IntegrationError::Transport(format!("invalid method {}: {}", request.method, e))
        })?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(Duration::from_millis(request.timeout_ms));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let timeout_ms = request.timeout_ms;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                IntegrationError::Timeout { timeout_ms }
            } else {
                IntegrationError::Transport(e.to_string())
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(map_err)?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(status, url = %request.url, "webhook responded");
        Ok(WebhookResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_invalid_method_is_transport_error() {
        let adapter = ReqwestWebhookAdapter::new();
        let err = adapter
            .call(WebhookRequest {
                url: "http://127.0.0.1:9/".into(),
                method: "NOT A METHOD".into(),
                headers: BTreeMap::new(),
                body: None,
                timeout_ms: 100,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
