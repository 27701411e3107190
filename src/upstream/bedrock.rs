//! AWS Bedrock runtime provider.
//!
//! Calls `POST {endpoint}/model/{model_id}/invoke` authenticated with a Bedrock API key
//! (`Authorization: Bearer ...`). The request body depends on the model family:
//!
//! - `anthropic.*`: Messages API body; `max_tokens` is mandatory there, so the priced
//!   default is sent when the client omitted it
//! - everything else: prompt body with optional `max_gen_len` / `temperature`

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{UpstreamError, UpstreamProvider, UpstreamRequest};
use crate::services::pricing::DEFAULT_MAX_TOKENS;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Bedrock runtime client.
#[derive(Debug, Clone)]
pub struct BedrockProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl BedrockProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn invoke_url(&self, model_id: &str) -> String {
        // Model ids contain ':' which must be escaped inside a path segment
        let encoded: String = url::form_urlencoded::byte_serialize(model_id.as_bytes()).collect();
        format!("{}/model/{}/invoke", self.endpoint, encoded)
    }
}

/// Shape the request body for the model family.
pub fn request_body(model_id: &str, request: &UpstreamRequest) -> Value {
    if model_id.starts_with("anthropic.") {
        let mut body = json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        return body;
    }

    let mut body = Map::new();
    body.insert("prompt".to_string(), json!(request.prompt));
    if let Some(max_tokens) = request.max_tokens {
        body.insert("max_gen_len".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = request.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    Value::Object(body)
}

#[async_trait]
impl UpstreamProvider for BedrockProvider {
    async fn invoke(
        &self,
        model_id: &str,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .post(self.invoke_url(model_id))
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&request_body(model_id, request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
