//! Development provider that answers with the prompt itself.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{UpstreamError, UpstreamProvider, UpstreamRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProvider;

#[async_trait]
impl UpstreamProvider for EchoProvider {
    async fn invoke(
        &self,
        model_id: &str,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        Ok(json!({
            "model": model_id,
            "generation": request.prompt,
            "stop_reason": "stop",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_prompt() {
        let request = UpstreamRequest {
            prompt: "hello".to_string(),
            max_tokens: None,
            temperature: None,
        };
        let output = EchoProvider.invoke("model-x", &request).await.unwrap();
        assert_eq!(output["generation"], "hello");
        assert_eq!(output["model"], "model-x");
    }
}
