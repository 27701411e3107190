//! Upstream model-inference providers.
//!
//! The gateway only sees the [`UpstreamProvider`] trait; which backend answers is decided once at
//! startup by [`create_provider`].

pub mod bedrock;
pub mod echo;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{Config, UpstreamKind};

/// Inference parameters forwarded to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub prompt: String,

    /// Only what the client sent; the priced default is not forwarded
    pub max_tokens: Option<i64>,

    pub temperature: Option<f64>,
}

/// Errors surfaced by an upstream call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream response could not be decoded: {0}")]
    Decode(String),
}

/// A black-box inference service keyed by model identifier.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Run one inference, returning the provider's decoded JSON output.
    async fn invoke(&self, model_id: &str, request: &UpstreamRequest)
    -> Result<Value, UpstreamError>;
}

/// Build the provider selected by configuration.
pub fn create_provider(config: &Config) -> anyhow::Result<Arc<dyn UpstreamProvider>> {
    match config.upstream_provider {
        UpstreamKind::Bedrock => {
            let api_key = config
                .bedrock_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("BEDROCK_API_KEY is required for the bedrock provider"))?;
            let provider = bedrock::BedrockProvider::new(
                config.bedrock_endpoint(),
                api_key,
                Duration::from_secs(config.upstream_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        UpstreamKind::Echo => Ok(Arc::new(echo::EchoProvider)),
    }
}
