//! Invocation request/response types for `POST /api/deploy/invoke/{user_id}/{model_name}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body sent by API-key clients.
///
/// # JSON Example
///
/// ```json
/// { "input": "Write a haiku about Rust", "maxTokens": 120, "temperature": 0.7 }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub input: String,

    /// Tokens to generate; priced as 50 when omitted
    pub max_tokens: Option<i64>,

    pub temperature: Option<f64>,
}

/// Successful invocation: the provider's decoded output, untouched.
#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub output: Value,
}
