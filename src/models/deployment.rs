//! Deployment data models and API request/response types.
//!
//! This module defines:
//! - `Deployment`: Database entity binding a (user, model) pair to an API key
//! - `DeployRequest` / `DeployResponse`: body types for `POST /api/deploy`
//! - `DeploymentResponse`: list entry returned by `GET /api/deploy/models`
//! - `DeploymentOptions`: static catalogue returned by `GET /api/deploy/options`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status written for every new deployment.
pub const STATUS_DEPLOYED: &str = "deployed";

/// Represents a deployment record from the database.
///
/// # Database Table
///
/// Maps to the `deployments` table. Rows are never updated except for `status`, and there is no
/// uniqueness constraint on `(user_id, model_name)`: deploying the same model twice issues a
/// second, independently valid API key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Deployment {
    pub id: Uuid,

    pub user_id: Uuid,

    /// Upstream model identifier, e.g. `meta.llama3-70b-instruct-v1:0`
    pub model_name: String,

    /// 64 hex characters (256 random bits)
    pub api_key: String,

    /// Callback URL clients invoke with the API key
    pub api_url: String,

    pub status: String,

    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new deployment.
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub user_id: Uuid,
    pub model_name: String,
    pub api_key: String,
    pub api_url: String,
}

/// Request body for deploying a model.
///
/// # JSON Example
///
/// ```json
/// { "modelName": "meta.llama3-70b-instruct-v1:0" }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub model_name: String,
}

/// Credentials returned once a deployment is created.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub message: String,
    pub api_key: String,
    pub api_url: String,
}

/// One entry of the dashboard's deployment list.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "modelName": "meta.llama3-70b-instruct-v1:0",
///   "apiKey": "9f86d081884c7d65...",
///   "apiUrl": "https://api.example.com/api/deploy/invoke/<user>/meta.llama3-70b-instruct-v1:0",
///   "status": "deployed",
///   "deployedAt": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub id: String,
    pub model_name: String,
    pub api_key: String,
    pub api_url: String,
    pub status: String,
    pub deployed_at: DateTime<Utc>,
}

impl From<Deployment> for DeploymentResponse {
    fn from(deployment: Deployment) -> Self {
        Self {
            id: deployment.id.to_string(),
            model_name: deployment.model_name,
            api_key: deployment.api_key,
            api_url: deployment.api_url,
            status: deployment.status,
            deployed_at: deployment.created_at,
        }
    }
}

/// Static deployment catalogue.
#[derive(Debug, Serialize)]
pub struct DeploymentOptions {
    pub models: Vec<&'static str>,
    pub regions: Vec<&'static str>,
}
