//! Deployment HTTP handlers.
//!
//! This module implements the deployment API endpoints:
//! - POST /api/deploy - Deploy a model, issuing an API key (session auth)
//! - GET /api/deploy/models - List the caller's deployments (session auth)
//! - GET /api/deploy/options - Static catalogue of models and regions (public)
//! - POST /api/deploy/invoke/{user_id}/{model_name} - Metered invocation (API key auth)

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::HeaderMap,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        deployment::{DeployRequest, DeployResponse, DeploymentOptions, DeploymentResponse},
        invocation::{InvokeRequest, InvokeResponse},
    },
    services::{
        gateway::InvocationRequest,
        pricing::{SUPPORTED_MODELS, SUPPORTED_REGIONS, is_supported_model},
    },
};

/// Header carrying the deployment's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Deploy a model for the authenticated user.
///
/// # Request Body
///
/// ```json
/// { "modelName": "meta.llama3-70b-instruct-v1:0" }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "message": "Model deployed successfully",
///   "apiKey": "3f2a...",
///   "apiUrl": "http://localhost:3000/api/deploy/invoke/<user_id>/meta.llama3-70b-instruct-v1:0"
/// }
/// ```
///
/// - **Error (400)**: `modelName` is not one of the supported models
pub async fn deploy_model(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<DeployResponse>, AppError> {
    let Json(request) = payload?;

    if !is_supported_model(&request.model_name) {
        return Err(AppError::InvalidRequest(format!(
            "modelName must be one of: {}",
            SUPPORTED_MODELS.join(", ")
        )));
    }

    let credentials = state
        .registry
        .create(auth.user_id, &request.model_name)
        .await?;

    Ok(Json(DeployResponse {
        message: "Model deployed successfully".to_string(),
        api_key: credentials.api_key,
        api_url: credentials.api_url,
    }))
}

/// List every deployment of the authenticated user, oldest first.
pub async fn list_deployed_models(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<DeploymentResponse>>, AppError> {
    let deployments = state.registry.list_by_user(auth.user_id).await?;

    Ok(Json(deployments.into_iter().map(Into::into).collect()))
}

/// Models and regions a deployment can target.
pub async fn deployment_options() -> Json<DeploymentOptions> {
    Json(DeploymentOptions {
        models: SUPPORTED_MODELS.to_vec(),
        regions: SUPPORTED_REGIONS.to_vec(),
    })
}

/// Invoke a deployed model with its API key.
///
/// # Headers
///
/// `x-api-key: <deployment apiKey>`
///
/// # Request Body
///
/// ```json
/// { "input": "Tell me a joke", "maxTokens": 100, "temperature": 0.7 }
/// ```
///
/// # Response
///
/// - **200**: `{ "output": <provider output> }`
/// - **400**: malformed body or non-positive `maxTokens`
/// - **402**: balance does not cover `maxTokens (or 50) × credits per token`
/// - **403**: unknown deployment or wrong key
/// - **404**: user not found
/// - **500**: upstream provider failed (credits are not refunded)
pub async fn invoke_model(
    State(state): State<AppState>,
    Path((user_id, model_name)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<InvokeResponse>, AppError> {
    let Json(request) = payload?;

    if matches!(request.max_tokens, Some(n) if n <= 0) {
        return Err(AppError::InvalidRequest(
            "maxTokens must be a positive integer".to_string(),
        ));
    }

    // A path that cannot name a user cannot name a deployment either
    let user_id = Uuid::parse_str(&user_id).map_err(|_| AppError::InvalidApiKey)?;

    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let invocation = state
        .gateway
        .invoke(InvocationRequest {
            user_id,
            model_name,
            api_key,
            prompt: request.input,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })
        .await?;

    Ok(Json(InvokeResponse {
        output: invocation.output,
    }))
}
