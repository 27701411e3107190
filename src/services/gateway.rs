//! Metered invocation gateway - core business logic for API-key invocations.
//!
//! # Process
//!
//! Each step can end the invocation with a rejection:
//!
//! 1. Resolve the deployments of (user, model)
//! 2. Compare the presented API key in constant time
//! 3. Load the user
//! 4. Price the request (`maxTokens` or 50, times the model's credits per token)
//! 5. + 6. Admission check and debit, as one conditional decrement in the store
//! 7. Forward to the upstream provider
//! 8. Return its output verbatim
//!
//! # Atomicity Guarantees
//!
//! The balance is never read-then-written: the store's conditional decrement is the admission
//! check. The debit commits before the upstream call, so no lock is held while the provider runs
//! and an upstream failure does NOT refund the debit.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    models::{credit_transaction::NewDebit, deployment::Deployment},
    services::{pricing::PricingTable, registry::DeploymentRegistry},
    store::{Store, StoreError},
    upstream::{UpstreamError, UpstreamProvider, UpstreamRequest},
};

/// One inbound invocation, as received on the callback URL.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub user_id: Uuid,
    pub model_name: String,
    /// Value of the `x-api-key` header
    pub api_key: String,
    pub prompt: String,
    pub max_tokens: Option<i64>,
    pub temperature: Option<f64>,
}

/// An admitted and completed invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub output: Value,
    pub cost: i64,
    pub balance_after: i64,
}

/// Why an invocation was rejected.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("maxTokens must be a positive integer")]
    InvalidMaxTokens,

    #[error("No deployment for this user and model")]
    UnknownDeployment,

    #[error("API key does not match the deployment")]
    InvalidApiKey,

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },

    /// Raised after the debit committed; the credits are not returned.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authenticates, prices, debits and proxies invocations.
#[derive(Clone)]
pub struct Gateway {
    registry: DeploymentRegistry,
    store: Arc<dyn Store>,
    upstream: Arc<dyn UpstreamProvider>,
    pricing: PricingTable,
}

impl Gateway {
    pub fn new(
        registry: DeploymentRegistry,
        store: Arc<dyn Store>,
        upstream: Arc<dyn UpstreamProvider>,
        pricing: PricingTable,
    ) -> Self {
        Self {
            registry,
            store,
            upstream,
            pricing,
        }
    }

    /// Run one invocation through authentication, admission, debit and the upstream call.
    pub async fn invoke(&self, request: InvocationRequest) -> Result<Invocation, GatewayError> {
        if matches!(request.max_tokens, Some(n) if n <= 0) {
            return Err(GatewayError::InvalidMaxTokens);
        }

        // Step 1: resolve deployment
        let candidates = self
            .registry
            .candidates(request.user_id, &request.model_name)
            .await?;
        if candidates.is_empty() {
            return Err(GatewayError::UnknownDeployment);
        }

        // Step 2: authenticate
        let deployment =
            match_api_key(&candidates, &request.api_key).ok_or(GatewayError::InvalidApiKey)?;

        // Step 3: resolve user balance
        let user = self
            .store
            .find_user(request.user_id)
            .await?
            .ok_or(GatewayError::UserNotFound)?;

        // Step 4: price
        let cost = self
            .pricing
            .total_cost(&request.model_name, request.max_tokens);

        // Steps 5 + 6: admission check and debit as one conditional decrement
        let debit = self
            .store
            .try_debit(NewDebit {
                user_id: user.id,
                amount: cost,
                model_name: request.model_name.clone(),
                deployment_id: deployment.id,
            })
            .await?;

        let Some(debit) = debit else {
            tracing::info!(
                user_id = %user.id,
                model = %request.model_name,
                cost,
                "invocation rejected: insufficient credits"
            );
            return Err(GatewayError::InsufficientCredits {
                required: cost,
                available: user.credits,
            });
        };

        tracing::info!(
            user_id = %user.id,
            model = %request.model_name,
            cost,
            balance_after = debit.balance_after,
            "invocation admitted"
        );

        // Step 7: upstream call, no balance lock held
        let upstream_request = UpstreamRequest {
            prompt: request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let output = self
            .upstream
            .invoke(&request.model_name, &upstream_request)
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %user.id,
                    model = %request.model_name,
                    cost,
                    error = %e,
                    "upstream call failed after debit"
                );
                GatewayError::from(e)
            })?;

        // Step 8
        Ok(Invocation {
            output,
            cost,
            balance_after: debit.balance_after,
        })
    }
}

/// Find the deployment whose key equals `presented`, comparing in constant time.
///
/// Both sides are hashed first so the comparison length is fixed, and every candidate is
/// compared even after a match.
fn match_api_key<'a>(candidates: &'a [Deployment], presented: &str) -> Option<&'a Deployment> {
    let presented = Sha256::digest(presented.as_bytes());

    let mut matched = None;
    for deployment in candidates {
        let stored = Sha256::digest(deployment.api_key.as_bytes());
        if constant_time_eq(&stored, &presented) && matched.is_none() {
            matched = Some(deployment);
        }
    }
    matched
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
