//! Deployment registry: issues API keys and callback URLs for (user, model) pairs.

use std::sync::Arc;

use url::Url;
use uuid::Uuid;

use crate::{
    models::deployment::{Deployment, NewDeployment},
    store::{Store, StoreResult},
};

/// Credentials handed back once a deployment exists.
#[derive(Debug, Clone)]
pub struct DeploymentCredentials {
    pub api_key: String,
    pub api_url: String,
}

/// Creates and resolves deployments.
#[derive(Clone)]
pub struct DeploymentRegistry {
    store: Arc<dyn Store>,
    api_base_url: Url,
}

impl DeploymentRegistry {
    pub fn new(store: Arc<dyn Store>, api_base_url: Url) -> Self {
        Self {
            store,
            api_base_url,
        }
    }

    /// Issue a new API key for `(user_id, model_name)` and persist the deployment.
    ///
    /// Deploying the same pair again issues an additional key; earlier keys stay valid.
    pub async fn create(
        &self,
        user_id: Uuid,
        model_name: &str,
    ) -> StoreResult<DeploymentCredentials> {
        let api_key = generate_api_key();
        let api_url = self.callback_url(user_id, model_name);

        let deployment = self
            .store
            .insert_deployment(NewDeployment {
                user_id,
                model_name: model_name.to_string(),
                api_key: api_key.clone(),
                api_url: api_url.clone(),
            })
            .await?;

        tracing::info!(
            deployment_id = %deployment.id,
            user_id = %user_id,
            model = model_name,
            "deployment created"
        );

        Ok(DeploymentCredentials { api_key, api_url })
    }

    /// Most recent deployment of the pair, if any.
    pub async fn find_by_user_and_model(
        &self,
        user_id: Uuid,
        model_name: &str,
    ) -> StoreResult<Option<Deployment>> {
        Ok(self
            .store
            .find_deployments(user_id, model_name)
            .await?
            .into_iter()
            .next())
    }

    /// Every deployment of the pair, newest first. Each one carries a valid key.
    pub async fn candidates(
        &self,
        user_id: Uuid,
        model_name: &str,
    ) -> StoreResult<Vec<Deployment>> {
        self.store.find_deployments(user_id, model_name).await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Deployment>> {
        self.store.list_deployments(user_id).await
    }

    /// `{API_BASE_URL}/api/deploy/invoke/{user_id}/{model_name}`
    pub fn callback_url(&self, user_id: Uuid, model_name: &str) -> String {
        let user_segment = user_id.to_string();
        let mut url = self.api_base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "api",
                "deploy",
                "invoke",
                user_segment.as_str(),
                model_name,
            ]);
        }
        url.to_string()
    }
}

/// 256 random bits rendered as 64 hex characters.
fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}
