//! Application state and HTTP router.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use url::Url;

use crate::{
    handlers, middleware,
    payment_providers::PaymentProvider,
    services::{
        billing::BillingService, gateway::Gateway, pricing::PricingTable,
        registry::DeploymentRegistry, session::SessionAuthenticator,
    },
    store::Store,
    upstream::UpstreamProvider,
};

/// Shared state handed to every handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: DeploymentRegistry,
    pub gateway: Gateway,
    pub billing: BillingService,
    pub sessions: SessionAuthenticator,
}

impl AppState {
    /// Wire the services on top of the given store and providers.
    pub fn new(
        store: Arc<dyn Store>,
        upstream: Arc<dyn UpstreamProvider>,
        payments: Arc<dyn PaymentProvider>,
        api_base_url: Url,
        jwt_secret: &str,
    ) -> Self {
        let registry = DeploymentRegistry::new(store.clone(), api_base_url.clone());
        let gateway = Gateway::new(
            registry.clone(),
            store.clone(),
            upstream,
            PricingTable::default(),
        );
        let billing = BillingService::new(store.clone(), payments, api_base_url.as_str());

        Self {
            store,
            registry,
            gateway,
            billing,
            sessions: SessionAuthenticator::new(jwt_secret),
        }
    }
}

/// Build the full router: public routes, session-authenticated routes and shared layers.
pub fn create_router(state: AppState) -> Router {
    // Dashboard routes, authenticated with a session token
    let session_routes = Router::new()
        .route("/api/deploy", post(handlers::deployments::deploy_model))
        .route(
            "/api/deploy/models",
            get(handlers::deployments::list_deployed_models),
        )
        .route("/api/payment/buy", post(handlers::payments::buy_credits))
        .route("/api/payment/balance", get(handlers::payments::get_balance))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/deploy/options",
            get(handlers::deployments::deployment_options),
        )
        // Authenticated by the x-api-key header inside the handler
        .route(
            "/api/deploy/invoke/{user_id}/{model_name}",
            post(handlers::deployments::invoke_model),
        )
        // Authenticated by the payment processor's signature
        .route(
            "/api/payment/webhook",
            post(handlers::payments::payment_webhook),
        )
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
