//! Payment provider abstraction layer
//!
//! Credits are bought through an external checkout. The provider creates the checkout session and
//! later reports completed payments through a webhook; crediting the balance happens in
//! [`crate::services::billing`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::config::{Config, PaymentKind};

pub mod dummy;
pub mod stripe;

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment processing
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

/// A paid checkout that should be credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    /// Provider session id; used as the idempotency key of the top-up
    pub session_id: String,
    pub user_id: Uuid,
    pub credits: i64,
}

/// Represents a webhook event from a payment provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Provider event type, e.g. `checkout.session.completed` or `CheckoutSessionCompleted`
    pub event_type: String,
    /// Present only for completed, paid checkouts
    pub checkout: Option<CompletedCheckout>,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a checkout session selling `credits` credits (1 credit = 1 US-cent).
    ///
    /// Returns the URL the user should be redirected to.
    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        credits: i64,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String>;

    /// Authenticate and decode a webhook delivery.
    fn parse_webhook(&self, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent>;
}

/// Create a payment provider from configuration
pub fn create_provider(config: &Config) -> anyhow::Result<Arc<dyn PaymentProvider>> {
    match config.payment_provider {
        PaymentKind::Stripe => {
            let secret_key = config.stripe_secret_key.clone().ok_or_else(|| {
                anyhow::anyhow!("STRIPE_SECRET_KEY is required for the stripe provider")
            })?;
            let webhook_secret = config.stripe_webhook_secret.clone().ok_or_else(|| {
                anyhow::anyhow!("STRIPE_WEBHOOK_SECRET is required for the stripe provider")
            })?;
            let price_id = config.stripe_price_id.clone().ok_or_else(|| {
                anyhow::anyhow!("STRIPE_PRICE_ID is required for the stripe provider")
            })?;
            Ok(Arc::new(stripe::StripeProvider::new(
                secret_key,
                price_id,
                webhook_secret,
            )))
        }
        PaymentKind::Dummy => Ok(Arc::new(dummy::DummyProvider)),
    }
}
