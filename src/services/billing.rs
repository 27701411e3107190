//! Credit purchases and top-ups.
//!
//! The payment processor is external: this service only opens checkout sessions and applies
//! completed payments to the balance, once per checkout session.

use std::sync::Arc;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        credit_transaction::{NewTopUp, TopUpOutcome},
        user::User,
    },
    payment_providers::PaymentProvider,
    store::Store,
};

/// What a webhook delivery did to the balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Credited { user_id: Uuid, credits: i64 },
    AlreadyProcessed,
    Ignored,
}

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn Store>,
    payments: Arc<dyn PaymentProvider>,
    api_base_url: String,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn Store>,
        payments: Arc<dyn PaymentProvider>,
        api_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            payments,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Open a checkout for `credits` credits and return the redirect URL.
    pub async fn buy(&self, user_id: Uuid, credits: i64) -> Result<String, AppError> {
        if credits <= 0 {
            return Err(AppError::InvalidRequest(
                "Invalid credit quantity".to_string(),
            ));
        }

        let success_url = format!(
            "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.api_base_url
        );
        let cancel_url = format!("{}/payment/cancel", self.api_base_url);

        let url = self
            .payments
            .create_checkout_session(user_id, credits, &success_url, &cancel_url)
            .await?;

        tracing::info!(%user_id, credits, "checkout session created");

        Ok(url)
    }

    /// Apply a payment processor webhook delivery.
    pub async fn handle_webhook(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<WebhookOutcome, AppError> {
        let event = self.payments.parse_webhook(headers, body)?;

        let Some(checkout) = event.checkout else {
            tracing::debug!(event_type = %event.event_type, "webhook event ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        let outcome = self
            .store
            .top_up(NewTopUp {
                user_id: checkout.user_id,
                amount: checkout.credits,
                idempotency_key: checkout.session_id.clone(),
            })
            .await?;

        match outcome {
            TopUpOutcome::Applied(transaction) => {
                tracing::info!(
                    user_id = %checkout.user_id,
                    credits = checkout.credits,
                    balance_after = transaction.balance_after,
                    "credits topped up"
                );
                Ok(WebhookOutcome::Credited {
                    user_id: checkout.user_id,
                    credits: checkout.credits,
                })
            }
            TopUpOutcome::AlreadyProcessed(_) => {
                tracing::info!(session_id = %checkout.session_id, "checkout already credited");
                Ok(WebhookOutcome::AlreadyProcessed)
            }
            TopUpOutcome::UserNotFound => {
                tracing::warn!(user_id = %checkout.user_id, "paid checkout for unknown user");
                Err(AppError::UserNotFound)
            }
        }
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<User, AppError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}
