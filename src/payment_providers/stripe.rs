//! Stripe payment provider implementation
//!
//! Credits are sold as a Stripe Price of 1 US-cent, so a checkout for `n` credits is one line
//! item with quantity `n` and the paid `amount_total` equals the credit count. The buying user
//! travels as the session's `client_reference_id`.

use async_trait::async_trait;
use axum::http::HeaderMap;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CheckoutSessionPaymentStatus, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, EventObject, EventType, Webhook,
};
use uuid::Uuid;

use super::{CompletedCheckout, PaymentError, PaymentProvider, Result, WebhookEvent};

/// Stripe payment provider
pub struct StripeProvider {
    client: Client,
    price_id: String,
    webhook_secret: String,
}

impl StripeProvider {
    pub fn new(api_key: String, price_id: String, webhook_secret: String) -> Self {
        Self {
            client: Client::new(api_key),
            price_id,
            webhook_secret,
        }
    }

    /// Provider talking to a non-default API host (stripe-mock, test servers).
    pub fn with_api_base(
        api_base: &str,
        api_key: String,
        price_id: String,
        webhook_secret: String,
    ) -> Self {
        Self {
            client: Client::from_url(api_base, api_key),
            price_id,
            webhook_secret,
        }
    }
}

/// Credit a paid checkout session, if it carries our user reference.
fn completed_checkout(session: &CheckoutSession) -> Result<Option<CompletedCheckout>> {
    if session.payment_status != CheckoutSessionPaymentStatus::Paid {
        tracing::debug!(session_id = %session.id, "checkout session not paid yet");
        return Ok(None);
    }

    let user_id = session
        .client_reference_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| {
            PaymentError::InvalidData("client_reference_id missing or invalid".to_string())
        })?;

    let credits = session
        .amount_total
        .filter(|amount| *amount > 0)
        .ok_or_else(|| PaymentError::InvalidData("amount_total missing".to_string()))?;

    Ok(Some(CompletedCheckout {
        session_id: session.id.to_string(),
        user_id,
        credits,
    }))
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        credits: i64,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String> {
        let quantity = u64::try_from(credits)
            .map_err(|_| PaymentError::InvalidData("credits must be positive".to_string()))?;
        let client_reference_id = user_id.to_string();

        let params = CreateCheckoutSession {
            cancel_url: Some(cancel_url),
            success_url: Some(success_url),
            client_reference_id: Some(client_reference_id.as_str()),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(self.price_id.clone()),
                quantity: Some(quantity),
                ..Default::default()
            }]),
            mode: Some(CheckoutSessionMode::Payment),
            ..Default::default()
        };

        let checkout_session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to create Stripe checkout session");
                PaymentError::ProviderApi(e.to_string())
            })?;

        tracing::info!(
            %user_id,
            credits,
            session_id = %checkout_session.id,
            "created Stripe checkout session"
        );

        checkout_session
            .url
            .ok_or_else(|| PaymentError::ProviderApi("Checkout session missing URL".to_string()))
    }

    fn parse_webhook(&self, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent> {
        let signature = headers
            .get("stripe-signature")
            .and_then(|h| h.to_str().ok())
            .ok_or(PaymentError::InvalidSignature)?;
        let payload = std::str::from_utf8(body)
            .map_err(|_| PaymentError::InvalidData("webhook body is not UTF-8".to_string()))?;

        // Checks the v1 HMAC, the timestamp tolerance, then decodes the event
        let event = Webhook::construct_event(payload, signature, &self.webhook_secret)
            .map_err(|e| {
                tracing::warn!(error = ?e, "Stripe webhook rejected");
                PaymentError::InvalidSignature
            })?;

        let checkout = match (&event.type_, &event.data.object) {
            (
                EventType::CheckoutSessionCompleted
                | EventType::CheckoutSessionAsyncPaymentSucceeded,
                EventObject::CheckoutSession(session),
            ) => completed_checkout(session)?,
            _ => None,
        };

        Ok(WebhookEvent {
            event_type: format!("{:?}", event.type_),
            checkout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEBHOOK_SECRET: &str = "whsec_test";

    fn sign(body: &[u8], timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(body);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn provider() -> StripeProvider {
        StripeProvider::new(
            "sk_test_fake".to_string(),
            "price_fake".to_string(),
            WEBHOOK_SECRET.to_string(),
        )
    }

    fn headers_with(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("stripe-signature", HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn test_missing_signature_header_rejected() {
        let result = provider().parse_webhook(&HeaderMap::new(), b"{}");
        assert!(matches!(result, Err(PaymentError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let headers = headers_with(&sign(br#"{"id":"evt_1"}"#, Utc::now().timestamp()));
        let result = provider().parse_webhook(&headers, br#"{"id":"evt_2"}"#);
        assert!(matches!(result, Err(PaymentError::InvalidSignature)));
    }

    #[test]
    fn test_signature_with_other_secret_rejected() {
        let body = br#"{"id":"evt_1"}"#;
        let headers = headers_with(&sign(body, Utc::now().timestamp()));
        let other = StripeProvider::new(
            "sk_test_fake".to_string(),
            "price_fake".to_string(),
            "whsec_other".to_string(),
        );

        let result = other.parse_webhook(&headers, body);
        assert!(matches!(result, Err(PaymentError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_create_checkout_session_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "type": "invalid_request_error", "message": "Invalid API Key provided" }
            })))
            .mount(&server)
            .await;

        let provider = StripeProvider::with_api_base(
            &server.uri(),
            "sk_bad".to_string(),
            "price_fake".to_string(),
            WEBHOOK_SECRET.to_string(),
        );
        let result = provider
            .create_checkout_session(Uuid::new_v4(), 250, "http://s", "http://c")
            .await;

        assert!(matches!(result, Err(PaymentError::ProviderApi(_))));
    }
}
