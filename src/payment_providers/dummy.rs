//! Dummy payment provider implementation
//!
//! Checkouts complete instantly and webhooks are accepted unsigned. Useful for testing and
//! development purposes only.
//!
//! Webhook body:
//!
//! ```json
//! { "type": "checkout.session.completed", "sessionId": "dummy_session_...", "userId": "...", "credits": 500 }
//! ```

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;
use uuid::Uuid;

use super::{CompletedCheckout, PaymentError, PaymentProvider, Result, WebhookEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct DummyProvider;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DummyWebhook {
    #[serde(rename = "type")]
    event_type: String,
    session_id: Option<String>,
    user_id: Option<Uuid>,
    credits: Option<i64>,
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        credits: i64,
        success_url: &str,
        _cancel_url: &str,
    ) -> Result<String> {
        let session_id = format!("dummy_session_{}", Uuid::new_v4());

        tracing::info!(%user_id, credits, %session_id, "dummy checkout session created");

        Ok(success_url.replace("{CHECKOUT_SESSION_ID}", &session_id))
    }

    fn parse_webhook(&self, _headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent> {
        let webhook: DummyWebhook = serde_json::from_slice(body)
            .map_err(|e| PaymentError::InvalidData(format!("Invalid webhook body: {e}")))?;

        let checkout = match (
            webhook.event_type.as_str(),
            webhook.session_id,
            webhook.user_id,
            webhook.credits,
        ) {
            ("checkout.session.completed", Some(session_id), Some(user_id), Some(credits)) => {
                if credits <= 0 {
                    return Err(PaymentError::InvalidData(
                        "credits must be positive".to_string(),
                    ));
                }
                Some(CompletedCheckout {
                    session_id,
                    user_id,
                    credits,
                })
            }
            ("checkout.session.completed", ..) => {
                return Err(PaymentError::InvalidData(
                    "completed checkout requires sessionId, userId and credits".to_string(),
                ));
            }
            _ => None,
        };

        Ok(WebhookEvent {
            event_type: webhook.event_type,
            checkout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_redirects_to_success_url() {
        let url = DummyProvider
            .create_checkout_session(
                Uuid::new_v4(),
                100,
                "http://localhost/payment/success?session_id={CHECKOUT_SESSION_ID}",
                "http://localhost/payment/cancel",
            )
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost/payment/success?session_id=dummy_session_"));
    }

    #[test]
    fn test_completed_webhook_parsed() {
        let user_id = Uuid::new_v4();
        let body = serde_json::json!({
            "type": "checkout.session.completed",
            "sessionId": "dummy_session_1",
            "userId": user_id,
            "credits": 250
        });

        let event = DummyProvider
            .parse_webhook(&HeaderMap::new(), body.to_string().as_bytes())
            .unwrap();

        assert_eq!(
            event.checkout,
            Some(CompletedCheckout {
                session_id: "dummy_session_1".to_string(),
                user_id,
                credits: 250
            })
        );
    }

    #[test]
    fn test_other_events_ignored() {
        let body = br#"{"type":"checkout.session.expired"}"#;
        let event = DummyProvider.parse_webhook(&HeaderMap::new(), body).unwrap();
        assert!(event.checkout.is_none());
    }

    #[test]
    fn test_incomplete_checkout_rejected() {
        let body = br#"{"type":"checkout.session.completed","sessionId":"s"}"#;
        let result = DummyProvider.parse_webhook(&HeaderMap::new(), body);
        assert!(matches!(result, Err(PaymentError::InvalidData(_))));
    }
}
