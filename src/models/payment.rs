//! Credit purchase request/response types.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/payment/buy`.
///
/// 1 credit costs 1 US-cent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyCreditsRequest {
    pub credits_to_buy: i64,
}

/// Redirect target for the external checkout page.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Acknowledgement returned to the payment processor's webhook delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,

    /// Credits added by this delivery (0 for ignored events and replays)
    pub credited: i64,
}
