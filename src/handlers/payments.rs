//! Credit purchase HTTP handlers.
//!
//! - POST /api/payment/buy - Open a checkout session (session auth)
//! - GET /api/payment/balance - Current credit balance (session auth)
//! - POST /api/payment/webhook - Payment processor callback (signature auth)

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        payment::{BuyCreditsRequest, CheckoutResponse, WebhookAck},
        user::BalanceResponse,
    },
    services::billing::WebhookOutcome,
};

/// Start a credit purchase.
///
/// # Request Body
///
/// ```json
/// { "creditsToBuy": 500 }
/// ```
///
/// # Response (200)
///
/// ```json
/// { "url": "https://checkout.stripe.com/c/pay/cs_..." }
/// ```
pub async fn buy_credits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<BuyCreditsRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let Json(request) = payload?;

    let url = state
        .billing
        .buy(auth.user_id, request.credits_to_buy)
        .await?;

    Ok(Json(CheckoutResponse { url }))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BalanceResponse>, AppError> {
    let user = state.billing.balance(auth.user_id).await?;

    Ok(Json(user.into()))
}

/// Receive a payment processor webhook.
///
/// The raw body is needed for signature verification, so it is not extracted as JSON.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let outcome = state.billing.handle_webhook(&headers, &body).await?;

    let credited = match outcome {
        WebhookOutcome::Credited { credits, .. } => credits,
        WebhookOutcome::AlreadyProcessed | WebhookOutcome::Ignored => 0,
    };

    Ok(Json(WebhookAck {
        received: true,
        credited,
    }))
}
