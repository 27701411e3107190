//! User data model.
//!
//! Users are created by the auth service. This service reads identity and owns exactly one mutation:
//! the credit balance (debited by invocations, topped up by completed checkouts).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. `credits` is guarded by a `CHECK (credits >= 0)` constraint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub email: String,

    /// Owned by the auth service, never read here
    pub password_hash: String,

    /// Prepaid balance, 1 credit = 1 US-cent
    pub credits: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Response body for `GET /api/payment/balance`.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub credits: i64,
}

impl From<User> for BalanceResponse {
    fn from(user: User) -> Self {
        Self {
            credits: user.credits,
        }
    }
}
