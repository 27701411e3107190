//! Credit ledger models.
//!
//! Every balance mutation writes one row to `credit_transactions` in the same database
//! transaction as the balance update, so the ledger always explains the current balance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Kind of balance mutation recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Credits spent on an invocation
    Debit,
    /// Credits bought through the payment processor
    TopUp,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "debit",
            TransactionKind::TopUp => "top_up",
        }
    }
}

/// Represents a ledger record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CreditTransaction {
    pub id: Uuid,

    pub user_id: Uuid,

    /// "debit" or "top_up"
    pub transaction_type: String,

    /// Always positive; direction comes from `transaction_type`
    pub amount: i64,

    /// Balance immediately after this mutation
    pub balance_after: i64,

    /// Model the credits were spent on (debits only)
    pub model_name: Option<String>,

    /// Deployment whose key admitted the invocation (debits only)
    pub deployment_id: Option<Uuid>,

    /// External reference for top-ups, e.g. the checkout session id
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A debit to apply atomically: only succeeds when `credits >= amount`.
#[derive(Debug, Clone)]
pub struct NewDebit {
    pub user_id: Uuid,
    pub amount: i64,
    pub model_name: String,
    pub deployment_id: Uuid,
}

/// A top-up keyed by an external reference so that replays credit once.
#[derive(Debug, Clone)]
pub struct NewTopUp {
    pub user_id: Uuid,
    pub amount: i64,
    pub idempotency_key: String,
}

/// Result of applying a top-up.
#[derive(Debug, Clone)]
pub enum TopUpOutcome {
    /// Balance credited, new ledger row written
    Applied(CreditTransaction),
    /// The reference was seen before; the earlier row is returned and nothing changes
    AlreadyProcessed(CreditTransaction),
    UserNotFound,
}
