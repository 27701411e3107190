//! Persistence for users, credit balances and deployments.
//!
//! Services depend on the [`Store`] trait object rather than a concrete pool so that the
//! Postgres implementation can be swapped for the in-memory one in tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    credit_transaction::{CreditTransaction, NewDebit, NewTopUp, TopUpOutcome},
    deployment::{Deployment, NewDeployment},
    user::User,
};

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A top-up would take the balance past `i64::MAX`.
    #[error("Credit balance overflow")]
    BalanceOverflow,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User identity and credit balance.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    /// Conditionally decrement the balance by `debit.amount`.
    ///
    /// The check and the decrement are one atomic operation: concurrent debits for the same user
    /// can never take the balance below zero. Returns `None` when the balance is insufficient
    /// (or the user no longer exists, or `amount` is not positive), in which case nothing is
    /// mutated.
    async fn try_debit(&self, debit: NewDebit) -> StoreResult<Option<CreditTransaction>>;

    /// Credit the balance once per `idempotency_key`.
    ///
    /// Fails with [`StoreError::BalanceOverflow`] instead of wrapping.
    async fn top_up(&self, top_up: NewTopUp) -> StoreResult<TopUpOutcome>;

    /// Connectivity check for health probes.
    async fn ping(&self) -> StoreResult<()>;
}

/// Deployment registry persistence.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn insert_deployment(&self, deployment: NewDeployment) -> StoreResult<Deployment>;

    /// All deployments of one (user, model) pair, newest first.
    async fn find_deployments(&self, user_id: Uuid, model_name: &str)
    -> StoreResult<Vec<Deployment>>;

    /// All deployments of a user, oldest first.
    async fn list_deployments(&self, user_id: Uuid) -> StoreResult<Vec<Deployment>>;
}

/// Everything the application needs from storage.
pub trait Store: UserStore + DeploymentStore {}

impl<T: UserStore + DeploymentStore> Store for T {}
