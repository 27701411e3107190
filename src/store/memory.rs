//! In-memory storage backend.
//!
//! Used by tests and local development. All state sits behind one `RwLock`; a debit takes the
//! write lock for its check and decrement, which gives the same atomicity as the conditional
//! `UPDATE` in the Postgres backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeploymentStore, StoreError, StoreResult, UserStore};
use crate::models::{
    credit_transaction::{CreditTransaction, NewDebit, NewTopUp, TopUpOutcome, TransactionKind},
    deployment::{Deployment, NewDeployment, STATUS_DEPLOYED},
    user::User,
};

#[derive(Debug, Default)]
struct MemoryData {
    users: HashMap<Uuid, User>,
    deployments: Vec<Deployment>,
    /// Deployment positions keyed by (user, model)
    deployment_index: HashMap<(Uuid, String), Vec<usize>>,
    ledger: Vec<CreditTransaction>,
}

/// Store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user the way the auth service would, returning its id.
    pub async fn insert_user(&self, email: &str, credits: i64) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            credits,
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        self.data.write().await.users.insert(id, user);
        id
    }

    /// Ledger rows of one user, oldest first.
    pub async fn transactions_for(&self, user_id: Uuid) -> Vec<CreditTransaction> {
        self.data
            .read()
            .await
            .ledger
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.data.read().await.users.get(&user_id).cloned())
    }

    async fn try_debit(&self, debit: NewDebit) -> StoreResult<Option<CreditTransaction>> {
        let mut data = self.data.write().await;

        let Some(user) = data.users.get_mut(&debit.user_id) else {
            return Ok(None);
        };
        if debit.amount <= 0 || user.credits < debit.amount {
            return Ok(None);
        }

        user.credits -= debit.amount;
        user.updated_at = Utc::now();

        let transaction = CreditTransaction {
            id: Uuid::new_v4(),
            user_id: debit.user_id,
            transaction_type: TransactionKind::Debit.as_str().to_string(),
            amount: debit.amount,
            balance_after: user.credits,
            model_name: Some(debit.model_name),
            deployment_id: Some(debit.deployment_id),
            idempotency_key: None,
            created_at: Utc::now(),
        };
        data.ledger.push(transaction.clone());

        Ok(Some(transaction))
    }

    async fn top_up(&self, top_up: NewTopUp) -> StoreResult<TopUpOutcome> {
        let mut data = self.data.write().await;

        if !data.users.contains_key(&top_up.user_id) {
            return Ok(TopUpOutcome::UserNotFound);
        }

        if let Some(existing) = data
            .ledger
            .iter()
            .find(|t| t.idempotency_key.as_deref() == Some(top_up.idempotency_key.as_str()))
        {
            return Ok(TopUpOutcome::AlreadyProcessed(existing.clone()));
        }

        let Some(user) = data.users.get_mut(&top_up.user_id) else {
            return Ok(TopUpOutcome::UserNotFound);
        };
        user.credits = user
            .credits
            .checked_add(top_up.amount)
            .ok_or(StoreError::BalanceOverflow)?;
        user.updated_at = Utc::now();

        let transaction = CreditTransaction {
            id: Uuid::new_v4(),
            user_id: top_up.user_id,
            transaction_type: TransactionKind::TopUp.as_str().to_string(),
            amount: top_up.amount,
            balance_after: user.credits,
            model_name: None,
            deployment_id: None,
            idempotency_key: Some(top_up.idempotency_key),
            created_at: Utc::now(),
        };
        data.ledger.push(transaction.clone());

        Ok(TopUpOutcome::Applied(transaction))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn insert_deployment(&self, deployment: NewDeployment) -> StoreResult<Deployment> {
        let mut data = self.data.write().await;

        let record = Deployment {
            id: Uuid::new_v4(),
            user_id: deployment.user_id,
            model_name: deployment.model_name,
            api_key: deployment.api_key,
            api_url: deployment.api_url,
            status: STATUS_DEPLOYED.to_string(),
            created_at: Utc::now(),
        };

        let position = data.deployments.len();
        data.deployments.push(record.clone());
        data.deployment_index
            .entry((record.user_id, record.model_name.clone()))
            .or_default()
            .push(position);

        Ok(record)
    }

    async fn find_deployments(
        &self,
        user_id: Uuid,
        model_name: &str,
    ) -> StoreResult<Vec<Deployment>> {
        let data = self.data.read().await;

        let found: Vec<Deployment> = data
            .deployment_index
            .get(&(user_id, model_name.to_string()))
            .map(|positions| {
                positions
                    .iter()
                    .rev()
                    .map(|&i| data.deployments[i].clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(found)
    }

    async fn list_deployments(&self, user_id: Uuid) -> StoreResult<Vec<Deployment>> {
        let data = self.data.read().await;

        Ok(data
            .deployments
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn debit(user_id: Uuid, amount: i64) -> NewDebit {
        NewDebit {
            user_id,
            amount,
            model_name: "meta.llama3-70b-instruct-v1:0".to_string(),
            deployment_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_debit_decrements_and_records_ledger() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 100).await;

        let tx = store.try_debit(debit(user_id, 40)).await.unwrap().unwrap();
        assert_eq!(tx.balance_after, 60);
        assert_eq!(tx.transaction_type, "debit");

        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.credits, 60);
        assert_eq!(store.transactions_for(user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_debit_rejected_without_mutation() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 99).await;

        assert!(store.try_debit(debit(user_id, 100)).await.unwrap().is_none());

        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.credits, 99);
        assert!(store.transactions_for(user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_debit_rejected() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 100).await;

        assert!(store.try_debit(debit(user_id, 0)).await.unwrap().is_none());
        assert!(store.try_debit(debit(user_id, -5)).await.unwrap().is_none());
        assert_eq!(store.find_user(user_id).await.unwrap().unwrap().credits, 100);
    }

    #[tokio::test]
    async fn test_top_up_overflow_rejected() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 10).await;

        let result = store
            .top_up(NewTopUp {
                user_id,
                amount: i64::MAX,
                idempotency_key: "cs_overflow".to_string(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::BalanceOverflow)));
        assert_eq!(store.find_user(user_id).await.unwrap().unwrap().credits, 10);
        assert!(store.transactions_for(user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_debit_exact_balance_reaches_zero() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 100).await;

        let tx = store.try_debit(debit(user_id, 100)).await.unwrap().unwrap();
        assert_eq!(tx.balance_after, 0);
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overspend() {
        let store = Arc::new(MemoryStore::new());
        let user_id = store.insert_user("a@example.com", 100).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_debit(debit(user_id, 30)).await.unwrap().is_some()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 3);
        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.credits, 10);
    }

    #[tokio::test]
    async fn test_top_up_is_idempotent() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 0).await;
        let top_up = NewTopUp {
            user_id,
            amount: 500,
            idempotency_key: "cs_test_123".to_string(),
        };

        assert!(matches!(
            store.top_up(top_up.clone()).await.unwrap(),
            TopUpOutcome::Applied(_)
        ));
        assert!(matches!(
            store.top_up(top_up).await.unwrap(),
            TopUpOutcome::AlreadyProcessed(_)
        ));

        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.credits, 500);
    }

    #[tokio::test]
    async fn test_top_up_unknown_user() {
        let store = MemoryStore::new();
        let outcome = store
            .top_up(NewTopUp {
                user_id: Uuid::new_v4(),
                amount: 10,
                idempotency_key: "cs_missing".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, TopUpOutcome::UserNotFound));
    }

    #[tokio::test]
    async fn test_find_deployments_newest_first() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("a@example.com", 0).await;

        for key in ["first", "second"] {
            store
                .insert_deployment(NewDeployment {
                    user_id,
                    model_name: "model-x".to_string(),
                    api_key: key.to_string(),
                    api_url: "http://localhost".to_string(),
                })
                .await
                .unwrap();
        }

        let found = store.find_deployments(user_id, "model-x").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].api_key, "second");
        assert!(store.find_deployments(user_id, "model-y").await.unwrap().is_empty());
    }
}
