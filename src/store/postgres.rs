//! PostgreSQL storage backend.
//!
//! # Atomicity Guarantees
//!
//! Balance mutations and their ledger rows are written in one PostgreSQL transaction.
//! The debit is a single conditional `UPDATE ... WHERE credits >= $1`, so the admission
//! check and the decrement cannot be interleaved by a concurrent invocation.

use async_trait::async_trait;
use uuid::Uuid;

use super::{DeploymentStore, StoreError, StoreResult, UserStore};
use crate::{
    db::DbPool,
    models::{
        credit_transaction::{
            CreditTransaction, NewDebit, NewTopUp, TopUpOutcome, TransactionKind,
        },
        deployment::{Deployment, NewDeployment, STATUS_DEPLOYED},
        user::User,
    },
};

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map Postgres `numeric_value_out_of_range` (22003) on the bigint balance to an overflow.
fn overflow_or_database(error: sqlx::Error) -> StoreError {
    let out_of_range = error
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "22003");
    if out_of_range {
        StoreError::BalanceOverflow
    } else {
        StoreError::Database(error)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, credits, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn try_debit(&self, debit: NewDebit) -> StoreResult<Option<CreditTransaction>> {
        if debit.amount <= 0 {
            return Ok(None);
        }

        let mut tx = self.pool.begin().await?;

        // Admission check and decrement in one statement; zero rows means insufficient credits
        let balance_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET credits = credits - $1,
                updated_at = NOW()
            WHERE id = $2 AND credits >= $1
            RETURNING credits
            "#,
        )
        .bind(debit.amount)
        .bind(debit.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(balance_after) = balance_after else {
            tx.rollback().await?;
            return Ok(None);
        };

        let transaction = sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions (
                user_id,
                transaction_type,
                amount,
                balance_after,
                model_name,
                deployment_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(debit.user_id)
        .bind(TransactionKind::Debit.as_str())
        .bind(debit.amount)
        .bind(balance_after)
        .bind(&debit.model_name)
        .bind(debit.deployment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(transaction))
    }

    async fn top_up(&self, top_up: NewTopUp) -> StoreResult<TopUpOutcome> {
        let mut tx = self.pool.begin().await?;

        // Serialize replays of the same reference on the user row before checking the ledger
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT credits FROM users WHERE id = $1 FOR UPDATE")
                .bind(top_up.user_id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            tx.rollback().await?;
            return Ok(TopUpOutcome::UserNotFound);
        }

        if let Some(existing) = sqlx::query_as::<_, CreditTransaction>(
            "SELECT * FROM credit_transactions WHERE idempotency_key = $1",
        )
        .bind(&top_up.idempotency_key)
        .fetch_optional(&mut *tx)
        .await?
        {
            tx.rollback().await?;
            return Ok(TopUpOutcome::AlreadyProcessed(existing));
        }

        let balance_after: i64 = sqlx::query_scalar(
            r#"
            UPDATE users
            SET credits = credits + $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING credits
            "#,
        )
        .bind(top_up.amount)
        .bind(top_up.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(overflow_or_database)?;

        let transaction = sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions (
                user_id,
                transaction_type,
                amount,
                balance_after,
                idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(top_up.user_id)
        .bind(TransactionKind::TopUp.as_str())
        .bind(top_up.amount)
        .bind(balance_after)
        .bind(&top_up.idempotency_key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TopUpOutcome::Applied(transaction))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DeploymentStore for PgStore {
    async fn insert_deployment(&self, deployment: NewDeployment) -> StoreResult<Deployment> {
        let deployment = sqlx::query_as::<_, Deployment>(
            r#"
            INSERT INTO deployments (user_id, model_name, api_key, api_url, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, model_name, api_key, api_url, status, created_at
            "#,
        )
        .bind(deployment.user_id)
        .bind(&deployment.model_name)
        .bind(&deployment.api_key)
        .bind(&deployment.api_url)
        .bind(STATUS_DEPLOYED)
        .fetch_one(&self.pool)
        .await?;

        Ok(deployment)
    }

    async fn find_deployments(
        &self,
        user_id: Uuid,
        model_name: &str,
    ) -> StoreResult<Vec<Deployment>> {
        // Served by idx_deployments_user_model
        let deployments = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, user_id, model_name, api_key, api_url, status, created_at
            FROM deployments
            WHERE user_id = $1 AND model_name = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(model_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(deployments)
    }

    async fn list_deployments(&self, user_id: Uuid) -> StoreResult<Vec<Deployment>> {
        let deployments = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, user_id, model_name, api_key, api_url, status, created_at
            FROM deployments
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(deployments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    const MODEL: &str = "meta.llama3-70b-instruct-v1:0";

    /// Insert a user with `credits` and one deployment, returning both ids.
    async fn seed(store: &PgStore, credits: i64) -> (Uuid, Uuid) {
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, credits) VALUES ($1, '', $2) RETURNING id",
        )
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .bind(credits)
        .fetch_one(&store.pool)
        .await
        .unwrap();

        let deployment = store
            .insert_deployment(NewDeployment {
                user_id,
                model_name: MODEL.to_string(),
                api_key: hex::encode(rand::random::<[u8; 32]>()),
                api_url: format!("http://localhost:3000/api/deploy/invoke/{user_id}/{MODEL}"),
            })
            .await
            .unwrap();

        (user_id, deployment.id)
    }

    fn debit(user_id: Uuid, deployment_id: Uuid, amount: i64) -> NewDebit {
        NewDebit {
            user_id,
            amount,
            model_name: MODEL.to_string(),
            deployment_id,
        }
    }

    async fn credits(store: &PgStore, user_id: Uuid) -> i64 {
        store.find_user(user_id).await.unwrap().unwrap().credits
    }

    async fn ledger_len(store: &PgStore, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_debit_of_exact_balance_reaches_zero(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user_id, deployment_id) = seed(&store, 100).await;

        let tx = store
            .try_debit(debit(user_id, deployment_id, 100))
            .await
            .unwrap()
            .expect("exact balance should be admitted");

        assert_eq!(tx.balance_after, 0);
        assert_eq!(tx.transaction_type, "debit");
        assert_eq!(tx.deployment_id, Some(deployment_id));
        assert_eq!(credits(&store, user_id).await, 0);
        assert_eq!(ledger_len(&store, user_id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_debit_one_credit_short_changes_nothing(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user_id, deployment_id) = seed(&store, 99).await;

        let result = store
            .try_debit(debit(user_id, deployment_id, 100))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(credits(&store, user_id).await, 99);
        assert_eq!(ledger_len(&store, user_id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_non_positive_debit_rejected(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user_id, deployment_id) = seed(&store, 100).await;

        for amount in [0, -100] {
            let result = store
                .try_debit(debit(user_id, deployment_id, amount))
                .await
                .unwrap();
            assert!(result.is_none());
        }

        assert_eq!(credits(&store, user_id).await, 100);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_debits_admit_exactly_one(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user_id, deployment_id) = seed(&store, 100).await;

        let first = store.try_debit(debit(user_id, deployment_id, 60));
        let second = store.try_debit(debit(user_id, deployment_id, 60));
        let (first, second) = tokio::join!(first, second);

        let admitted = [first.unwrap(), second.unwrap()]
            .iter()
            .filter(|r| r.is_some())
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(credits(&store, user_id).await, 40);
        assert_eq!(ledger_len(&store, user_id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_replayed_top_up_credits_once(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user_id, _) = seed(&store, 10).await;
        let top_up = || NewTopUp {
            user_id,
            amount: 500,
            idempotency_key: "cs_test_replay".to_string(),
        };

        let first = store.top_up(top_up()).await.unwrap();
        let replay = store.top_up(top_up()).await.unwrap();

        match (first, replay) {
            (TopUpOutcome::Applied(applied), TopUpOutcome::AlreadyProcessed(existing)) => {
                assert_eq!(existing.id, applied.id);
                assert_eq!(applied.balance_after, 510);
            }
            other => panic!("unexpected top-up outcomes: {other:?}"),
        }
        assert_eq!(credits(&store, user_id).await, 510);
        assert_eq!(ledger_len(&store, user_id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_top_up_overflow_rejected(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user_id, _) = seed(&store, 10).await;

        let result = store
            .top_up(NewTopUp {
                user_id,
                amount: i64::MAX,
                idempotency_key: "cs_test_overflow".to_string(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::BalanceOverflow)));
        assert_eq!(credits(&store, user_id).await, 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_top_up_unknown_user(pool: PgPool) {
        let store = PgStore::new(pool);

        let outcome = store
            .top_up(NewTopUp {
                user_id: Uuid::new_v4(),
                amount: 5,
                idempotency_key: "cs_test_unknown".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, TopUpOutcome::UserNotFound));
    }
}
