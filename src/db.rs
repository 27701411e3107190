//! PostgreSQL pool and schema migrations.

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

pub type DbPool = Pool<Postgres>;

/// Connect a pool of at most `max_connections` connections.
///
/// Every invocation takes a connection twice (deployment lookup, then the debit) and holds none
/// while the upstream call runs, so the pool size bounds concurrent admissions, not concurrent
/// upstream calls.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/`, embedded at compile time.
///
/// Applied versions are recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
