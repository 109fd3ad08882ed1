pub mod migrations;
pub mod queries;

use anyhow::Context;
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};

/// Build the connection pool and bring the schema up to date.
///
/// Connections are handed out per request (or per transaction) and return
/// to the pool when dropped; nothing holds a database handle across
/// requests.
pub async fn init_pool(path: &str) -> anyhow::Result<Pool> {
    let mut config = Config::new(path);

    // A :memory: database is private to the connection that opened it, so a
    // pool larger than one would give each request an empty schema.
    if path == ":memory:" {
        config.pool = Some(PoolConfig::new(1));
    }

    let pool = config
        .create_pool(Runtime::Tokio1)
        .context("failed to create database pool")?;

    let conn = pool
        .get()
        .await
        .context("failed to acquire connection for migrations")?;
    conn.interact(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("failed to set database pragmas")?;
        migrations::run_migrations(conn)
    })
    .await
    .map_err(|e| anyhow::anyhow!("migration task failed: {e}"))??;

    Ok(pool)
}
