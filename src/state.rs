use deadpool_sqlite::Pool;
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::payments::PaymentProvider;

pub struct AppState {
    pub pool: Pool,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentProvider>,
}

impl AppState {
    /// Run `f` on a pooled connection. The connection is acquired for this
    /// call only and goes back to the pool when the closure returns,
    /// whichever way it exits.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("connection pool: {e}")))?;
        conn.interact(move |conn| {
            // Without a timeout SQLite reports SQLITE_BUSY immediately when
            // another writer holds the lock; wait for it instead.
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            f(conn)
        })
        .await
        .map_err(|e| AppError::Storage(anyhow::anyhow!("database task: {e}")))?
    }
}
