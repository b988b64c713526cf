//! Pool-backed entry point handing out query tools and transactions.

use std::sync::Arc;

use sqlfrag_core::{IsolationLevel, Log, NullLog, QueryTool, Result, within_transaction};

use crate::config::Config;
use crate::pool::{PgPool, PoolStats, PooledConnection};

/// Query tool bound to a pooled client.
pub type PgQueryTool = QueryTool<PooledConnection>;

/// Owns the connection pool and runs units of work on pooled clients.
///
/// # Example
/// ```ignore
/// let service = PostgresService::connect(&Config::load()?, None)?;
/// let names = service
///     .with_connection(async |db| db.query(&sql!("SELECT name ", as_string("name"), " FROM users")).await)
///     .await?;
/// ```
#[derive(Clone)]
pub struct PostgresService {
    pool: PgPool,
    log: Arc<dyn Log>,
    isolation: IsolationLevel,
}

impl PostgresService {
    /// Builds the pool from `config`. Connections open lazily.
    pub fn connect(config: &Config, log: Option<Arc<dyn Log>>) -> Result<Self> {
        let log = log.unwrap_or_else(|| Arc::new(NullLog));
        let pool = PgPool::new(config, Arc::clone(&log))?;
        log.info(&format!(
            "created postgres connection pool (max={})",
            config.pool.max_connections
        ));
        Ok(Self {
            pool,
            log,
            isolation: config.isolation,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Isolation level used by [`within_transaction`](Self::within_transaction).
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Runs `f` on a pooled client, releasing it afterwards whether or not
    /// `f` succeeded.
    pub async fn with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: AsyncFnOnce(&PgQueryTool) -> Result<R>,
    {
        self.log.debug(&format!(
            "acquiring postgres client from connection pool ({})",
            self.pool.stats()
        ));
        let connection = self.pool.acquire().await.inspect_err(|e| {
            self.log.error(&format!("postgres pool error: {e}"));
        })?;
        self.log.debug(&format!(
            "acquired postgres client from connection pool ({})",
            self.pool.stats()
        ));

        let tool = QueryTool::new(connection);
        let result = f(&tool).await;

        self.log.debug(&format!(
            "releasing postgres client to connection pool ({})",
            self.pool.stats()
        ));
        tool.into_inner().release();
        self.log.debug(&format!(
            "released postgres client to connection pool ({})",
            self.pool.stats()
        ));
        result
    }

    /// Runs `f` inside a transaction at the configured isolation level.
    pub async fn within_transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: AsyncFnOnce(&PgQueryTool) -> Result<R>,
    {
        self.within_transaction_with(self.isolation, f).await
    }

    pub async fn within_transaction_with<F, R>(&self, isolation: IsolationLevel, f: F) -> Result<R>
    where
        F: AsyncFnOnce(&PgQueryTool) -> Result<R>,
    {
        let log = self.log.as_ref();
        self.with_connection(async move |tool| within_transaction(tool, log, isolation, f).await)
            .await
    }

    /// Closes the pool. Clients still checked out are closed on release.
    pub fn close(&self) {
        self.log.info("closing postgres connection pool");
        self.pool.close();
    }
}
