//! Bounded pool of tokio-postgres clients.
//!
//! Clients are created on demand up to `max-connections`. A released client
//! goes back to the idle list unless the pool was closed, the connection
//! died, or it is still inside a transaction. Idle clients older than
//! `idle-timeout-ms` are discarded on acquire.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use sqlfrag_core::{Error, Executor, Log, Param, QueryResult, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::config::{Config, PoolConfig};
use crate::row::raw_row;
use crate::values::PgParam;

/// Pool occupancy snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub active: usize,
    /// Callers blocked waiting for a free slot
    pub waiting: usize,
    pub max: usize,
}

impl PoolStats {
    pub const fn total(&self) -> usize {
        self.idle + self.active
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "idle={}, total={}, waiting={}",
            self.idle,
            self.total(),
            self.waiting
        )
    }
}

struct IdleClient {
    client: Client,
    last_used: Instant,
}

struct PoolInner {
    pg: tokio_postgres::Config,
    settings: PoolConfig,
    idle: Mutex<Vec<IdleClient>>,
    semaphore: Arc<Semaphore>,
    closed: AtomicBool,
    active: AtomicUsize,
    waiting: AtomicUsize,
    log: Arc<dyn Log>,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<IdleClient>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_idle(&self) -> Option<Client> {
        let idle_timeout = self.settings.idle_timeout();
        let mut idle = self.idle();
        while let Some(entry) = idle.pop() {
            if entry.client.is_closed() || entry.last_used.elapsed() > idle_timeout {
                continue;
            }
            return Some(entry.client);
        }
        None
    }

    async fn connect(&self) -> Result<Client> {
        let (client, connection) = self
            .pg
            .connect(NoTls)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let log = Arc::clone(&self.log);
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log.error(&format!("postgres connection error: {e}"));
            }
        });
        Ok(client)
    }

    fn release(&self, client: Client, in_transaction: bool) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        if in_transaction {
            self.log
                .warn("discarding postgres client released inside an open transaction");
            return;
        }
        if self.closed.load(Ordering::Acquire) || client.is_closed() {
            return;
        }
        self.idle().push(IdleClient {
            client,
            last_used: Instant::now(),
        });
    }
}

/// Counts a caller as waiting for as long as it is alive.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// # Example
/// ```ignore
/// let pool = PgPool::new(&Config::from_url("postgres://localhost/app"), Arc::new(NullLog))?;
/// let conn = pool.acquire().await?;
/// let tool = QueryTool::new(conn);
/// ```
#[derive(Clone)]
pub struct PgPool {
    inner: Arc<PoolInner>,
}

impl PgPool {
    /// Creates an empty pool. No connection is opened until the first acquire.
    pub fn new(config: &Config, log: Arc<dyn Log>) -> Result<Self> {
        let pg = config.pg_config()?;
        let settings = config.pool;
        Ok(Self {
            inner: Arc::new(PoolInner {
                pg,
                settings,
                idle: Mutex::new(Vec::with_capacity(settings.max_connections)),
                semaphore: Arc::new(Semaphore::new(settings.max_connections)),
                closed: AtomicBool::new(false),
                active: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                log,
            }),
        })
    }

    /// Waits up to `acquire-timeout-ms` for a free slot, then hands out an
    /// idle client or opens a new one.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }

        let acquire_timeout = inner.settings.acquire_timeout();
        let permit = {
            let _waiting = Waiting::enter(&inner.waiting);
            tokio::time::timeout(acquire_timeout, Arc::clone(&inner.semaphore).acquire_owned())
                .await
        };
        let permit = permit
            .map_err(|_| {
                Error::Connection(format!(
                    "timed out after {}ms waiting for a connection",
                    acquire_timeout.as_millis()
                ))
            })?
            .map_err(|_| Error::PoolClosed)?;

        let client = match inner.take_idle() {
            Some(client) => client,
            None => inner.connect().await?,
        };
        inner.active.fetch_add(1, Ordering::Relaxed);

        Ok(PooledConnection {
            client: Some(client),
            in_transaction: AtomicBool::new(false),
            pool: Arc::clone(inner),
            _permit: permit,
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.inner.idle().len(),
            active: self.inner.active.load(Ordering::Relaxed),
            waiting: self.inner.waiting.load(Ordering::Relaxed),
            max: self.inner.settings.max_connections,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Drops idle clients and fails pending and future acquires.
    /// Clients in use are closed when released.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.semaphore.close();
        self.inner.idle().clear();
    }
}

/// A client checked out of a [`PgPool`], returned when dropped.
pub struct PooledConnection {
    client: Option<Client>,
    in_transaction: AtomicBool,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    pub fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(Error::PoolClosed)
    }

    /// Whether a transaction was begun on this client and not yet finished.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }

    /// Returns the client to the pool. Same as dropping it.
    pub fn release(self) {}
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client, self.in_transaction());
        }
    }
}

impl Executor for PooledConnection {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<QueryResult> {
        let client = self.client()?;
        let params: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let statement = client.prepare(sql).await?;
        if statement.columns().is_empty() {
            let row_count = client.execute(&statement, &refs).await?;
            return Ok(QueryResult {
                row_count,
                rows: Vec::new(),
            });
        }

        let rows = client
            .query(&statement, &refs)
            .await?
            .iter()
            .map(raw_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryResult {
            row_count: rows.len() as u64,
            rows,
        })
    }

    fn mark_transaction(&self, open: bool) {
        self.in_transaction.store(open, Ordering::Release);
    }
}
