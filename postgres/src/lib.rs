//! PostgreSQL executor for sqlfrag
//!
//! Binds [`Param`](sqlfrag_core::Param)s through `tokio-postgres`, reads
//! result columns into [`RawValue`](sqlfrag_core::RawValue)s and hands out
//! pooled [`QueryTool`](sqlfrag_core::QueryTool)s via [`PostgresService`].

pub mod config;
pub mod pool;
pub mod row;
pub mod service;
pub mod values;

pub use config::{CONFIG_FILE, Config, ConfigError, Credentials, PoolConfig};
pub use pool::{PgPool, PoolStats, PooledConnection};
pub use row::{PgRaw, raw_row};
pub use service::{PgQueryTool, PostgresService};
pub use values::PgParam;

pub use tokio_postgres::Row;
