//! # sqlfrag
//!
//! Composable SQL fragments for PostgreSQL with typed result decoding.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sqlfrag::prelude::*;
//!
//! # async fn run() -> sqlfrag::Result<()> {
//! let service = PostgresService::connect(&Config::load()?, None)?;
//!
//! let team = 7;
//! let users = sql!(
//!     "SELECT id ", as_safe_integer("id"),
//!     ", name ", as_string("name"),
//!     " FROM users WHERE team = ", team, ""
//! );
//!
//! // Vec<(i64, String)>
//! let rows = service.with_connection(async |db| db.query(&users).await).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Crate              | Contents                                              |
//! |--------------------|-------------------------------------------------------|
//! | `sqlfrag-core`     | fragments, flattening, decoding, `QueryTool`          |
//! | `sqlfrag-postgres` | tokio-postgres executor, pool, `PostgresService`      |
//!
//! ## Feature Flags
//!
//! | Feature    | Description                                     |
//! |------------|-------------------------------------------------|
//! | `postgres` | PostgreSQL driver (default)                     |
//! | `serde`    | `Serialize` for decoded records                 |
//! | `tracing`  | statement and transaction events via `tracing`  |

/// Result type for sqlfrag operations
pub use sqlfrag_core::Result;

/// Fragment template macro
pub use sqlfrag_core::sql;

/// Error types
pub mod error {
    pub use sqlfrag_core::{DecodeError, Error};
}

/// Dialect-independent building blocks.
pub mod core {
    pub use sqlfrag_core::*;

    /// Type-level result shapes.
    pub mod shape {
        pub use sqlfrag_core::shape::{Concat, Cons, Dynamic, Nil, Shape, TypeSet};
        pub use sqlfrag_core::shape_list;
    }
}

/// PostgreSQL executor, pool and service.
#[cfg(feature = "postgres")]
pub mod postgres {
    pub use sqlfrag_postgres::*;
}

/// Everything needed to build and run queries.
pub mod prelude {
    pub use sqlfrag_core::{
        Error, Executor, Fragment, IsolationLevel, Log, NullLog, PgArray, QueryTool, Record,
        Result, TaggingFunctions, Value, ValueDescriptor, sql,
    };
    pub use sqlfrag_core::{
        as_boolean, as_boolean_array, as_date, as_date_array, as_optional_boolean,
        as_optional_boolean_array, as_optional_date, as_optional_date_array,
        as_optional_safe_integer, as_optional_safe_integer_array, as_optional_string,
        as_optional_string_array, as_safe_integer, as_safe_integer_array, as_string,
        as_string_array,
    };

    #[cfg(feature = "tracing")]
    pub use sqlfrag_core::TracingLog;

    #[cfg(feature = "postgres")]
    pub use sqlfrag_postgres::{Config, PgQueryTool, PostgresService};
}
