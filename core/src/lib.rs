//! Core of sqlfrag: composable SQL fragments with typed result decoding.
//!
//! A [`Fragment`] interleaves literal SQL segments with bound parameters,
//! result value descriptors and nested fragments. [`flatten`] turns it into
//! numbered-placeholder SQL plus the descriptors needed to decode each
//! returned row, and [`QueryTool`] does both against any [`Executor`].
//!
//! ```
//! use sqlfrag_core::{as_safe_integer, as_string, sql};
//!
//! let query = sql!("SELECT id ", as_safe_integer("id"), ", name ", as_string("name"), " FROM users WHERE team = ", 7, "");
//! let parsed = query.flatten().unwrap();
//! assert_eq!(parsed.sql, "SELECT id AS result_0, name AS result_1 FROM users WHERE team = $1");
//! ```

pub mod decode;
pub mod descriptor;
pub mod error;
pub mod flatten;
pub mod fragment;
pub mod log;
pub mod param;
pub mod query;
pub mod raw;
pub mod shape;
pub mod tagging;
pub mod tracing;
pub mod transaction;
pub mod value;

// Re-export key types and traits
pub use decode::{Record, RowDecoder, make_decoder};
pub use descriptor::{ErasedDescriptor, ValueDescriptor};
pub use error::{DecodeError, Error, Result};
pub use flatten::{ParsedQuery, ResultDescriptors, flatten};
pub use fragment::{Fragment, IntoItem, Item};
pub use log::{Log, NullLog};
#[cfg(feature = "tracing")]
pub use log::TracingLog;
pub use param::Param;
pub use query::{Executor, QueryResult, QueryTool};
pub use raw::{RawRow, RawValue};
pub use shape::{Dynamic, Shape};
pub use tagging::*;
pub use transaction::{IsolationLevel, within_transaction};
pub use value::{PgArray, ResultValue, Value};
