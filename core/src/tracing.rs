//! Tracing utilities for statement and transaction observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! Without it the macros expand to nothing.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// sqlfrag_trace_query!(&parsed.sql, parsed.query_params.len());
/// ```
#[macro_export]
macro_rules! sqlfrag_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "sqlfrag.query");
    };
}

/// Emit an info-level tracing event for transaction lifecycle (begin, commit, rollback).
///
/// ```ignore
/// sqlfrag_trace_tx!("begin", "SERIALIZABLE");
/// ```
#[macro_export]
macro_rules! sqlfrag_trace_tx {
    ($event:literal, $isolation:expr) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, isolation = %$isolation, "sqlfrag.transaction");
    };
}
