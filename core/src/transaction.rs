//! Transactional units of work over a [`QueryTool`].

use std::fmt;

use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::log::Log;
use crate::query::{Executor, QueryTool};
use crate::sqlfrag_trace_tx;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
}

impl IsolationLevel {
    /// The SQL keywords, e.g. `REPEATABLE READ`.
    pub const fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    fn begin_statement(self) -> Fragment<crate::shape::Nil> {
        match self {
            IsolationLevel::ReadUncommitted => {
                Fragment::sql("BEGIN TRANSACTION ISOLATION LEVEL READ UNCOMMITTED")
            }
            IsolationLevel::ReadCommitted => {
                Fragment::sql("BEGIN TRANSACTION ISOLATION LEVEL READ COMMITTED")
            }
            IsolationLevel::RepeatableRead => {
                Fragment::sql("BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            }
            IsolationLevel::Serializable => {
                Fragment::sql("BEGIN TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            }
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Runs `f` between `BEGIN` and `COMMIT`.
///
/// Any error from `f`, including flattening and decoding errors, or from
/// the `COMMIT` itself rolls the transaction back and is returned
/// unchanged; a failing `ROLLBACK` is only logged. Nothing is retried.
///
/// The executor stays marked through [`Executor::mark_transaction`] until
/// `COMMIT` or `ROLLBACK` succeeds, so a future dropped in between leaves
/// it marked.
pub async fn within_transaction<E, F, R>(
    tool: &QueryTool<E>,
    log: &dyn Log,
    isolation: IsolationLevel,
    f: F,
) -> Result<R>
where
    E: Executor,
    F: AsyncFnOnce(&QueryTool<E>) -> Result<R>,
{
    log.debug("starting transaction");
    sqlfrag_trace_tx!("begin", isolation);
    tool.executor().mark_transaction(true);
    tool.exec(&isolation.begin_statement()).await?;
    log.debug("started transaction");

    let outcome = async {
        let value = f(tool).await?;
        log.debug("committing transaction");
        tool.exec(&Fragment::sql("COMMIT")).await?;
        Ok::<_, Error>(value)
    }
    .await;

    match outcome {
        Ok(value) => {
            tool.executor().mark_transaction(false);
            sqlfrag_trace_tx!("commit", isolation);
            log.debug("committed transaction");
            Ok(value)
        }
        Err(err) => {
            log.debug("rolling back transaction");
            sqlfrag_trace_tx!("rollback", isolation);
            match tool.exec(&Fragment::sql("ROLLBACK")).await {
                Ok(_) => {
                    tool.executor().mark_transaction(false);
                    log.debug("rolled back transaction");
                }
                Err(rollback) => log.error(&format!("rollback failed: {rollback}")),
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializable_by_default() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::Serializable);
        assert_eq!(IsolationLevel::RepeatableRead.to_string(), "REPEATABLE READ");
    }

    #[test]
    fn begin_statement_names_level() {
        for level in [
            IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable,
        ] {
            let parsed = level.begin_statement().flatten().unwrap();
            assert_eq!(parsed.sql, format!("BEGIN TRANSACTION ISOLATION LEVEL {level}"));
        }
    }
}
