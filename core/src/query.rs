//! The executor contract and the decoding query interface built on it.

use std::future::Future;

use crate::decode::Record;
use crate::error::{Error, Result};
use crate::flatten::ParsedQuery;
use crate::fragment::Fragment;
use crate::param::Param;
use crate::raw::RawRow;
use crate::shape::Shape;
use crate::sqlfrag_trace_query;

/// Rows and affected row count returned by an executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub row_count: u64,
    pub rows: Vec<RawRow>,
}

/// Runs one parameterized statement using `$1, $2, ...` placeholders.
///
/// Implementations return each row keyed by column alias.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Set before `BEGIN` and cleared once `COMMIT` or `ROLLBACK` succeeded.
    /// An executor still marked when dropped holds an unfinished transaction.
    fn mark_transaction(&self, _open: bool) {}
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<QueryResult>> + Send {
        (**self).execute(sql, params)
    }

    fn mark_transaction(&self, open: bool) {
        (**self).mark_transaction(open)
    }
}

/// Flattens fragments, runs them on an executor and decodes the rows.
///
/// The typed methods (`query`, `query_single`, `query_optional`) return
/// tuples following the fragment's static shape. The `*_record` variants
/// work on any fragment, including dynamically built ones.
#[derive(Debug, Clone)]
pub struct QueryTool<E> {
    executor: E,
}

impl<E: Executor> QueryTool<E> {
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }

    #[inline]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    async fn run(&self, parsed: &ParsedQuery) -> Result<QueryResult> {
        sqlfrag_trace_query!(&parsed.sql, parsed.query_params.len());
        self.executor
            .execute(&parsed.sql, &parsed.query_params)
            .await
    }

    async fn fetch<S>(&self, fragment: &Fragment<S>) -> Result<(ParsedQuery, Vec<RawRow>)> {
        let parsed = fragment.flatten()?;
        let result = self.run(&parsed).await?;
        Ok((parsed, result.rows))
    }

    /// Runs a statement without result values and returns the affected row count.
    pub async fn exec<S>(&self, fragment: &Fragment<S>) -> Result<u64> {
        let parsed = fragment.flatten()?;
        if !parsed.result_descriptors.is_empty() {
            return Err(Error::ResultValuesInExec);
        }
        Ok(self.run(&parsed).await?.row_count)
    }

    pub async fn query_records<S>(&self, fragment: &Fragment<S>) -> Result<Vec<Record>> {
        let (parsed, rows) = self.fetch(fragment).await?;
        parsed.decode_rows(&rows)
    }

    /// Fails with [`Error::ExpectedOneRow`] unless exactly one row comes back.
    pub async fn query_single_record<S>(&self, fragment: &Fragment<S>) -> Result<Record> {
        let (parsed, rows) = self.fetch(fragment).await?;
        match rows.as_slice() {
            [row] => parsed.decoder().decode(row),
            rows => Err(Error::ExpectedOneRow(rows.len())),
        }
    }

    /// Fails with [`Error::ExpectedAtMostOneRow`] if more than one row comes back.
    pub async fn query_optional_record<S>(&self, fragment: &Fragment<S>) -> Result<Option<Record>> {
        let (parsed, rows) = self.fetch(fragment).await?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => parsed.decoder().decode(row).map(Some),
            rows => Err(Error::ExpectedAtMostOneRow(rows.len())),
        }
    }

    pub async fn query<S: Shape>(&self, fragment: &Fragment<S>) -> Result<Vec<S::Row>> {
        self.query_records(fragment)
            .await?
            .into_iter()
            .map(S::decode)
            .collect()
    }

    pub async fn query_single<S: Shape>(&self, fragment: &Fragment<S>) -> Result<S::Row> {
        S::decode(self.query_single_record(fragment).await?)
    }

    pub async fn query_optional<S: Shape>(&self, fragment: &Fragment<S>) -> Result<Option<S::Row>> {
        self.query_optional_record(fragment)
            .await?
            .map(S::decode)
            .transpose()
    }
}
