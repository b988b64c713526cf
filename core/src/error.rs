use compact_str::CompactString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Segment/item count mismatch when constructing a fragment
    #[error("invalid arguments: {segments} segments given for {items} items")]
    InvalidArguments { segments: usize, items: usize },

    /// Two result values in one statement share a property name
    #[error("duplicate property name {0}")]
    DuplicateProperty(CompactString),

    /// A raw column value could not be converted
    #[error("cannot decode property {property}: {source}")]
    Decode {
        property: CompactString,
        #[source]
        source: DecodeError,
    },

    /// The executor returned a row without the expected column alias
    #[error("column {0} missing from result row")]
    MissingColumn(CompactString),

    /// A decoded record does not line up with the static shape
    #[error("record does not match result shape: {0}")]
    ShapeMismatch(String),

    /// Enum source mapping contains a non-string constant
    #[error("only string enums supported but enum constant {identifier:?} has value {value}")]
    NonStringEnumValue { identifier: String, value: String },

    /// Enum source mapping maps two constants to one value
    #[error("multiple enum constants with value {0:?}")]
    DuplicateEnumValue(String),

    /// `query_single` received a row count other than one
    #[error("exactly one row expected but {0} rows received")]
    ExpectedOneRow(usize),

    /// `query_optional` received more than one row
    #[error("at most one row expected but {0} rows received")]
    ExpectedAtMostOneRow(usize),

    /// `exec` was given a fragment that declares result values
    #[error("use query instead of exec to retrieve values from database")]
    ResultValuesInExec,

    /// Error executing a statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error establishing or driving a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error with transaction demarcation
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The connection pool has been closed
    #[error("connection pool is closed")]
    PoolClosed,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// tokio-postgres specific errors
    #[cfg(feature = "tokio-postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

/// Failure of a single converter applied to a raw column value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("{expected} expected but {found} found")]
    Mismatch {
        expected: &'static str,
        found: String,
    },

    #[error("safe integer expected but {0:?} found")]
    InvalidInteger(String),

    #[error("one of enum values {allowed:?} expected but {found} found")]
    UnknownEnumValue { allowed: Vec<String>, found: String },
}

impl DecodeError {
    pub(crate) fn mismatch(expected: &'static str, found: &crate::RawValue) -> Self {
        Self::Mismatch {
            expected,
            found: found.describe(),
        }
    }
}

/// Result type for fragment, decoding and execution operations
pub type Result<T> = std::result::Result<T, Error>;
