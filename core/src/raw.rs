//! Driver-native column values as returned by an executor.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use hashbrown::HashMap;

/// A column value before decoding.
///
/// Multi-dimensional SQL arrays are represented as nested [`RawValue::Array`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<RawValue>),
}

impl RawValue {
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Short description used in decoding errors.
    pub fn describe(&self) -> String {
        match self {
            RawValue::Null => "null".into(),
            RawValue::Bool(b) => format!("boolean {b}"),
            RawValue::Int(i) => format!("integer {i}"),
            RawValue::Float(f) => format!("number {f}"),
            RawValue::Text(s) => format!("text {s:?}"),
            RawValue::Timestamp(ts) => format!("timestamp {}", ts.to_rfc3339()),
            RawValue::Array(items) => format!("array of {} elements", items.len()),
        }
    }
}

macro_rules! impl_raw_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for RawValue {
                #[inline]
                fn from(value: $ty) -> Self {
                    RawValue::$variant(value.into())
                }
            }
        )+
    };
}

impl_raw_from!(
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    DateTime<Utc> => Timestamp,
);

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Null, Into::into)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(values: Vec<T>) -> Self {
        RawValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// One result row keyed by column alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    columns: HashMap<CompactString, RawValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, alias: impl Into<CompactString>, value: impl Into<RawValue>) {
        self.columns.insert(alias.into(), value.into());
    }

    #[inline]
    pub fn get(&self, alias: &str) -> Option<&RawValue> {
        self.columns.get(alias)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<CompactString>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_vectors_become_nested_arrays() {
        let raw = RawValue::from(vec![vec![1i64, 2], vec![3]]);
        assert_eq!(
            raw,
            RawValue::Array(vec![
                RawValue::Array(vec![RawValue::Int(1), RawValue::Int(2)]),
                RawValue::Array(vec![RawValue::Int(3)]),
            ])
        );
    }

    #[test]
    fn row_from_pairs() {
        let row: RawRow = [("result_0", RawValue::Int(7)), ("result_1", "Sara".into())]
            .into_iter()
            .collect();
        assert_eq!(row.get("result_0"), Some(&RawValue::Int(7)));
        assert_eq!(row.get("result_1"), Some(&RawValue::Text("Sara".into())));
        assert!(row.get("result_2").is_none());
    }
}
