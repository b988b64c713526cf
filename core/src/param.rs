//! Bound parameter values.

use chrono::{DateTime, NaiveDate, Utc};

/// A value bound to a positional `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Param {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(serde_json::Value),
    TextArray(Vec<Option<String>>),
    IntArray(Vec<Option<i64>>),
}

impl Param {
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Param::Null)
    }
}

macro_rules! impl_param_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Param {
                #[inline]
                fn from(value: $ty) -> Self {
                    Param::$variant(value.into())
                }
            }
        )+
    };
}

impl_param_from!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    &String => Text,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    serde_json::Value => Json,
);

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Null, Into::into)
    }
}

impl From<Vec<String>> for Param {
    fn from(values: Vec<String>) -> Self {
        Param::TextArray(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for Param {
    fn from(values: Vec<&str>) -> Self {
        Param::TextArray(values.into_iter().map(|s| Some(s.to_owned())).collect())
    }
}

impl From<Vec<Option<String>>> for Param {
    fn from(values: Vec<Option<String>>) -> Self {
        Param::TextArray(values)
    }
}

impl From<Vec<i64>> for Param {
    fn from(values: Vec<i64>) -> Self {
        Param::IntArray(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<i32>> for Param {
    fn from(values: Vec<i32>) -> Self {
        Param::IntArray(values.into_iter().map(|v| Some(v.into())).collect())
    }
}

impl From<Vec<Option<i64>>> for Param {
    fn from(values: Vec<Option<i64>>) -> Self {
        Param::IntArray(values)
    }
}
