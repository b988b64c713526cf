//! Decoded result values and the Rust types they map to.

use chrono::{DateTime, Utc};

use crate::error::DecodeError;

/// A decoded result field.
///
/// [`Value::Absent`] is what a SQL NULL decodes to for optional fields and
/// for null array elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    String(String),
    Integer(i64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
}

impl Value {
    #[inline]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Absent => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serde::Serialize::serialize(d, serializer),
            Value::Array(items) => serde::Serialize::serialize(items, serializer),
        }
    }
}

/// A Rust type a result column can be decoded into.
///
/// Every descriptor produced by the tagging functions decodes to a
/// `ResultValue`, which lets the same field travel through the dynamic
/// [`Record`](crate::Record) and come back out as its static type.
pub trait ResultValue: Sized + Send + 'static {
    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

fn unexpected(expected: &'static str, value: &Value) -> DecodeError {
    DecodeError::Mismatch {
        expected,
        found: value.kind().into(),
    }
}

macro_rules! impl_result_value {
    ($($ty:ty => $variant:ident, $expected:literal);+ $(;)?) => {
        $(
            impl ResultValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(unexpected($expected, &other)),
                    }
                }
            }
        )+
    };
}

impl_result_value!(
    String => String, "string";
    i64 => Integer, "integer";
    bool => Boolean, "boolean";
    DateTime<Utc> => Date, "date";
);

impl<T: ResultValue> ResultValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Absent, ResultValue::into_value)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Absent => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A decoded SQL array: either a flat list of possibly-absent elements or
/// a list of sub-arrays (multi-dimensional arrays).
#[derive(Debug, Clone, PartialEq)]
pub enum PgArray<T> {
    Elements(Vec<Option<T>>),
    Nested(Vec<PgArray<T>>),
}

impl<T> PgArray<T> {
    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        match self {
            PgArray::Elements(items) => items.len(),
            PgArray::Nested(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the elements of a one-dimensional array.
    pub fn as_elements(&self) -> Option<&[Option<T>]> {
        match self {
            PgArray::Elements(items) => Some(items),
            PgArray::Nested(_) => None,
        }
    }
}

impl<T> Default for PgArray<T> {
    fn default() -> Self {
        PgArray::Elements(Vec::new())
    }
}

impl<T: ResultValue> ResultValue for PgArray<T> {
    fn into_value(self) -> Value {
        match self {
            PgArray::Elements(items) => {
                Value::Array(items.into_iter().map(ResultValue::into_value).collect())
            }
            PgArray::Nested(items) => {
                Value::Array(items.into_iter().map(ResultValue::into_value).collect())
            }
        }
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(unexpected("array", &other)),
        };
        if matches!(items.first(), Some(Value::Array(_))) {
            items
                .into_iter()
                .map(PgArray::from_value)
                .collect::<Result<_, _>>()
                .map(PgArray::Nested)
        } else {
            items
                .into_iter()
                .map(Option::<T>::from_value)
                .collect::<Result<_, _>>()
                .map(PgArray::Elements)
        }
    }
}
