//! Factories for result value descriptors.
//!
//! A base converter checks and converts one raw scalar. [`TaggingFunctions`]
//! lifts it into the four decoding modes: required, optional, required array
//! and optional array. Arrays recurse, so multi-dimensional SQL arrays decode
//! into nested [`PgArray`]s.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use hashbrown::HashSet;

use crate::descriptor::{Converter, ValueDescriptor, converter};
use crate::error::{DecodeError, Error, Result};
use crate::raw::RawValue;
use crate::value::PgArray;

/// Largest integer magnitude that survives a round trip through an IEEE-754 double.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Descriptor factories sharing one base converter.
pub struct TaggingFunctions<T> {
    convert: Converter<T>,
}

impl<T> Clone for TaggingFunctions<T> {
    fn clone(&self) -> Self {
        Self {
            convert: Arc::clone(&self.convert),
        }
    }
}

impl<T: 'static> TaggingFunctions<T> {
    pub fn new<F>(convert: F) -> Self
    where
        F: Fn(&RawValue) -> std::result::Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            convert: converter(convert),
        }
    }

    /// NULL is a decoding error.
    pub fn as_required(&self, name: impl Into<CompactString>) -> ValueDescriptor<T> {
        ValueDescriptor::new(name, Arc::clone(&self.convert), false)
    }

    /// NULL decodes to `None` without running the converter.
    pub fn as_optional(&self, name: impl Into<CompactString>) -> ValueDescriptor<Option<T>> {
        let convert = Arc::clone(&self.convert);
        ValueDescriptor::new(
            name,
            converter(move |raw| {
                if raw.is_null() {
                    Ok(None)
                } else {
                    convert(raw).map(Some)
                }
            }),
            true,
        )
    }

    pub fn as_required_array(&self, name: impl Into<CompactString>) -> ValueDescriptor<PgArray<T>> {
        let convert = Arc::clone(&self.convert);
        ValueDescriptor::new(name, converter(move |raw| convert_array(&convert, raw)), false)
    }

    /// Like [`as_required_array`](Self::as_required_array), but the array itself may be NULL.
    pub fn as_optional_array(
        &self,
        name: impl Into<CompactString>,
    ) -> ValueDescriptor<Option<PgArray<T>>> {
        let convert = Arc::clone(&self.convert);
        ValueDescriptor::new(
            name,
            converter(move |raw| {
                if raw.is_null() {
                    Ok(None)
                } else {
                    convert_array(&convert, raw).map(Some)
                }
            }),
            true,
        )
    }
}

fn convert_array<T>(
    convert: &Converter<T>,
    raw: &RawValue,
) -> std::result::Result<PgArray<T>, DecodeError> {
    let RawValue::Array(items) = raw else {
        return Err(DecodeError::mismatch("array", raw));
    };
    if matches!(items.first(), Some(RawValue::Array(_))) {
        items
            .iter()
            .map(|item| convert_array(convert, item))
            .collect::<std::result::Result<_, _>>()
            .map(PgArray::Nested)
    } else {
        items
            .iter()
            .map(|item| match item {
                RawValue::Null => Ok(None),
                item => convert(item).map(Some),
            })
            .collect::<std::result::Result<_, _>>()
            .map(PgArray::Elements)
    }
}

impl TaggingFunctions<String> {
    /// Builds descriptor factories for a closed set of string values.
    ///
    /// `constants` maps an identifier to its database value, e.g. the
    /// variants of a Rust enum to their SQL labels. Every value must be a
    /// JSON string and no two identifiers may share a value.
    ///
    /// ```
    /// # use sqlfrag_core::TaggingFunctions;
    /// let status = TaggingFunctions::for_enum([("Active", "active"), ("Banned", "banned")]).unwrap();
    /// let descriptor = status.as_required("status");
    /// assert_eq!(descriptor.property_name(), "status");
    /// ```
    pub fn for_enum<I, K, V>(constants: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        let mut allowed = Vec::new();
        let mut known = HashSet::new();
        for (identifier, value) in constants {
            let value = match value.into() {
                serde_json::Value::String(value) => value,
                other => {
                    return Err(Error::NonStringEnumValue {
                        identifier: identifier.into(),
                        value: other.to_string(),
                    });
                }
            };
            if !known.insert(value.clone()) {
                return Err(Error::DuplicateEnumValue(value));
            }
            allowed.push(value);
        }

        Ok(Self::new(move |raw| match raw {
            RawValue::Text(value) if known.contains(value) => Ok(value.clone()),
            other => Err(DecodeError::UnknownEnumValue {
                allowed: allowed.clone(),
                found: other.describe(),
            }),
        }))
    }
}

/// Accepts text only.
pub fn convert_string(raw: &RawValue) -> std::result::Result<String, DecodeError> {
    match raw {
        RawValue::Text(value) => Ok(value.clone()),
        other => Err(DecodeError::mismatch("string", other)),
    }
}

/// Accepts integers and integral floats within [`MAX_SAFE_INTEGER`], and
/// text holding a strictly formatted decimal integer.
pub fn convert_safe_integer(raw: &RawValue) -> std::result::Result<i64, DecodeError> {
    match raw {
        RawValue::Int(value) if is_safe(*value) => Ok(*value),
        RawValue::Float(value)
            if value.is_finite()
                && value.fract() == 0.0
                && value.abs() <= MAX_SAFE_INTEGER as f64 =>
        {
            Ok(*value as i64)
        }
        RawValue::Text(text) => parse_int_strict(text)
            .filter(|value| is_safe(*value))
            .ok_or_else(|| DecodeError::InvalidInteger(text.clone())),
        other => Err(DecodeError::mismatch("safe integer", other)),
    }
}

#[inline]
fn is_safe(value: i64) -> bool {
    value.unsigned_abs() <= MAX_SAFE_INTEGER as u64
}

/// An optional sign followed by one or more ASCII digits, nothing else.
fn parse_int_strict(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

pub fn convert_boolean(raw: &RawValue) -> std::result::Result<bool, DecodeError> {
    match raw {
        RawValue::Bool(value) => Ok(*value),
        other => Err(DecodeError::mismatch("boolean", other)),
    }
}

pub fn convert_date(raw: &RawValue) -> std::result::Result<DateTime<Utc>, DecodeError> {
    match raw {
        RawValue::Timestamp(value) => Ok(*value),
        other => Err(DecodeError::mismatch("date", other)),
    }
}

macro_rules! tagging_functions {
    ($($name:ident: $ty:ty => $convert:path),+ $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("Decodes a non-null ", stringify!($name), " column.")]
                pub fn [<as_ $name>](name: impl Into<CompactString>) -> ValueDescriptor<$ty> {
                    TaggingFunctions::new($convert).as_required(name)
                }

                #[doc = concat!("Decodes a nullable ", stringify!($name), " column.")]
                pub fn [<as_optional_ $name>](
                    name: impl Into<CompactString>,
                ) -> ValueDescriptor<Option<$ty>> {
                    TaggingFunctions::new($convert).as_optional(name)
                }

                #[doc = concat!("Decodes a non-null ", stringify!($name), " array column.")]
                pub fn [<as_ $name _array>](
                    name: impl Into<CompactString>,
                ) -> ValueDescriptor<PgArray<$ty>> {
                    TaggingFunctions::new($convert).as_required_array(name)
                }

                #[doc = concat!("Decodes a nullable ", stringify!($name), " array column.")]
                pub fn [<as_optional_ $name _array>](
                    name: impl Into<CompactString>,
                ) -> ValueDescriptor<Option<PgArray<$ty>>> {
                    TaggingFunctions::new($convert).as_optional_array(name)
                }
            )+
        }
    };
}

tagging_functions!(
    string: String => convert_string,
    safe_integer: i64 => convert_safe_integer,
    boolean: bool => convert_boolean,
    date: DateTime<Utc> => convert_date,
);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn required_rejects_null() {
        let err = as_safe_integer("id").convert(&RawValue::Null).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Mismatch {
                expected: "safe integer",
                found: "null".into()
            }
        );
    }

    #[test]
    fn optional_skips_converter_on_null() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let tags = TaggingFunctions::new(move |raw| {
            counter.fetch_add(1, Ordering::SeqCst);
            convert_string(raw)
        });
        let descriptor = tags.as_optional("nickname");
        assert!(descriptor.accepts_null());

        assert_eq!(descriptor.convert(&RawValue::Null), Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(descriptor.convert(&"Bob".into()), Ok(Some("Bob".to_owned())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn safe_integer_accepts_numeric_text() {
        assert_eq!(convert_safe_integer(&"42".into()), Ok(42));
        assert_eq!(convert_safe_integer(&"-17".into()), Ok(-17));
        assert_eq!(convert_safe_integer(&RawValue::Float(3.0)), Ok(3));
        assert_eq!(
            convert_safe_integer(&"4.5".into()),
            Err(DecodeError::InvalidInteger("4.5".into()))
        );
        assert_eq!(
            convert_safe_integer(&" 4".into()),
            Err(DecodeError::InvalidInteger(" 4".into()))
        );
        assert!(convert_safe_integer(&"9007199254740993".into()).is_err());
        assert!(convert_safe_integer(&RawValue::Float(0.5)).is_err());
        assert!(convert_safe_integer(&RawValue::Float(f64::INFINITY)).is_err());
        assert!(convert_safe_integer(&RawValue::Int(MAX_SAFE_INTEGER + 1)).is_err());
    }

    #[test]
    fn empty_array() {
        let descriptor = as_safe_integer_array("ids");
        assert_eq!(
            descriptor.convert(&RawValue::Array(vec![])),
            Ok(PgArray::Elements(vec![]))
        );
    }

    #[test]
    fn array_with_null_element() {
        let descriptor = as_safe_integer_array("ids");
        let raw = RawValue::from(vec![Some(1i64), Some(2), None]);
        assert_eq!(
            descriptor.convert(&raw),
            Ok(PgArray::Elements(vec![Some(1), Some(2), None]))
        );
    }

    #[test]
    fn nested_array() {
        let descriptor = as_safe_integer_array("matrix");
        let raw = RawValue::from(vec![vec![1i64, 2], vec![3]]);
        assert_eq!(
            descriptor.convert(&raw),
            Ok(PgArray::Nested(vec![
                PgArray::Elements(vec![Some(1), Some(2)]),
                PgArray::Elements(vec![Some(3)]),
            ]))
        );
    }

    #[test]
    fn array_rejects_scalar() {
        let err = as_string_array("tags").convert(&"a".into()).unwrap_err();
        assert!(matches!(err, DecodeError::Mismatch { expected: "array", .. }));
    }

    #[test]
    fn optional_array_accepts_null() {
        let descriptor = as_optional_boolean_array("flags");
        assert_eq!(descriptor.convert(&RawValue::Null), Ok(None));
        assert_eq!(
            descriptor.convert(&RawValue::from(vec![true])),
            Ok(Some(PgArray::Elements(vec![Some(true)])))
        );
    }

    #[test]
    fn date_requires_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(as_date("at").convert(&RawValue::Timestamp(ts)), Ok(ts));
        assert!(as_date("at").convert(&"2024-05-01".into()).is_err());
    }

    #[test]
    fn enum_rejects_duplicate_values() {
        let err = TaggingFunctions::for_enum([("A", "a"), ("B", "a")]).err().unwrap();
        assert!(matches!(err, Error::DuplicateEnumValue(ref value) if value == "a"));
    }

    #[test]
    fn enum_rejects_non_string_values() {
        let err = TaggingFunctions::for_enum([("A", json!("a")), ("B", json!(1))])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::NonStringEnumValue { ref identifier, ref value } if identifier == "B" && value == "1"
        ));
    }

    #[test]
    fn enum_decodes_known_values_only() {
        let tags = TaggingFunctions::for_enum([("A", "a"), ("B", "b")]).unwrap();
        let descriptor = tags.as_required("letter");
        assert_eq!(descriptor.convert(&"a".into()), Ok("a".to_owned()));
        assert_eq!(
            descriptor.convert(&"c".into()),
            Err(DecodeError::UnknownEnumValue {
                allowed: vec!["a".into(), "b".into()],
                found: "text \"c\"".into(),
            })
        );
    }
}
