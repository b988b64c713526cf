//! Decoding result columns into [`RawValue`]s.

use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fallible_iterator::FallibleIterator;
use postgres_protocol::types as protocol;
use rust_decimal::Decimal;
use sqlfrag_core::{RawRow, RawValue, Result};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

type BoxError = Box<dyn Error + Sync + Send>;

/// A column value read from any supported PostgreSQL type.
#[derive(Debug, Clone, PartialEq)]
pub struct PgRaw(pub RawValue);

impl<'a> FromSql<'a> for PgRaw {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        decode_value(ty, raw).map(PgRaw)
    }

    fn from_sql_null(_ty: &Type) -> std::result::Result<Self, BoxError> {
        Ok(PgRaw(RawValue::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_value(ty: &Type, raw: &[u8]) -> std::result::Result<RawValue, BoxError> {
    match ty.kind() {
        Kind::Array(member) => return decode_array(member, raw),
        Kind::Enum(_) => return Ok(RawValue::Text(protocol::text_from_sql(raw)?.to_owned())),
        Kind::Domain(inner) => return decode_value(inner, raw),
        _ => {}
    }

    let value = if *ty == Type::BOOL {
        RawValue::Bool(bool::from_sql(ty, raw)?)
    } else if *ty == Type::INT2 {
        RawValue::Int(i16::from_sql(ty, raw)?.into())
    } else if *ty == Type::INT4 {
        RawValue::Int(i32::from_sql(ty, raw)?.into())
    } else if *ty == Type::INT8 {
        RawValue::Int(i64::from_sql(ty, raw)?)
    } else if *ty == Type::OID {
        RawValue::Int(u32::from_sql(ty, raw)?.into())
    } else if *ty == Type::FLOAT4 {
        RawValue::Float(f32::from_sql(ty, raw)?.into())
    } else if *ty == Type::FLOAT8 {
        RawValue::Float(f64::from_sql(ty, raw)?)
    } else if *ty == Type::NUMERIC {
        // arbitrary precision, so it stays text
        RawValue::Text(Decimal::from_sql(ty, raw)?.to_string())
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        RawValue::Text(serde_json::Value::from_sql(ty, raw)?.to_string())
    } else if <String as FromSql>::accepts(ty) {
        RawValue::Text(String::from_sql(ty, raw)?)
    } else if *ty == Type::TIMESTAMPTZ {
        RawValue::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?)
    } else if *ty == Type::TIMESTAMP {
        RawValue::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc())
    } else if *ty == Type::DATE {
        RawValue::Timestamp(NaiveDate::from_sql(ty, raw)?.and_time(NaiveTime::MIN).and_utc())
    } else {
        return Err(format!("unsupported column type {ty}").into());
    };
    Ok(value)
}

fn decode_array(member: &Type, raw: &[u8]) -> std::result::Result<RawValue, BoxError> {
    let array = protocol::array_from_sql(raw)?;
    let dimensions: Vec<usize> = array
        .dimensions()
        .map(|dimension| Ok(usize::try_from(dimension.len)?))
        .collect()?;
    let values: Vec<RawValue> = array
        .values()
        .map(|value| match value {
            Some(bytes) => decode_value(member, bytes),
            None => Ok(RawValue::Null),
        })
        .collect()?;

    Ok(nest(&dimensions, &mut values.into_iter()))
}

/// Rebuilds the dimension structure from the flat, row-major element list.
fn nest(dimensions: &[usize], values: &mut std::vec::IntoIter<RawValue>) -> RawValue {
    match dimensions {
        [] => RawValue::Array(Vec::new()),
        [len] => RawValue::Array(values.take(*len).collect()),
        [len, rest @ ..] => RawValue::Array((0..*len).map(|_| nest(rest, values)).collect()),
    }
}

/// Reads every column of `row`, keyed by column name.
pub fn raw_row(row: &Row) -> Result<RawRow> {
    let mut raw = RawRow::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let PgRaw(value) = row.try_get(idx)?;
        raw.insert(column.name(), value);
    }
    Ok(raw)
}
