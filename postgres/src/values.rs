//! Bound parameter encoding for tokio-postgres.

use std::error::Error;

use bytes::BytesMut;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlfrag_core::Param;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

/// A [`Param`] bound to a statement parameter.
///
/// Numbers adapt to the integer, float or numeric type the server inferred
/// for the placeholder, and text binds to enum types as well as text types.
#[derive(Debug)]
pub struct PgParam<'a>(pub &'a Param);

fn is_text(ty: &Type) -> bool {
    [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME, Type::UNKNOWN].contains(ty)
}

fn int_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::INT2 {
        i16::try_from(value)?.to_sql_checked(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(value)?.to_sql_checked(ty, out)
    } else if *ty == Type::FLOAT4 {
        (value as f32).to_sql_checked(ty, out)
    } else if *ty == Type::FLOAT8 {
        (value as f64).to_sql_checked(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::from(value).to_sql_checked(ty, out)
    } else if is_text(ty) {
        value.to_string().to_sql_checked(ty, out)
    } else {
        value.to_sql_checked(ty, out)
    }
}

fn float_to_sql(value: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::FLOAT4 {
        (value as f32).to_sql_checked(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::try_from(value)?.to_sql_checked(ty, out)
    } else if is_text(ty) {
        value.to_string().to_sql_checked(ty, out)
    } else {
        value.to_sql_checked(ty, out)
    }
}

fn text_to_sql(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match ty.kind() {
        // enum labels travel as their text in the binary protocol
        Kind::Enum(_) => {
            out.extend_from_slice(value.as_bytes());
            Ok(IsNull::No)
        }
        Kind::Domain(inner) => text_to_sql(value, inner, out),
        _ => value.to_sql_checked(ty, out),
    }
}

fn int_array_to_sql(
    values: &[Option<i64>],
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, BoxError> {
    if *ty == Type::INT2_ARRAY {
        values
            .iter()
            .map(|v| v.map(i16::try_from).transpose())
            .collect::<Result<Vec<_>, _>>()?
            .to_sql_checked(ty, out)
    } else if *ty == Type::INT4_ARRAY {
        values
            .iter()
            .map(|v| v.map(i32::try_from).transpose())
            .collect::<Result<Vec<_>, _>>()?
            .to_sql_checked(ty, out)
    } else {
        values.to_sql_checked(ty, out)
    }
}

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self.0 {
            Param::Null => Ok(IsNull::Yes),
            Param::Bool(b) => b.to_sql_checked(ty, out),
            Param::Int(i) => int_to_sql(*i, ty, out),
            Param::Float(f) => float_to_sql(*f, ty, out),
            Param::Text(s) => text_to_sql(s, ty, out),
            Param::Timestamp(ts) => {
                if *ty == Type::TIMESTAMP {
                    ts.naive_utc().to_sql_checked(ty, out)
                } else if *ty == Type::DATE {
                    ts.date_naive().to_sql_checked(ty, out)
                } else {
                    ts.to_sql_checked(ty, out)
                }
            }
            Param::Date(date) => {
                if *ty == Type::TIMESTAMP {
                    NaiveDateTime::from(*date).to_sql_checked(ty, out)
                } else if *ty == Type::TIMESTAMPTZ {
                    NaiveDateTime::from(*date).and_utc().to_sql_checked(ty, out)
                } else {
                    date.to_sql_checked(ty, out)
                }
            }
            Param::Json(value) => value.to_sql_checked(ty, out),
            Param::TextArray(values) => values.to_sql_checked(ty, out),
            Param::IntArray(values) => int_array_to_sql(values, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // the server-inferred type is checked per variant in to_sql
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    fn encode(param: Param, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut out = BytesMut::new();
        PgParam(&param).to_sql(ty, &mut out)?;
        Ok(out.to_vec())
    }

    #[test]
    fn integers_adapt_to_column_width() {
        assert_eq!(encode(Param::Int(5), &Type::INT2).unwrap(), vec![0, 5]);
        assert_eq!(encode(Param::Int(5), &Type::INT4).unwrap(), vec![0, 0, 0, 5]);
        assert_eq!(encode(Param::Int(5), &Type::INT8).unwrap().len(), 8);
        assert_eq!(encode(Param::Int(5), &Type::TEXT).unwrap(), b"5".to_vec());
    }

    #[test]
    fn out_of_range_integer_fails() {
        assert!(encode(Param::Int(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn text_rejects_numeric_columns() {
        assert!(encode(Param::Text("x".into()), &Type::INT4).is_err());
    }

    #[test]
    fn null_binds_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            PgParam(&Param::Null).to_sql(&Type::INT4, &mut out).unwrap(),
            IsNull::Yes
        ));
    }

    #[test]
    fn timestamps_follow_target_type() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(encode(Param::Timestamp(ts), &Type::TIMESTAMPTZ).unwrap().len(), 8);
        assert_eq!(encode(Param::Timestamp(ts), &Type::TIMESTAMP).unwrap().len(), 8);
        assert_eq!(encode(Param::Timestamp(ts), &Type::DATE).unwrap().len(), 4);

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(encode(Param::Date(date), &Type::DATE).unwrap().len(), 4);
    }

    #[test]
    fn int_arrays_narrow_elements() {
        let values = Param::IntArray(vec![Some(1), None]);
        assert!(encode(values.clone(), &Type::INT4_ARRAY).is_ok());
        assert!(encode(Param::IntArray(vec![Some(i64::MAX)]), &Type::INT4_ARRAY).is_err());
        assert!(encode(values, &Type::INT8_ARRAY).is_ok());
    }
}
