//! Postgres row to JSON decoding

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Map, Value as JsonValue};
use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgRow, PgTypeInfo, PgTypeKind, PgValueFormat, Postgres};
use sqlx::{Column, Decode, Row, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::models::ServiceDetailRow;

/// Fractional digits of `money` under the C/en_US monetary locales
const MONEY_FRAC_DIGITS: u32 = 2;

#[derive(Error, Debug)]
enum ColumnDecodeError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[error("unsupported column type {0}")]
    Unsupported(String),
}

/// Convert a database row into a [`ServiceDetailRow`], keeping column order.
///
/// SQL NULL becomes `null`. A column that cannot be decoded is logged and also
/// emitted as `null`.
pub fn decode_row(row: &PgRow) -> ServiceDetailRow {
    let mut map = Map::new();

    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let type_info = column.type_info();

        let value = match decode_value(row, index, type_info) {
            Ok(value) => value.unwrap_or(JsonValue::Null),
            Err(e) => {
                warn!(
                    column = name,
                    pg_type = type_info.name(),
                    error = %e,
                    "column decode failed, emitting null"
                );
                JsonValue::Null
            }
        };
        map.insert(name.to_string(), value);
    }

    ServiceDetailRow::new(map)
}

/// Dispatch is on the type name, so the unchecked getter is safe to use and also
/// covers domains over these types.
fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Postgres>,
{
    row.try_get_unchecked::<Option<T>, _>(index)
}

fn decode_value(
    row: &PgRow,
    index: usize,
    type_info: &PgTypeInfo,
) -> Result<Option<JsonValue>, ColumnDecodeError> {
    match type_info.kind() {
        // Enum values travel as their label text.
        PgTypeKind::Enum(_) => {
            return Ok(get::<String>(row, index)?.map(JsonValue::String));
        }
        PgTypeKind::Domain(base) => return decode_value(row, index, base),
        PgTypeKind::Array(element) if matches!(element.kind(), PgTypeKind::Enum(_)) => {
            return Ok(get::<Vec<Option<String>>>(row, index)?.map(|v| json!(v)));
        }
        _ => {}
    }

    let value = match type_info.name() {
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => {
            get::<String>(row, index)?.map(JsonValue::String)
        }
        "INT2" => get::<i16>(row, index)?.map(|i| json!(i)),
        "INT4" => get::<i32>(row, index)?.map(|i| json!(i)),
        "INT8" => get::<i64>(row, index)?.map(|i| json!(i)),
        "FLOAT4" => get::<f32>(row, index)?.map(|f| float(f64::from(f))),
        "FLOAT8" => get::<f64>(row, index)?.map(float),
        "NUMERIC" => match numeric_special(row, index)? {
            Some(text) => Some(JsonValue::String(text.to_string())),
            None => get::<BigDecimal>(row, index)?.map(|d| numeric(&d)),
        },
        "MONEY" => get::<PgMoney>(row, index)?.map(money),
        "BOOL" => get::<bool>(row, index)?.map(JsonValue::Bool),
        "JSONB" | "JSON" => get::<JsonValue>(row, index)?,
        "UUID" => get::<Uuid>(row, index)?.map(|u| JsonValue::String(u.to_string())),
        "TIMESTAMPTZ" => {
            get::<DateTime<Utc>>(row, index)?.map(|dt| JsonValue::String(dt.to_rfc3339()))
        }
        "TIMESTAMP" => {
            get::<NaiveDateTime>(row, index)?.map(|dt| JsonValue::String(dt.to_string()))
        }
        "DATE" => get::<NaiveDate>(row, index)?.map(|d| JsonValue::String(d.to_string())),
        "TIME" => get::<NaiveTime>(row, index)?.map(|t| JsonValue::String(t.to_string())),
        "TIMETZ" => get::<PgTimeTz<NaiveTime, FixedOffset>>(row, index)?
            .map(|t| JsonValue::String(format!("{}{}", t.time, t.offset))),
        "INTERVAL" => {
            get::<PgInterval>(row, index)?.map(|i| JsonValue::String(interval(&i)))
        }

        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            get::<Vec<Option<String>>>(row, index)?.map(|v| json!(v))
        }
        "INT2[]" => get::<Vec<Option<i16>>>(row, index)?.map(|v| json!(v)),
        "INT4[]" => get::<Vec<Option<i32>>>(row, index)?.map(|v| json!(v)),
        "INT8[]" => get::<Vec<Option<i64>>>(row, index)?.map(|v| json!(v)),
        "FLOAT4[]" => get::<Vec<Option<f32>>>(row, index)?.map(|v| {
            v.into_iter()
                .map(|f| f.map_or(JsonValue::Null, |f| float(f64::from(f))))
                .collect()
        }),
        "FLOAT8[]" => get::<Vec<Option<f64>>>(row, index)?
            .map(|v| v.into_iter().map(|f| f.map_or(JsonValue::Null, float)).collect()),
        "NUMERIC[]" => get::<Vec<Option<BigDecimal>>>(row, index)?.map(|v| {
            v.iter()
                .map(|d| d.as_ref().map_or(JsonValue::Null, numeric))
                .collect()
        }),
        "BOOL[]" => get::<Vec<Option<bool>>>(row, index)?.map(|v| json!(v)),
        "UUID[]" => get::<Vec<Option<Uuid>>>(row, index)?.map(|v| json!(v)),
        "JSONB[]" | "JSON[]" => get::<Vec<Option<JsonValue>>>(row, index)?.map(|v| json!(v)),

        other => return Err(ColumnDecodeError::Unsupported(other.to_string())),
    };

    Ok(value)
}

/// Non-finite floats have no JSON number form and are kept as their text.
fn float(f: f64) -> JsonValue {
    serde_json::Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(f.to_string()))
}

/// Prices come back as f64, the same coercion a data frame read applies. Values
/// beyond f64 keep their exact decimal text.
fn numeric(d: &BigDecimal) -> JsonValue {
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(d.to_string()))
}

/// NaN and the infinities have no decimal form; pick them out of the raw value.
fn numeric_special(row: &PgRow, index: usize) -> Result<Option<&'static str>, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() || raw.format() != PgValueFormat::Binary {
        return Ok(None);
    }
    Ok(raw.as_bytes().ok().and_then(numeric_special_sign))
}

/// Binary NUMERIC header is ndigits, weight, sign, dscale (i16 each).
fn numeric_special_sign(bytes: &[u8]) -> Option<&'static str> {
    match bytes.get(4..6)? {
        [0xC0, 0x00] => Some("NaN"),
        [0xD0, 0x00] => Some("Infinity"),
        [0xF0, 0x00] => Some("-Infinity"),
        _ => None,
    }
}

fn money(m: PgMoney) -> JsonValue {
    let amount = m.to_decimal(MONEY_FRAC_DIGITS);
    amount
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(amount.to_string()))
}

/// Postgres-style interval text, e.g. `1 year 2 mons 3 days 04:05:06.5`
fn interval(i: &PgInterval) -> String {
    let mut parts = Vec::new();
    let (years, months) = (i.months / 12, i.months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "mon"));
    }
    if i.days != 0 {
        parts.push(unit(i.days, "day"));
    }

    if i.microseconds != 0 || parts.is_empty() {
        let sign = if i.microseconds < 0 { "-" } else { "" };
        let total = i.microseconds.unsigned_abs();
        let (secs, frac) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if frac != 0 {
            time.push_str(format!(".{frac:06}").trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

fn unit(n: i32, name: &str) -> String {
    if n.abs() == 1 {
        format!("{n} {name}")
    } else {
        format!("{n} {name}s")
    }
}
