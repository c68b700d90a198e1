//! Positional row decoding through the classified scalar container of each column.

use crate::error::AppError;
use crate::database::DecodedRow;
use crate::sql::{Registry, ScalarKind};
use crate::value::Value;
use bigdecimal::ToPrimitive;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::types::BigDecimal;
use sqlx::{Column, Row, TypeInfo, ValueRef};

fn naive(t: NaiveDateTime) -> Value {
    Value::Timestamp(t.and_utc().fixed_offset())
}

fn date(d: NaiveDate) -> Value {
    naive(d.and_time(NaiveTime::default()))
}

fn time(t: NaiveTime) -> Value {
    naive(NaiveDate::default().and_time(t))
}

fn time_tz(t: PgTimeTz<NaiveTime, FixedOffset>) -> Option<Value> {
    NaiveDate::default()
        .and_time(t.time)
        .and_local_timezone(t.offset)
        .single()
        .map(Value::Timestamp)
}

fn plural(n: i64, unit: &str) -> String {
    if n.abs() == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Interval in the server's default output style, e.g. `1 year 2 mons 3 days 04:05:06`.
fn interval_text(iv: &PgInterval) -> String {
    let mut parts = Vec::new();
    let (years, months) = (iv.months / 12, iv.months % 12);
    if years != 0 {
        parts.push(plural(i64::from(years), "year"));
    }
    if months != 0 {
        parts.push(plural(i64::from(months), "mon"));
    }
    if iv.days != 0 {
        parts.push(plural(i64::from(iv.days), "day"));
    }
    if iv.microseconds != 0 || parts.is_empty() {
        let sign = if iv.microseconds < 0 { "-" } else { "" };
        let micros = iv.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut clock = format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, secs / 60 % 60, secs % 60);
        if micros % 1_000_000 != 0 {
            clock.push_str(&format!(".{:06}", micros % 1_000_000));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// Text form of any Postgres value. Types without a dedicated decoder fall back to their raw bytes.
fn postgres_text(row: &PgRow, i: usize) -> Option<String> {
    if let Ok(s) = row.try_get::<String, _>(i) {
        return Some(s);
    }
    if let Ok(u) = row.try_get::<uuid::Uuid, _>(i) {
        return Some(u.to_string());
    }
    if let Ok(j) = row.try_get::<serde_json::Value, _>(i) {
        return Some(j.to_string());
    }
    if let Ok(iv) = row.try_get::<PgInterval, _>(i) {
        return Some(interval_text(&iv));
    }
    if let Ok(oid) = row.try_get::<Oid, _>(i) {
        return Some(oid.0.to_string());
    }
    if let Ok(items) = row.try_get::<Vec<String>, _>(i) {
        return serde_json::to_string(&items).ok();
    }
    if let Ok(items) = row.try_get::<Vec<i64>, _>(i) {
        return serde_json::to_string(&items).ok();
    }
    if let Ok(items) = row.try_get::<Vec<i32>, _>(i) {
        return serde_json::to_string(&items).ok();
    }
    row.try_get_unchecked::<Vec<u8>, _>(i)
        .ok()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}

fn mismatch(row_column: &str, expected: ScalarKind) -> AppError {
    AppError::ScanTypeMismatch {
        column: row_column.to_string(),
        expected,
    }
}

pub(crate) fn postgres(row: &PgRow, i: usize, name: &str, kind: ScalarKind) -> Result<Value, AppError> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }
    let decoded = match kind {
        ScalarKind::Integer => row
            .try_get::<i64, _>(i)
            .or_else(|_| row.try_get::<i32, _>(i).map(i64::from))
            .or_else(|_| row.try_get::<i16, _>(i).map(i64::from))
            .ok()
            .map(Value::Integer),
        ScalarKind::Float => row
            .try_get::<f64, _>(i)
            .or_else(|_| row.try_get::<f32, _>(i).map(f64::from))
            .ok()
            .or_else(|| row.try_get::<BigDecimal, _>(i).ok().and_then(|d| d.to_f64()))
            .or_else(|| row.try_get::<PgMoney, _>(i).ok().map(|m| m.0 as f64 / 100.0))
            .map(Value::Float),
        ScalarKind::String => postgres_text(row, i).map(Value::String),
        ScalarKind::Timestamp => row
            .try_get::<DateTime<Utc>, _>(i)
            .map(|t| Value::Timestamp(t.fixed_offset()))
            .or_else(|_| row.try_get::<NaiveDateTime, _>(i).map(naive))
            .or_else(|_| row.try_get::<NaiveDate, _>(i).map(date))
            .or_else(|_| row.try_get::<NaiveTime, _>(i).map(time))
            .ok()
            .or_else(|| row.try_get::<PgTimeTz, _>(i).ok().and_then(time_tz)),
        ScalarKind::Boolean => row.try_get::<bool, _>(i).ok().map(Value::Bool),
    };
    decoded.ok_or_else(|| mismatch(name, kind))
}

/// SQLite is dynamically typed; the storage class of a cell may differ from its declared type.
pub(crate) fn sqlite(row: &SqliteRow, i: usize, name: &str, kind: ScalarKind) -> Result<Value, AppError> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }
    let decoded = match kind {
        ScalarKind::Integer => row.try_get::<i64, _>(i).ok().map(Value::Integer),
        ScalarKind::Float => row
            .try_get::<f64, _>(i)
            .or_else(|_| row.try_get::<i64, _>(i).map(|n| n as f64))
            .ok()
            .map(Value::Float),
        ScalarKind::String => row
            .try_get::<String, _>(i)
            .or_else(|_| row.try_get::<i64, _>(i).map(|n| n.to_string()))
            .or_else(|_| row.try_get::<f64, _>(i).map(|f| f.to_string()))
            .or_else(|_| row.try_get::<Vec<u8>, _>(i).map(|b| String::from_utf8_lossy(&b).into_owned()))
            .ok()
            .map(Value::String),
        ScalarKind::Timestamp => row
            .try_get::<DateTime<FixedOffset>, _>(i)
            .map(Value::Timestamp)
            .or_else(|_| row.try_get::<NaiveDateTime, _>(i).map(naive))
            .or_else(|_| row.try_get::<NaiveDate, _>(i).map(date))
            .or_else(|_| row.try_get::<NaiveTime, _>(i).map(time))
            .ok(),
        ScalarKind::Boolean => row
            .try_get::<bool, _>(i)
            .or_else(|_| row.try_get::<i64, _>(i).map(|n| n != 0))
            .ok()
            .map(Value::Bool),
    };
    decoded.ok_or_else(|| mismatch(name, kind))
}

pub(crate) fn postgres_row(row: &PgRow, registry: &Registry) -> Result<DecodedRow, AppError> {
    let mut out = Vec::with_capacity(row.len());
    for (i, c) in row.columns().iter().enumerate() {
        let kind = registry.classify(c.type_info().name());
        out.push((c.name().to_string(), postgres(row, i, c.name(), kind)?));
    }
    Ok(out)
}

pub(crate) fn sqlite_row(row: &SqliteRow, registry: &Registry) -> Result<DecodedRow, AppError> {
    let mut out = Vec::with_capacity(row.len());
    for (i, c) in row.columns().iter().enumerate() {
        let kind = registry.classify(c.type_info().name());
        out.push((c.name().to_string(), sqlite(row, i, c.name(), kind)?));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_render_like_the_server() {
        let iv = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(interval_text(&iv(24, 0, 0)), "2 years");
        assert_eq!(interval_text(&iv(14, 3, 14_706_000_000)), "1 year 2 mons 3 days 04:05:06");
        assert_eq!(interval_text(&iv(0, 1, 0)), "1 day");
        assert_eq!(interval_text(&iv(0, 0, -1_500_000)), "-00:00:01.500000");
        assert_eq!(interval_text(&iv(0, 0, 0)), "00:00:00");
    }

    #[test]
    fn time_with_zone_keeps_its_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let t = PgTimeTz {
            time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            offset,
        };
        let Some(Value::Timestamp(ts)) = time_tz(t) else { panic!("expected timestamp") };
        assert_eq!(ts.to_rfc3339(), "1970-01-01T08:30:00+02:00");
    }

    #[test]
    fn naive_values_land_at_offset_zero() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let Value::Timestamp(t) = date(d) else { panic!("expected timestamp") };
        assert_eq!(t.offset().local_minus_utc(), 0);
        assert_eq!(t.to_rfc3339(), "2020-01-02T00:00:00+00:00");
    }
}
