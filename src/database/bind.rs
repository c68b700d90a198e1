//! Binding canonical values to sqlx queries.

use crate::value::Value;
use chrono::{DateTime, FixedOffset};
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::query::Query;
use sqlx::sqlite::Sqlite;
use sqlx::{Database, Type};

/// A value bound to a PostgreSQL statement. Each variant reports its own wire type.
#[derive(Clone, Debug)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Timestamp(DateTime<FixedOffset>),
    Json(serde_json::Value),
}

impl From<&Value> for PgBindValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Integer(n) => PgBindValue::I64(*n),
            Value::Float(f) => PgBindValue::F64(*f),
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Timestamp(t) => PgBindValue::Timestamp(*t),
            Value::Uuid(u) => PgBindValue::Uuid(*u),
            Value::Object(_) | Value::Array(_) => PgBindValue::Json(v.to_json()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => IsNull::Yes,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            PgBindValue::Timestamp(t) => <DateTime<FixedOffset> as Encode<Postgres>>::encode_by_ref(t, buf)?,
            PgBindValue::Json(v) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            // unspecified: the server infers the parameter type from context
            PgBindValue::Null => PgTypeInfo::with_oid(Oid(0)),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => <DateTime<FixedOffset> as Type<Postgres>>::type_info(),
            PgBindValue::Json(_) => <serde_json::Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

pub(crate) type PgQuery<'q> = Query<'q, Postgres, <Postgres as Database>::Arguments<'q>>;
pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;

pub(crate) fn bind_postgres<'q>(mut query: PgQuery<'q>, params: &[Value]) -> PgQuery<'q> {
    for p in params {
        query = query.bind(PgBindValue::from(p));
    }
    query
}

pub(crate) fn bind_sqlite<'q>(mut query: SqliteQuery<'q>, params: &[Value]) -> SqliteQuery<'q> {
    for p in params {
        query = match p {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Integer(n) => query.bind(*n),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.clone()),
            Value::Timestamp(t) => query.bind(*t),
            Value::Uuid(u) => query.bind(u.to_string()),
            Value::Object(_) | Value::Array(_) => query.bind(p.to_json().to_string()),
        };
    }
    query
}
