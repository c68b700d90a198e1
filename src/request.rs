//! Request payloads: JSON or form bodies, URL query parameters, filters and value coercion.

use crate::error::AppError;
use crate::sql::{FilterOperator, ScalarKind};
use crate::value::Value;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, Method},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Parameters supplied by the client, keyed as the client names them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload(pub HashMap<String, Value>);

impl Payload {
    /// A JSON object body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AppError> {
        let parsed: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| AppError::RequestData(format!("unable to parse JSON body: {}", e)))?;
        match Value::from_json(parsed) {
            Value::Object(map) => Ok(Payload(map.into_iter().collect())),
            _ => Err(AppError::RequestData("JSON body must be an object".into())),
        }
    }

    /// A form body. Several values for one key are rejected.
    pub fn from_form(bytes: &[u8]) -> Result<Self, AppError> {
        let mut out = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(bytes) {
            if out.insert(k.to_string(), Value::String(v.into_owned())).is_some() {
                return Err(AppError::RequestData(format!(
                    "form data contained multiple input values for {}",
                    k
                )));
            }
        }
        Ok(Payload(out))
    }

    /// URL query parameters. The last occurrence of a key wins.
    pub fn from_query(query: &str) -> Self {
        let out = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        Payload(out)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query = req.uri().query().unwrap_or_default().to_string();
        if req.method() == Method::GET {
            return Ok(Payload::from_query(&query));
        }
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::RequestData(e.body_text()))?;
        if bytes.is_empty() {
            return Ok(Payload::from_query(&query));
        }
        if content_type.starts_with("application/json") {
            Payload::from_json(&bytes)
        } else {
            Payload::from_form(&bytes)
        }
    }
}

/// Parsed `filter=<param> <op> <value>` of a collection request.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterExpr {
    pub param: String,
    pub operator: FilterOperator,
    pub value: String,
}

fn filter_pattern() -> Result<&'static Regex, AppError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^\s*(\S+)\s+(eq|ne|lt|le|gt|ge|like)\s+(.*?)\s*$"))
        .as_ref()
        .map_err(|e| AppError::Unsupported(format!("filter pattern: {}", e)))
}

impl FilterExpr {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let caps = filter_pattern()?
            .captures(raw)
            .ok_or_else(|| AppError::RequestData(format!("malformed filter: {}", raw)))?;
        Ok(FilterExpr {
            param: caps[1].to_string(),
            operator: caps[2].parse()?,
            value: caps[3].to_string(),
        })
    }
}

fn parse_timestamp(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::Timestamp(t));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Value::Timestamp(t.and_utc().fixed_offset()));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| Value::Timestamp(t.and_utc().fixed_offset()))
}

/// `f` as an i64 when it is whole and inside the i64 range.
fn whole_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Typed uuid for a column whose native type is a UUID; other strings bind as text.
pub fn uuid_value(column: &str, value: Value) -> Result<Value, AppError> {
    match value {
        Value::String(s) => uuid::Uuid::parse_str(s.trim())
            .map(Value::Uuid)
            .map_err(|e| AppError::RequestData(format!("value {} for column {} is not a uuid: {}", s, column, e))),
        other => Ok(other),
    }
}

/// Convert a client value into the container of the target column before binding.
pub fn coerce(column: &str, value: Value, kind: ScalarKind) -> Result<Value, AppError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let converted = match (kind, &value) {
        (ScalarKind::Integer, Value::Integer(_)) => Some(value.clone()),
        (ScalarKind::Integer, Value::Float(f)) => whole_i64(*f).map(Value::Integer),
        (ScalarKind::Integer, Value::Bool(b)) => Some(Value::Integer(i64::from(*b))),
        (ScalarKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),

        (ScalarKind::Float, Value::Float(_)) => Some(value.clone()),
        (ScalarKind::Float, Value::Integer(n)) => Some(Value::Float(*n as f64)),
        (ScalarKind::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::Float),

        (ScalarKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ScalarKind::Boolean, Value::Integer(n)) if *n == 0 || *n == 1 => Some(Value::Bool(*n == 1)),
        (ScalarKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },

        (ScalarKind::Timestamp, Value::Timestamp(_)) => Some(value.clone()),
        (ScalarKind::Timestamp, Value::String(s)) => parse_timestamp(s),

        (ScalarKind::String, Value::String(_)) => Some(value.clone()),
        (ScalarKind::String, Value::Integer(n)) => Some(Value::String(n.to_string())),
        (ScalarKind::String, Value::Float(f)) => Some(Value::String(f.to_string())),
        (ScalarKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (ScalarKind::String, Value::Timestamp(t)) => Some(Value::String(t.to_rfc3339())),
        (ScalarKind::String, Value::Uuid(u)) => Some(Value::String(u.to_string())),
        (ScalarKind::String, Value::Object(_) | Value::Array(_)) => Some(Value::String(value.to_json().to_string())),
        _ => None,
    };
    converted.ok_or_else(|| {
        AppError::RequestData(format!(
            "value {} for column {} is not a valid {:?}",
            value.to_json(),
            column,
            kind
        ))
    })
}
