//! Native column type classification per backend family.

use serde::Serialize;

/// Container a native column value is decoded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ScalarKind {
    Integer,
    Float,
    String,
    Timestamp,
    Boolean,
}

/// Ordered table of (type-name prefixes, kind). First matching family wins.
#[derive(Clone, Copy, Debug)]
pub struct TypeClassifier {
    families: &'static [(&'static [&'static str], ScalarKind)],
}

impl TypeClassifier {
    pub const fn new(families: &'static [(&'static [&'static str], ScalarKind)]) -> Self {
        TypeClassifier { families }
    }

    /// Case-insensitive prefix match; unknown names fall back to String.
    pub fn classify(&self, native: &str) -> ScalarKind {
        let upper = native.trim().to_uppercase();
        for (prefixes, kind) in self.families {
            if prefixes.iter().any(|p| upper.starts_with(p)) {
                return *kind;
            }
        }
        ScalarKind::String
    }
}

const SQLITE_INTEGER: &[&str] = &[
    "BIGINT", "INT", "INT2", "INT8", "INTEGER", "MEDIUMINT", "SMALLINT", "TINYINT", "UNSIGNED",
];
const SQLITE_TEXT: &[&str] = &[
    "CHARACTER",
    "CLOB",
    "NATIVE CHARACTER",
    "NCHAR",
    "NVARCHAR",
    "TEXT",
    "VARCHAR",
    "VARYING CHARACTER",
];
const SQLITE_REAL: &[&str] = &["DOUBLE PRECISION", "DOUBLE", "FLOAT", "REAL"];
const SQLITE_NUMERIC: &[&str] = &["BOOLEAN", "DECIMAL", "NUMERIC"];
const SQLITE_DATE_TIME: &[&str] = &["DATE", "DATETIME"];

pub const SQLITE_TYPES: TypeClassifier = TypeClassifier::new(&[
    (SQLITE_INTEGER, ScalarKind::Integer),
    (SQLITE_TEXT, ScalarKind::String),
    (SQLITE_REAL, ScalarKind::Float),
    (SQLITE_NUMERIC, ScalarKind::Float),
    (SQLITE_DATE_TIME, ScalarKind::Timestamp),
]);

const SQLSERVER_INTEGER: &[&str] = &["TINYINT", "SMALLINT", "INT", "BIGINT"];
const SQLSERVER_TEXT: &[&str] = &[
    "CHAR", "VARCHAR", "TEXT", "NCHAR", "NVARCHAR", "NTEXT", "BINARY", "VARBINARY", "IMAGE",
];
// MONEY-like types fold into the numeric family
const SQLSERVER_NUMERIC: &[&str] = &["DECIMAL", "NUMERIC", "SMALLMONEY", "MONEY", "FLOAT", "REAL"];
const SQLSERVER_DATE_TIME: &[&str] = &[
    "DATETIME",
    "DATETIME2",
    "DATETIMEOFFSET",
    "SMALLDATETIME",
    "DATE",
    "TIME",
];

pub const SQLSERVER_TYPES: TypeClassifier = TypeClassifier::new(&[
    (SQLSERVER_INTEGER, ScalarKind::Integer),
    (SQLSERVER_TEXT, ScalarKind::String),
    (SQLSERVER_NUMERIC, ScalarKind::Float),
    (SQLSERVER_DATE_TIME, ScalarKind::Timestamp),
]);

const POSTGRES_TEXT: &[&str] = &["CHAR", "VARCHAR", "TEXT", "BYTEA", "BPCHAR", "NAME", "UUID"];
const POSTGRES_INTEGER: &[&str] = &["INT2", "INT4", "INT8"];
const POSTGRES_NUMERIC: &[&str] = &["NUMERIC", "MONEY", "FLOAT4", "FLOAT8"];
const POSTGRES_DATE_TIME: &[&str] = &["TIMESTAMP", "TIMESTAMPTZ", "DATE", "TIME", "TIMETZ"];
const POSTGRES_BOOLEAN: &[&str] = &["BOOL"];

pub const POSTGRES_TYPES: TypeClassifier = TypeClassifier::new(&[
    (POSTGRES_TEXT, ScalarKind::String),
    (POSTGRES_INTEGER, ScalarKind::Integer),
    (POSTGRES_NUMERIC, ScalarKind::Float),
    (POSTGRES_DATE_TIME, ScalarKind::Timestamp),
    (POSTGRES_BOOLEAN, ScalarKind::Boolean),
]);
