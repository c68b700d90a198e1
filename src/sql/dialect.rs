//! Backend dialects: identifier quoting, placeholders, row limiting and insert ids.

use crate::error::AppError;
use std::str::FromStr;

/// Database families the connector can render SQL for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    SqlServer,
    Postgres,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::SqlServer => "sqlserver",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(BackendKind::Sqlite),
            "sqlserver" | "mssql" => Ok(BackendKind::SqlServer),
            "postgres" | "postgresql" | "pgsql" => Ok(BackendKind::Postgres),
            _ => Err(AppError::Unsupported(format!(
                "backend {} (expected sqlite, sqlserver or postgres)",
                s
            ))),
        }
    }
}

/// How a backend hands back the unique id of a freshly inserted row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertedId {
    /// The driver reports the last inserted row id.
    LastRowId,
    /// `OUTPUT INSERTED.<col>` between the column list and VALUES.
    Output,
    /// Trailing `RETURNING <col>`.
    Returning,
}

pub trait Dialect: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Placeholder for the n-th bound value, counting from 1.
    fn placeholder(&self, n: usize) -> String;

    /// `SELECT <body>` limited to a single row.
    fn select_one_row(&self, body: &str) -> String {
        format!("SELECT {} LIMIT 1", body)
    }

    fn inserted_id(&self) -> InsertedId;

    /// Expression used on the left of a LIKE against the option-name column.
    fn like_operand(&self, quoted_column: &str) -> String {
        quoted_column.to_string()
    }
}

pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn placeholder(&self, _n: usize) -> String {
        "?".to_string()
    }

    fn inserted_id(&self) -> InsertedId {
        InsertedId::LastRowId
    }
}

pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::SqlServer
    }

    fn quote(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn placeholder(&self, n: usize) -> String {
        format!("@p{}", n)
    }

    fn select_one_row(&self, body: &str) -> String {
        format!("SELECT TOP 1 {}", body)
    }

    fn inserted_id(&self) -> InsertedId {
        InsertedId::Output
    }

    fn like_operand(&self, quoted_column: &str) -> String {
        format!("CAST({} AS NVARCHAR(MAX))", quoted_column)
    }
}

pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

    fn inserted_id(&self) -> InsertedId {
        InsertedId::Returning
    }

    fn like_operand(&self, quoted_column: &str) -> String {
        format!("CAST({} AS TEXT)", quoted_column)
    }
}
