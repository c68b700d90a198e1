//! Connection pools for the supported backends and statement execution.

mod bind;
mod decode;

pub use bind::PgBindValue;

use crate::error::AppError;
use crate::sql::{BackendKind, QueryBuf, Registry};
use crate::value::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Column, Executor, Statement, TypeInfo};

/// One decoded row: column names (duplicates allowed for joins) with values, in select order.
pub type DecodedRow = Vec<(String, Value)>;

/// Outcome of a statement that returns no rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Executed {
    pub rows_affected: u64,
    /// SQLite only: rowid of the last inserted row.
    pub last_insert_id: Option<i64>,
}

#[derive(Clone, Debug)]
pub enum Database {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Database {
    /// Open a pool for `kind`. SQL Server has templates and a type table but no sqlx driver.
    pub async fn connect(kind: BackendKind, url: &str, max_connections: u32) -> Result<Self, AppError> {
        match kind {
            BackendKind::Postgres => {
                let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
                Ok(Database::Postgres(pool))
            }
            BackendKind::Sqlite => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url)
                    .await?;
                Ok(Database::Sqlite(pool))
            }
            BackendKind::SqlServer => Err(AppError::Unsupported(
                "no database driver is available for sqlserver".into(),
            )),
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Database::Postgres(_) => BackendKind::Postgres,
            Database::Sqlite(_) => BackendKind::Sqlite,
        }
    }

    /// Result columns of `sql` with their native type names, without reading rows.
    pub async fn describe(&self, sql: &str) -> Result<Vec<(String, String)>, AppError> {
        tracing::debug!(sql = %sql, "describe");
        let columns: Vec<(String, String)> = match self {
            Database::Postgres(pool) => {
                let stmt = pool.prepare(sql).await?;
                stmt.columns()
                    .iter()
                    .map(|c| (c.name().to_string(), c.type_info().name().to_string()))
                    .collect()
            }
            Database::Sqlite(pool) => {
                let stmt = pool.prepare(sql).await?;
                stmt.columns()
                    .iter()
                    .map(|c| (c.name().to_string(), c.type_info().name().to_string()))
                    .collect()
            }
        };
        Ok(columns)
    }

    /// Run a row-returning statement and decode every column through its classified container.
    pub async fn fetch_all(&self, q: &QueryBuf, registry: &Registry) -> Result<Vec<DecodedRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        match self {
            Database::Postgres(pool) => {
                let rows = bind::bind_postgres(sqlx::query(&q.sql), &q.params).fetch_all(pool).await?;
                rows.iter().map(|row| decode::postgres_row(row, registry)).collect()
            }
            Database::Sqlite(pool) => {
                let rows = bind::bind_sqlite(sqlx::query(&q.sql), &q.params).fetch_all(pool).await?;
                rows.iter().map(|row| decode::sqlite_row(row, registry)).collect()
            }
        }
    }

    pub async fn execute(&self, q: &QueryBuf) -> Result<Executed, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        match self {
            Database::Postgres(pool) => {
                let done = bind::bind_postgres(sqlx::query(&q.sql), &q.params).execute(pool).await?;
                Ok(Executed {
                    rows_affected: done.rows_affected(),
                    last_insert_id: None,
                })
            }
            Database::Sqlite(pool) => {
                let done = bind::bind_sqlite(sqlx::query(&q.sql), &q.params).execute(pool).await?;
                Ok(Executed {
                    rows_affected: done.rows_affected(),
                    last_insert_id: Some(done.last_insert_rowid()),
                })
            }
        }
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        match self {
            Database::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            Database::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }
}
