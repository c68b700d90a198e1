//! Per-backend template set: one dialect plus its type classifier.

use crate::error::TemplateError;
use crate::sql::builder::{render, QueryBuf};
use crate::sql::dialect::{BackendKind, Dialect, PostgresDialect, SqlServerDialect, SqliteDialect};
use crate::sql::template::{QueryContext, QueryKind};
use crate::sql::types::{ScalarKind, TypeClassifier, POSTGRES_TYPES, SQLITE_TYPES, SQLSERVER_TYPES};

/// Built once at startup and shared; never mutated.
pub struct Registry {
    dialect: Box<dyn Dialect>,
    classifier: TypeClassifier,
}

impl Registry {
    pub fn for_backend(kind: BackendKind) -> Self {
        let (dialect, classifier): (Box<dyn Dialect>, TypeClassifier) = match kind {
            BackendKind::Sqlite => (Box::new(SqliteDialect), SQLITE_TYPES),
            BackendKind::SqlServer => (Box::new(SqlServerDialect), SQLSERVER_TYPES),
            BackendKind::Postgres => (Box::new(PostgresDialect), POSTGRES_TYPES),
        };
        Registry { dialect, classifier }
    }

    pub fn backend(&self) -> BackendKind {
        self.dialect.kind()
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn render(&self, kind: QueryKind, ctx: QueryContext<'_>) -> Result<QueryBuf, TemplateError> {
        render(self.dialect.as_ref(), kind, ctx)
    }

    pub fn classify(&self, native_type: &str) -> ScalarKind {
        self.classifier.classify(native_type)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("backend", &self.backend()).finish()
    }
}
