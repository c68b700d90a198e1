//! Shared application state for all routes. Built once at startup, read-only afterwards.

use crate::database::Database;
use crate::descriptor::Descriptor;
use crate::error::AppError;
use crate::schema::SchemaCatalog;
use crate::service::ConnectorService;
use crate::sql::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub registry: Arc<Registry>,
    pub descriptor: Arc<Descriptor>,
    pub schemas: Arc<SchemaCatalog>,
}

impl AppState {
    /// Introspect every described table, then assemble the state.
    pub async fn initialize(db: Database, descriptor: Descriptor) -> Result<Self, AppError> {
        let registry = Registry::for_backend(db.backend());
        let schemas = SchemaCatalog::introspect(&db, &registry, &descriptor).await?;
        Ok(AppState {
            db,
            registry: Arc::new(registry),
            descriptor: Arc::new(descriptor),
            schemas: Arc::new(schemas),
        })
    }

    pub fn service(&self) -> ConnectorService<'_> {
        ConnectorService::new(&self.db, &self.registry, &self.descriptor, &self.schemas)
    }
}
