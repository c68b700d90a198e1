//! Workflow connector: exposes relational tables as a JSON resource API driven by a descriptor.

pub mod database;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod handlers;
pub mod request;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod value;

pub use database::Database;
pub use descriptor::{load, load_from_path, Descriptor};
pub use error::{AppError, DescriptorError, FormatError, TemplateError};
pub use routes::{common_routes, common_routes_with_ready, connector_routes, connector_routes_with_limit};
pub use schema::SchemaCatalog;
pub use service::ConnectorService;
pub use settings::Settings;
pub use sql::{BackendKind, Registry};
pub use state::AppState;
pub use value::Value;
