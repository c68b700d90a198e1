//! Router assembly.

mod common;
mod connector;

pub use common::{common_routes, common_routes_with_ready};
pub use connector::{connector_routes, connector_routes_with_limit};
