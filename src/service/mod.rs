//! ConnectorService: descriptor-driven operations over the configured backend.

mod connector;
pub use connector::{ConnectorService, FILTER_PARAM};
