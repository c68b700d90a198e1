//! HTTP handlers for the connector routes.

pub mod connector;
pub use connector::*;
