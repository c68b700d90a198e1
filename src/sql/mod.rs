//! SQL rendering: dialects, named templates and native type classification.
//! Identifiers come from the descriptor only; values are always bound.

mod builder;
pub mod dialect;
pub mod registry;
pub mod template;
pub mod types;

pub use builder::*;
pub use dialect::*;
pub use registry::Registry;
pub use template::*;
pub use types::*;
