//! carto-core: Shared types, errors, kind registry, and configuration for carto.

pub mod config;
pub mod error;
pub mod kinds;
pub mod types;

pub use config::*;
pub use error::*;
pub use kinds::*;
pub use types::*;
