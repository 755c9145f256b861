//! Engine configuration.
//!
//! Loads and validates the YAML file that sets polling cadence, the live
//! data source, the speech and playback commands and objective metadata.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
