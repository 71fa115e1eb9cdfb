//! Shared building blocks for manifest-view.
//!
//! Holds the error taxonomy, the passenger data model and filter
//! specification, numeric helpers, display formatting and the CLI settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;

pub use error::{ManifestError, Result, SchemaError};
