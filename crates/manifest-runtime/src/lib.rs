//! Runtime layer for manifest-view.
//!
//! Owns the TTL-cached record set and the caller-owned dashboard state that
//! the presentation layer drives.

pub mod data_manager;
pub mod session;

pub use manifest_core as core;
pub use manifest_data as data;
