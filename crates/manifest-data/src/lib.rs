//! Data layer for manifest-view.
//!
//! Reads raw passenger rows from a file or a hosted table, normalizes them
//! into a typed [`PassengerTable`](manifest_core::models::PassengerTable),
//! filters, summarizes and groups them for the dashboard.

pub mod aggregator;
pub mod analysis;
pub mod filter;
pub mod normalizer;
pub mod reader;
pub mod summary;

pub use manifest_core as core;
