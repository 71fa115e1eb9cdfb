//! Terminal UI layer for manifest-view.
//!
//! Provides themes, the passenger dashboard screen and the application
//! event loop built on top of [`ratatui`].

pub mod app;
pub mod dashboard_view;
pub mod themes;

pub use manifest_core as core;
