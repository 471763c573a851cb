//! Core types and configuration for a0ctl.
//!
//! This crate defines the per-project app descriptor (`.a0/app.json`,
//! [`AppDescriptor`]), the user-level [`Settings`] file, and shared error types.

pub mod app;
pub mod error;
pub mod settings;

pub use app::{AppDescriptor, CONFIG_DIR, DESCRIPTOR_FILE, REGIONS, build_output_dir};
pub use error::{Error, Result};
pub use settings::Settings;
