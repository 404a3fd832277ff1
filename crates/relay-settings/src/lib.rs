//! # relay-settings
//!
//! Layered configuration for coderelay: compiled defaults, deep-merged with
//! `~/.coderelay/settings.json`, then `RELAY_*` environment overrides.
//! Provider credentials are loaded separately via [`Credentials`].

pub mod credentials;
pub mod errors;
pub mod loader;
pub mod types;

pub use credentials::Credentials;
pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
