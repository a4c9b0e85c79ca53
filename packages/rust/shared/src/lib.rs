//! Shared types, error model, and configuration for paperdigest.
//!
//! This crate is the foundation depended on by all other paperdigest crates.
//! It provides:
//! - [`PaperdigestError`] — the unified error type
//! - Domain types ([`Category`], [`PaperMeta`], [`PaperRecord`])
//! - Configuration ([`AppConfig`], config loading, API key lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenAiConfig, ServerConfig, api_key, config_dir, config_file_path,
    default_categories, expand_home, load_config, load_config_from,
};
pub use error::{PaperdigestError, Result};
pub use types::{Category, NEUTRAL_SCORE, PaperMeta, PaperRecord, slugify, today_utc};
