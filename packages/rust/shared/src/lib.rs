//! Shared types, error model, and configuration for pagelift.
//!
//! This crate is the foundation depended on by all other pagelift crates.
//! It provides:
//! - [`PageliftError`] — the unified error type
//! - The block data model ([`Block`], [`TextSpan`], [`Color`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContentConfig, ImagesConfig, StoreConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key, validate_for_sync,
};
pub use error::{PageliftError, Result};
pub use types::{Annotations, Block, Color, Style, TextSpan};
