//! Shared types, error model, and configuration for Carton.
//!
//! This crate is the foundation depended on by all other Carton crates.
//! It provides:
//! - [`CartonError`]: the unified error type
//! - Key/value pair lists ([`JsonPairs`]) with first-match lookup and nuke-and-set
//! - Domain types ([`Status`], [`DeployBox`], [`Carton`], [`Policy`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod pairs;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, RepositoryConfig, StoreConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, validate_config,
};
pub use error::{CartonError, Result};
pub use pairs::{JsonPair, JsonPairs};
pub use types::{
    BoxCompute, Carton, DeployBox, Hook, Policy, Repo, Status, is_usable_id,
};
