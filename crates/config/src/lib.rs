//! Configuration loading and env substitution.
//!
//! Config files: `murmur.toml`, `murmur.yaml`, or `murmur.json`
//! Searched in `./` then `~/.config/murmur/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{MurmurConfig, ServerConfig, TransmitConfig},
};
