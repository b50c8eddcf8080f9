//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `linecord.toml`, `linecord.yaml` or `linecord.json`,
//! searched in `./` then `~/.config/linecord/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, discover_and_load, load_config},
    schema::{BridgeConfig, DiscordConfig, LineConfig, RelayConfig, ServerConfig},
    validate::{Diagnostic, Severity, has_errors, validate},
};
