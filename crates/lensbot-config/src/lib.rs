//! Configuration for the lensbot assistant.
//!
//! Provides TOML-based configuration with:
//! - One section per concern (`[llm]`, `[matching]`, `[conversation]`, ...)
//! - Config file layering (user config dir + project-local overrides)
//! - API key lookup through a configurable environment variable

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, Discovery, Layer, LoadedConfig, load_config, load_config_file, user_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::*;
