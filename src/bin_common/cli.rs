//! CLI utilities for binaries
//!
//! Handles settings path resolution and argument parsing for `hubcat`.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Hub client settings (config/mhub.yaml)
    Hub,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Hub => "config/mhub.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Hub => "MHUB_CONFIG_PATH",
            ConfigType::Custom(_) => "MHUB_CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use mhub_client::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Hub);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// `hubcat` subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stay connected and print every message
    Listen,
    /// Publish one message and exit
    Publish { topic: String, payload: String },
}

impl Command {
    pub const USAGE: &'static str = "usage: hubcat listen | hubcat publish <topic> <payload>";

    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        match args {
            [cmd] if cmd == "listen" => Ok(Command::Listen),
            [cmd, topic, payload] if cmd == "publish" => Ok(Command::Publish {
                topic: topic.clone(),
                payload: payload.clone(),
            }),
            _ => anyhow::bail!(Self::USAGE),
        }
    }
}
