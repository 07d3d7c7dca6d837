//! mhub client
//!
//! Streaming pub/sub client for the hub plus the process-level pieces its
//! binaries share.
//!
//! ## Architecture
//!
//! - **hubstream**: Reconnecting client library (re-exported from workspace)
//! - **bin_common**: Settings, CLI and logging helpers for binaries
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use mhub_client::bin_common::{load_config_from_env, ConfigType, HubSettings};
//!
//! let settings = HubSettings::load(load_config_from_env(ConfigType::Hub))?;
//! let client = settings.client_builder().build().await?;
//! ```

// Re-export workspace libraries for convenience
pub use hubstream;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod settings;

    pub use cli::{load_config_from_env, parse_args, Command, ConfigType};
    pub use logging::init_tracing;
    pub use settings::{HubSettings, SettingsError};
}
