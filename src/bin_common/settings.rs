//! Hub client settings
//!
//! YAML file plus environment overrides, turned into a `hubstream` builder.
//! The library itself never reads files or the environment.

use hubstream::builder::states::{HasAddress, HasIdentity};
use hubstream::{ExponentialBackoff, FixedDelay, HubClientBuilder, TlsSettings, WireFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment variable overriding `address`
pub const ADDRESS_ENV: &str = "MHUB_ADDRESS";

/// Environment variable overriding `subscriber_id`
pub const SUBSCRIBER_ID_ENV: &str = "MHUB_SUBSCRIBER_ID";

/// Environment variable overriding `debug` (`1`/`true`/`yes`)
pub const DEBUG_ENV: &str = "MHUB_DEBUG";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid settings: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Frame encoding as written in YAML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireFormatSetting {
    #[default]
    Dotted,
    Escaped,
}

impl From<WireFormatSetting> for WireFormat {
    fn from(setting: WireFormatSetting) -> Self {
        match setting {
            WireFormatSetting::Dotted => WireFormat::Dotted,
            WireFormatSetting::Escaped => WireFormat::Escaped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSection {
    /// Plain TCP when false (loopback hubs and local testing only)
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
    #[serde(default)]
    pub verify_peer: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

impl Default for TlsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            ca_path: None,
            verify_peer: false,
            domain: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSection {
    /// Wait between failed handshakes
    #[serde(default = "default_reconnect_delay_secs")]
    pub delay_secs: u64,
    /// Upper bound for exponential backoff; fixed delay when absent
    #[serde(default)]
    pub max_delay_secs: Option<u64>,
    /// Give up after this many consecutive failures
    #[serde(default)]
    pub max_attempts: Option<usize>,
    /// Wait after a live session drops
    #[serde(default)]
    pub delay_offset_ms: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            delay_secs: default_reconnect_delay_secs(),
            max_delay_secs: None,
            max_attempts: None,
            delay_offset_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Settings for one hub client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Hub `host:port`
    pub address: String,
    /// Random UUID v4 when absent
    #[serde(default)]
    pub subscriber_id: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub debug: bool,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub wire_format: WireFormatSetting,
    #[serde(default)]
    pub tls: TlsSection,
    #[serde(default)]
    pub reconnect: ReconnectSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

impl HubSettings {
    /// Load settings from a YAML file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml_str(&yaml_content)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings.finalize()?;
        Ok(settings)
    }

    /// Parse settings without touching the environment
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override fields from `lookup` (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup(ADDRESS_ENV) {
            info!("Overriding hub address from {}", ADDRESS_ENV);
            self.address = address;
        }
        if let Some(id) = lookup(SUBSCRIBER_ID_ENV) {
            info!("Overriding subscriber id from {}", SUBSCRIBER_ID_ENV);
            self.subscriber_id = Some(id);
        }
        if let Some(debug) = lookup(DEBUG_ENV) {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Fill in the subscriber id if missing, then validate
    pub fn finalize(&mut self) -> Result<()> {
        if self.subscriber_id.is_none() {
            let id = uuid::Uuid::new_v4().to_string();
            info!("No subscriber id configured, generated {}", id);
            self.subscriber_id = Some(id);
        }
        self.validate()
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SettingsError::ValidationError(msg));

        match self.address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => return invalid(format!("address {:?} must be host:port", self.address)),
        }

        let format = WireFormat::from(self.wire_format);
        if let Some(id) = &self.subscriber_id {
            if format.validate_subscriber_id(id).is_err() {
                return invalid(format!("subscriber_id {:?} cannot be framed", id));
            }
        }
        for topic in &self.topics {
            if format.validate_topic(topic).is_err() {
                return invalid(format!("topic {:?} cannot be framed", topic));
            }
        }

        if self.reconnect.delay_secs == 0 {
            return invalid("reconnect.delay_secs must be greater than 0".to_string());
        }
        if let Some(max) = self.reconnect.max_delay_secs {
            if max < self.reconnect.delay_secs {
                return invalid("reconnect.max_delay_secs must be >= delay_secs".to_string());
            }
        }
        if self.dispatch.workers == 0 || self.dispatch.queue_capacity == 0 {
            return invalid("dispatch.workers and dispatch.queue_capacity must be greater than 0".to_string());
        }
        if self.read_buffer_size == 0 || self.max_frame_len == 0 {
            return invalid("read_buffer_size and max_frame_len must be greater than 0".to_string());
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return invalid(format!("log_level must be one of: {}", valid_levels.join(", ")));
        }

        Ok(())
    }

    /// Level used when `RUST_LOG` is not set
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    pub fn tls_settings(&self) -> TlsSettings {
        let mut tls = TlsSettings::new(&self.tls.cert_path, &self.tls.key_path)
            .verify_peer(self.tls.verify_peer);
        if let Some(ca) = &self.tls.ca_path {
            tls = tls.ca_path(ca);
        }
        if let Some(domain) = &self.tls.domain {
            tls = tls.domain(domain);
        }
        tls
    }

    /// Builder preloaded with these settings
    ///
    /// Add a handler (or parser) and call `build()`.
    pub fn client_builder(&self) -> HubClientBuilder<HasAddress, HasIdentity> {
        let subscriber_id = self
            .subscriber_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut builder = hubstream::builder()
            .address(self.address.clone())
            .subscriber_id(subscriber_id)
            .topics(self.topics.clone())
            .debug(self.debug)
            .wire_format(self.wire_format.into())
            .reconnection_delay_offset(Duration::from_millis(self.reconnect.delay_offset_ms))
            .read_buffer_size(self.read_buffer_size)
            .max_frame_len(self.max_frame_len)
            .dispatch_workers(self.dispatch.workers)
            .queue_capacity(self.dispatch.queue_capacity);

        let delay = Duration::from_secs(self.reconnect.delay_secs);
        builder = match self.reconnect.max_delay_secs {
            Some(max) => builder.reconnect_strategy(ExponentialBackoff::new(
                delay,
                Duration::from_secs(max),
                self.reconnect.max_attempts,
            )),
            None => builder.reconnect_strategy(FixedDelay::new(delay, self.reconnect.max_attempts)),
        };

        builder = if self.tls.enabled {
            builder.tls(self.tls_settings())
        } else {
            builder.plaintext()
        };

        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.read_timeout_secs {
            builder = builder.read_timeout(Duration::from_secs(secs));
        }
        builder
    }

    /// Log settings summary
    pub fn log(&self) {
        info!("Settings loaded:");
        info!("  Hub address: {}", self.address);
        info!("  Subscriber id: {}", self.subscriber_id.as_deref().unwrap_or("<generated>"));
        info!("  Topics: {:?}", self.topics);
        info!("  Wire format: {:?}", self.wire_format);
        info!(
            "  TLS: {} (verify peer: {})",
            if self.tls.enabled { "on" } else { "off" },
            self.tls.verify_peer
        );
        info!("  Reconnect delay: {}s", self.reconnect.delay_secs);
        info!("  Log level: {}", self.effective_log_level());
    }
}

fn default_true() -> bool {
    true
}

fn default_cert_path() -> PathBuf {
    PathBuf::from(hubstream::tls::DEFAULT_CERT_PATH)
}

fn default_key_path() -> PathBuf {
    PathBuf::from(hubstream::tls::DEFAULT_KEY_PATH)
}

fn default_reconnect_delay_secs() -> u64 {
    hubstream::DEFAULT_RECONNECT_DELAY.as_secs()
}

fn default_workers() -> usize {
    hubstream::dispatcher::DEFAULT_DISPATCH_WORKERS
}

fn default_queue_capacity() -> usize {
    hubstream::dispatcher::DEFAULT_QUEUE_CAPACITY
}

fn default_read_buffer_size() -> usize {
    hubstream::config::DEFAULT_READ_BUFFER_SIZE
}

fn default_max_frame_len() -> usize {
    hubstream::frame_decoder::DEFAULT_MAX_FRAME_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}
