//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Every section has defaults so a minimal file (or none) works.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Site identity and URL mode.
    pub site: SiteConfig,

    /// Optional modules that contribute routes.
    pub plugins: PluginsConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Timeline id cache settings.
    pub stream: StreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Site settings that shape the route set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Display name.
    pub name: String,

    /// Public base URL links are built against.
    pub base_url: String,

    /// Omit `index.php/` from generated links.
    pub fancy_urls: bool,

    /// Single-user mode binds user pages to one nickname.
    pub single_user: bool,

    /// The nickname used in single-user mode.
    pub single_user_nickname: String,

    /// Code version; part of the router cache fingerprint.
    pub version: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "GNU social".to_string(),
            base_url: "http://localhost:8080/".to_string(),
            fancy_urls: true,
            single_user: false,
            single_user_nickname: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Enabled plugins, by name.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PluginsConfig {
    pub enabled: Vec<String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Windowed id cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum number of ids kept per cached stream.
    pub window: usize,

    /// Refresh from the last known window instead of refetching it.
    pub use_last: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window: crate::stream::CACHE_WINDOW,
            use_last: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
