//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Extra public channels, merged with the built-in allow-list
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,

    /// 0 = unlimited
    #[serde(default)]
    pub max_clients_per_channel: usize,

    /// 0 = unlimited
    #[serde(default)]
    pub max_total_connections: usize,

    /// Outbound frames buffered per subscriber before it is evicted
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    #[serde(default)]
    pub shutdown: ShutdownConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_outbound_buffer() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            channels: Vec::new(),
            heartbeat_interval: default_heartbeat_interval(),
            max_clients_per_channel: 0,
            max_total_connections: 0,
            outbound_buffer: default_outbound_buffer(),
            shutdown: ShutdownConfig::default(),
            rate_limit: RateLimitConfig::default(),
            limits: LimitsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Listen address for the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8765
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub require_auth: bool,

    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            jwt_secret: None,
            jwt_algorithm: default_jwt_algorithm(),
        }
    }
}

/// Graceful shutdown timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Overall deadline for the shutdown sequence
    #[serde(default = "default_shutdown_timeout")]
    pub timeout: u64,

    /// Seconds to wait for clients to disconnect on their own
    #[serde(default = "default_grace_period")]
    pub grace_period: u64,
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_grace_period() -> u64 {
    5
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout: default_shutdown_timeout(),
            grace_period: default_grace_period(),
        }
    }
}

/// Rate limiting for publishers and WebSocket connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Publish requests per identifier per window
    #[serde(default = "default_publish_requests")]
    pub publish_requests: u32,

    /// Concurrent WebSocket connections per user (0 = unlimited)
    #[serde(default = "default_websocket_connections")]
    pub websocket_connections: usize,

    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Message-type ceilings, checked instead of the global publish limit
    #[serde(default)]
    pub per_type: HashMap<String, u32>,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_publish_requests() -> u32 {
    100
}

fn default_websocket_connections() -> usize {
    10
}

fn default_window_seconds() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            publish_requests: default_publish_requests(),
            websocket_connections: default_websocket_connections(),
            window_seconds: default_window_seconds(),
            per_type: HashMap::new(),
        }
    }
}

/// Message size and shape limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,

    #[serde(default = "default_max_array_size")]
    pub max_array_size: usize,
}

fn default_max_message_size() -> usize {
    1_048_576
}

fn default_max_string_length() -> usize {
    10_000
}

fn default_max_array_size() -> usize {
    1_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_string_length: default_max_string_length(),
            max_array_size: default_max_array_size(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["debug", "info", "warning", "error", "critical"];

impl Config {
    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        if self.auth.require_auth && self.auth.jwt_secret.is_none() {
            return Err(Error::Config(
                "auth.jwt_secret is required when auth.require_auth is enabled".into(),
            ));
        }

        Ok(())
    }

    /// Map the configured level onto a tracing directive
    pub fn tracing_directive(&self) -> String {
        let level = match self.log_level.as_str() {
            "warning" => "warn",
            "critical" => "error",
            other => other,
        };
        format!("courier={}", level)
    }
}
