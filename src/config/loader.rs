//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

use super::Config;

const CONFIG_FILENAME: &str = "courier.toml";

/// Load configuration from courier.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<std::path::PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Compile-time constant pattern, panicking here indicates a bug
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("invalid interpolation pattern");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Courier Configuration
# WebSocket event broadcasting hub

[server]
host = "0.0.0.0"
port = 8765

# Extra public channels, merged with the built-in allow-list
# (trade, candles, sys, rsi, extrema, analysis, subscription, payment, deposit)
channels = []

heartbeat_interval = 30
max_clients_per_channel = 0   # 0 = unlimited
max_total_connections = 0     # 0 = unlimited
outbound_buffer = 32

log_level = "info"            # debug | info | warning | error | critical

[auth]
require_auth = false
# jwt_secret = "${COURIER_JWT_SECRET}"
jwt_algorithm = "HS256"

[shutdown]
timeout = 30
grace_period = 5

[rate_limit]
enabled = true
publish_requests = 100        # per identifier per window
websocket_connections = 10    # concurrent connections per user, 0 = unlimited
window_seconds = 60

# Per-message-type publish ceilings (checked instead of the global limit)
# [rate_limit.per_type]
# trade = 50
# candles = 200

[limits]
max_message_size = 1048576    # bytes
max_string_length = 10000
max_array_size = 1000
"#
}
