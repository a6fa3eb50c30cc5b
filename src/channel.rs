//! Channel name value object
//!
//! A channel is identified solely by its validated name. Names classify the
//! channel: `global` is public, `user.<id>` is private to one user, and the
//! `strategy.` / `backtest.` / `forge.job.` prefixes mark ephemeral channels
//! that are dropped when their last subscriber leaves.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Maximum channel name length
pub const MAX_CHANNEL_NAME_LENGTH: usize = 100;

/// Prefixes of channels that are removed when their last subscriber leaves
const EPHEMERAL_PREFIXES: [&str; 3] = ["strategy.", "backtest.", "forge.job."];

/// Built-in public channels open to any authenticated user
pub const PUBLIC_CHANNELS: [&str; 9] = [
    "trade",
    "candles",
    "sys",
    "rsi",
    "extrema",
    "analysis",
    "subscription",
    "payment",
    "deposit",
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Compile-time constant pattern, panicking here indicates a bug
        Regex::new(r"^[a-z0-9.\-]+$").expect("invalid channel name pattern")
    })
}

/// A validated channel name
///
/// Construction via [`ChannelName::parse`] guarantees the name is non-empty,
/// at most 100 characters, and contains only lowercase letters, digits, dots,
/// and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Parse and validate a channel name
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::Validation("Channel name cannot be empty".into()));
        }

        if name.len() > MAX_CHANNEL_NAME_LENGTH {
            return Err(Error::Validation(format!(
                "Channel name too long (max {} characters)",
                MAX_CHANNEL_NAME_LENGTH
            )));
        }

        if !name_pattern().is_match(name) {
            return Err(Error::Validation(
                "Channel name must contain only lowercase letters, numbers, dots, and hyphens"
                    .into(),
            ));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the global channel
    pub fn is_global(&self) -> bool {
        self.0 == "global"
    }

    /// Whether this is a user-specific channel (`user.<id>`)
    pub fn is_user_channel(&self) -> bool {
        self.0.starts_with("user.")
    }

    /// Whether this channel is removed once its last subscriber leaves
    pub fn is_ephemeral(&self) -> bool {
        EPHEMERAL_PREFIXES.iter().any(|p| self.0.starts_with(p))
    }

    /// Extract the user id from a `user.<id>` channel name
    pub fn extract_user_id(&self) -> Result<&str> {
        if !self.is_user_channel() {
            return Err(Error::Validation(format!(
                "Not a user channel: {}",
                self.0
            )));
        }
        Ok(&self.0["user.".len()..])
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
