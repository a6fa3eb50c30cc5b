//! JWT token verification and channel access rules
//!
//! Courier only verifies tokens; issuing belongs to the upstream auth
//! service. The verifier is a plain value over `{secret, algorithm}` so
//! deployments and tests construct their own instances.

use crate::channel::PUBLIC_CHANNELS;
use crate::error::{Error, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a Courier access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub user_id: String,
    /// Wallet address
    pub wallet_address: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration time (Unix seconds)
    pub exp: i64,
}

/// Verifies tokens and answers channel-access questions
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    /// Extra public channels from config, merged with the built-ins
    extra_channels: Vec<String>,
}

impl TokenVerifier {
    pub fn new(secret: &str, algorithm: &str, extra_channels: Vec<String>) -> Result<Self> {
        let algorithm = match algorithm {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(Error::Config(format!(
                    "Unsupported JWT algorithm: {}",
                    other
                )))
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            extra_channels,
        })
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => Error::TokenExpired,
                    ErrorKind::MissingRequiredClaim(claim) => {
                        Error::MissingClaim(claim.to_string())
                    }
                    _ => Error::TokenInvalid(e.to_string()),
                }
            })
    }

    /// Whether `user_id` may subscribe to `channel`
    ///
    /// Rules, in order:
    /// - `global` is open to everyone
    /// - `user.<id>` only to the matching user
    /// - `strategy.` / `backtest.` / `forge.job.` prefixes are open
    ///   (ownership checks belong to a future ownership service)
    /// - names on the public allow-list are open
    /// - everything else is denied
    pub fn authorize(&self, user_id: &str, channel: &str) -> bool {
        if channel == "global" {
            return true;
        }

        if let Some(channel_user_id) = channel.strip_prefix("user.") {
            return channel_user_id == user_id;
        }

        if channel.starts_with("strategy.")
            || channel.starts_with("backtest.")
            || channel.starts_with("forge.job.")
        {
            return true;
        }

        if PUBLIC_CHANNELS.contains(&channel) {
            return true;
        }

        if self.extra_channels.iter().any(|c| c == channel) {
            return true;
        }

        false
    }
}
