//! Server configuration read from the environment.
//!
//! ```bash
//! TROLLEY_PUBLIC_ORIGIN=https://trolley.example.com  # used to build invite links
//! TROLLEY_INVITE_TTL_HOURS=72                        # lifetime of a fresh invite token
//! ```

use std::env;
use thiserror::Error;
use trolley_core::CoreConfig;

pub const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_INVITE_TTL_HOURS: i64 = 72;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Origin invite links point at, without trailing slash
    pub public_origin: String,
    pub invite_ttl_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_origin: DEFAULT_PUBLIC_ORIGIN.to_string(),
            invite_ttl_hours: DEFAULT_INVITE_TTL_HOURS,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid public origin: {0}. Expected an http:// or https:// URL")]
    InvalidOrigin(String),

    #[error("Invalid invite TTL: {0}. Expected a positive number of hours")]
    InvalidInviteTtl(String),
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_origin = match env::var("TROLLEY_PUBLIC_ORIGIN") {
            Ok(origin) => {
                let origin = origin.trim().trim_end_matches('/').to_string();
                let host = origin
                    .strip_prefix("https://")
                    .or_else(|| origin.strip_prefix("http://"));
                if host.map_or(true, str::is_empty) {
                    return Err(ConfigError::InvalidOrigin(origin));
                }
                origin
            }
            Err(_) => DEFAULT_PUBLIC_ORIGIN.to_string(),
        };

        let invite_ttl_hours = match env::var("TROLLEY_INVITE_TTL_HOURS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => return Err(ConfigError::InvalidInviteTtl(raw)),
            },
            Err(_) => DEFAULT_INVITE_TTL_HOURS,
        };

        Ok(Self {
            public_origin,
            invite_ttl_hours,
        })
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            public_origin: self.public_origin.clone(),
            invite_ttl: chrono::Duration::hours(self.invite_ttl_hours),
        }
    }
}
