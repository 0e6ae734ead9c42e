// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Token secrets are
//! mandatory; everything else has a default. Provider credentials (Gemini,
//! Uploadcare) are read by the provider clients themselves and are optional;
//! an unconfigured provider disables its feature instead of failing startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the embedded database | `./data` |
//! | `ACCESS_TOKEN_SECRET` | HS256 key for access tokens | Required |
//! | `REFRESH_TOKEN_SECRET` | HS256 key for refresh tokens | Required |
//! | `ACCESS_TOKEN_TTL_SECS` | Access token validity in seconds | `31536000` (1 year) |
//! | `REFRESH_TOKEN_TTL_SECS` | Refresh token validity in seconds | `604800` (7 days) |
//! | `GEMINI_API_KEY` | Gemini credential (unset disables AI endpoints' upstream) | Optional |
//! | `UPLOADCARE_PUBLIC_KEY` | Uploadcare credential (unset disables uploads) | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `json` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

/// Environment variable name for the database directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the access token signing secret.
pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";

/// Environment variable name for the refresh token signing secret.
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Default access token validity: 1 year.
///
/// Unusually long for a bearer credential; kept for contract parity with the
/// clients this service serves, overridable per deployment.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Default refresh token validity: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Server configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", DEFAULT_HOST);
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let data_dir = PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR));
        let access_secret = env_required(ACCESS_SECRET_ENV)?;
        let refresh_secret = env_required(REFRESH_SECRET_ENV)?;
        let access_ttl_secs =
            env_i64_or_default("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?;
        let refresh_ttl_secs =
            env_i64_or_default("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)?;

        Ok(Self {
            host,
            port,
            data_dir,
            access_secret,
            refresh_secret,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    /// Socket address string to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn env_i64_or_default(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(default);
            }
            trimmed.parse().map_err(|_| ConfigError::InvalidVar {
                name,
                value: raw,
            })
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_joins_host_and_port() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9100,
            data_dir: PathBuf::from("/tmp/x"),
            access_secret: "a".to_string(),
            refresh_secret: "r".to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9100");
    }

    #[test]
    fn ttl_defaults_are_one_year_and_seven_days() {
        assert_eq!(DEFAULT_ACCESS_TOKEN_TTL_SECS, 31_536_000);
        assert_eq!(DEFAULT_REFRESH_TOKEN_TTL_SECS, 604_800);
    }
}
