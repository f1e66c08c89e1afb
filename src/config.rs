//! Upstream provider settings, read from the process environment.

use std::time::Duration;

use tracing::warn;

use crate::error::{FleetError, Result};

pub const API_KEY_VAR: &str = "ONEBUSAWAY_API_KEY";
pub const BASE_URL_VAR: &str = "ONEBUSAWAY_BASE_URL";
pub const TIMEOUT_VAR: &str = "UPSTREAM_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_VAR: &str = "UPSTREAM_CONNECT_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.pugetsound.onebusaway.org";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the upstream transit provider.
///
/// The credential is optional here: a missing key does not prevent startup,
/// it surfaces as [`FleetError::ConfigMissing`] on the first upstream call.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Reads the settings from the process environment (after `.env` loading).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = non_empty(BASE_URL_VAR)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            api_key: non_empty(API_KEY_VAR),
            base_url,
            request_timeout: secs(non_empty(TIMEOUT_VAR), TIMEOUT_VAR, DEFAULT_TIMEOUT_SECS),
            connect_timeout: secs(
                non_empty(CONNECT_TIMEOUT_VAR),
                CONNECT_TIMEOUT_VAR,
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
        }
    }

    /// Returns the credential, or `ConfigMissing` when it is not configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(FleetError::ConfigMissing(API_KEY_VAR))
    }
}

fn secs(raw: Option<String>, name: &str, default: u64) -> Duration {
    let value = match raw {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(v) if v > 0 => v,
            _ => {
                warn!(var = name, value = %raw, default, "Invalid duration, using default");
                default
            }
        },
    };
    Duration::from_secs(value)
}
