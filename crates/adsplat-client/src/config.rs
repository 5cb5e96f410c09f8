//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the console starts with zero
//! configuration; without a backend URL the remote-call capability is simply
//! unavailable.

use std::path::PathBuf;
use std::time::Duration;

use adsplat_shared::constants::{
    CLIENT_JSON_KEY, MENU_CACHE_TTL_SECS, SERVER_CACHE_TTL_SECS, SIGN_IN_PATH,
    SIGN_OUT_REDIRECT_DELAY_MS,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend's HTTP bridge.
    /// Env: `ADSPLAT_BACKEND_URL`
    /// Default: none (remote calls unavailable).
    pub backend_url: Option<String>,

    /// Directory holding the SQLite store.
    /// Env: `ADSPLAT_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Env: `ADSPLAT_SERVER_CACHE_TTL_SECS`
    /// Default: 2 hours.
    pub server_cache_ttl: Duration,

    /// Env: `ADSPLAT_MENU_CACHE_TTL_SECS`
    /// Default: 5 minutes.
    pub menu_cache_ttl: Duration,

    /// Delay between the sign-out notice and the redirect.
    /// Env: `ADSPLAT_REDIRECT_DELAY_MS`
    /// Default: 1500 ms.
    pub redirect_delay: Duration,

    /// Env: `ADSPLAT_SIGN_IN_PATH`
    /// Default: `/lock`
    pub sign_in_path: String,

    /// KV key sent to the backend as `client_json` on every call.
    /// Env: `ADSPLAT_CLIENT_JSON_KEY`
    /// Default: `client_json`
    pub client_json_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            data_dir: None,
            server_cache_ttl: Duration::from_secs(SERVER_CACHE_TTL_SECS),
            menu_cache_ttl: Duration::from_secs(MENU_CACHE_TTL_SECS),
            redirect_delay: Duration::from_millis(SIGN_OUT_REDIRECT_DELAY_MS),
            sign_in_path: SIGN_IN_PATH.to_string(),
            client_json_key: CLIENT_JSON_KEY.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("ADSPLAT_BACKEND_URL") {
            let url = url.trim();
            if !url.is_empty() {
                config.backend_url = Some(url.trim_end_matches('/').to_string());
            }
        }

        if let Some(dir) = lookup("ADSPLAT_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(ttl) = parse_u64(&lookup, "ADSPLAT_SERVER_CACHE_TTL_SECS") {
            config.server_cache_ttl = Duration::from_secs(ttl);
        }

        if let Some(ttl) = parse_u64(&lookup, "ADSPLAT_MENU_CACHE_TTL_SECS") {
            config.menu_cache_ttl = Duration::from_secs(ttl);
        }

        if let Some(ms) = parse_u64(&lookup, "ADSPLAT_REDIRECT_DELAY_MS") {
            config.redirect_delay = Duration::from_millis(ms);
        }

        if let Some(path) = lookup("ADSPLAT_SIGN_IN_PATH") {
            if path.starts_with('/') {
                config.sign_in_path = path;
            } else {
                tracing::warn!(value = %path, "Invalid ADSPLAT_SIGN_IN_PATH, using default");
            }
        }

        if let Some(key) = lookup("ADSPLAT_CLIENT_JSON_KEY") {
            if !key.trim().is_empty() {
                config.client_json_key = key.trim().to_string();
            }
        }

        config
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Invalid number, using default");
            None
        }
    }
}
