//! Configuration management for the Last.fm scrobble client.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage the Last.fm
//! credentials and the tuning knobs of the client (call limit, page sizes and
//! whether now playing tracks are part of fetched histories).
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (see [`LastfmConfiguration::default`])

use std::{env, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, ScrobbleError};

pub const DEFAULT_API_CALL_LIMIT: u32 = 5;
pub const DEFAULT_MILLIS_FOR_CALL_LIMIT: u64 = 1039;
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 50;
pub const DEFAULT_MAX_RESULTS_PER_PAGE: u32 = 1000;
pub const DEFAULT_INCLUDE_NOW_PLAYING: bool = false;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file is looked up under `lastfm-scrobbler/.env` in the platform-specific
/// local data directory:
/// - Linux: `~/.local/share/lastfm-scrobbler/.env`
/// - macOS: `~/Library/Application Support/lastfm-scrobbler/.env`
/// - Windows: `%LOCALAPPDATA%/lastfm-scrobbler/.env`
///
/// A missing file is not an error, since every value can also be provided
/// through the process environment. Variables already set in the environment
/// are not overridden.
///
/// # Errors
///
/// Returns [`ScrobbleError::Config`] if the file exists but cannot be read or parsed.
///
/// # Example
///
/// ```
/// use lastfm_scrobbler::config;
///
/// if let Err(e) = config::load_env() {
///     eprintln!("Configuration error: {}", e);
/// }
/// ```
pub fn load_env() -> Result<()> {
    let path = env_file_path();
    if !path.exists() {
        log::debug!("No environment file found at {}", path.display());
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| ScrobbleError::Config(e.to_string()))?;
    log::debug!("Loaded environment file {}", path.display());
    Ok(())
}

/// Location of the `.env` file read by [`load_env`].
pub fn env_file_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("lastfm-scrobbler/.env");
    path
}

/// Returns the Last.fm API key from `LASTFM_API_KEY`.
pub fn lastfm_api_key() -> Option<String> {
    non_empty_var("LASTFM_API_KEY")
}

/// Returns the shared secret of the API key from `LASTFM_SHARED_SECRET`.
///
/// The shared secret signs write requests and should be kept confidential and
/// never exposed in logs or version control.
pub fn lastfm_shared_secret() -> Option<String> {
    non_empty_var("LASTFM_SHARED_SECRET")
}

/// Returns the Last.fm username from `LASTFM_USERNAME`.
pub fn lastfm_username() -> Option<String> {
    non_empty_var("LASTFM_USERNAME")
}

/// Returns the Last.fm account password from `LASTFM_PASSWORD`.
pub fn lastfm_password() -> Option<String> {
    non_empty_var("LASTFM_PASSWORD")
}

/// Returns the user agent sent with every HTTP request from `LASTFM_USER_AGENT`.
pub fn lastfm_user_agent() -> Option<String> {
    non_empty_var("LASTFM_USER_AGENT")
}

/// Tuning of the scrobble client.
///
/// Last.fm allows roughly five calls per second per API key; the window is a
/// little longer than a second so that clock jitter does not push a burst over
/// the limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastfmConfiguration {
    /// Maximum number of API calls within one call limit window.
    pub api_call_limit: u32,
    /// Length of the call limit window in milliseconds.
    pub millis_for_call_limit: u64,
    /// Page size used when fetching a bounded history.
    pub results_per_page: u32,
    /// Page size used when fetching the complete history.
    pub max_results_per_page: u32,
    /// Whether the currently playing track is part of fetched histories.
    pub include_now_playing: bool,
}

impl Default for LastfmConfiguration {
    fn default() -> Self {
        Self {
            api_call_limit: DEFAULT_API_CALL_LIMIT,
            millis_for_call_limit: DEFAULT_MILLIS_FOR_CALL_LIMIT,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
            max_results_per_page: DEFAULT_MAX_RESULTS_PER_PAGE,
            include_now_playing: DEFAULT_INCLUDE_NOW_PLAYING,
        }
    }
}

impl LastfmConfiguration {
    /// Builds a configuration from the `LASTFM_*` environment variables.
    ///
    /// Absent or unparsable values fall back to their defaults:
    ///
    /// | Variable                       | Default |
    /// |--------------------------------|---------|
    /// | `LASTFM_API_CALL_LIMIT`        | 5       |
    /// | `LASTFM_MILLIS_FOR_CALL_LIMIT` | 1039    |
    /// | `LASTFM_RESULTS_PER_PAGE`      | 50      |
    /// | `LASTFM_MAX_RESULTS_PER_PAGE`  | 1000    |
    /// | `LASTFM_INCLUDE_NOW_PLAYING`   | false   |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            api_call_limit: parse_or(
                lookup("LASTFM_API_CALL_LIMIT"),
                defaults.api_call_limit,
            ),
            millis_for_call_limit: parse_or(
                lookup("LASTFM_MILLIS_FOR_CALL_LIMIT"),
                defaults.millis_for_call_limit,
            ),
            results_per_page: parse_or(
                lookup("LASTFM_RESULTS_PER_PAGE"),
                defaults.results_per_page,
            ),
            max_results_per_page: parse_or(
                lookup("LASTFM_MAX_RESULTS_PER_PAGE"),
                defaults.max_results_per_page,
            ),
            include_now_playing: parse_or(
                lookup("LASTFM_INCLUDE_NOW_PLAYING"),
                defaults.include_now_playing,
            ),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_lastfm_limits() {
        let config = LastfmConfiguration::default();
        assert_eq!(config.api_call_limit, 5);
        assert_eq!(config.millis_for_call_limit, 1039);
        assert_eq!(config.results_per_page, 50);
        assert_eq!(config.max_results_per_page, 1000);
        assert!(!config.include_now_playing);
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = LastfmConfiguration::from_lookup(lookup_from(&[]));
        assert_eq!(config, LastfmConfiguration::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = LastfmConfiguration::from_lookup(lookup_from(&[
            ("LASTFM_API_CALL_LIMIT", "3"),
            ("LASTFM_MILLIS_FOR_CALL_LIMIT", "250"),
            ("LASTFM_RESULTS_PER_PAGE", " 20 "),
            ("LASTFM_INCLUDE_NOW_PLAYING", "true"),
        ]));

        assert_eq!(config.api_call_limit, 3);
        assert_eq!(config.millis_for_call_limit, 250);
        assert_eq!(config.results_per_page, 20);
        assert_eq!(config.max_results_per_page, 1000);
        assert!(config.include_now_playing);
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let config = LastfmConfiguration::from_lookup(lookup_from(&[
            ("LASTFM_API_CALL_LIMIT", "five"),
            ("LASTFM_INCLUDE_NOW_PLAYING", "yes"),
        ]));

        assert_eq!(config.api_call_limit, DEFAULT_API_CALL_LIMIT);
        assert!(!config.include_now_playing);
    }

    #[test]
    fn deserializes_partial_configuration() {
        let config: LastfmConfiguration =
            serde_json::from_str(r#"{"results_per_page": 10}"#).unwrap();
        assert_eq!(config.results_per_page, 10);
        assert_eq!(config.api_call_limit, DEFAULT_API_CALL_LIMIT);
    }
}
