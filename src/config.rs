use log::{debug, info};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AmbientError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.ambientweather.net/v1";
const DEFAULT_TIMEOUT_MS: u64 = 30000;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_HISTORY_HOURS: u32 = 24;

/// The two parallel credential lists. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_keys: Vec<String>,
    pub application_keys: Vec<String>,
}

impl Credentials {
    pub fn new(api_keys: Vec<String>, application_keys: Vec<String>) -> Result<Self> {
        if api_keys.is_empty() {
            return Err(AmbientError::configuration(
                "No API keys configured. Please set AMBIENT_API_KEYS or AMBIENT_API_KEY_<N>",
            ));
        }
        if application_keys.is_empty() {
            return Err(AmbientError::configuration(
                "No application keys configured. Please set AMBIENT_APPLICATION_KEYS or AMBIENT_APPLICATION_KEY_<N>",
            ));
        }
        Ok(Credentials {
            api_keys,
            application_keys,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub history_hours: u32,
}

impl WeatherConfig {
    pub fn new() -> Result<Self> {
        // Load environment variables
        dotenv::dotenv().ok();

        let api_keys = load_key_list("AMBIENT_API_KEYS", "AMBIENT_API_KEY_");
        let application_keys =
            load_key_list("AMBIENT_APPLICATION_KEYS", "AMBIENT_APPLICATION_KEY_");
        info!(
            "Loaded {} API keys and {} application keys",
            api_keys.len(),
            application_keys.len()
        );
        let credentials = Credentials::new(api_keys, application_keys)?;

        let base_url =
            env::var("AMBIENT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_ms = parse_env("AMBIENT_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let max_retries = parse_env("AMBIENT_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let history_hours = parse_env("AMBIENT_HISTORY_HOURS", DEFAULT_HISTORY_HOURS)?;

        Ok(WeatherConfig {
            credentials,
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
            history_hours,
        })
    }
}

/// Read a comma-separated list, falling back to `<PREFIX><N>` variables
fn load_key_list(list_var: &str, indexed_prefix: &str) -> Vec<String> {
    match env::var(list_var) {
        Ok(raw) => {
            debug!("Found {}", list_var);
            parse_key_list(&raw)
        }
        Err(_) => {
            debug!(
                "{} environment variable not found, trying individual variables",
                list_var
            );
            indexed_keys(env::vars(), indexed_prefix)
        }
    }
}

pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collect `<PREFIX><N>` values ordered by `N`
fn indexed_keys(vars: impl Iterator<Item = (String, String)>, prefix: &str) -> Vec<String> {
    let mut indexed: Vec<(u32, String)> = vars
        .filter_map(|(key, value)| {
            let index = key.strip_prefix(prefix)?.parse::<u32>().ok()?;
            let value = value.trim();
            (!value.is_empty()).then(|| (index, value.to_string()))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, value)| value).collect()
}

fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AmbientError::configuration(format!("{} is not a valid value: '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
