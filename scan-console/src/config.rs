//! Console configuration.
//!
//! Values come from environment variables with compiled-in defaults. Invalid
//! values fall back to the default and log a warning instead of failing startup.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::polling::PollingPolicy;

/// Default API base URL (the console backend mounts its router under `/api`).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "scan_console=info,scanctl=info";

/// Runtime configuration for the console client.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL every request path is joined onto.
    pub base_url: Url,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Polling interval for tasks observed as running.
    pub poll_running_interval: Duration,
    /// Polling interval for every other non-terminal status.
    pub poll_idle_interval: Duration,
    /// `EnvFilter` directive.
    pub log_filter: String,
    /// Emit JSON log lines instead of text.
    pub log_json: bool,
    /// Directory for daily-rolling log files.
    pub log_dir: Option<PathBuf>,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let policy = PollingPolicy::default();
        Self {
            base_url: default_base_url(),
            request_timeout: Duration::from_secs(10),
            poll_running_interval: policy.running_interval,
            poll_idle_interval: policy.idle_interval,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
            log_dir: None,
            user_agent: concat!("scan-console/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

impl ConsoleConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `SCAN_CONSOLE_BASE_URL` (e.g. "https://scanner.local/api")
    /// - `SCAN_CONSOLE_TIMEOUT_SECS`
    /// - `SCAN_CONSOLE_POLL_RUNNING_MS`
    /// - `SCAN_CONSOLE_POLL_IDLE_MS`
    /// - `SCAN_CONSOLE_LOG_FILTER`
    /// - `SCAN_CONSOLE_LOG_JSON` ("1", "true", "yes", "on")
    /// - `SCAN_CONSOLE_LOG_DIR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = non_empty(lookup("SCAN_CONSOLE_BASE_URL")) {
            match parse_base_url(&raw) {
                Ok(url) => config.base_url = url,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid SCAN_CONSOLE_BASE_URL"),
            }
        }

        if let Some(secs) = parse_u64(&lookup, "SCAN_CONSOLE_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(ms) = parse_u64(&lookup, "SCAN_CONSOLE_POLL_RUNNING_MS") {
            config.poll_running_interval = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_u64(&lookup, "SCAN_CONSOLE_POLL_IDLE_MS") {
            config.poll_idle_interval = Duration::from_millis(ms);
        }

        if let Some(filter) = non_empty(lookup("SCAN_CONSOLE_LOG_FILTER")) {
            config.log_filter = filter;
        }

        config.log_json = lookup("SCAN_CONSOLE_LOG_JSON").is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        });

        if let Some(dir) = non_empty(lookup("SCAN_CONSOLE_LOG_DIR")) {
            config.log_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Replace the base URL, validating it.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }

    /// Check invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if self.poll_running_interval.is_zero() || self.poll_idle_interval.is_zero() {
            return Err(Error::config("polling intervals must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than zero"));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base URL {} cannot be used as a base",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Polling policy derived from the configured intervals.
    pub fn polling_policy(&self) -> PollingPolicy {
        PollingPolicy {
            running_interval: self.poll_running_interval,
            idle_interval: self.poll_idle_interval,
        }
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins keep the path prefix.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&normalized)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_u64<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = non_empty(lookup(key))?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid numeric setting");
            None
        }
    }
}
