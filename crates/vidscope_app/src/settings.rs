//! Client settings loaded from an optional RON file.
//!
//! Precedence is file, then `VIDSCOPE_API_URL` / `--api-url` (resolved by the
//! CLI), then built-in defaults for anything the file leaves out.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vidscope_core::{PollPolicy, StallBackoff};
use vidscope_engine::ClientSettings;

pub const DEFAULT_SETTINGS_FILENAME: &str = "vidscope.ron";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Where the effective settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsSource::File(path) => write!(f, "{}", path.display()),
            SettingsSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub api_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub upload_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub initial_poll_delay_ms: u64,
    pub stall_backoff: Option<StallBackoffSettings>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallBackoffSettings {
    pub after_polls: u32,
    pub factor: u32,
    pub max_interval_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let client = ClientSettings::default();
        let policy = PollPolicy::default();
        Self {
            api_url: client.base_url,
            connect_timeout_ms: millis(client.connect_timeout),
            request_timeout_ms: millis(client.request_timeout),
            upload_timeout_secs: client.upload_timeout.as_secs(),
            poll_interval_ms: millis(policy.interval),
            initial_poll_delay_ms: millis(policy.initial_delay),
            stall_backoff: None,
            log_file: None,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let url = self.api_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SettingsError::Invalid(
                "api_url must start with http:// or https://".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(backoff) = &self.stall_backoff {
            if backoff.factor < 2 {
                return Err(SettingsError::Invalid(
                    "stall_backoff.factor must be at least 2".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_url.trim().to_string(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            upload_timeout: Duration::from_secs(self.upload_timeout_secs),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            initial_delay: Duration::from_millis(self.initial_poll_delay_ms),
            stall_backoff: self.stall_backoff.as_ref().map(|backoff| StallBackoff {
                after_polls: backoff.after_polls,
                factor: backoff.factor,
                max_interval: Duration::from_millis(backoff.max_interval_ms),
            }),
        }
    }
}

/// Loads settings from `explicit`, or from `./vidscope.ron` if it exists.
/// An explicit path that cannot be read is an error; a missing default file
/// just means defaults. Runs before logging is set up, so the source is
/// returned for the caller to report.
pub fn load(explicit: Option<&Path>) -> Result<(AppSettings, SettingsSource), SettingsError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILENAME), false),
    };

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            return Ok((AppSettings::default(), SettingsSource::Defaults));
        }
        Err(source) => return Err(SettingsError::Read { path, source }),
    };

    let settings: AppSettings = ron::from_str(&content).map_err(|err| SettingsError::Parse {
        path: path.clone(),
        message: err.to_string(),
    })?;
    Ok((settings, SettingsSource::File(path)))
}
