//! User configuration, read from `<config_dir>/tubesum/config.toml`.
//!
//! Every field is optional; anything missing keeps its default. Delays are in
//! milliseconds.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::ConfigError,
    injector::InjectorSettings,
    prompt::LONG_TRANSCRIPT_THRESHOLD,
    retry::RetryPolicy,
    target::chatgpt::{DEFAULT_CHAT_URL, SubmitTimings},
    transcript::DEFAULT_CAPTION_LANGUAGE,
};

pub const DEFAULT_CDP_ENDPOINT: &str = "http://localhost:9222";
pub const DEFAULT_VIDEO_PAGE_PATTERN: &str = "youtube.com/watch";

const APP_DIR: &str = "tubesum";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chrome remote-debugging HTTP endpoint.
    pub cdp_endpoint: String,
    /// Substring a tab URL must contain to count as a video page.
    pub video_page_pattern: String,
    pub chat_url: String,
    pub caption_language: String,
    pub long_transcript_threshold: usize,
    /// Player config lookups, at least 1.
    pub config_retry_attempts: u32,
    pub config_retry_initial_delay_ms: u64,
    pub grace_delay_ms: u64,
    pub input_poll_interval_ms: u64,
    pub input_poll_attempts: u32,
    pub resend_delay_ms: u64,
    pub fingerprint_scan_delay_ms: u64,
    /// Upper bound on any page-load wait. Unset waits forever.
    pub load_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let injector = InjectorSettings::default();
        let timings = SubmitTimings::default();
        Self {
            cdp_endpoint: DEFAULT_CDP_ENDPOINT.to_string(),
            video_page_pattern: DEFAULT_VIDEO_PAGE_PATTERN.to_string(),
            chat_url: DEFAULT_CHAT_URL.to_string(),
            caption_language: DEFAULT_CAPTION_LANGUAGE.to_string(),
            long_transcript_threshold: LONG_TRANSCRIPT_THRESHOLD,
            config_retry_attempts: retry.max_attempts,
            config_retry_initial_delay_ms: retry.initial_delay.as_millis() as u64,
            grace_delay_ms: injector.grace_delay.as_millis() as u64,
            input_poll_interval_ms: injector.poll_interval.as_millis() as u64,
            input_poll_attempts: injector.poll_attempts,
            resend_delay_ms: timings.resend_delay.as_millis() as u64,
            fingerprint_scan_delay_ms: timings.fingerprint_scan_delay.as_millis() as u64,
            load_timeout_ms: None,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

impl Config {
    /// Load from `path` if given (it must exist), else from the default
    /// location if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::read(path)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.config_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                field: "config_retry_attempts",
                reason: "must be at least 1",
            });
        }
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config_retry_attempts,
            initial_delay: Duration::from_millis(self.config_retry_initial_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn injector_settings(&self) -> InjectorSettings {
        InjectorSettings {
            grace_delay: Duration::from_millis(self.grace_delay_ms),
            poll_interval: Duration::from_millis(self.input_poll_interval_ms),
            poll_attempts: self.input_poll_attempts,
            long_transcript_threshold: self.long_transcript_threshold,
        }
    }

    pub fn submit_timings(&self) -> SubmitTimings {
        SubmitTimings {
            resend_delay: Duration::from_millis(self.resend_delay_ms),
            fingerprint_scan_delay: Duration::from_millis(self.fingerprint_scan_delay_ms),
        }
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}
