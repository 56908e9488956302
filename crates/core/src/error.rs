use std::path::PathBuf;
use thiserror::Error;

use crate::browser::BrowserError;

/// Extraction-phase failures. The `Display` text is what the user sees as an alert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Could not fetch the transcript configuration.")]
    ConfigUnavailable,

    #[error("No transcript available for this video.")]
    NoCaptions,

    #[error("Could not fetch the transcript.")]
    TranscriptUnavailable,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config {path}: {field} {reason}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum TubesumError {
    #[error("This tool only works on YouTube video pages (got {url})")]
    UnsupportedPage { url: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed timed text: {0}")]
    TimedText(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, TubesumError>;
