use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use shared::domain::{Arity, MediaType, Mode};
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "classifier.toml";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub timeout_secs: u64,
    pub image_max_bytes: u64,
    pub audio_max_bytes: u64,
    /// Per-file ceiling in both batch modes, whatever the media type.
    pub batch_file_max_bytes: u64,
    pub batch_max_files: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            timeout_secs: 60,
            image_max_bytes: 10 * MIB,
            audio_max_bytes: 50 * MIB,
            batch_file_max_bytes: 10 * MIB,
            batch_max_files: 50,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api url '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("api url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    image_max_bytes: Option<u64>,
    audio_max_bytes: Option<u64>,
    batch_file_max_bytes: Option<u64>,
    batch_max_files: Option<usize>,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_bytes(&self, mode: Mode) -> u64 {
        match (mode.arity(), mode.media()) {
            (Arity::Batch, _) => self.batch_file_max_bytes,
            (Arity::Single, MediaType::Image) => self.image_max_bytes,
            (Arity::Single, MediaType::Audio) => self.audio_max_bytes,
        }
    }

    /// Parsed base url; only http and https are accepted.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.api_url.trim()).map_err(|source| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(self.api_url.clone()));
        }
        Ok(url)
    }

    /// Defaults, then the TOML document (if any), then environment overrides.
    pub fn from_sources(
        file_contents: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut settings = Settings::default();

        if let Some(raw) = file_contents {
            match toml::from_str::<FileSettings>(raw) {
                Ok(file_cfg) => settings.apply_file(file_cfg),
                Err(error) => warn!(%error, "ignoring unparsable settings file"),
            }
        }

        if let Some(v) = env("API_URL") {
            settings.api_url = v;
        }
        if let Some(v) = env("APP__API_URL") {
            settings.api_url = v;
        }
        if let Some(v) = env("APP__TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            settings.timeout_secs = v;
        }
        if let Some(v) = env("APP__IMAGE_MAX_BYTES").and_then(|v| v.parse().ok()) {
            settings.image_max_bytes = v;
        }
        if let Some(v) = env("APP__AUDIO_MAX_BYTES").and_then(|v| v.parse().ok()) {
            settings.audio_max_bytes = v;
        }
        if let Some(v) = env("APP__BATCH_FILE_MAX_BYTES").and_then(|v| v.parse().ok()) {
            settings.batch_file_max_bytes = v;
        }
        if let Some(v) = env("APP__BATCH_MAX_FILES").and_then(|v| v.parse().ok()) {
            settings.batch_max_files = v;
        }

        settings
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.api_url {
            self.api_url = v;
        }
        if let Some(v) = file_cfg.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = file_cfg.image_max_bytes {
            self.image_max_bytes = v;
        }
        if let Some(v) = file_cfg.audio_max_bytes {
            self.audio_max_bytes = v;
        }
        if let Some(v) = file_cfg.batch_file_max_bytes {
            self.batch_file_max_bytes = v;
        }
        if let Some(v) = file_cfg.batch_max_files {
            self.batch_max_files = v;
        }
    }
}

/// Loads settings from `path` (or `classifier.toml` in the working directory)
/// and the process environment.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    let raw = fs::read_to_string(path).ok();
    Settings::from_sources(raw.as_deref(), |key| std::env::var(key).ok())
}
