//! Configuration file support for portrait-qa.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/portrait-qa/config.toml` (lowest priority)
//! - Project-local: `.portrait-qa.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use portrait_qa_core::domain::EnhancementLevel;
use serde::Deserialize;
use tracing::{debug, info};

/// Environment variable read for the provider API key when none is configured.
pub const DEFAULT_API_KEY_ENV: &str = "PORTRAIT_QA_API_KEY";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Validation options.
    pub options: OptionsConfig,
    /// Feature provider endpoints.
    pub provider: ProviderConfig,
    /// Object storage location.
    pub storage: StorageConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
    /// Caller id used to namespace stored images.
    pub caller: Option<String>,
}

/// Defaults for the validation options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Youngest acceptable estimated age.
    pub min_age: Option<u32>,
    /// Oldest acceptable estimated age.
    pub max_age: Option<u32>,
    /// Maximum number of people.
    pub max_people: Option<u32>,
    /// Abort on the first hard error or fault.
    pub strict: Option<bool>,
    /// Produce enhanced copies.
    pub enhance: Option<bool>,
    /// Enhancement strength.
    pub level: Option<EnhancementLevel>,
    /// Accept text overlays.
    pub allow_text_overlay: Option<bool>,
    /// Accept watermarks.
    pub allow_watermark: Option<bool>,
}

/// Feature provider configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Annotation endpoint.
    pub vision_endpoint: Option<String>,
    /// Deep-analysis endpoint, consulted when the vision provider finds no face.
    pub deep_endpoint: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Retries for transient failures.
    pub retries: Option<u32>,
}

/// Storage configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket directory.
    pub dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/portrait-qa/config.toml`
    /// 2. Project-local: `.portrait-qa.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.options.min_age, self.options.max_age) {
            if min > max {
                return Err(format!(
                    "options.min_age ({min}) must not exceed options.max_age ({max})"
                ));
            }
        }
        if self.options.max_people == Some(0) {
            return Err("options.max_people must be at least 1".to_string());
        }
        if self.provider.timeout_secs == Some(0) {
            return Err("provider.timeout_secs must be at least 1".to_string());
        }
        for (key, endpoint) in [
            ("provider.vision_endpoint", &self.provider.vision_endpoint),
            ("provider.deep_endpoint", &self.provider.deep_endpoint),
        ] {
            if let Some(url) = endpoint {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{key} must be an http(s) URL, got '{url}'"));
                }
            }
        }
        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!("output.format must be 'json' or 'jsonl', got '{f}'"));
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);
        self.general.caller = other.general.caller.or_else(|| self.general.caller.take());

        let (mine, theirs) = (&mut self.options, other.options);
        mine.min_age = theirs.min_age.or(mine.min_age);
        mine.max_age = theirs.max_age.or(mine.max_age);
        mine.max_people = theirs.max_people.or(mine.max_people);
        mine.strict = theirs.strict.or(mine.strict);
        mine.enhance = theirs.enhance.or(mine.enhance);
        mine.level = theirs.level.or(mine.level);
        mine.allow_text_overlay = theirs.allow_text_overlay.or(mine.allow_text_overlay);
        mine.allow_watermark = theirs.allow_watermark.or(mine.allow_watermark);

        let (mine, theirs) = (&mut self.provider, other.provider);
        mine.vision_endpoint = theirs.vision_endpoint.or_else(|| mine.vision_endpoint.take());
        mine.deep_endpoint = theirs.deep_endpoint.or_else(|| mine.deep_endpoint.take());
        mine.api_key_env = theirs.api_key_env.or_else(|| mine.api_key_env.take());
        mine.timeout_secs = theirs.timeout_secs.or(mine.timeout_secs);
        mine.retries = theirs.retries.or(mine.retries);

        self.storage.dir = other.storage.dir.or_else(|| self.storage.dir.take());

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("portrait-qa").join("config.toml"))
}

/// Default bucket directory under the user's data directory.
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from(".portrait-qa-bucket"),
        |d| d.join("portrait-qa").join("bucket"),
    )
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.portrait-qa.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".portrait-qa.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
