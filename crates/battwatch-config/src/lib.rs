//! Configuration and on-disk state for battwatch.
//!
//! One TOML file layered under `BATTWATCH_*` environment variables,
//! translated into `battwatch_core::Settings`, plus the small state
//! file that remembers the resolved plan id across runs.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use battwatch_core::{CoreError, PlanStore, Settings, SortDirection};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub plan: PlanSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSection {
    /// Base URL of the home automation server.
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MonitorSection {
    /// Battery percentage treated as empty. Values in (0, 1) are read
    /// as fractions and scaled up.
    #[serde(default = "default_empty_level")]
    pub empty_level: f64,

    /// Create mirrored devices as active.
    #[serde(default = "default_true")]
    pub auto_use: bool,

    /// Register a low-battery notification for every new mirror.
    #[serde(default = "default_true")]
    pub notify: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            empty_level: default_empty_level(),
            auto_use: default_true(),
            notify: default_true(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_empty_level() -> f64 {
    50.0
}
fn default_true() -> bool {
    true
}
fn default_poll_interval() -> u64 {
    300
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PlanSection {
    /// Plan to keep populated; an empty name disables the feature.
    #[serde(default = "default_plan_name")]
    pub name: String,

    /// "ascending", "descending", or "none".
    #[serde(default = "default_sort")]
    pub sort: String,
}

impl Default for PlanSection {
    fn default() -> Self {
        Self {
            name: default_plan_name(),
            sort: default_sort(),
        }
    }
}

fn default_plan_name() -> String {
    "Batteries".into()
}
fn default_sort() -> String {
    "ascending".into()
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LogSection {
    /// 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    #[serde(default)]
    pub verbosity: u8,
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "battwatch", "battwatch").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the plan id state file.
pub fn state_path() -> PathBuf {
    ProjectDirs::from("com", "battwatch", "battwatch").map_or_else(
        || dirs_fallback().join("state.toml"),
        |dirs| dirs.data_dir().join("state.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("battwatch");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load configuration: built-in defaults, then the TOML file, then
/// `BATTWATCH_*` environment variables. `__` separates section from
/// key, e.g. `BATTWATCH_SERVER__URL`.
pub fn load(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");

    let figment = Figment::new()
        .merge(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("BATTWATCH_").split("__"));

    Ok(figment.extract()?)
}

impl FileConfig {
    /// Translate the file shape into engine settings.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let url: Url = self
            .server
            .url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "server.url".into(),
                reason: format!("invalid URL: {}", self.server.url),
            })?;

        let sort = parse_sort(&self.plan.sort)?;

        let mut settings = Settings::new(url);
        settings.http_timeout = Duration::from_secs(self.server.timeout_secs);
        settings.empty_level = Settings::normalize_empty_level(self.monitor.empty_level);
        settings.auto_use = self.monitor.auto_use;
        settings.notify_all = self.monitor.notify;
        settings.poll_interval = Duration::from_secs(self.monitor.poll_interval_secs);
        settings.plan_name = self.plan.name;
        settings.sort = sort;
        Ok(settings)
    }
}

fn parse_sort(raw: &str) -> Result<Option<SortDirection>, ConfigError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    SortDirection::from_str(raw)
        .map(Some)
        .map_err(|_| ConfigError::Validation {
            field: "plan.sort".into(),
            reason: format!("expected 'ascending', 'descending', or 'none', got '{raw}'"),
        })
}

// ── Plan id state ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
struct StateFile {
    plan_id: Option<u32>,
}

/// [`PlanStore`] backed by a small TOML file.
#[derive(Debug)]
pub struct StatePlanStore {
    path: PathBuf,
}

impl StatePlanStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the platform default location.
    pub fn at_default_path() -> Self {
        Self::new(state_path())
    }
}

impl PlanStore for StatePlanStore {
    fn load(&self) -> Result<Option<u32>, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::PlanStore {
                    message: format!("read {}: {e}", self.path.display()),
                });
            }
        };
        let state: StateFile = toml::from_str(&raw).map_err(|e| CoreError::PlanStore {
            message: format!("parse {}: {e}", self.path.display()),
        })?;
        Ok(state.plan_id)
    }

    fn save(&mut self, plan_id: u32) -> Result<(), CoreError> {
        let state = StateFile {
            plan_id: Some(plan_id),
        };
        let raw = toml::to_string(&state).map_err(|e| CoreError::PlanStore {
            message: format!("serialize state: {e}"),
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::PlanStore {
                message: format!("create {}: {e}", parent.display()),
            })?;
        }
        std::fs::write(&self.path, raw).map_err(|e| CoreError::PlanStore {
            message: format!("write {}: {e}", self.path.display()),
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
