//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::Scope;
use crate::core::errors::{Result, RqmError};
use crate::model::timestamp::CalendarZone;
use crate::notify::NotificationConfig;

/// Full client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub local: LocalConfig,
    pub dashboard: DashboardConfig,
    pub notifications: NotificationConfig,
    pub paths: PathsConfig,
}

/// Which [`RequestApi`](crate::api::RequestApi) binding to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Http,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub backend: Backend,
    pub base_url: String,
    /// Whole-request timeout for the HTTP backend.
    pub timeout_ms: u64,
}

/// Embedded SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub admin_page_size: usize,
    pub user_page_size: usize,
    /// Zone used for date filters and day display.
    pub calendar_zone: CalendarZone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub session_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Http,
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("requests.sqlite3"),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            admin_page_size: 20,
            user_page_size: 10,
            calendar_zone: CalendarZone::Local,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        let data = data_dir();
        Self {
            config_file: home.join(".config").join("rqm").join("config.toml"),
            session_file: data.join("session.json"),
            activity_log: data.join("activity.jsonl"),
        }
    }
}

impl DashboardConfig {
    #[must_use]
    pub const fn page_size(&self, scope: Scope) -> usize {
        match scope {
            Scope::Admin => self.admin_page_size,
            Scope::User => self.user_page_size,
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from the default or an explicit path, then apply env
    /// overrides, normalize and validate.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Config::load`] with an injectable environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|e| RqmError::io(&path_buf, e))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(RqmError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render as TOML for `rqm config show`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RqmError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        // api
        if let Some(raw) = get("RQM_API_BACKEND") {
            self.api.backend = parse_env_enum("RQM_API_BACKEND", &raw)?;
        }
        if let Some(raw) = get("RQM_API_BASE_URL") {
            self.api.base_url = raw;
        }
        if let Some(raw) = get("RQM_API_TIMEOUT_MS") {
            self.api.timeout_ms = parse_env_num("RQM_API_TIMEOUT_MS", &raw)?;
        }

        // local
        if let Some(raw) = get("RQM_LOCAL_DB_PATH") {
            self.local.db_path = PathBuf::from(raw);
        }

        // dashboard
        if let Some(raw) = get("RQM_DASHBOARD_ADMIN_PAGE_SIZE") {
            self.dashboard.admin_page_size = parse_env_num("RQM_DASHBOARD_ADMIN_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = get("RQM_DASHBOARD_USER_PAGE_SIZE") {
            self.dashboard.user_page_size = parse_env_num("RQM_DASHBOARD_USER_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = get("RQM_DASHBOARD_CALENDAR_ZONE") {
            self.dashboard.calendar_zone = parse_env_enum("RQM_DASHBOARD_CALENDAR_ZONE", &raw)?;
        }

        // notifications
        if let Some(raw) = get("RQM_NOTIFICATIONS_MIN_LEVEL") {
            self.notifications.min_level = parse_env_enum("RQM_NOTIFICATIONS_MIN_LEVEL", &raw)?;
        }
        if let Some(raw) = get("RQM_NOTIFICATIONS_COLOR") {
            self.notifications.color = parse_env_bool("RQM_NOTIFICATIONS_COLOR", &raw)?;
        }
        if let Some(raw) = get("RQM_NOTIFICATIONS_FILE_ENABLED") {
            self.notifications.file.enabled =
                parse_env_bool("RQM_NOTIFICATIONS_FILE_ENABLED", &raw)?;
        }
        if let Some(raw) = get("RQM_NOTIFICATIONS_FILE_PATH") {
            self.notifications.file.path = PathBuf::from(raw);
        }

        // paths
        if let Some(raw) = get("RQM_SESSION_FILE") {
            self.paths.session_file = PathBuf::from(raw);
        }
        if let Some(raw) = get("RQM_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }

        // NO_COLOR convention disables color regardless of file settings.
        if get("NO_COLOR").is_some() {
            self.notifications.color = false;
        }
        Ok(())
    }

    /// Expand a leading `~/` and drop trailing slashes from the base URL.
    fn normalize_paths(&mut self) {
        for path in [
            &mut self.local.db_path,
            &mut self.notifications.file.path,
            &mut self.paths.session_file,
            &mut self.paths.activity_log,
        ] {
            if let Ok(rest) = path.strip_prefix("~") {
                *path = home_dir().join(rest);
            }
        }
        let trimmed = self.api.base_url.trim().trim_end_matches('/');
        self.api.base_url = trimmed.to_string();
    }

    fn validate(&self) -> Result<()> {
        if self.dashboard.admin_page_size == 0 {
            return Err(invalid("dashboard.admin_page_size must be >= 1"));
        }
        if self.dashboard.user_page_size == 0 {
            return Err(invalid("dashboard.user_page_size must be >= 1"));
        }
        if self.api.timeout_ms == 0 {
            return Err(invalid("api.timeout_ms must be > 0"));
        }
        if self.api.backend == Backend::Http {
            let url = self.api.base_url.as_str();
            let rest = url
                .strip_prefix("http://")
                .or_else(|| url.strip_prefix("https://"));
            if rest.is_none_or(str::is_empty) {
                return Err(RqmError::InvalidConfig {
                    details: format!("api.base_url must start with http:// or https://, got {url:?}"),
                });
            }
        }
        if self.paths.session_file.as_os_str().is_empty() {
            return Err(invalid("paths.session_file must not be empty"));
        }
        Ok(())
    }
}

fn invalid(details: &str) -> RqmError {
    RqmError::InvalidConfig {
        details: details.to_string(),
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[RQM-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("rqm")
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env_num<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| RqmError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RqmError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: expected a boolean"),
        }),
    }
}

/// Parse a lower-case enum name through its serde representation.
fn parse_env_enum<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T> {
    let value = serde_json::Value::String(raw.trim().to_ascii_lowercase());
    serde_json::from_value(value).map_err(|error| RqmError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
