//! Client configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the TOML file, `TASKLINK_*`
//! environment variables, then command-line overrides.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const APP_DIR: &str = "tasklink";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_NOTIFICATION_TTL_SECS: u64 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 25;

pub const ENV_BASE_URL: &str = "TASKLINK_BASE_URL";
pub const ENV_COOKIE: &str = "TASKLINK_COOKIE";
pub const ENV_CSRF_TOKEN: &str = "TASKLINK_CSRF_TOKEN";

const CSRF_COOKIE_NAME: &str = "csrftoken";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: String,
    /// Raw `Cookie` header value sent with every request.
    pub cookie: Option<String>,
    /// Explicit anti-forgery token; overrides the cookie's `csrftoken`.
    pub csrf_token: Option<String>,
    pub search_debounce_ms: u64,
    pub notification_ttl_secs: u64,
    pub page_size: usize,
    pub preferences_path: PathBuf,
}

/// Shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    cookie: Option<String>,
    csrf_token: Option<String>,
    search_debounce_ms: Option<u64>,
    notification_ttl_secs: Option<u64>,
    page_size: Option<usize>,
    preferences_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            cookie: None,
            csrf_token: None,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            notification_ttl_secs: DEFAULT_NOTIFICATION_TTL_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            preferences_path: default_preferences_path(),
        }
    }
}

impl AppConfig {
    /// Loads the full stack. An explicit `config_path` must exist; the default location
    /// is optional.
    pub fn load(config_path: Option<&Path>, base_url: Option<String>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        if let Some(base_url) = base_url {
            config.base_url = non_empty("base_url", base_url)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&data).map_err(|source| ConfigError::ParseToml {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");

        let mut config = Self::default();
        if let Some(base_url) = file.base_url {
            config.base_url = non_empty("base_url", base_url)?;
        }
        if let Some(cookie) = file.cookie {
            config.cookie = Some(non_empty("cookie", cookie)?);
        }
        if let Some(token) = file.csrf_token {
            config.csrf_token = Some(non_empty("csrf_token", token)?);
        }
        if let Some(debounce) = file.search_debounce_ms {
            config.search_debounce_ms = debounce;
        }
        if let Some(ttl) = file.notification_ttl_secs {
            config.notification_ttl_secs = ttl;
        }
        if let Some(page_size) = file.page_size {
            config.page_size = page_size;
        }
        if let Some(path) = file.preferences_path {
            config.preferences_path = path;
        }
        Ok(config)
    }

    /// Applies `TASKLINK_*` variables. Set-but-blank variables are rejected.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = non_empty(ENV_BASE_URL, value)?;
        }
        if let Some(value) = lookup(ENV_COOKIE) {
            self.cookie = Some(non_empty(ENV_COOKIE, value)?);
        }
        if let Some(value) = lookup(ENV_CSRF_TOKEN) {
            self.csrf_token = Some(non_empty(ENV_CSRF_TOKEN, value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|error| ConfigError::Invalid {
            field: "base_url".to_owned(),
            details: error.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "base_url".to_owned(),
                details: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page_size".to_owned(),
                details: "must be greater than zero".to_owned(),
            });
        }
        if self.notification_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "notification_ttl_secs".to_owned(),
                details: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    /// The token sent as `X-CSRFToken`.
    pub fn effective_csrf_token(&self) -> Option<String> {
        self.csrf_token.clone().or_else(|| {
            self.cookie
                .as_deref()
                .and_then(|cookie| cookie_value(cookie, CSRF_COOKIE_NAME))
        })
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }
}

/// Looks up one cookie in a `name=value; name2=value2` header string.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name)
            .then(|| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    })
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
        .join("preferences.json")
}

pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
        .join(format!("{APP_DIR}.log"))
}

fn non_empty(field: &str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            field: field.to_owned(),
            details: "must not be empty".to_owned(),
        });
    }
    Ok(trimmed.to_owned())
}
