//! Small persisted key/value store for UI preferences.
//!
//! Values are JSON, kept in one pretty-printed object on disk. Every `set` writes
//! through, so a crash never loses a toggle that was already shown on screen.

use crate::columns::ColumnVisibility;
use crate::error::PreferenceError;
use crate::theme::Theme;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const COLUMN_SETTINGS_KEY: &str = "columnSettings";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl PreferenceStore {
    /// Opens the store at `path`. A missing file is an empty store; an unreadable or
    /// corrupt one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Map<String, Value>>(&data) {
                Ok(values) => values,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring corrupt preferences file");
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read preferences");
                Map::new()
            }
        };
        Self {
            path: Some(path),
            values,
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Map::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key, error = %err, "ignoring unreadable preference");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), PreferenceError> {
        self.values.insert(key.to_owned(), serde_json::to_value(value)?);
        self.flush()
    }

    fn flush(&self) -> Result<(), PreferenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_error = |source| PreferenceError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let data = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, data).map_err(io_error)
    }

    pub fn column_visibility(&self) -> ColumnVisibility {
        self.get(COLUMN_SETTINGS_KEY).unwrap_or_default()
    }

    pub fn save_column_visibility(
        &mut self,
        visibility: &ColumnVisibility,
    ) -> Result<(), PreferenceError> {
        self.set(COLUMN_SETTINGS_KEY, visibility)
    }

    pub fn theme(&self) -> Option<Theme> {
        self.get(THEME_KEY)
    }

    pub fn save_theme(&mut self, theme: Theme) -> Result<(), PreferenceError> {
        self.set(THEME_KEY, &theme)
    }
}
