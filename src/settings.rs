use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DepensesError, Result};
use crate::fmt::DisplayConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// File opened when a command is given no path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_file: Option<String>,
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_locale() -> String {
    "fr_FR".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            locale: default_locale(),
            default_file: None,
        }
    }
}

impl Settings {
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig::from_parts(&self.date_format, &self.locale)
    }

    /// The file to work on: `explicit` if given, else `default_file`.
    pub fn resolve_file(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        match (explicit, &self.default_file) {
            (Some(path), _) => Ok(path.to_path_buf()),
            (None, Some(default)) => Ok(PathBuf::from(shellexpand_path(default))),
            (None, None) => Err(DepensesError::Settings(
                "no file given and no default_file configured".into(),
            )),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("depenses")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Missing or unreadable files give the defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DepensesError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Locale;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("settings.json");
        let settings = Settings {
            date_format: "%Y-%m-%d".to_string(),
            locale: "en_US".to_string(),
            default_file: Some("~/depenses.csv".to_string()),
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("settings.json"));
        assert_eq!(s.date_format, "%d/%m/%Y");
        assert_eq!(s.locale, "fr_FR");
        assert!(s.default_file.is_none());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"default_file": "/tmp/depenses.json"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.date_format, "%d/%m/%Y");
        assert_eq!(s.default_file.as_deref(), Some("/tmp/depenses.json"));
    }

    #[test]
    fn test_display_config_from_settings() {
        let s = Settings {
            locale: "en_US".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.display_config().locale, Locale::en_US);
        assert_eq!(s.display_config().date_format, "%d/%m/%Y");
    }

    #[test]
    fn test_resolve_file() {
        let s = Settings::default();
        assert!(s.resolve_file(None).is_err());
        assert_eq!(
            s.resolve_file(Some(Path::new("a.csv"))).unwrap(),
            PathBuf::from("a.csv")
        );
        let s = Settings {
            default_file: Some("/data/b.json".into()),
            ..Settings::default()
        };
        assert_eq!(s.resolve_file(None).unwrap(), PathBuf::from("/data/b.json"));
    }
}
