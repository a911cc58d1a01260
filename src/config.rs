//! Configuration file support for vision-cal
//!
//! Supports TOML configuration files with the following search order:
//! 1. `--config <path>` - explicitly specified path
//! 2. `./vision-cal.toml` - current directory
//! 3. `~/.config/vision-cal/config.toml` - user config
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [calibration]
//! base_path = 'C:\Park Systems\XEService\DB\Module\Vision'
//!
//! [history]
//! path = "measurements.json"
//!
//! [report]
//! template = "my_template.html"
//!
//! [histogram]
//! width = 640
//! height = 240
//!
//! [[checklist.categories]]
//! name = "Camera Vision Setting"
//! items = ["Brightness set to 50", "Contrast set to 0"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::checklist::{default_categories, ChecklistCategory};
use crate::constants::xml::DEFAULT_BASE_PATH;

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "vision-cal.toml";

/// Application directory under the user config/data directories
pub const APP_DIR: &str = "vision-cal";

/// Default histogram plot size
pub const DEFAULT_HISTOGRAM_WIDTH: u32 = 640;
pub const DEFAULT_HISTOGRAM_HEIGHT: u32 = 240;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// File not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Calibration store location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalibrationConfig {
    /// Directory holding `Module/General.xml` and `Part/Camera/*.xml`
    #[serde(default)]
    pub base_path: Option<PathBuf>,
}

/// Measurement history file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// HTML report options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Custom template; the built-in one is used when unset
    #[serde(default)]
    pub template: Option<PathBuf>,
}

/// Histogram plot size
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistogramConfig {
    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,
}

/// Pre-flight checklist contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChecklistConfig {
    #[serde(default)]
    pub categories: Option<Vec<ChecklistCategory>>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub histogram: HistogramConfig,

    #[serde(default)]
    pub checklist: ChecklistConfig,
}

/// Effective settings after defaults, file values and CLI overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_path: PathBuf,
    pub history_path: PathBuf,
    pub report_template: Option<PathBuf>,
    pub histogram_width: u32,
    pub histogram_height: u32,
    pub checklist: Vec<ChecklistCategory>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            history_path: default_history_path(),
            report_template: None,
            histogram_width: DEFAULT_HISTOGRAM_WIDTH,
            histogram_height: DEFAULT_HISTOGRAM_HEIGHT,
            checklist: default_categories(),
        }
    }
}

/// `<data_local_dir>/vision-cal/history.json`, or `./history.json` without one
pub fn default_history_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("history.json"))
        .unwrap_or_else(|| PathBuf::from("history.json"))
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default search path
    ///
    /// Search order:
    /// 1. `./vision-cal.toml`
    /// 2. `~/.config/vision-cal/config.toml`
    /// 3. Default values (if no file found)
    pub fn load() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load from an explicit path if given, otherwise search
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply file values over the defaults
    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::default();

        if let Some(base) = &self.calibration.base_path {
            settings.base_path = base.clone();
        }
        if let Some(path) = &self.history.path {
            settings.history_path = path.clone();
        }
        if let Some(template) = &self.report.template {
            settings.report_template = Some(template.clone());
        }
        if let Some(width) = self.histogram.width {
            settings.histogram_width = width;
        }
        if let Some(height) = self.histogram.height {
            settings.histogram_height = height;
        }
        if let Some(categories) = &self.checklist.categories {
            settings.checklist = categories.clone();
        }

        settings
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> Settings {
        let mut settings = self.to_settings();

        if let Some(base) = &cli.base_path {
            settings.base_path = base.clone();
        }
        if let Some(path) = &cli.history_path {
            settings.history_path = path.clone();
        }
        if let Some(template) = &cli.report_template {
            settings.report_template = Some(template.clone());
        }

        settings
    }

    /// Get config file search paths
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(APP_DIR).join("config.toml"));
        }

        paths
    }
}

/// CLI override values for merging with config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub report_template: Option<PathBuf>,
}

impl CliOverrides {
    /// Create new empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Set calibration base directory override
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Set history file override
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    /// Set report template override
    pub fn with_report_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_template = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.calibration.base_path, None);
        assert_eq!(config.history.path, None);
        assert_eq!(config.report.template, None);
        assert_eq!(config.histogram.width, None);
        assert_eq!(config.checklist.categories, None);
    }

    #[test]
    fn test_settings_default() {
        let settings = Config::default().to_settings();
        assert_eq!(settings.base_path, PathBuf::from(DEFAULT_BASE_PATH));
        assert!(settings.history_path.ends_with("history.json"));
        assert_eq!(settings.histogram_width, DEFAULT_HISTOGRAM_WIDTH);
        assert_eq!(settings.histogram_height, DEFAULT_HISTOGRAM_HEIGHT);
        assert_eq!(settings.checklist, default_categories());
        assert!(settings.report_template.is_none());
    }

    #[test]
    fn test_config_load_from_path_existing() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[calibration]
base_path = "/opt/vision"

[history]
path = "/tmp/history.json"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.calibration.base_path, Some(PathBuf::from("/opt/vision")));
        assert_eq!(config.history.path, Some(PathBuf::from("/tmp/history.json")));
    }

    #[test]
    fn test_config_load_from_path_not_found() {
        let result = Config::load_from_path(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_resolve_explicit_missing() {
        let result = Config::resolve(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_search_paths() {
        let paths = Config::search_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths[0], PathBuf::from("vision-cal.toml"));
    }

    #[test]
    fn test_config_merge_cli_priority() {
        let config = Config {
            calibration: CalibrationConfig {
                base_path: Some(PathBuf::from("/from/file")),
            },
            history: HistoryConfig {
                path: Some(PathBuf::from("/file/history.json")),
            },
            ..Default::default()
        };

        let cli = CliOverrides::new()
            .with_base_path("/from/cli")
            .with_report_template("/cli/template.html");

        let settings = config.merge_with_cli(&cli);
        assert_eq!(settings.base_path, PathBuf::from("/from/cli")); // CLI wins
        assert_eq!(settings.history_path, PathBuf::from("/file/history.json")); // Config preserved
        assert_eq!(
            settings.report_template,
            Some(PathBuf::from("/cli/template.html"))
        );
    }

    #[test]
    fn test_config_toml_parse_complete() {
        let toml = r#"
[calibration]
base_path = 'C:\Vision'

[history]
path = "h.json"

[report]
template = "t.html"

[histogram]
width = 512
height = 128

[[checklist.categories]]
name = "Setup"
items = ["Lamp on", "Stage clear"]
"#;

        let config = Config::from_toml(toml).unwrap();
        let settings = config.to_settings();
        assert_eq!(settings.base_path, PathBuf::from(r"C:\Vision"));
        assert_eq!(settings.history_path, PathBuf::from("h.json"));
        assert_eq!(settings.report_template, Some(PathBuf::from("t.html")));
        assert_eq!(settings.histogram_width, 512);
        assert_eq!(settings.histogram_height, 128);
        assert_eq!(settings.checklist.len(), 1);
        assert_eq!(settings.checklist[0].items, vec!["Lamp on", "Stage clear"]);
    }

    #[test]
    fn test_config_toml_parse_partial() {
        let toml = r#"
[histogram]
width = 800
"#;

        let config = Config::from_toml(toml).unwrap();
        let settings = config.to_settings();
        assert_eq!(settings.histogram_width, 800);
        assert_eq!(settings.histogram_height, DEFAULT_HISTOGRAM_HEIGHT);
        assert_eq!(config.calibration.base_path, None);
    }

    #[test]
    fn test_config_toml_parse_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_toml_parse_invalid() {
        let result = Config::from_toml("this is not valid toml [[[");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config {
            histogram: HistogramConfig {
                width: Some(300),
                height: None,
            },
            ..Default::default()
        };

        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("width = 300"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/test/path"));
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_config_merge_empty_cli() {
        let config = Config {
            calibration: CalibrationConfig {
                base_path: Some(PathBuf::from("/from/file")),
            },
            ..Default::default()
        };

        let settings = config.merge_with_cli(&CliOverrides::new());
        assert_eq!(settings.base_path, PathBuf::from("/from/file"));
    }
}
