// Configuration: built-in defaults written on first run, then engine.toml
// and app.toml parsed and validated.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use longball_engine::config::{EngineConfig, ValidationError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to write default config {path}: {source}")]
    WriteDefault {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot locate the longball home directory: {0}")]
    NoHome(#[source] std::io::Error),
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        ConfigError::ValidationError {
            field: e.field,
            message: e.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub data_paths: DataPaths,
    pub db_path: String,
    pub report_dir: String,
    pub log_filter: String,
    /// Directory for the daily log files, relative to the home directory.
    pub log_dir: String,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire app.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AppFile {
    data: DataPaths,
    database: DatabaseSection,
    reports: ReportsSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ReportsSection {
    dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LoggingSection {
    filter: String,
    dir: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: "info".into(),
            dir: "logs".into(),
        }
    }
}

/// Input CSV locations. The game-log and roster files are required; the
/// rest are skipped with a warning when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub game_logs: String,
    pub roster: String,
    pub batter_arsenal: String,
    pub pitcher_arsenal: String,
    pub batter_contact: String,
    pub pitcher_contact: String,
    pub yearly_metrics: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/engine.toml` and `config/app.toml` under
/// `base_dir`. Run [`write_missing_config`] first to get defaults on a
/// fresh install.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- engine.toml (required) ---
    let engine_path = config_dir.join("engine.toml");
    let engine_text = read_file(&engine_path)?;
    let engine: EngineConfig =
        toml::from_str(&engine_text).map_err(|e| ConfigError::ParseError {
            path: engine_path.clone(),
            source: e,
        })?;

    // --- app.toml (required) ---
    let app_path = config_dir.join("app.toml");
    let app_text = read_file(&app_path)?;
    let app_file: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    let config = Config {
        engine,
        data_paths: app_file.data,
        db_path: app_file.database.path,
        report_dir: app_file.reports.dir,
        log_filter: app_file.logging.filter,
        log_dir: app_file.logging.dir,
    };

    validate(&config)?;

    Ok(config)
}

/// Environment variable naming the directory that holds `config/`,
/// the report store and the logs. Defaults to the working directory.
pub const HOME_ENV: &str = "LONGBALL_HOME";

/// The two files longball reads, with their built-in contents.
const CONFIG_FILES: &[(&str, &str)] = &[
    ("engine.toml", include_str!("../defaults/engine.toml")),
    ("app.toml", include_str!("../defaults/app.toml")),
];

/// Resolve the home directory from `LONGBALL_HOME`, falling back to the
/// working directory.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
    home_from(std::env::var_os(HOME_ENV))
}

fn home_from(var: Option<OsString>) -> Result<PathBuf, ConfigError> {
    match var.filter(|v| !v.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => std::env::current_dir().map_err(ConfigError::NoHome),
    }
}

/// Write the built-in `engine.toml` / `app.toml` into `<base_dir>/config`
/// where missing. Files already present are never touched. Returns the
/// paths written.
pub fn write_missing_config(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|source| ConfigError::WriteDefault {
        path: config_dir.clone(),
        source,
    })?;

    let mut written = Vec::new();
    for (name, text) in CONFIG_FILES {
        let target = config_dir.join(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(ConfigError::WriteDefault { path: target, source }),
        };
        if let Err(source) = file.write_all(text.as_bytes()) {
            return Err(ConfigError::WriteDefault { path: target, source });
        }
        written.push(target);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    config.engine.validate()?;

    let d = &config.data_paths;
    let path_fields: &[(&str, &str)] = &[
        ("data.game_logs", d.game_logs.as_str()),
        ("data.roster", d.roster.as_str()),
        ("data.batter_arsenal", d.batter_arsenal.as_str()),
        ("data.pitcher_arsenal", d.pitcher_arsenal.as_str()),
        ("data.batter_contact", d.batter_contact.as_str()),
        ("data.pitcher_contact", d.pitcher_contact.as_str()),
        ("data.yearly_metrics", d.yearly_metrics.as_str()),
        ("database.path", config.db_path.as_str()),
        ("reports.dir", config.report_dir.as_str()),
        ("logging.dir", config.log_dir.as_str()),
    ];
    for (name, val) in path_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if config.log_filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fresh scratch dir with the built-in config written to `config/`.
    fn scratch_with_defaults(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        write_missing_config(&tmp).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config_from_default_files() {
        let tmp = scratch_with_defaults("longball_config_defaults");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert!((config.engine.weights.arsenal_matchup - 0.40).abs() < f64::EPSILON);
        assert!((config.engine.weights.contextual - 0.20).abs() < f64::EPSILON);
        assert!((config.engine.baseline.slg - 0.400).abs() < f64::EPSILON);
        assert_eq!(config.engine.thresholds.inactivity_days, 10);
        assert_eq!(config.engine.thresholds.trailing_window_games, 10);
        assert_eq!(config.engine.cache_ttl_secs, 3600);
        assert_eq!(config.engine, EngineConfig::default());

        assert_eq!(config.data_paths.game_logs, "data/game_logs.csv");
        assert_eq!(config.data_paths.roster, "data/roster.csv");
        assert_eq!(config.db_path, "longball.db");
        assert_eq!(config.report_dir, "reports");
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.log_dir, "logs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn fresh_home_gets_both_config_files() {
        let tmp = std::env::temp_dir().join("longball_config_fresh");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let written = write_missing_config(&tmp).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["engine.toml", "app.toml"]);
        assert!(load_config_from(&tmp).is_ok());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn edited_config_is_never_overwritten() {
        let tmp = std::env::temp_dir().join("longball_config_edited");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/app.toml"), "edited").unwrap();

        let written = write_missing_config(&tmp).unwrap();
        assert_eq!(written, vec![tmp.join("config/engine.toml")]);
        assert_eq!(fs::read_to_string(tmp.join("config/app.toml")).unwrap(), "edited");

        assert!(write_missing_config(&tmp).unwrap().is_empty());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn config_path_blocked_by_a_file_is_an_error() {
        let tmp = std::env::temp_dir().join("longball_config_blocked");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        fs::write(tmp.join("config"), "not a directory").unwrap();

        let err = write_missing_config(&tmp).unwrap_err();
        match &err {
            ConfigError::WriteDefault { path, .. } => assert!(path.ends_with("config")),
            other => panic!("expected WriteDefault, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn home_env_overrides_working_directory() {
        let home = home_from(Some(OsString::from("/srv/longball"))).unwrap();
        assert_eq!(home, PathBuf::from("/srv/longball"));
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(home_from(Some(OsString::new())).unwrap(), cwd);
        assert_eq!(home_from(None).unwrap(), cwd);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let tmp = scratch_with_defaults("longball_config_bad_weights");
        let text = fs::read_to_string(tmp.join("config/engine.toml")).unwrap();
        let modified = text.replace("contextual = 0.20", "contextual = 0.35");
        fs::write(tmp.join("config/engine.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "weights");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_inverted_metric_range() {
        let tmp = scratch_with_defaults("longball_config_bad_range");
        let text = fs::read_to_string(tmp.join("config/engine.toml")).unwrap();
        let modified = text.replace(
            "iso = { min = 0.05, max = 0.35 }",
            "iso = { min = 0.35, max = 0.05 }",
        );
        fs::write(tmp.join("config/engine.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "ranges.iso");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_database_path() {
        let tmp = scratch_with_defaults("longball_config_empty_db");
        let text = fs::read_to_string(tmp.join("config/app.toml")).unwrap();
        let modified = text.replace("path = \"longball.db\"", "path = \"\"");
        fs::write(tmp.join("config/app.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "database.path");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_names_the_file() {
        let tmp = scratch_with_defaults("longball_config_parse_error");
        fs::write(tmp.join("config/engine.toml"), "[weights\narsenal_matchup = ").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("engine.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_app_toml() {
        let tmp = scratch_with_defaults("longball_config_missing_app");
        fs::remove_file(tmp.join("config/app.toml")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("app.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn logging_section_is_optional() {
        let tmp = scratch_with_defaults("longball_config_no_logging");
        let text = fs::read_to_string(tmp.join("config/app.toml")).unwrap();
        let trimmed: String = text
            .split("[logging]")
            .next()
            .unwrap_or_default()
            .to_string();
        fs::write(tmp.join("config/app.toml"), trimmed).unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.log_dir, "logs");
        let _ = fs::remove_dir_all(&tmp);
    }
}
