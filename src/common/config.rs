//! Runtime configuration loaded from an optional TOML file and the environment.
//!
//! Priority, highest first:
//! 1. `MODELCTL_*` environment variables
//! 2. The TOML file named by `MODELCTL_CONFIG`
//! 3. Built-in defaults

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{TxError, TxResult};

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppCfg {
    /// Root directory for the filesystem repositories.
    pub data_root: String,
    /// Run LEARN transactions on the background worker pool.
    pub learn_in_background: bool,
    /// Number of background learn workers.
    pub learn_workers: usize,
    /// Backend used when a LEARN request does not name one.
    pub default_backend: Option<String>,
    /// `EnvFilter` directive string.
    pub log_filter: String,
    /// Emit JSON log lines instead of human readable text.
    pub log_json: bool,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            data_root: "./data".to_string(),
            learn_in_background: false,
            learn_workers: 2,
            default_backend: None,
            log_filter: "info".to_string(),
            log_json: true,
        }
    }
}

impl AppCfg {
    /// Load configuration from the file named by `MODELCTL_CONFIG` (if any),
    /// then apply environment overrides.
    pub fn load() -> TxResult<Self> {
        let mut cfg = match env::var("MODELCTL_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        cfg.apply_env(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    /// Parse a TOML configuration file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> TxResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TxError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> TxResult<Self> {
        let cfg: AppCfg = toml::from_str(content).map_err(|e| TxError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env<F>(&mut self, lookup: F) -> TxResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("MODELCTL_DATA_ROOT") {
            self.data_root = root;
        }
        if let Some(flag) = lookup("MODELCTL_LEARN_IN_BACKGROUND") {
            self.learn_in_background = parse_bool("MODELCTL_LEARN_IN_BACKGROUND", &flag)?;
        }
        if let Some(workers) = lookup("MODELCTL_LEARN_WORKERS") {
            self.learn_workers = workers.parse().map_err(|_| {
                TxError::Config(format!("MODELCTL_LEARN_WORKERS: '{workers}' is not a count"))
            })?;
        }
        if let Some(backend) = lookup("MODELCTL_DEFAULT_BACKEND") {
            self.default_backend = Some(backend).filter(|b| !b.is_empty());
        }
        if let Some(filter) = lookup("MODELCTL_LOG") {
            self.log_filter = filter;
        }
        if let Some(flag) = lookup("MODELCTL_LOG_JSON") {
            self.log_json = parse_bool("MODELCTL_LOG_JSON", &flag)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> TxResult<()> {
        if self.learn_in_background && self.learn_workers == 0 {
            return Err(TxError::Config(
                "learn_in_background requires at least one learn worker".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> TxResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TxError::Config(format!("{key}: '{other}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_run_learn_inline() {
        let cfg = AppCfg::default();
        assert!(!cfg.learn_in_background);
        assert_eq!(cfg.learn_workers, 2);
        assert!(cfg.default_backend.is_none());
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let cfg = AppCfg::from_toml(
            r#"
learn_in_background = true
default_backend = "linear"
"#,
        )
        .unwrap();
        assert!(cfg.learn_in_background);
        assert_eq!(cfg.default_backend.as_deref(), Some("linear"));
        assert_eq!(cfg.data_root, "./data");
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = AppCfg::from_toml("learn_workers = [[ nope").unwrap_err();
        assert!(matches!(err, TxError::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("MODELCTL_DATA_ROOT", "/tmp/models"),
            ("MODELCTL_LEARN_IN_BACKGROUND", "yes"),
            ("MODELCTL_LEARN_WORKERS", "4"),
            ("MODELCTL_LOG_JSON", "off"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppCfg::default();
        cfg.apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(cfg.data_root, "/tmp/models");
        assert!(cfg.learn_in_background);
        assert_eq!(cfg.learn_workers, 4);
        assert!(!cfg.log_json);
    }

    #[test]
    fn background_without_workers_is_rejected() {
        let mut cfg = AppCfg::default();
        let err = cfg
            .apply_env(|key| match key {
                "MODELCTL_LEARN_IN_BACKGROUND" => Some("true".into()),
                "MODELCTL_LEARN_WORKERS" => Some("0".into()),
                _ => None,
            })
            .unwrap_err();
        assert!(matches!(err, TxError::Config(_)));
    }

    #[test]
    fn garbage_boolean_is_rejected() {
        assert!(parse_bool("K", "maybe").is_err());
        assert!(parse_bool("K", " TRUE ").unwrap());
    }
}
