//! On-disk configuration, persisted as TOML in
//! `$XDG_CONFIG_HOME/intent-probe/config.toml`.
//!
//! Every field has a serde default, so a partial (or empty) file is valid.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::belief::BeliefSource;
use crate::engine::EngineConfig;
use crate::infer::SolverConfig;
use crate::paths::IntentPaths;
use crate::query::{RankPolicy, TieBreak};
use crate::store::DEFAULT_LEARNING_RATE;

/// Errors from configuration files.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(intent::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(intent::config::parse),
        help("Check the TOML syntax and the field names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(intent::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// User-editable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Template store location; the XDG data file when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub belief_source: BeliefSource,
    #[serde(default)]
    pub rank_policy: RankPolicy,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Fixed RNG seed; entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub solver: SolverConfig,
}

fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            learning_rate: default_learning_rate(),
            belief_source: BeliefSource::default(),
            rank_policy: RankPolicy::default(),
            tie_break: TieBreak::default(),
            seed: None,
            solver: SolverConfig::default(),
        }
    }
}

impl FileConfig {
    /// Convert to an [`EngineConfig`], filling the store path from `paths`.
    pub fn to_engine_config(&self, paths: &IntentPaths) -> EngineConfig {
        EngineConfig {
            store_path: Some(
                self.store_path
                    .clone()
                    .unwrap_or_else(|| paths.store_file()),
            ),
            learning_rate: self.learning_rate,
            belief_source: self.belief_source,
            rank_policy: self.rank_policy,
            tie_break: self.tie_break,
            seed: self.seed,
            solver: self.solver.clone(),
        }
    }

    /// Parse TOML text.
    pub fn parse(text: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load from a TOML file, or the defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::{InferenceMode, SolverKind};

    #[test]
    fn empty_file_yields_defaults() {
        let config = FileConfig::parse("", Path::new("config.toml")).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let text = r#"
            learning_rate = 0.5
            rank_policy = "count"
            tie_break = "by_name"
            seed = 42

            [solver]
            kind = "exact"
            mode = "max_product"
        "#;
        let config = FileConfig::parse(text, Path::new("config.toml")).unwrap();
        assert_eq!(config.learning_rate, 0.5);
        assert_eq!(config.rank_policy, RankPolicy::Count);
        assert_eq!(config.tie_break, TieBreak::ByName);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.solver.kind, SolverKind::Exact);
        assert_eq!(config.solver.mode, InferenceMode::MaxProduct);
        assert_eq!(config.solver.tolerance, 1e-8);
        assert_eq!(config.belief_source, BeliefSource::Inferred);
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let err = FileConfig::parse("rank_policy = \"loudest\"", Path::new("c.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = FileConfig {
            seed: Some(7),
            belief_source: BeliefSource::Frequency,
            ..FileConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(FileConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn engine_config_falls_back_to_xdg_store() {
        let paths = IntentPaths::under(Path::new("/tmp/ip"));
        let engine = FileConfig::default().to_engine_config(&paths);
        assert_eq!(engine.store_path, Some(paths.store_file()));
    }
}
