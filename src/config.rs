// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Editor configuration.
//!
//! Values come from defaults, then an optional YAML file, then `STEPGRAPH_*` environment
//! variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout::LayoutPresets;
use crate::projection::ProjectionConfig;

pub const ENV_HISTORY_DEPTH: &str = "STEPGRAPH_HISTORY_DEPTH";
pub const ENV_TRANSCRIPT_CAP: &str = "STEPGRAPH_TRANSCRIPT_CAP";
pub const ENV_TRANSCRIPT: &str = "STEPGRAPH_TRANSCRIPT";

pub const DEFAULT_HISTORY_DEPTH: usize = 10;
pub const DEFAULT_TRANSCRIPT_CAP: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo snapshots kept before the oldest is evicted.
    pub history_depth: usize,
    /// Chat messages kept in persisted storage.
    pub transcript_cap: usize,
    /// Where the chat transcript is persisted; in-memory when unset.
    pub transcript_path: Option<PathBuf>,
    /// Sync persisted files and their directory after every write.
    pub durable_writes: bool,
    pub projection: ProjectionConfig,
    pub layout: LayoutPresets,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            transcript_cap: DEFAULT_TRANSCRIPT_CAP,
            transcript_path: None,
            durable_writes: false,
            projection: ProjectionConfig::default(),
            layout: LayoutPresets::default(),
        }
    }
}

impl EditorConfig {
    /// Loads `path` (if any) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `STEPGRAPH_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_HISTORY_DEPTH) {
            self.history_depth = parse_count(ENV_HISTORY_DEPTH, &value)?;
        }
        if let Some(value) = lookup(ENV_TRANSCRIPT_CAP) {
            self.transcript_cap = parse_count(ENV_TRANSCRIPT_CAP, &value)?;
        }
        if let Some(value) = lookup(ENV_TRANSCRIPT) {
            let value = value.trim();
            self.transcript_path = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_depth == 0 {
            return Err(ConfigError::Zero { field: "history_depth" });
        }
        if self.transcript_cap == 0 {
            return Err(ConfigError::Zero { field: "transcript_cap" });
        }
        Ok(())
    }
}

fn parse_count(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::Env { var, value: value.to_owned() })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{ConfigError, EditorConfig, ENV_HISTORY_DEPTH, ENV_TRANSCRIPT, ENV_TRANSCRIPT_CAP};
    use crate::layout::LayoutDirection;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_editor_behaviour() {
        let config = EditorConfig::default();
        assert_eq!(config.history_depth, 10);
        assert_eq!(config.transcript_cap, 50);
        assert!(!config.durable_writes);
        assert_eq!(config.projection.row_spacing, 150.0);
        assert_eq!(config.layout.workflow.node_spacing, 180.0);
        assert_eq!(config.layout.compact.direction, LayoutDirection::LeftToRight);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("stepgraph.yaml");
        fs::write(&path, "history_depth: 3\ndurable_writes: true\nprojection:\n  row_spacing: 90\n")
            .expect("write");

        let config = EditorConfig::from_file(&path).expect("config");
        assert_eq!(config.history_depth, 3);
        assert!(config.durable_writes);
        assert_eq!(config.transcript_cap, 50);
        assert_eq!(config.projection.row_spacing, 90.0);
        assert_eq!(config.projection.column_spacing, 300.0);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = EditorConfig::default();
        config
            .apply_env(env(&[
                (ENV_HISTORY_DEPTH, "4"),
                (ENV_TRANSCRIPT_CAP, " 12 "),
                (ENV_TRANSCRIPT, "/tmp/chat.json"),
            ]))
            .expect("env");
        assert_eq!(config.history_depth, 4);
        assert_eq!(config.transcript_cap, 12);
        assert_eq!(config.transcript_path, Some(PathBuf::from("/tmp/chat.json")));
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let mut config = EditorConfig::default();
        let err = config.apply_env(env(&[(ENV_HISTORY_DEPTH, "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var, .. } if var == ENV_HISTORY_DEPTH));

        let err = config.apply_env(env(&[(ENV_TRANSCRIPT_CAP, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "transcript_cap" }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = EditorConfig::from_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
