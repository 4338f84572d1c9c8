// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! User settings
//!
//! Stage parameter defaults and execution flags, read from a YAML or TOML
//! file. Every field is optional in the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{TractifyError, TractifyResult};
use crate::geometry::DEFAULT_B0_THRESHOLD;
use crate::graph::ExecutionConfig;
use crate::stages::mrtrix::{
    is_multi_tissue_fod, is_multi_tissue_response, FOD_ALGORITHMS, RESPONSE_ALGORITHMS,
};

/// Name of the settings file in the per-user config directory
pub const SETTINGS_FILE: &str = "config.yaml";

/// Tractify settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Threads handed to multi-threaded stages (none: tool default)
    pub num_threads: Option<u32>,

    /// `dwi2response` algorithm
    pub response_algorithm: String,

    /// `dwi2fod` algorithm
    pub fod_algorithm: String,

    /// Shells kept for the low-b tensor fit
    pub low_b_shells: Vec<u32>,

    /// b-values at or below this count as b0
    pub b0_threshold: f64,

    /// `tck2connectome -assignment_radial_search` in mm
    pub connectome_search_radius: f64,

    /// FOD amplitude cutoff for `tckgen`
    pub tckgen_cutoff: Option<f64>,

    pub keep_inputs: bool,

    pub remove_unnecessary_outputs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            num_threads: None,
            response_algorithm: "msmt_5tt".to_string(),
            fod_algorithm: "csd".to_string(),
            low_b_shells: vec![0, 1000],
            b0_threshold: DEFAULT_B0_THRESHOLD,
            connectome_search_radius: 2.0,
            tckgen_cutoff: None,
            keep_inputs: true,
            remove_unnecessary_outputs: false,
        }
    }
}

impl Settings {
    /// Load from a file; format chosen by extension
    pub fn load(path: &Path) -> TractifyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TractifyError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let settings: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            other => {
                return Err(TractifyError::InvalidSettings {
                    reason: format!(
                        "Unsupported settings format '{}' ({})",
                        other.unwrap_or(""),
                        path.display()
                    ),
                    help: Some("Use a .yaml, .yml or .toml file".into()),
                })
            }
        };

        settings.validate()?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Explicit file, else the per-user settings file, else defaults
    pub fn resolve(explicit: Option<&Path>) -> TractifyResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match user_settings_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Reject values no stage would accept
    pub fn validate(&self) -> TractifyResult<()> {
        if !RESPONSE_ALGORITHMS.contains(&self.response_algorithm.as_str()) {
            return Err(TractifyError::InvalidSettings {
                reason: format!("Unknown response algorithm '{}'", self.response_algorithm),
                help: Some(format!("Supported: {}", RESPONSE_ALGORITHMS.join(", "))),
            });
        }
        if !FOD_ALGORITHMS.contains(&self.fod_algorithm.as_str()) {
            return Err(TractifyError::InvalidSettings {
                reason: format!("Unknown FOD algorithm '{}'", self.fod_algorithm),
                help: Some(format!("Supported: {}", FOD_ALGORITHMS.join(", "))),
            });
        }
        if is_multi_tissue_fod(&self.fod_algorithm)
            && !is_multi_tissue_response(&self.response_algorithm)
        {
            return Err(TractifyError::InvalidSettings {
                reason: format!(
                    "FOD algorithm '{}' needs GM and CSF responses, which '{}' does not estimate",
                    self.fod_algorithm, self.response_algorithm
                ),
                help: Some("Use response_algorithm msmt_5tt or dhollander".into()),
            });
        }
        if self.low_b_shells.is_empty() {
            return Err(TractifyError::InvalidSettings {
                reason: "low_b_shells must name at least one shell".into(),
                help: None,
            });
        }
        if self.b0_threshold < 0.0 || self.connectome_search_radius <= 0.0 {
            return Err(TractifyError::InvalidSettings {
                reason: "b0_threshold must be non-negative and connectome_search_radius positive"
                    .into(),
                help: None,
            });
        }
        if self.num_threads == Some(0) {
            return Err(TractifyError::InvalidSettings {
                reason: "num_threads must be at least 1".into(),
                help: Some("Leave num_threads unset to use each tool's default".into()),
            });
        }
        Ok(())
    }

    /// Execution configuration seeded from these settings
    pub fn execution_config(&self) -> ExecutionConfig {
        let config = ExecutionConfig {
            keep_inputs: self.keep_inputs,
            remove_unnecessary_outputs: self.remove_unnecessary_outputs,
            ..ExecutionConfig::default()
        };
        match self.num_threads {
            Some(n) => config.with_env("MRTRIX_NTHREADS", n.to_string()),
            None => config,
        }
    }
}

/// `config.yaml` in the per-user config directory
pub fn user_settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "tractify", "tractify")
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_yaml_takes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "fod_algorithm: msmt_csd\nnum_threads: 4\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.fod_algorithm, "msmt_csd");
        assert_eq!(settings.num_threads, Some(4));
        assert_eq!(settings.response_algorithm, "msmt_5tt");
        assert_eq!(settings.low_b_shells, vec![0, 1000]);
    }

    #[test]
    fn test_toml_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "connectome_search_radius = 3.5\nkeep_inputs = false\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.connectome_search_radius, 3.5);
        assert!(!settings.execution_config().keep_inputs);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "response_algorithm: guesswork\n").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, TractifyError::InvalidSettings { .. }));

        let json = dir.path().join("settings.json");
        std::fs::write(&json, "{}").unwrap();
        assert!(matches!(
            Settings::load(&json),
            Err(TractifyError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn test_algorithm_pairs() {
        for response in RESPONSE_ALGORITHMS {
            let settings = Settings {
                response_algorithm: response.to_string(),
                fod_algorithm: "csd".into(),
                ..Settings::default()
            };
            assert!(settings.validate().is_ok(), "{}", response);
        }

        for response in ["msmt_5tt", "dhollander"] {
            let settings = Settings {
                response_algorithm: response.into(),
                fod_algorithm: "msmt_csd".into(),
                ..Settings::default()
            };
            assert!(settings.validate().is_ok(), "{}", response);
        }

        let single_tissue = Settings {
            response_algorithm: "tournier".into(),
            fod_algorithm: "msmt_csd".into(),
            ..Settings::default()
        };
        assert!(matches!(
            single_tissue.validate(),
            Err(TractifyError::InvalidSettings { .. })
        ));

        let manual = Settings {
            response_algorithm: "manual".into(),
            ..Settings::default()
        };
        assert!(manual.validate().is_err());
    }

    #[test]
    fn test_threads_exported_to_environment() {
        let settings = Settings {
            num_threads: Some(8),
            ..Settings::default()
        };
        let config = settings.execution_config();
        assert_eq!(config.environment.get("MRTRIX_NTHREADS").map(String::as_str), Some("8"));
    }
}
