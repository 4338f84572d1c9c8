// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Execution configuration attached to a graph
//!
//! The orchestrator reads this alongside the graph. It is fixed when the
//! graph is sealed; nested graphs keep their own copy.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Orchestrator-facing execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionConfig {
    /// Scratch directory for intermediate stage outputs
    pub work_dir: Option<PathBuf>,
    /// Where crash reports for this graph go
    pub crash_dump_dir: Option<PathBuf>,
    /// Keep stage inputs alongside outputs
    pub keep_inputs: bool,
    /// Let the orchestrator delete outputs nobody consumes
    pub remove_unnecessary_outputs: bool,
    /// Extra environment for every stage
    pub environment: BTreeMap<String, String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            crash_dump_dir: None,
            keep_inputs: true,
            remove_unnecessary_outputs: false,
            environment: BTreeMap::new(),
        }
    }
}

impl ExecutionConfig {
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Crash dumps for one subject: `<output>/tractify_crash/sub-<id>/log`
    pub fn with_subject_crash_dir(mut self, output_dir: &Path, subject_id: &str) -> Self {
        self.crash_dump_dir = Some(
            output_dir
                .join("tractify_crash")
                .join(format!("sub-{}", subject_id))
                .join("log"),
        );
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_crash_dir() {
        let config = ExecutionConfig::default().with_subject_crash_dir(Path::new("/out"), "01");
        assert_eq!(
            config.crash_dump_dir,
            Some(PathBuf::from("/out/tractify_crash/sub-01/log"))
        );
        assert!(config.keep_inputs);
        assert!(!config.remove_unnecessary_outputs);
    }
}
