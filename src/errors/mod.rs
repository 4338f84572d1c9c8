// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Error types
//!
//! Every failure tractify can raise while assembling a pipeline maps onto one
//! of four kinds: configuration, dataset, invalid geometric input, or a
//! missing preprocessing artifact. Plumbing failures (I/O, parsing) form a
//! fifth kind.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for tractify operations
pub type TractifyResult<T> = Result<T, TractifyError>;

/// Broad classification of a [`TractifyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid choice, unbound input, cycle, name collision
    Configuration,
    /// Participants missing or dataset unreadable
    Dataset,
    /// Malformed geometric input
    InvalidInput,
    /// Expected preprocessing output absent
    MissingArtifact,
    /// I/O and parsing plumbing
    Io,
}

/// Main error type for tractify
#[derive(Error, Debug, Diagnostic)]
pub enum TractifyError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unknown segmentation algorithm '{choice}'")]
    #[diagnostic(
        code(tractify::unknown_algorithm),
        help("Supported algorithms: fsl, freesurfer")
    )]
    UnknownAlgorithm { choice: String },

    #[error("The freesurfer segmentation variant requires a segmentation file")]
    #[diagnostic(
        code(tractify::missing_segmentation),
        help("Pass the subject's aseg volume with --fs-file")
    )]
    MissingSegmentationFile,

    #[error("Node '{node}' already exists in graph '{graph}'")]
    #[diagnostic(code(tractify::duplicate_node))]
    DuplicateNode { graph: String, node: String },

    #[error("Graph '{graph}' has no node named '{node}'")]
    #[diagnostic(code(tractify::unknown_node))]
    UnknownNode { graph: String, node: String },

    #[error("Node '{node}' has no {direction} port '{port}'")]
    #[diagnostic(code(tractify::unknown_port))]
    UnknownPort {
        node: String,
        port: String,
        direction: &'static str,
    },

    #[error("Input '{node}.{port}' is already bound")]
    #[diagnostic(
        code(tractify::port_already_bound),
        help("An input port accepts at most one incoming connection")
    )]
    PortAlreadyBound { node: String, port: String },

    #[error("Cannot bind {source_port} ({found}) to {target_port} ({expected})")]
    #[diagnostic(code(tractify::type_mismatch))]
    TypeMismatch {
        source_port: String,
        target_port: String,
        expected: String,
        found: String,
    },

    #[error("Required input '{node}.{port}' is not bound in graph '{graph}'")]
    #[diagnostic(code(tractify::unbound_input))]
    UnboundInput {
        graph: String,
        node: String,
        port: String,
    },

    #[error("Circular dependency detected: {}", stages.join(" → "))]
    #[diagnostic(
        code(tractify::circular_dependency),
        help("Stages may only consume outputs of strictly upstream stages")
    )]
    CircularDependency { stages: Vec<String> },

    #[error("Output roles {} all map to '{name}'", roles.join(", "))]
    #[diagnostic(code(tractify::output_name_collision))]
    OutputNameCollision { name: String, roles: Vec<String> },

    #[error("Invalid settings: {reason}")]
    #[diagnostic(code(tractify::invalid_settings))]
    InvalidSettings {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Dataset Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{message} (dataset root: {})", root.display())]
    #[diagnostic(code(tractify::dataset))]
    Dataset {
        root: PathBuf,
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Geometry Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid input: {reason}")]
    #[diagnostic(code(tractify::invalid_input))]
    InvalidInput { reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Preprocessing Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Missing {artifact} for sub-{subject} ses-{session}: {}", path.display())]
    #[diagnostic(
        code(tractify::missing_artifact),
        help("Run dmripreproc for this subject/session before building its tractography graph")
    )]
    MissingArtifact {
        subject: String,
        session: String,
        artifact: String,
        path: PathBuf,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(tractify::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(tractify::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(tractify::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(tractify::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(tractify::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(tractify::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(tractify::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for TractifyError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for TractifyError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for TractifyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for TractifyError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for TractifyError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl TractifyError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAlgorithm { .. }
            | Self::MissingSegmentationFile
            | Self::DuplicateNode { .. }
            | Self::UnknownNode { .. }
            | Self::UnknownPort { .. }
            | Self::PortAlreadyBound { .. }
            | Self::TypeMismatch { .. }
            | Self::UnboundInput { .. }
            | Self::CircularDependency { .. }
            | Self::OutputNameCollision { .. }
            | Self::InvalidSettings { .. } => ErrorKind::Configuration,
            Self::Dataset { .. } => ErrorKind::Dataset,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::MissingArtifact { .. } => ErrorKind::MissingArtifact,
            Self::FileReadError { .. }
            | Self::FileWriteError { .. }
            | Self::Io { .. }
            | Self::Yaml { .. }
            | Self::Json { .. }
            | Self::Toml { .. }
            | Self::GlobPattern { .. } => ErrorKind::Io,
        }
    }

    /// Create a dataset error rooted at `root`
    pub fn dataset(root: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Dataset {
            root: root.into(),
            message: message.into(),
            help: None,
        }
    }

    /// Create an invalid geometric input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether the multi-subject driver should skip this session and continue
    pub fn is_skippable(&self) -> bool {
        matches!(self.kind(), ErrorKind::MissingArtifact)
    }

    /// A recovery suggestion for errors that have an obvious next step
    pub fn recovery(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::UnknownAlgorithm { choice } => Some(RecoverySuggestion::choose_algorithm(choice)),
            Self::MissingSegmentationFile => Some(RecoverySuggestion::provide_segmentation()),
            Self::CircularDependency { stages } => {
                Some(RecoverySuggestion::fix_circular_dependency(stages))
            }
            Self::MissingArtifact {
                subject, session, ..
            } => Some(RecoverySuggestion::run_preprocessing(subject, session)),
            Self::Dataset { root, .. } => Some(RecoverySuggestion::check_dataset(root)),
            _ => None,
        }
    }
}
