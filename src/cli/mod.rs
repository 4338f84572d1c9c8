// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for tractify.

pub mod batch;
pub mod build;
pub mod gradients;
pub mod graph;
pub mod participants;
pub mod tools;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{TractifyError, TractifyResult};
use crate::graph::PipelineGraph;
use crate::settings::Settings;
use crate::workflow::TractInputs;

/// Diffusion MRI tractography graph builder
///
/// Assembles per-subject tractography pipelines for BIDS datasets.
#[derive(Parser, Debug)]
#[clap(
    name = "tractify",
    version,
    about = "Builds and validates diffusion-MRI tractography pipeline graphs",
    long_about = None,
    after_help = "Examples:\n\
        tractify build T1w.nii.gz eddy.nii.gz dwi.bvec dwi.bval tpl.nii.gz atlas.nii.gz out/\n\
        tractify batch bids/ derivatives/dmripreproc tpl.nii.gz atlas.nii.gz out/\n\
        tractify participants bids/ --participant-label 01\n\
        tractify gradients dwi.bvec dwi.bval\n\n\
        See 'tractify <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the tractography graph for one subject/session
    Build {
        #[clap(flatten)]
        tract: TractArgs,

        /// Validate and report without writing graph files
        #[clap(long)]
        dry_run: bool,
    },

    /// Show the tractography graph for one subject/session
    Graph {
        #[clap(flatten)]
        tract: TractArgs,

        /// Output format (text, dot, mermaid, json)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Build graphs for every participant of a BIDS dataset
    Batch {
        #[clap(flatten)]
        batch: BatchArgs,

        /// Validate and report without writing graph files
        #[clap(long)]
        dry_run: bool,
    },

    /// List the participants a batch run would process
    Participants {
        /// BIDS dataset root
        bids_dir: PathBuf,

        /// Participants to select (default: all)
        #[clap(long = "participant-label", value_name = "LABEL")]
        participant_label: Vec<String>,

        /// Fail when a requested participant is not in the dataset
        #[clap(long)]
        strict: bool,

        /// Do not require dataset_description.json
        #[clap(long)]
        skip_bids_validation: bool,

        /// Output format (text, json)
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check whether a gradient set covers only one hemisphere
    Gradients {
        /// FSL-format b-vectors file
        bvec_file: PathBuf,

        /// FSL-format b-values file
        bval_file: PathBuf,

        /// b-value at or below which a volume counts as b=0
        #[clap(long, default_value = "50")]
        b0_threshold: f64,

        /// Output format (text, json)
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Report which external programs are available on PATH
    Tools {
        /// Five-tissue-type segmentation algorithm (fsl, freesurfer)
        #[clap(long, default_value = "fsl", env = "TRACTIFY_GEN5TT_ALGO")]
        gen5tt_algo: String,
    },
}

/// Inputs for one tractography graph
#[derive(Args, Debug, Clone)]
pub struct TractArgs {
    /// Anatomical T1-weighted image
    pub t1_file: PathBuf,

    /// Eddy-corrected diffusion volume
    pub eddy_file: PathBuf,

    /// FSL-format b-vectors file
    pub bvec_file: PathBuf,

    /// FSL-format b-values file
    pub bval_file: PathBuf,

    /// Template image for atlas registration
    pub template_file: PathBuf,

    /// Atlas image in template space
    pub atlas_file: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Five-tissue-type segmentation algorithm (fsl, freesurfer)
    #[clap(long, default_value = "fsl", env = "TRACTIFY_GEN5TT_ALGO")]
    pub gen5tt_algo: String,

    /// FreeSurfer segmentation volume (aseg), required for freesurfer
    #[clap(long)]
    pub fs_file: Option<PathBuf>,

    /// Number of streamlines to generate
    #[clap(long, default_value = "50000", env = "TRACTIFY_NUM_TRACTS")]
    pub num_tracts: u32,

    /// Participant label
    #[clap(long, default_value = "001")]
    pub participant_label: String,

    /// Session label
    #[clap(long, default_value = "01")]
    pub session_label: String,

    /// Settings file (YAML or TOML)
    #[clap(long, env = "TRACTIFY_SETTINGS")]
    pub settings: Option<PathBuf>,
}

impl TractArgs {
    pub fn inputs(&self) -> TractInputs {
        TractInputs {
            t1_file: self.t1_file.clone(),
            fs_file: self.fs_file.clone(),
            eddy_file: self.eddy_file.clone(),
            bvec: self.bvec_file.clone(),
            bval: self.bval_file.clone(),
            template: self.template_file.clone(),
            atlas: self.atlas_file.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    /// Participant label without a `sub-` prefix
    pub fn subject_id(&self) -> &str {
        crate::dataset::strip_subject_prefix(&self.participant_label)
    }

    pub fn session_id(&self) -> &str {
        self.session_label
            .strip_prefix("ses-")
            .unwrap_or(&self.session_label)
    }
}

/// Dataset-wide inputs
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// BIDS dataset root
    pub bids_dir: PathBuf,

    /// dmripreproc derivatives root
    pub dmripreproc_dir: PathBuf,

    /// Template image for atlas registration
    pub template_file: PathBuf,

    /// Atlas image in template space
    pub atlas_file: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Participants to process (with or without the sub- prefix)
    #[clap(long = "participant-label", value_name = "LABEL")]
    pub participant_label: Vec<String>,

    /// Fail when a requested participant is not in the dataset
    #[clap(long)]
    pub strict: bool,

    /// Do not require dataset_description.json
    #[clap(long)]
    pub skip_bids_validation: bool,

    /// Five-tissue-type segmentation algorithm (fsl, freesurfer)
    #[clap(long, default_value = "fsl", env = "TRACTIFY_GEN5TT_ALGO")]
    pub gen5tt_algo: String,

    /// FreeSurfer subjects directory (default: <bids_dir>/derivatives/freesurfer)
    #[clap(long, env = "TRACTIFY_FREESURFER_DIR")]
    pub freesurfer_dir: Option<PathBuf>,

    /// Number of streamlines to generate
    #[clap(long, default_value = "50000", env = "TRACTIFY_NUM_TRACTS")]
    pub num_tracts: u32,

    /// Settings file (YAML or TOML)
    #[clap(long, env = "TRACTIFY_SETTINGS")]
    pub settings: Option<PathBuf>,
}

/// Resolve settings and reject invalid values
pub(crate) fn load_settings(path: Option<&Path>) -> miette::Result<Settings> {
    let settings = Settings::resolve(path).map_err(fail)?;
    settings.validate().map_err(fail)?;
    Ok(settings)
}

/// Print the recovery suggestion, then hand the error to miette
pub(crate) fn fail(error: TractifyError) -> miette::Report {
    crate::utils::print_recovery(&error);
    miette::Report::new(error)
}

/// Write `graph.json` and `graph.dot` into `dir`
pub(crate) fn write_graph_files(graph: &PipelineGraph, dir: &Path) -> TractifyResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| TractifyError::FileWriteError {
        path: dir.to_path_buf(),
        error: e.to_string(),
    })?;

    let files = [
        (dir.join("graph.json"), graph.to_json()?),
        (dir.join("graph.dot"), graph.to_dot()),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        std::fs::write(&path, contents).map_err(|e| TractifyError::FileWriteError {
            path: path.clone(),
            error: e.to_string(),
        })?;
        debug!(path = %path.display(), "graph file written");
        written.push(path);
    }
    Ok(written)
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
    Json,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let cli = Cli::parse_from([
            "tractify", "build", "t1.nii.gz", "eddy.nii.gz", "dwi.bvec", "dwi.bval", "tpl.nii.gz",
            "atlas.nii.gz", "out",
        ]);
        match cli.command {
            Commands::Build { tract, dry_run } => {
                assert!(!dry_run);
                assert_eq!(tract.gen5tt_algo, "fsl");
                assert_eq!(tract.num_tracts, 50000);
                assert_eq!(tract.subject_id(), "001");
                assert_eq!(tract.session_id(), "01");
                assert_eq!(tract.inputs().bvec, PathBuf::from("dwi.bvec"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_labels_strip_prefixes() {
        let cli = Cli::parse_from([
            "tractify",
            "graph",
            "t1",
            "eddy",
            "bvec",
            "bval",
            "tpl",
            "atlas",
            "out",
            "--participant-label",
            "sub-07",
            "--session-label",
            "ses-02",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Graph { tract, format } => {
                assert_eq!(tract.subject_id(), "07");
                assert_eq!(tract.session_id(), "02");
                assert_eq!(format, GraphFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_repeated_participant_labels() {
        let cli = Cli::parse_from([
            "tractify",
            "batch",
            "bids",
            "prep",
            "tpl",
            "atlas",
            "out",
            "--participant-label",
            "01",
            "--participant-label",
            "sub-02",
        ]);
        match cli.command {
            Commands::Batch { batch, dry_run } => {
                assert!(!dry_run);
                assert_eq!(batch.participant_label, vec!["01", "sub-02"]);
                assert!(batch.freesurfer_dir.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
