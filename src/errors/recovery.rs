// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use std::path::Path;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest a valid segmentation algorithm
    pub fn choose_algorithm(choice: &str) -> Self {
        Self {
            action: "Pick a supported 5ttgen algorithm".into(),
            steps: vec![
                format!("'{}' is not a tissue segmentation variant", choice),
                "fsl segments the registered T1w image directly".into(),
                "freesurfer resamples an existing aseg volume into diffusion space".into(),
            ],
            commands: vec![
                "tractify build --gen5tt-algo fsl ...".into(),
                "tractify build --gen5tt-algo freesurfer --fs-file aseg.mgz ...".into(),
            ],
        }
    }

    /// Suggest passing the aseg volume
    pub fn provide_segmentation() -> Self {
        Self {
            action: "Provide a FreeSurfer segmentation".into(),
            steps: vec![
                "The freesurfer variant starts from the subject's aseg volume".into(),
                "It is usually found at $SUBJECTS_DIR/<subject>/mri/aseg.mgz".into(),
            ],
            commands: vec!["tractify build --gen5tt-algo freesurfer --fs-file aseg.mgz ...".into()],
        }
    }

    /// Suggest fixing a circular dependency
    pub fn fix_circular_dependency(stages: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", stages.join(" → ")),
                "Ensure stages form a directed acyclic graph (DAG)".into(),
            ],
            commands: vec![
                "# Visualize the graph:".into(),
                "tractify graph --format mermaid ...".into(),
            ],
        }
    }

    /// Suggest producing the preprocessing outputs
    pub fn run_preprocessing(subject: &str, session: &str) -> Self {
        Self {
            action: format!("Preprocess sub-{} ses-{}", subject, session),
            steps: vec![
                "Tractography starts from eddy-corrected dmripreproc outputs".into(),
                format!(
                    "Expected them under <dmripreproc_dir>/sub-{}/ses-{}/dwi/",
                    subject, session
                ),
            ],
            commands: vec![],
        }
    }

    /// Suggest checking the dataset layout
    pub fn check_dataset(root: &Path) -> Self {
        Self {
            action: "Check the BIDS dataset".into(),
            steps: vec![
                format!("Dataset root: {}", root.display()),
                "Subjects are directories named sub-<label>".into(),
                "A dataset_description.json must sit at the root unless validation is skipped".into(),
            ],
            commands: vec![
                "# List subjects tractify can see:".into(),
                format!("tractify participants {}", root.display()),
            ],
        }
    }

    /// Suggest installing missing external programs
    pub fn install_programs(programs: &[String]) -> Self {
        let mut steps = vec![format!("Not found on PATH: {}", programs.join(", "))];
        if programs.iter().any(|p| is_fsl_program(p)) {
            steps.push("FSL: https://fsl.fmrib.ox.ac.uk/fsl/fslwiki/FslInstallation".into());
        }
        if programs.iter().any(|p| !is_fsl_program(p) && p != "mri_convert") {
            steps.push("MRtrix3: https://www.mrtrix.org/download/".into());
        }
        if programs.iter().any(|p| p == "mri_convert") {
            steps.push("FreeSurfer: https://surfer.nmr.mgh.harvard.edu/fswiki/DownloadAndInstall".into());
        }

        Self {
            action: "Install the external imaging tools".into(),
            steps,
            commands: vec![],
        }
    }
}

fn is_fsl_program(program: &str) -> bool {
    matches!(
        program,
        "fslreorient2std" | "bet" | "flirt" | "convert_xfm" | "fnirt" | "invwarp" | "applywarp" | "dtifit"
    )
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_programs_links_toolkits() {
        let suggestion =
            RecoverySuggestion::install_programs(&["flirt".to_string(), "tckgen".to_string()]);
        let text = suggestion.to_string();
        assert!(text.contains("flirt, tckgen"));
        assert!(text.contains("FSL"));
        assert!(text.contains("MRtrix3"));
        assert!(!text.contains("FreeSurfer"));
    }
}
