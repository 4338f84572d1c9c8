// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Output provenance naming
//!
//! Final artifacts are placed as
//! `<output>/tractify/sub-<id>/ses-<id>/dwi/sub-<id>_ses-<id>_desc-<role>.<ext>`.
//! Naming is a pure path transform; it never touches file contents and
//! never appears as a stage in the graph.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{TractifyError, TractifyResult};
use crate::graph::Sink;

/// Semantic role of a final artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputRole {
    TissueSegmentation,
    Gmwmi,
    Fod,
    StreamlineWeights,
    AtlasDiffusionSpace,
    ConnectomeLength,
    ConnectomeInvLength,
    Sse,
}

impl OutputRole {
    pub const ALL: [OutputRole; 8] = [
        Self::TissueSegmentation,
        Self::Gmwmi,
        Self::Fod,
        Self::StreamlineWeights,
        Self::AtlasDiffusionSpace,
        Self::ConnectomeLength,
        Self::ConnectomeInvLength,
        Self::Sse,
    ];

    /// Value of the `desc` entity
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TissueSegmentation => "tissue-segmentation",
            Self::Gmwmi => "gmwmi",
            Self::Fod => "fod",
            Self::StreamlineWeights => "streamline-weights",
            Self::AtlasDiffusionSpace => "atlas-diffusion-space",
            Self::ConnectomeLength => "connectome-length",
            Self::ConnectomeInvLength => "connectome-invlength",
            Self::Sse => "sse",
        }
    }

    /// `outputnode` port carrying this role
    pub fn port(self) -> &'static str {
        match self {
            Self::TissueSegmentation => "tissue_segmentation",
            Self::Gmwmi => "gmwmi",
            Self::Fod => "fod",
            Self::StreamlineWeights => "streamline_weights",
            Self::AtlasDiffusionSpace => "atlas_diffusion_space",
            Self::ConnectomeLength => "connectome_length",
            Self::ConnectomeInvLength => "connectome_invlength",
            Self::Sse => "sse",
        }
    }

    /// Extension of the artifact the pipeline produces for this role
    pub fn extension(self) -> &'static str {
        match self {
            Self::StreamlineWeights => ".txt",
            Self::ConnectomeLength | Self::ConnectomeInvLength => ".csv",
            _ => ".nii.gz",
        }
    }
}

impl std::fmt::Display for OutputRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown output role: {}", s))
    }
}

/// Compound-aware extension of a file name: `fod.nii.gz` -> `.nii.gz`
fn extension_of(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    match name.find('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i..]),
    }
}

/// Maps subject, session and role to canonical names and locations
pub struct OutputProvenanceNamer;

impl OutputProvenanceNamer {
    /// `sub-<subject>_ses-<session>_desc-<role><ext>` with the role's extension
    pub fn name(subject_id: &str, session_id: &str, role: OutputRole) -> String {
        Self::with_extension(subject_id, session_id, role, role.extension())
    }

    /// Canonical name keeping the extension of the upstream artifact
    pub fn name_for_artifact(
        subject_id: &str,
        session_id: &str,
        role: OutputRole,
        artifact: &Path,
    ) -> String {
        let ext = extension_of(artifact).unwrap_or_else(|| role.extension());
        Self::with_extension(subject_id, session_id, role, ext)
    }

    fn with_extension(subject_id: &str, session_id: &str, role: OutputRole, ext: &str) -> String {
        format!(
            "sub-{}_ses-{}_desc-{}{}",
            subject_id,
            session_id,
            role.as_str(),
            ext
        )
    }

    /// `<output_root>/tractify/sub-<subject>/ses-<session>/dwi`
    pub fn destination_path(output_root: &Path, subject_id: &str, session_id: &str) -> PathBuf {
        output_root
            .join("tractify")
            .join(format!("sub-{}", subject_id))
            .join(format!("ses-{}", session_id))
            .join("dwi")
    }
}

/// Placement of every final artifact of one subject/session
#[derive(Debug, Clone)]
pub struct OutputPlan {
    directory: PathBuf,
    names: BTreeMap<OutputRole, String>,
}

impl OutputPlan {
    /// Plan placement for `roles`; two roles resolving to one name is an error
    pub fn new(
        output_root: &Path,
        subject_id: &str,
        session_id: &str,
        roles: &[OutputRole],
    ) -> TractifyResult<Self> {
        let mut by_name: BTreeMap<String, Vec<OutputRole>> = BTreeMap::new();
        for &role in roles {
            by_name
                .entry(OutputProvenanceNamer::name(subject_id, session_id, role))
                .or_default()
                .push(role);
        }

        if let Some((name, clashing)) = by_name.iter().find(|(_, r)| r.len() > 1) {
            return Err(TractifyError::OutputNameCollision {
                name: name.clone(),
                roles: clashing.iter().map(|r| r.to_string()).collect(),
            });
        }

        Ok(Self {
            directory: OutputProvenanceNamer::destination_path(output_root, subject_id, session_id),
            names: by_name
                .into_iter()
                .filter_map(|(name, roles)| roles.first().map(|&role| (role, name)))
                .collect(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(&self, role: OutputRole) -> Option<&str> {
        self.names.get(&role).map(String::as_str)
    }

    /// One sink per planned role, in role order
    pub fn sinks(&self) -> Vec<Sink> {
        self.names
            .iter()
            .map(|(role, name)| Sink {
                role: role.to_string(),
                port: role.port().to_string(),
                directory: self.directory.clone(),
                file_name: name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(
            OutputProvenanceNamer::name("01", "01", OutputRole::ConnectomeLength),
            "sub-01_ses-01_desc-connectome-length.csv"
        );
        assert_eq!(
            OutputProvenanceNamer::name("02", "03", OutputRole::Fod),
            "sub-02_ses-03_desc-fod.nii.gz"
        );
    }

    #[test]
    fn test_destination_path() {
        assert_eq!(
            OutputProvenanceNamer::destination_path(Path::new("root"), "01", "01"),
            PathBuf::from("root/tractify/sub-01/ses-01/dwi")
        );
    }

    #[test]
    fn test_name_keeps_artifact_extension() {
        assert_eq!(
            OutputProvenanceNamer::name_for_artifact(
                "01",
                "01",
                OutputRole::Gmwmi,
                Path::new("/scratch/gmwmi_convert/gmwmi.nii.gz")
            ),
            "sub-01_ses-01_desc-gmwmi.nii.gz"
        );
        assert_eq!(
            OutputProvenanceNamer::name_for_artifact(
                "01",
                "01",
                OutputRole::Fod,
                Path::new("FOD.mif")
            ),
            "sub-01_ses-01_desc-fod.mif"
        );
        assert_eq!(
            OutputProvenanceNamer::name_for_artifact("01", "01", OutputRole::Sse, Path::new("sse")),
            "sub-01_ses-01_desc-sse.nii.gz"
        );
    }

    #[test]
    fn test_role_names_round_trip_through_from_str() {
        for role in OutputRole::ALL {
            assert_eq!(role.as_str().parse::<OutputRole>(), Ok(role));
        }
        assert!("tracks".parse::<OutputRole>().is_err());
    }

    #[test]
    fn test_plan_rejects_collisions() {
        let plan = OutputPlan::new(Path::new("/out"), "01", "01", &OutputRole::ALL).unwrap();
        assert_eq!(plan.sinks().len(), 8);
        assert_eq!(
            plan.file_name(OutputRole::StreamlineWeights),
            Some("sub-01_ses-01_desc-streamline-weights.txt")
        );

        let err = OutputPlan::new(
            Path::new("/out"),
            "01",
            "01",
            &[OutputRole::Fod, OutputRole::Sse, OutputRole::Fod],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TractifyError::OutputNameCollision { ref roles, .. } if roles.len() == 2
        ));
    }
}
