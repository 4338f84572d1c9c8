// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! dmripreproc outputs for one subject and session

use serde::Serialize;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{TractifyError, TractifyResult};

const EDDY_FILE: &str = "eddy_corrected.nii.gz";
const ROTATED_BVECS: &str = "eddy_corrected.eddy_rotated_bvecs";
const AVG_B0: &str = "eddy_corrected_avg_b0.nii.gz";
const ROI_MASK: &str = "eddy_corrected_roi_mask.nii.gz";

/// Files found under `<root>/sub-<id>[/ses-<id>]/dwi/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmriPreprocOutputs {
    /// Eddy-corrected diffusion volume
    pub eddy_file: PathBuf,
    /// b-vectors rotated by eddy
    pub bvec: PathBuf,
    pub bval: PathBuf,
    /// Mean b0 volume
    pub avg_b0: PathBuf,
    /// Brain mask
    pub mask: PathBuf,
}

impl DmriPreprocOutputs {
    /// Directory holding the outputs; the session level is skipped without a session
    pub fn directory(root: &Path, subject_id: &str, session_id: Option<&str>) -> PathBuf {
        let mut dir = root.join(format!("sub-{}", subject_id));
        if let Some(session) = session_id {
            dir.push(format!("ses-{}", session));
        }
        dir.join("dwi")
    }

    /// Resolve every output, failing with `MissingArtifact` on the first absent one
    pub fn resolve(root: &Path, subject_id: &str, session_id: Option<&str>) -> TractifyResult<Self> {
        let dir = Self::directory(root, subject_id, session_id);
        let missing = |artifact: &str, path: PathBuf| TractifyError::MissingArtifact {
            subject: subject_id.to_string(),
            session: session_id.unwrap_or_default().to_string(),
            artifact: artifact.to_string(),
            path,
        };

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(missing("dmripreproc output directory", dir))
            }
            Err(e) => {
                return Err(TractifyError::FileReadError {
                    path: dir,
                    error: e.to_string(),
                })
            }
        };

        let mut bvals = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(".bval") {
                bvals.push(entry.path());
            }
        }
        bvals.sort();

        let require = |file_name: &str, artifact: &str| {
            let path = dir.join(file_name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(missing(artifact, path))
            }
        };

        let eddy_file = require(EDDY_FILE, "eddy-corrected diffusion volume")?;
        let bvec = require(ROTATED_BVECS, "rotated b-vectors")?;
        let bval = bvals
            .into_iter()
            .next()
            .ok_or_else(|| missing("b-values", dir.join("*.bval")))?;
        let avg_b0 = require(AVG_B0, "mean b0 volume")?;
        let mask = require(ROI_MASK, "brain mask")?;

        Ok(Self {
            eddy_file,
            bvec,
            bval,
            avg_b0,
            mask,
        })
    }
}
