// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Multi-subject driver
//!
//! Builds one tractography graph per subject and session of a BIDS dataset
//! and nests them as `tractify_wf` > `single_subject_<id>_wf` >
//! `sub_<id>_ses_<id>_tract_wf`. Sessions whose preprocessing outputs are
//! missing are skipped; other sessions and subjects carry on.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::segmentation::SegmentationVariant;
use super::tract::{PipelineGraphBuilder, TractInputs};
use crate::dataset::{
    BidsLayout, DatasetIndex, DmriPreprocOutputs, FileQuery, ParticipantResolver,
    ParticipantSelection,
};
use crate::errors::{TractifyError, TractifyResult};
use crate::graph::{GraphBuilder, PipelineGraph};

/// Name of the top-level graph
pub const TOP_LEVEL_GRAPH: &str = "tractify_wf";

/// Session assumed for files without a `ses` entity
pub const DEFAULT_SESSION: &str = "01";

const T1_EXTENSIONS: &[&str] = &[".nii", ".nii.gz"];

/// Everything a batch build needs
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub bids_dir: PathBuf,
    pub dmripreproc_dir: PathBuf,
    pub template: PathBuf,
    pub atlas: PathBuf,
    pub output_dir: PathBuf,
    /// FreeSurfer subjects directory (default `<bids_dir>/derivatives/freesurfer`)
    pub freesurfer_dir: Option<PathBuf>,
    pub variant: SegmentationVariant,
    pub num_tracts: u32,
    pub participant_labels: Vec<String>,
    pub strict: bool,
    pub validate: bool,
}

impl BatchRequest {
    /// Scratch directory for intermediate outputs
    pub fn work_dir(&self) -> PathBuf {
        self.output_dir.join("scratch")
    }

    fn freesurfer_dir(&self) -> PathBuf {
        self.freesurfer_dir
            .clone()
            .unwrap_or_else(|| self.bids_dir.join("derivatives").join("freesurfer"))
    }

    /// `<freesurfer_dir>/sub-<id>/mri/aseg.mgz`
    pub fn aseg_path(&self, subject_id: &str) -> PathBuf {
        self.freesurfer_dir()
            .join(format!("sub-{}", subject_id))
            .join("mri")
            .join("aseg.mgz")
    }
}

/// A session left out of the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSession {
    pub subject: String,
    pub session: String,
    pub reason: String,
}

/// A subject whose graph could not be built at all
#[derive(Debug)]
pub struct FailedSubject {
    pub subject: String,
    pub error: TractifyError,
}

/// Result of one subject
#[derive(Debug)]
pub struct SubjectGraph {
    pub subject: String,
    /// `None` when every session was skipped
    pub graph: Option<PipelineGraph>,
    /// Sessions built, in build order
    pub sessions: Vec<String>,
    pub skipped: Vec<SkippedSession>,
}

/// Result of a batch build
#[derive(Debug)]
pub struct BatchOutcome {
    pub graph: PipelineGraph,
    pub participants: ParticipantSelection,
    /// `(subject, session)` pairs built
    pub sessions: Vec<(String, String)>,
    pub skipped: Vec<SkippedSession>,
    pub failed: Vec<FailedSubject>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Builds graphs for every selected subject
#[derive(Debug, Clone)]
pub struct SessionDriver {
    builder: PipelineGraphBuilder,
}

impl SessionDriver {
    pub fn new(builder: PipelineGraphBuilder) -> Self {
        Self { builder }
    }

    /// Open the dataset, resolve participants and build every subject
    pub async fn run(&self, request: BatchRequest) -> TractifyResult<BatchOutcome> {
        let layout = {
            let root = request.bids_dir.clone();
            let validate = request.validate;
            tokio::task::spawn_blocking(move || BidsLayout::open(root, validate))
                .await
                .map_err(|e| TractifyError::Io {
                    message: e.to_string(),
                })??
        };
        let index: Arc<dyn DatasetIndex> = Arc::new(layout);

        let participants = ParticipantResolver::resolve(
            index.as_ref(),
            request.participant_labels.as_slice(),
            request.strict,
        )?;
        info!(
            participants = participants.participants.len(),
            variant = %request.variant,
            "building tractography graphs"
        );

        let request = Arc::new(request);
        let mut tasks = JoinSet::new();
        for subject in &participants.participants {
            let driver = self.clone();
            let index = Arc::clone(&index);
            let request = Arc::clone(&request);
            let subject = subject.clone();
            tasks.spawn_blocking(move || {
                let result = driver.build_subject(index.as_ref(), &request, &subject);
                (subject, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.map_err(|e| TractifyError::Io {
                message: e.to_string(),
            })?);
        }
        // Completion order varies; merge by subject
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut top = GraphBuilder::new(TOP_LEVEL_GRAPH, &[], &[])
            .with_config(self.builder.config().clone().with_work_dir(request.work_dir()));
        let mut sessions = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for (subject, result) in results {
            match result {
                Ok(built) => {
                    sessions.extend(
                        built
                            .sessions
                            .iter()
                            .map(|session| (subject.clone(), session.clone())),
                    );
                    skipped.extend(built.skipped);
                    if let Some(graph) = built.graph {
                        top.add_workflow(graph)?;
                    }
                }
                Err(error) => {
                    warn!(subject = %subject, "{}", error);
                    failed.push(FailedSubject { subject, error });
                }
            }
        }

        Ok(BatchOutcome {
            graph: top.build()?,
            participants,
            sessions,
            skipped,
            failed,
        })
    }

    /// Build `single_subject_<id>_wf` holding one graph per T1w session
    pub fn build_subject(
        &self,
        index: &dyn DatasetIndex,
        request: &BatchRequest,
        subject_id: &str,
    ) -> TractifyResult<SubjectGraph> {
        let t1_files = index.files(
            &FileQuery::new()
                .subject(subject_id)
                .suffix("T1w")
                .extensions(T1_EXTENSIONS),
        );
        if t1_files.is_empty() {
            return Err(TractifyError::Dataset {
                root: index.root().to_path_buf(),
                message: format!("No T1 images found for participant {}", subject_id),
                help: Some("All workflows require T1 images".into()),
            });
        }

        let config = self
            .builder
            .config()
            .clone()
            .with_work_dir(request.work_dir().join(subject_id))
            .with_subject_crash_dir(&request.output_dir, subject_id);
        let builder = self.builder.clone().with_config(config.clone());

        let mut subject_wf =
            GraphBuilder::new(format!("single_subject_{}_wf", subject_id), &[], &[]).with_config(config);
        let mut seen = BTreeSet::new();
        let mut sessions = Vec::new();
        let mut skipped = Vec::new();

        for t1_file in t1_files {
            let entities = index.parse_entities(&t1_file);
            let session_id = entities.session().unwrap_or(DEFAULT_SESSION).to_string();

            if !seen.insert(session_id.clone()) {
                warn!(
                    subject = subject_id,
                    session = %session_id,
                    file = %t1_file.display(),
                    "additional T1w image for session ignored"
                );
                continue;
            }

            match index.metadata(&t1_file) {
                Ok(meta) => debug!(file = %t1_file.display(), fields = meta.len(), "T1w metadata"),
                Err(e) => warn!(file = %t1_file.display(), "unreadable sidecar: {}", e),
            }

            match self.build_session(&builder, request, subject_id, &session_id, &t1_file) {
                Ok(graph) => {
                    subject_wf.add_workflow(graph)?;
                    sessions.push(session_id);
                }
                Err(e) if e.is_skippable() => {
                    warn!(subject = subject_id, session = %session_id, "skipping session: {}", e);
                    skipped.push(SkippedSession {
                        subject: subject_id.to_string(),
                        session: session_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let graph = if sessions.is_empty() {
            None
        } else {
            Some(subject_wf.build()?)
        };

        Ok(SubjectGraph {
            subject: subject_id.to_string(),
            graph,
            sessions,
            skipped,
        })
    }

    fn build_session(
        &self,
        builder: &PipelineGraphBuilder,
        request: &BatchRequest,
        subject_id: &str,
        session_id: &str,
        t1_file: &Path,
    ) -> TractifyResult<PipelineGraph> {
        let preproc =
            DmriPreprocOutputs::resolve(&request.dmripreproc_dir, subject_id, Some(session_id))?;

        let fs_file = if request.variant.requires_segmentation_file() {
            let aseg = request.aseg_path(subject_id);
            if !aseg.is_file() {
                return Err(TractifyError::MissingArtifact {
                    subject: subject_id.to_string(),
                    session: session_id.to_string(),
                    artifact: "FreeSurfer aseg segmentation".into(),
                    path: aseg,
                });
            }
            Some(aseg)
        } else {
            None
        };

        let inputs = TractInputs {
            t1_file: t1_file.to_path_buf(),
            fs_file,
            eddy_file: preproc.eddy_file,
            bvec: preproc.bvec,
            bval: preproc.bval,
            template: request.template.clone(),
            atlas: request.atlas.clone(),
            output_dir: request.output_dir.clone(),
        };

        builder.build_variant(request.variant, subject_id, session_id, &inputs, request.num_tracts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use tempfile::TempDir;

    const PREPROC_FILES: &[&str] = &[
        "eddy_corrected.nii.gz",
        "eddy_corrected.eddy_rotated_bvecs",
        "dwi.bval",
        "eddy_corrected_avg_b0.nii.gz",
        "eddy_corrected_roi_mask.nii.gz",
    ];

    fn touch(path: PathBuf) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    /// sub-01 (ses-01, ses-02), sub-02 (no session), sub-03 (no preprocessing)
    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let bids = dir.path().join("bids");
        let prep = dir.path().join("prep");

        touch(bids.join("dataset_description.json"));
        touch(bids.join("sub-01/ses-01/anat/sub-01_ses-01_T1w.nii.gz"));
        touch(bids.join("sub-01/ses-02/anat/sub-01_ses-02_T1w.nii.gz"));
        touch(bids.join("sub-02/anat/sub-02_T1w.nii.gz"));
        touch(bids.join("sub-03/anat/sub-03_T1w.nii"));

        for session_dir in ["sub-01/ses-01/dwi", "sub-01/ses-02/dwi", "sub-02/ses-01/dwi"] {
            for f in PREPROC_FILES {
                touch(prep.join(session_dir).join(f));
            }
        }
        dir
    }

    fn request(dir: &Path, variant: SegmentationVariant) -> BatchRequest {
        BatchRequest {
            bids_dir: dir.join("bids"),
            dmripreproc_dir: dir.join("prep"),
            template: dir.join("template.nii.gz"),
            atlas: dir.join("atlas.nii.gz"),
            output_dir: dir.join("out"),
            freesurfer_dir: Some(dir.join("freesurfer")),
            variant,
            num_tracts: 1000,
            participant_labels: Vec::new(),
            strict: false,
            validate: true,
        }
    }

    fn driver() -> SessionDriver {
        SessionDriver::new(PipelineGraphBuilder::new(Settings::default()))
    }

    #[tokio::test]
    async fn test_batch_skips_missing_preprocessing() {
        let dir = fixture();
        let outcome = driver()
            .run(request(dir.path(), SegmentationVariant::Fsl))
            .await
            .unwrap();

        assert_eq!(outcome.participants.participants, vec!["01", "02", "03"]);
        assert_eq!(
            outcome.sessions,
            vec![
                ("01".to_string(), "01".to_string()),
                ("01".to_string(), "02".to_string()),
                ("02".to_string(), "01".to_string()),
            ]
        );
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].subject, "03");
        assert!(outcome.failed.is_empty());
        assert!(!outcome.is_complete());

        let graph = &outcome.graph;
        assert_eq!(graph.name(), TOP_LEVEL_GRAPH);
        assert!(graph.contains("single_subject_01_wf"));
        assert!(graph.contains("single_subject_02_wf"));
        assert!(!graph.contains("single_subject_03_wf"));

        let paths: Vec<String> = graph.walk().into_iter().map(|(p, _)| p).collect();
        assert!(paths.contains(&"single_subject_01_wf.sub_01_ses_02_tract_wf.tckgen".to_string()));
    }

    #[tokio::test]
    async fn test_batch_is_deterministic() {
        let dir = fixture();
        let a = driver().run(request(dir.path(), SegmentationVariant::Fsl)).await.unwrap();
        let b = driver().run(request(dir.path(), SegmentationVariant::Fsl)).await.unwrap();
        assert_eq!(a.graph.fingerprint().unwrap(), b.graph.fingerprint().unwrap());
    }

    #[tokio::test]
    async fn test_freesurfer_without_aseg_skips() {
        let dir = fixture();
        touch(dir.path().join("freesurfer/sub-01/mri/aseg.mgz"));

        let mut req = request(dir.path(), SegmentationVariant::FreeSurfer);
        req.participant_labels = vec!["sub-01".into(), "02".into()];
        let outcome = driver().run(req).await.unwrap();

        assert_eq!(outcome.sessions.len(), 2);
        assert!(outcome.skipped.iter().any(|s| s.subject == "02"));

        let tract = outcome
            .graph
            .walk()
            .into_iter()
            .find(|(p, _)| p == "single_subject_01_wf.sub_01_ses_01_tract_wf")
            .and_then(|(_, node)| node.subgraph().cloned())
            .unwrap();
        assert!(tract.contains("aseg_flirt"));
        assert!(tract.config().environment.contains_key("SUBJECTS_DIR"));
    }

    #[tokio::test]
    async fn test_strict_missing_participant_fails() {
        let dir = fixture();
        let mut req = request(dir.path(), SegmentationVariant::Fsl);
        req.participant_labels = vec!["01".into(), "09".into()];
        req.strict = true;

        let err = driver().run(req).await.unwrap_err();
        assert!(matches!(err, TractifyError::Dataset { .. }));
    }

    #[test]
    fn test_subject_without_t1_fails() {
        let dir = fixture();
        touch(dir.path().join("bids/sub-04/dwi/sub-04_dwi.nii.gz"));
        let layout = BidsLayout::open(dir.path().join("bids"), true).unwrap();

        let err = driver()
            .build_subject(&layout, &request(dir.path(), SegmentationVariant::Fsl), "04")
            .unwrap_err();
        assert!(matches!(err, TractifyError::Dataset { .. }));
    }
}
