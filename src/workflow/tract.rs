// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Tractography graph for one subject and session
//!
//! Stages, in dependency order:
//!
//! 1. T1w reorientation and brain extraction
//! 2. bias correction of the eddy-corrected DWI, b0 and low-b extraction
//!    with mean volumes and masks
//! 3. T1w-to-diffusion affine (`t1_flirt`)
//! 4. five-tissue-type segmentation (variant specific) and GM/WM interface
//! 5. response function and FOD estimation
//! 6. `tckgen` and `tcksift2`
//! 7. atlas registration into diffusion space (variant specific)
//! 8. inverse-length and length connectomes
//! 9. NIfTI conversion of the MRtrix images and a low-b tensor fit for QA

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::outputs::{OutputPlan, OutputRole};
use super::segmentation::{SegmentationVariant, ATLAS_NODE, GEN5TT_NODE};
use crate::errors::{TractifyError, TractifyResult};
use crate::graph::{ExecutionConfig, GraphBuilder, PipelineGraph, PortType, INPUT_NODE, OUTPUT_NODE};
use crate::settings::Settings;
use crate::stages::fsl;
use crate::stages::mrtrix::{self, ConnectomeScale};

/// Boundary inputs of the tractography graph
pub const TRACT_INPUTS: &[(&str, PortType)] = &[
    ("subject_id", PortType::Text),
    ("session_id", PortType::Text),
    ("output_dir", PortType::File),
    ("t1_file", PortType::File),
    ("fs_file", PortType::File),
    ("eddy_file", PortType::File),
    ("bval", PortType::File),
    ("bvec", PortType::File),
    ("template", PortType::File),
    ("atlas", PortType::File),
    ("num_tracts", PortType::Integer),
    ("gen5tt_algo", PortType::Text),
];

/// Files the tractography graph starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TractInputs {
    pub t1_file: PathBuf,
    /// Segmentation volume, required by the FreeSurfer variant
    pub fs_file: Option<PathBuf>,
    pub eddy_file: PathBuf,
    pub bvec: PathBuf,
    pub bval: PathBuf,
    pub template: PathBuf,
    pub atlas: PathBuf,
    pub output_dir: PathBuf,
}

/// Name of the graph for one subject/session
pub fn tract_graph_name(subject_id: &str, session_id: &str) -> String {
    format!("sub_{}_ses_{}_tract_wf", subject_id, session_id)
}

/// `SUBJECTS_DIR` for FreeSurfer stages: the process value, else the
/// directory holding the segmentation file
pub fn freesurfer_subjects_dir(fs_file: &Path) -> Option<String> {
    std::env::var("SUBJECTS_DIR").ok().or_else(|| {
        fs_file
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
    })
}

/// Builds tractography graphs
///
/// Holds no state beyond settings and the base execution configuration, so
/// one instance can build graphs for many subjects concurrently.
#[derive(Debug, Clone)]
pub struct PipelineGraphBuilder {
    settings: Settings,
    config: ExecutionConfig,
}

impl PipelineGraphBuilder {
    pub fn new(settings: Settings) -> Self {
        let config = settings.execution_config();
        Self { settings, config }
    }

    /// Base configuration every graph starts from
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Build the graph for `algorithm` (`fsl` or `freesurfer`)
    pub fn build(
        &self,
        algorithm: &str,
        subject_id: &str,
        session_id: &str,
        inputs: &TractInputs,
        num_tracts: u32,
    ) -> TractifyResult<PipelineGraph> {
        let variant: SegmentationVariant = algorithm.parse()?;
        self.build_variant(variant, subject_id, session_id, inputs, num_tracts)
    }

    pub fn build_variant(
        &self,
        variant: SegmentationVariant,
        subject_id: &str,
        session_id: &str,
        inputs: &TractInputs,
        num_tracts: u32,
    ) -> TractifyResult<PipelineGraph> {
        self.settings.validate()?;
        let name = tract_graph_name(subject_id, session_id);
        debug!(graph = %name, variant = %variant, "building tractography graph");

        let config = self.execution_config(variant, subject_id, inputs)?;
        let plan = OutputPlan::new(&inputs.output_dir, subject_id, session_id, &OutputRole::ALL)?;

        let outputs: Vec<(&str, PortType)> = OutputRole::ALL
            .iter()
            .map(|role| (role.port(), PortType::File))
            .collect();
        let mut b = GraphBuilder::new(&name, TRACT_INPUTS, &outputs).with_config(config);

        self.bind_inputs(&mut b, variant, subject_id, session_id, inputs, num_tracts)?;
        self.wire_anatomy(&mut b)?;
        self.wire_diffusion(&mut b)?;
        variant.wire_segmentation(&mut b)?;
        self.wire_tractography(&mut b)?;
        variant.wire_atlas(&mut b)?;
        self.wire_connectomes(&mut b)?;
        self.wire_outputs(&mut b)?;

        for sink in plan.sinks() {
            b.add_sink(sink)?;
        }

        let graph = b.build()?;
        info!(
            graph = %graph.name(),
            stages = graph.stages().count(),
            "tractography graph ready"
        );
        Ok(graph)
    }

    fn execution_config(
        &self,
        variant: SegmentationVariant,
        subject_id: &str,
        inputs: &TractInputs,
    ) -> TractifyResult<ExecutionConfig> {
        let config = self
            .config
            .clone()
            .with_subject_crash_dir(&inputs.output_dir, subject_id);

        if !variant.requires_segmentation_file() {
            return Ok(config);
        }

        let fs_file = inputs
            .fs_file
            .as_deref()
            .ok_or(TractifyError::MissingSegmentationFile)?;
        Ok(match freesurfer_subjects_dir(fs_file) {
            Some(dir) => config.with_env("SUBJECTS_DIR", dir),
            None => config,
        })
    }

    fn bind_inputs(
        &self,
        b: &mut GraphBuilder,
        variant: SegmentationVariant,
        subject_id: &str,
        session_id: &str,
        inputs: &TractInputs,
        num_tracts: u32,
    ) -> TractifyResult<()> {
        b.set_input("subject_id", subject_id)?;
        b.set_input("session_id", session_id)?;
        b.set_input("output_dir", inputs.output_dir.as_path())?;
        b.set_input("t1_file", inputs.t1_file.as_path())?;
        b.set_input("eddy_file", inputs.eddy_file.as_path())?;
        b.set_input("bval", inputs.bval.as_path())?;
        b.set_input("bvec", inputs.bvec.as_path())?;
        b.set_input("template", inputs.template.as_path())?;
        b.set_input("atlas", inputs.atlas.as_path())?;
        b.set_input("num_tracts", num_tracts)?;
        b.set_input("gen5tt_algo", variant.as_str())?;

        // Only the FreeSurfer variant reads the segmentation volume
        if variant.requires_segmentation_file() {
            if let Some(fs_file) = &inputs.fs_file {
                b.set_input("fs_file", fs_file.as_path())?;
            }
        }
        Ok(())
    }

    fn wire_anatomy(&self, b: &mut GraphBuilder) -> TractifyResult<()> {
        b.add_node(fsl::reorient2std("t1_reorient"))?;
        b.add_node(fsl::bet("t1_brain", false))?;

        b.connect((INPUT_NODE, "t1_file"), ("t1_reorient", "in_file"))?;
        b.connect(("t1_reorient", "out_file"), ("t1_brain", "in_file"))
    }

    fn wire_diffusion(&self, b: &mut GraphBuilder) -> TractifyResult<()> {
        let gradients = [("bvec", "in_bvec"), ("bval", "in_bval")];

        b.add_node(mrtrix::dwibiascorrect("dwi_biascorrect"))?;
        b.connect((INPUT_NODE, "eddy_file"), ("dwi_biascorrect", "in_file"))?;
        b.connect_all(INPUT_NODE, "dwi_biascorrect", &gradients)?;

        // b0 and low-b subsets, each with a mean volume and a brain mask
        b.add_node(mrtrix::dwiextract_b0("b0_extract"))?;
        b.add_node(mrtrix::dwiextract_shells("lowb_extract", &self.settings.low_b_shells))?;
        for (extract, mean, mask) in [
            ("b0_extract", "b0_mean", "b0_mask"),
            ("lowb_extract", "lowb_mean", "lowb_mask"),
        ] {
            b.add_node(mrtrix::mrmath_mean(mean))?;
            b.add_node(fsl::bet(mask, true))?;

            b.connect(("dwi_biascorrect", "out_file"), (extract, "in_file"))?;
            b.connect_all(INPUT_NODE, extract, &gradients)?;
            b.connect((extract, "out_file"), (mean, "in_file"))?;
            b.connect((mean, "out_file"), (mask, "in_file"))?;
        }

        // T1w into diffusion space, rigid
        b.add_node(fsl::flirt_estimate("t1_flirt", Some(6)))?;
        b.connect(("t1_brain", "out_file"), ("t1_flirt", "in_file"))?;
        b.connect(("b0_mean", "out_file"), ("t1_flirt", "reference"))?;

        // Tensor fit on the low-b shells for the SSE map
        b.add_node(fsl::dtifit("dtifit"))?;
        b.connect_all(
            "lowb_extract",
            "dtifit",
            &[("out_file", "dwi"), ("out_bvec", "bvecs"), ("out_bval", "bvals")],
        )?;
        b.connect(("lowb_mask", "mask_file"), ("dtifit", "mask"))
    }

    fn wire_tractography(&self, b: &mut GraphBuilder) -> TractifyResult<()> {
        let gradients = [("bvec", "in_bvec"), ("bval", "in_bval")];

        b.add_node(mrtrix::gen5tt2gmwmi("gen5tt_mask"))?;
        b.connect((GEN5TT_NODE, "out_file"), ("gen5tt_mask", "in_file"))?;

        let response = self.settings.response_algorithm.as_str();
        b.add_node(mrtrix::dwi2response("response_sd", response))?;
        b.connect(("dwi_biascorrect", "out_file"), ("response_sd", "in_file"))?;
        b.connect_all(INPUT_NODE, "response_sd", &gradients)?;
        b.connect(("b0_mask", "mask_file"), ("response_sd", "in_mask"))?;
        if response == "msmt_5tt" {
            b.connect((GEN5TT_NODE, "out_file"), ("response_sd", "mtt_file"))?;
        }

        let fod = self.settings.fod_algorithm.as_str();
        b.add_node(mrtrix::dwi2fod("estimate_fod", fod))?;
        b.connect(("dwi_biascorrect", "out_file"), ("estimate_fod", "in_file"))?;
        b.connect_all(INPUT_NODE, "estimate_fod", &gradients)?;
        b.connect(("b0_mask", "mask_file"), ("estimate_fod", "mask_file"))?;
        if mrtrix::is_multi_tissue_fod(fod) {
            b.connect_all(
                "response_sd",
                "estimate_fod",
                &[("wm_file", "wm_txt"), ("gm_file", "gm_txt"), ("csf_file", "csf_txt")],
            )?;
        } else {
            b.connect(("response_sd", "wm_file"), ("estimate_fod", "wm_txt"))?;
        }

        b.add_node(mrtrix::tckgen("tckgen", self.settings.tckgen_cutoff))?;
        b.connect(("estimate_fod", "wm_odf"), ("tckgen", "in_file"))?;
        b.connect((GEN5TT_NODE, "out_file"), ("tckgen", "act_file"))?;
        b.connect(("gen5tt_mask", "out_file"), ("tckgen", "seed_gmwmi"))?;
        b.connect((INPUT_NODE, "num_tracts"), ("tckgen", "select"))?;

        b.add_node(mrtrix::tcksift2("tcksift"))?;
        b.connect(("tckgen", "out_file"), ("tcksift", "in_tracks"))?;
        b.connect(("estimate_fod", "wm_odf"), ("tcksift", "in_fod"))
    }

    fn wire_connectomes(&self, b: &mut GraphBuilder) -> TractifyResult<()> {
        let radius = self.settings.connectome_search_radius;

        for (name, scale) in [
            ("conmatgen", ConnectomeScale::InverseLength),
            ("conmatgen_length", ConnectomeScale::Length),
        ] {
            b.add_node(mrtrix::tck2connectome(name, scale, radius))?;
            b.connect(("tckgen", "out_file"), (name, "in_file"))?;
            b.connect((ATLAS_NODE, "out_file"), (name, "in_parc"))?;
        }
        b.connect(("tcksift", "out_weights"), ("conmatgen", "in_weights"))
    }

    fn wire_outputs(&self, b: &mut GraphBuilder) -> TractifyResult<()> {
        for (name, file_name, source) in [
            ("gen5tt_convert", "5tt.nii.gz", GEN5TT_NODE),
            ("gmwmi_convert", "gmwmi.nii.gz", "gen5tt_mask"),
        ] {
            b.add_node(mrtrix::mrconvert(name, file_name))?;
            b.connect((source, "out_file"), (name, "in_file"))?;
        }
        b.add_node(mrtrix::mrconvert("fod_convert", "FOD.nii.gz"))?;
        b.connect(("estimate_fod", "wm_odf"), ("fod_convert", "in_file"))?;

        let sources = [
            (OutputRole::TissueSegmentation, ("gen5tt_convert", "converted")),
            (OutputRole::Gmwmi, ("gmwmi_convert", "converted")),
            (OutputRole::Fod, ("fod_convert", "converted")),
            (OutputRole::StreamlineWeights, ("tcksift", "out_weights")),
            (OutputRole::AtlasDiffusionSpace, (ATLAS_NODE, "out_file")),
            (OutputRole::ConnectomeLength, ("conmatgen_length", "out_file")),
            (OutputRole::ConnectomeInvLength, ("conmatgen", "out_file")),
            (OutputRole::Sse, ("dtifit", "sse")),
        ];
        for (role, source) in sources {
            b.connect(source, (OUTPUT_NODE, role.port()))?;
        }
        Ok(())
    }
}
