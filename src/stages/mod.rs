// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! External tool stages
//!
//! Each constructor returns a [`StageNode`](crate::graph::StageNode) with
//! the port contract of one command-line program. The programs themselves
//! are run by the orchestrator, never by tractify.

pub mod freesurfer;
pub mod fsl;
pub mod mrtrix;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::graph::PipelineGraph;

/// Distinct programs a graph (and every nested graph) invokes, sorted
pub fn required_programs(graph: &PipelineGraph) -> Vec<String> {
    graph
        .walk()
        .into_iter()
        .filter_map(|(_, node)| node.program().map(str::to_string))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Where each program was found on PATH
#[derive(Debug, Default)]
pub struct ProgramReport {
    pub found: Vec<(String, PathBuf)>,
    pub missing: Vec<String>,
}

impl ProgramReport {
    pub fn all_found(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Look every program up on PATH
pub fn check_programs<S: AsRef<str>>(programs: &[S]) -> ProgramReport {
    let mut report = ProgramReport::default();
    for program in programs {
        let program = program.as_ref();
        match which::which(program) {
            Ok(path) => report.found.push((program.to_string(), path)),
            Err(_) => report.missing.push(program.to_string()),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, PortType, INPUT_NODE, OUTPUT_NODE};

    #[test]
    fn test_required_programs_are_distinct_and_nested() {
        let mut inner = GraphBuilder::new("inner", &[("in_file", PortType::File)], &[("out", PortType::File)]);
        inner.add_node(mrtrix::mrconvert("a", "a.nii.gz")).unwrap();
        inner.add_node(mrtrix::mrconvert("b", "b.nii.gz")).unwrap();
        inner.add_node(fsl::reorient2std("c")).unwrap();
        inner.connect((INPUT_NODE, "in_file"), ("a", "in_file")).unwrap();
        inner.connect(("a", "converted"), ("b", "in_file")).unwrap();
        inner.connect(("b", "converted"), ("c", "in_file")).unwrap();
        inner.connect(("c", "out_file"), (OUTPUT_NODE, "out")).unwrap();
        let inner = inner.build_component().unwrap();

        let mut outer = GraphBuilder::new("outer", &[("t1", PortType::File)], &[]);
        outer.add_workflow(inner).unwrap();
        outer.connect((INPUT_NODE, "t1"), ("inner", "in_file")).unwrap();
        outer.set_input("t1", PathBuf::from("t1.nii.gz")).unwrap();
        let graph = outer.build().unwrap();

        assert_eq!(required_programs(&graph), vec!["fslreorient2std", "mrconvert"]);
    }

    #[test]
    fn test_missing_program_reported() {
        let report = check_programs(&["tractify-no-such-program"]);
        assert!(!report.all_found());
        assert_eq!(report.missing, vec!["tractify-no-such-program"]);
    }
}
