// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Graph validation
//!
//! Runs when a graph is sealed. Edge-level checks (port existence, types,
//! single binding per input) already happened in `GraphBuilder::connect`;
//! this pass checks the graph as a whole.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{DagIndex, Edge, NodeKind, PortRef, PortType, StageNode, Value, INPUT_NODE};
use crate::errors::TractifyError;

/// Graph validator
pub struct GraphValidator;

impl GraphValidator {
    /// Validate a graph about to be sealed
    ///
    /// With `allow_open_inputs`, boundary inputs that are consumed but carry
    /// no value are reported in [`ValidationResult::open_inputs`] instead of
    /// failing; the parent graph must then bind them.
    pub fn validate(
        graph: &str,
        nodes: &[StageNode],
        edges: &[Edge],
        input_values: &BTreeMap<String, Value>,
        allow_open_inputs: bool,
    ) -> ValidationResult {
        let mut result = ValidationResult::default();

        let bound: HashSet<&PortRef> = edges.iter().map(|e| &e.target).collect();
        let consumed: HashSet<&PortRef> = edges.iter().map(|e| &e.source).collect();

        // Every required input must have an incoming edge
        for node in nodes.iter().filter(|n| n.name() != INPUT_NODE) {
            for port in node.inputs().iter().filter(|p| !p.optional) {
                let target = PortRef::new(node.name(), &port.name);
                if !bound.contains(&target) {
                    result.errors.push(TractifyError::UnboundInput {
                        graph: graph.to_string(),
                        node: node.name().to_string(),
                        port: port.name.clone(),
                    });
                }
            }
        }

        // Boundary inputs that feed stages need a value
        if let Some(inputnode) = nodes.iter().find(|n| n.name() == INPUT_NODE) {
            for port in inputnode.outputs() {
                let source = PortRef::new(INPUT_NODE, &port.name);
                let is_consumed = consumed.contains(&source);
                let has_value = input_values.contains_key(&port.name);

                match (is_consumed, has_value) {
                    (true, false) if allow_open_inputs => {
                        result.open_inputs.insert(port.name.clone());
                    }
                    (true, false) => result.errors.push(TractifyError::UnboundInput {
                        graph: graph.to_string(),
                        node: INPUT_NODE.to_string(),
                        port: port.name.clone(),
                    }),
                    // ids and labels are read by the orchestrator, files by stages
                    (false, true) if matches!(port.ty, PortType::File | PortType::FileList) => {
                        result.warnings.push(format!(
                            "Input file '{}' is set but no stage reads it",
                            port.name
                        ))
                    }
                    _ => {}
                }
            }
        }

        // Stages whose outputs nobody reads
        let producers: HashSet<&str> = consumed.iter().map(|p| p.node.as_str()).collect();
        for node in nodes {
            if matches!(node.kind(), NodeKind::Command { .. })
                && !node.outputs().is_empty()
                && !producers.contains(node.name())
            {
                result.warnings.push(format!(
                    "Stage '{}': none of its outputs are consumed",
                    node.name()
                ));
            }
        }

        // Must be acyclic
        let dag = DagIndex::new(nodes.iter().map(|n| (n.name(), n.label())), edges);
        if let Err(e) = dag.validate_acyclic() {
            result.errors.push(e);
        }

        result
    }
}

/// Result of graph validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<TractifyError>,
    pub warnings: Vec<String>,
    pub open_inputs: BTreeSet<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// The first error, if any
    pub fn into_first_error(self) -> Option<TractifyError> {
        self.errors.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OUTPUT_NODE;

    fn boundary_in(ports: &[&str]) -> StageNode {
        ports.iter().fold(StageNode::boundary(INPUT_NODE), |n, p| {
            n.output(p, PortType::File)
        })
    }

    fn boundary_out(ports: &[&str]) -> StageNode {
        ports.iter().fold(StageNode::boundary(OUTPUT_NODE), |n, p| {
            n.input(p, PortType::File)
        })
    }

    fn stage(name: &str) -> StageNode {
        StageNode::command(name, "mrconvert")
            .input("in_file", PortType::File)
            .output("converted", PortType::File)
    }

    fn edge(from: (&str, &str), to: (&str, &str)) -> Edge {
        Edge {
            source: PortRef::new(from.0, from.1),
            target: PortRef::new(to.0, to.1),
        }
    }

    #[test]
    fn test_fully_bound_graph_is_valid() {
        let nodes = vec![boundary_in(&["t1_file"]), stage("convert"), boundary_out(&["out"])];
        let edges = vec![
            edge((INPUT_NODE, "t1_file"), ("convert", "in_file")),
            edge(("convert", "converted"), (OUTPUT_NODE, "out")),
        ];
        let values = BTreeMap::from([("t1_file".to_string(), Value::from("t1.nii.gz"))]);

        let result = GraphValidator::validate("wf", &nodes, &edges, &values, false);
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_unbound_required_input() {
        let nodes = vec![boundary_in(&[]), stage("convert"), boundary_out(&[])];

        let result = GraphValidator::validate("wf", &nodes, &[], &BTreeMap::new(), false);
        assert!(!result.is_valid());
        assert!(matches!(
            &result.errors[0],
            TractifyError::UnboundInput { node, port, .. } if node == "convert" && port == "in_file"
        ));
    }

    #[test]
    fn test_open_boundary_input() {
        let nodes = vec![boundary_in(&["t1_file"]), stage("convert"), boundary_out(&[])];
        let edges = vec![edge((INPUT_NODE, "t1_file"), ("convert", "in_file"))];

        let strict = GraphValidator::validate("wf", &nodes, &edges, &BTreeMap::new(), false);
        assert!(!strict.is_valid());

        let open = GraphValidator::validate("wf", &nodes, &edges, &BTreeMap::new(), true);
        assert!(open.is_valid());
        assert!(open.open_inputs.contains("t1_file"));
    }

    #[test]
    fn test_unused_value_and_dead_stage_warn() {
        let nodes = vec![boundary_in(&["t1_file", "fs_file"]), stage("convert"), boundary_out(&[])];
        let edges = vec![edge((INPUT_NODE, "t1_file"), ("convert", "in_file"))];
        let values = BTreeMap::from([
            ("t1_file".to_string(), Value::from("t1.nii.gz")),
            ("fs_file".to_string(), Value::from("aseg.mgz")),
        ]);

        let result = GraphValidator::validate("wf", &nodes, &edges, &values, false);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("fs_file")));
        assert!(result.warnings.iter().any(|w| w.contains("'convert'")));
    }

    #[test]
    fn test_cycle_is_an_error() {
        let nodes = vec![boundary_in(&[]), stage("a"), stage("b"), boundary_out(&[])];
        let edges = vec![
            edge(("a", "converted"), ("b", "in_file")),
            edge(("b", "converted"), ("a", "in_file")),
        ];

        let result = GraphValidator::validate("wf", &nodes, &edges, &BTreeMap::new(), false);
        assert!(matches!(
            result.into_first_error(),
            Some(TractifyError::CircularDependency { .. })
        ));
    }
}
