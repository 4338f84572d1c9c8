// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Sealed pipeline graphs
//!
//! A [`PipelineGraph`] is the declarative description handed to the
//! orchestrator. It cannot be changed once [`super::GraphBuilder`] seals it.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::{DagIndex, Edge, ExecutionConfig, Port, PortRef, StageNode, Value, INPUT_NODE, OUTPUT_NODE};
use crate::errors::TractifyResult;

/// Where an artifact on an `outputnode` port ends up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sink {
    /// Output role, e.g. `connectome-length`
    pub role: String,
    /// `outputnode` port carrying the artifact
    pub port: String,
    pub directory: PathBuf,
    pub file_name: String,
}

impl Sink {
    pub fn destination(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Immutable dataflow graph of stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineGraph {
    pub(super) name: String,
    pub(super) nodes: Vec<StageNode>,
    pub(super) edges: Vec<Edge>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(super) input_values: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub(super) open_inputs: BTreeSet<String>,
    pub(super) config: ExecutionConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(super) sinks: Vec<Sink>,
}

impl PipelineGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All nodes including the `inputnode` and `outputnode` boundaries
    pub fn nodes(&self) -> &[StageNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges feeding `node`
    pub fn incoming<'a, 'n>(&'a self, node: &'n str) -> impl Iterator<Item = &'a Edge> + 'n
    where
        'a: 'n,
    {
        self.edges.iter().filter(move |e| e.target.node == node)
    }

    /// Upstream port bound to `node.port`
    pub fn source_of(&self, node: &str, port: &str) -> Option<&PortRef> {
        self.edges
            .iter()
            .find(|e| e.target.node == node && e.target.port == port)
            .map(|e| &e.source)
    }

    /// Boundary input ports
    pub fn inputs(&self) -> &[Port] {
        self.node(INPUT_NODE).map(|n| n.outputs()).unwrap_or(&[])
    }

    /// Boundary output ports
    pub fn outputs(&self) -> &[Port] {
        self.node(OUTPUT_NODE).map(|n| n.inputs()).unwrap_or(&[])
    }

    pub fn input_value(&self, port: &str) -> Option<&Value> {
        self.input_values.get(port)
    }

    pub fn input_values(&self) -> &BTreeMap<String, Value> {
        &self.input_values
    }

    /// Consumed boundary inputs a parent graph must bind
    pub fn open_inputs(&self) -> &BTreeSet<String> {
        &self.open_inputs
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    /// Command stages in this graph, not counting nested graphs
    pub fn stages(&self) -> impl Iterator<Item = &StageNode> {
        self.nodes.iter().filter(|n| n.program().is_some())
    }

    /// Node-level dependency index
    pub fn dag(&self) -> DagIndex {
        DagIndex::new(self.nodes.iter().map(|n| (n.name(), n.label())), &self.edges)
    }

    /// Node names in an order respecting every edge
    pub fn topological_order(&self) -> TractifyResult<Vec<String>> {
        self.dag().topological_order()
    }

    /// Every node of this graph and its nested graphs, depth first
    ///
    /// Names are qualified by the enclosing workflow nodes, e.g.
    /// `single_subject_01_wf.sub_01_ses_01_tract_wf.tckgen`.
    pub fn walk(&self) -> Vec<(String, &StageNode)> {
        let mut out = Vec::new();
        self.walk_into("", &mut out);
        out
    }

    fn walk_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a StageNode)>) {
        for node in &self.nodes {
            let path = if prefix.is_empty() {
                node.name().to_string()
            } else {
                format!("{}.{}", prefix, node.name())
            };
            out.push((path.clone(), node));
            if let Some(inner) = node.subgraph() {
                inner.walk_into(&path, out);
            }
        }
    }

    /// Sinks of this graph and every nested graph
    pub fn all_sinks(&self) -> Vec<&Sink> {
        let mut sinks: Vec<&Sink> = self.sinks.iter().collect();
        for node in &self.nodes {
            if let Some(inner) = node.subgraph() {
                sinks.extend(inner.all_sinks());
            }
        }
        sinks
    }

    /// Stable content hash of the graph
    ///
    /// Building twice from identical inputs yields the same fingerprint.
    pub fn fingerprint(&self) -> TractifyResult<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn to_json(&self) -> TractifyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self) -> TractifyResult<String> {
        self.dag().to_text()
    }

    pub fn to_dot(&self) -> String {
        self.dag().to_dot(&self.name)
    }

    pub fn to_mermaid(&self) -> String {
        self.dag().to_mermaid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, PortType};

    fn tiny(name: &str) -> PipelineGraph {
        let mut b = GraphBuilder::new(name, &[("in_file", PortType::File)], &[("fod", PortType::File)]);
        b.add_node(
            StageNode::command("fod_convert", "mrconvert")
                .input("in_file", PortType::File)
                .output("converted", PortType::File),
        )
        .unwrap();
        b.connect((INPUT_NODE, "in_file"), ("fod_convert", "in_file")).unwrap();
        b.connect(("fod_convert", "converted"), (OUTPUT_NODE, "fod")).unwrap();
        b.set_input("in_file", PathBuf::from("wm.mif")).unwrap();
        b.add_sink(Sink {
            role: "fod".into(),
            port: "fod".into(),
            directory: PathBuf::from("/out/tractify/sub-01/ses-01/dwi"),
            file_name: "sub-01_ses-01_desc-fod.nii.gz".into(),
        })
        .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_accessors() {
        let graph = tiny("wf");

        assert_eq!(graph.inputs().len(), 1);
        assert_eq!(graph.outputs()[0].name, "fod");
        assert_eq!(graph.stages().count(), 1);
        assert_eq!(
            graph.source_of(OUTPUT_NODE, "fod"),
            Some(&PortRef::new("fod_convert", "converted"))
        );
        assert_eq!(
            graph.sinks()[0].destination(),
            PathBuf::from("/out/tractify/sub-01/ses-01/dwi/sub-01_ses-01_desc-fod.nii.gz")
        );
    }

    #[test]
    fn test_edge_lookup_outlives_query_name() {
        let graph = tiny("wf");

        let source = {
            let node = String::from("fod_convert");
            graph.source_of(&node, "in_file")
        };
        assert_eq!(source, Some(&PortRef::new(INPUT_NODE, "in_file")));

        let edges: Vec<&Edge> = {
            let node = OUTPUT_NODE.to_string();
            graph.incoming(&node).collect()
        };
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source.node, "fod_convert");
        assert!(graph.source_of("fod_convert", "missing").is_none());
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let order = tiny("wf").topological_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();

        assert!(pos(INPUT_NODE) < pos("fod_convert"));
        assert!(pos("fod_convert") < pos(OUTPUT_NODE));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = tiny("wf").fingerprint().unwrap();
        let b = tiny("wf").fingerprint().unwrap();
        let c = tiny("other_wf").fingerprint().unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_walk_and_sinks_include_nested() {
        let mut outer = GraphBuilder::new("outer", &[], &[]);
        outer.add_workflow(tiny("inner")).unwrap();
        let graph = outer.build().unwrap();

        let paths: Vec<String> = graph.walk().into_iter().map(|(p, _)| p).collect();
        assert!(paths.contains(&"inner.fod_convert".to_string()));
        assert_eq!(graph.all_sinks().len(), 1);
    }

    #[test]
    fn test_json_lists_nodes() {
        let json = tiny("wf").to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["name"], "wf");
        assert_eq!(parsed["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["config"]["keep_inputs"], true);
    }
}
