// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Mutable graph assembly
//!
//! `GraphBuilder` is the only way to put nodes and edges together. Sealing it
//! runs [`GraphValidator`] and yields an immutable [`PipelineGraph`].

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::{
    Edge, ExecutionConfig, GraphValidator, PipelineGraph, PortRef, PortType, Sink, StageNode,
    Value, INPUT_NODE, OUTPUT_NODE,
};
use crate::errors::{TractifyError, TractifyResult};

/// Assembles a [`PipelineGraph`]
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<StageNode>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    bound: HashSet<PortRef>,
    input_values: BTreeMap<String, Value>,
    config: ExecutionConfig,
    sinks: Vec<Sink>,
}

impl GraphBuilder {
    /// Start a graph with the given boundary inputs and outputs
    pub fn new(
        name: impl Into<String>,
        inputs: &[(&str, PortType)],
        outputs: &[(&str, PortType)],
    ) -> Self {
        let inputnode = inputs
            .iter()
            .fold(StageNode::boundary(INPUT_NODE), |node, (port, ty)| {
                node.output(port, *ty)
            });
        let outputnode = outputs
            .iter()
            .fold(StageNode::boundary(OUTPUT_NODE), |node, (port, ty)| {
                node.input(port, *ty)
            });

        let mut builder = Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            bound: HashSet::new(),
            input_values: BTreeMap::new(),
            config: ExecutionConfig::default(),
            sinks: Vec::new(),
        };
        builder.insert(inputnode);
        builder.insert(outputnode);
        builder
    }

    /// Attach the execution configuration carried by the sealed graph
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, node: &str) -> bool {
        self.index.contains_key(node)
    }

    fn insert(&mut self, node: StageNode) {
        self.index.insert(node.name().to_string(), self.nodes.len());
        self.nodes.push(node);
    }

    fn node(&self, name: &str) -> TractifyResult<&StageNode> {
        self.index
            .get(name)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| TractifyError::UnknownNode {
                graph: self.name.clone(),
                node: name.to_string(),
            })
    }

    /// Add a stage
    pub fn add_node(&mut self, node: StageNode) -> TractifyResult<()> {
        if self.contains(node.name()) {
            return Err(TractifyError::DuplicateNode {
                graph: self.name.clone(),
                node: node.name().to_string(),
            });
        }
        debug!(graph = %self.name, node = node.name(), "adding node");
        self.insert(node);
        Ok(())
    }

    /// Nest a sealed graph as a single node named after it
    pub fn add_workflow(&mut self, graph: PipelineGraph) -> TractifyResult<()> {
        self.add_node(StageNode::workflow(graph))
    }

    /// Connect `source` (node, output port) to `target` (node, input port)
    pub fn connect(&mut self, source: (&str, &str), target: (&str, &str)) -> TractifyResult<()> {
        let (src_node, src_port) = source;
        let (dst_node, dst_port) = target;

        let source_ty = self
            .node(src_node)?
            .output_port(src_port)
            .map(|p| p.ty)
            .ok_or_else(|| TractifyError::UnknownPort {
                node: src_node.to_string(),
                port: src_port.to_string(),
                direction: "output",
            })?;

        let target_ty = self
            .node(dst_node)?
            .input_port(dst_port)
            .map(|p| p.ty)
            .ok_or_else(|| TractifyError::UnknownPort {
                node: dst_node.to_string(),
                port: dst_port.to_string(),
                direction: "input",
            })?;

        let source = PortRef::new(src_node, src_port);
        let target = PortRef::new(dst_node, dst_port);

        if !target_ty.accepts(source_ty) {
            return Err(TractifyError::TypeMismatch {
                source_port: source.to_string(),
                target_port: target.to_string(),
                expected: target_ty.to_string(),
                found: source_ty.to_string(),
            });
        }

        if !self.bound.insert(target.clone()) {
            return Err(TractifyError::PortAlreadyBound {
                node: target.node,
                port: target.port,
            });
        }

        debug!(graph = %self.name, "{} -> {}", source, target);
        self.edges.push(Edge { source, target });
        Ok(())
    }

    /// Connect several `(output, input)` port pairs between two nodes
    pub fn connect_all(
        &mut self,
        source: &str,
        target: &str,
        ports: &[(&str, &str)],
    ) -> TractifyResult<()> {
        for &(out_port, in_port) in ports {
            self.connect((source, out_port), (target, in_port))?;
        }
        Ok(())
    }

    /// Bind a literal value to a boundary input
    pub fn set_input(&mut self, port: &str, value: impl Into<Value>) -> TractifyResult<()> {
        let value = value.into();
        let ty = self
            .node(INPUT_NODE)?
            .output_port(port)
            .map(|p| p.ty)
            .ok_or_else(|| TractifyError::UnknownPort {
                node: INPUT_NODE.to_string(),
                port: port.to_string(),
                direction: "input",
            })?;

        if !ty.accepts_value(&value) {
            return Err(TractifyError::TypeMismatch {
                source_port: format!("value '{}'", value),
                target_port: format!("{}.{}", INPUT_NODE, port),
                expected: ty.to_string(),
                found: value
                    .port_type()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "unsupported value".to_string()),
            });
        }

        if self.input_values.contains_key(port) {
            return Err(TractifyError::PortAlreadyBound {
                node: INPUT_NODE.to_string(),
                port: port.to_string(),
            });
        }

        self.input_values.insert(port.to_string(), value);
        Ok(())
    }

    /// Record where the artifact on an `outputnode` port is placed
    pub fn add_sink(&mut self, sink: Sink) -> TractifyResult<()> {
        if self.node(OUTPUT_NODE)?.input_port(&sink.port).is_none() {
            return Err(TractifyError::UnknownPort {
                node: OUTPUT_NODE.to_string(),
                port: sink.port,
                direction: "input",
            });
        }
        self.sinks.push(sink);
        Ok(())
    }

    /// Seal into a graph ready for the orchestrator
    ///
    /// Every required input, including consumed boundary inputs, must be
    /// bound and the graph must be acyclic.
    pub fn build(self) -> TractifyResult<PipelineGraph> {
        self.seal(false)
    }

    /// Seal into a graph meant to be nested with [`GraphBuilder::add_workflow`]
    ///
    /// Consumed boundary inputs without a value are allowed; they become
    /// required inputs of the workflow node in the parent graph.
    pub fn build_component(self) -> TractifyResult<PipelineGraph> {
        self.seal(true)
    }

    fn seal(self, allow_open_inputs: bool) -> TractifyResult<PipelineGraph> {
        let result = GraphValidator::validate(
            &self.name,
            &self.nodes,
            &self.edges,
            &self.input_values,
            allow_open_inputs,
        );

        for warning in &result.warnings {
            warn!(graph = %self.name, "{}", warning);
        }

        let open_inputs = result.open_inputs.clone();
        if let Some(err) = result.into_first_error() {
            return Err(err);
        }

        debug!(
            graph = %self.name,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "graph sealed"
        );

        Ok(PipelineGraph {
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
            input_values: self.input_values,
            open_inputs,
            config: self.config,
            sinks: self.sinks,
        })
    }
}
