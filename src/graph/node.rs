// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Stage nodes, ports and edges
//!
//! A node declares named input and output ports with a semantic type.
//! Edges connect an upstream output port to a downstream input port.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::PipelineGraph;

/// Name of the boundary node exposing a graph's external inputs
pub const INPUT_NODE: &str = "inputnode";

/// Name of the boundary node exposing a graph's external outputs
pub const OUTPUT_NODE: &str = "outputnode";

/// Semantic type carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    File,
    FileList,
    Integer,
    Text,
}

impl PortType {
    /// Whether an input of this type can be fed by `source`
    ///
    /// A single file is accepted where a list of files is expected.
    pub fn accepts(self, source: PortType) -> bool {
        self == source || (self == Self::FileList && source == Self::File)
    }

    /// Whether a literal value can be bound to a port of this type
    pub fn accepts_value(self, value: &Value) -> bool {
        match value.port_type() {
            Some(ty) => self.accepts(ty),
            None => false,
        }
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::FileList => write!(f, "file list"),
            Self::Integer => write!(f, "integer"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A literal value: a stage parameter or a bound boundary input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Path(PathBuf),
    List(Vec<Value>),
}

impl Value {
    /// Port type this value can be bound to, if any
    pub fn port_type(&self) -> Option<PortType> {
        match self {
            Self::Integer(_) => Some(PortType::Integer),
            Self::Text(_) => Some(PortType::Text),
            Self::Path(_) => Some(PortType::File),
            Self::List(items) if items.iter().all(|v| matches!(v, Self::Path(_))) => {
                Some(PortType::FileList)
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Self::Path(v)
    }
}

impl From<&std::path::Path> for Value {
    fn from(v: &std::path::Path) -> Self {
        Self::Path(v.to_path_buf())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// A named, typed port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PortType,
    /// Optional inputs need not be bound
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

/// What a node runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// An external command-line program
    Command { program: String },
    /// `inputnode` / `outputnode` of a graph
    Boundary,
    /// A nested graph used as a single opaque node
    Workflow { graph: Box<PipelineGraph> },
}

/// A processing stage with declared port contracts
///
/// Built with the chained constructors below and immutable once added to a
/// graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageNode {
    name: String,
    #[serde(flatten)]
    kind: NodeKind,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, Value>,
}

impl StageNode {
    /// A stage running an external program
    pub fn command(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            NodeKind::Command {
                program: program.into(),
            },
        )
    }

    pub(crate) fn boundary(name: &str) -> Self {
        Self::with_kind(name, NodeKind::Boundary)
    }

    /// Wrap a sealed graph as a single node
    ///
    /// Boundary inputs become input ports (required only when the inner
    /// graph left them open), boundary outputs become output ports.
    pub fn workflow(graph: PipelineGraph) -> Self {
        let inputs = graph
            .inputs()
            .iter()
            .map(|p| Port {
                name: p.name.clone(),
                ty: p.ty,
                optional: !graph.open_inputs().contains(&p.name),
            })
            .collect();
        let outputs = graph.outputs().to_vec();

        Self {
            name: graph.name().to_string(),
            inputs,
            outputs,
            parameters: BTreeMap::new(),
            kind: NodeKind::Workflow {
                graph: Box::new(graph),
            },
        }
    }

    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Declare a required input port
    pub fn input(mut self, name: &str, ty: PortType) -> Self {
        self.inputs.push(Port {
            name: name.to_string(),
            ty,
            optional: false,
        });
        self
    }

    /// Declare an input port that may stay unbound
    pub fn optional_input(mut self, name: &str, ty: PortType) -> Self {
        self.inputs.push(Port {
            name: name.to_string(),
            ty,
            optional: true,
        });
        self
    }

    /// Declare an output port
    pub fn output(mut self, name: &str, ty: PortType) -> Self {
        self.outputs.push(Port {
            name: name.to_string(),
            ty,
            optional: false,
        });
        self
    }

    /// Set a construction-time parameter
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    pub fn input_port(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_port(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// External program for command stages
    pub fn program(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Command { program } => Some(program),
            _ => None,
        }
    }

    /// Nested graph for workflow nodes
    pub fn subgraph(&self) -> Option<&PipelineGraph> {
        match &self.kind {
            NodeKind::Workflow { graph } => Some(graph),
            _ => None,
        }
    }

    /// Short label used in rendered graphs
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Command { program } => program.clone(),
            NodeKind::Boundary => "boundary".to_string(),
            NodeKind::Workflow { graph } => format!("workflow, {} nodes", graph.nodes().len()),
        }
    }
}

/// One end of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortRef {
    pub node: String,
    pub port: String,
}

impl PortRef {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// `(sourceNode, sourceOutputPort) → (destNode, destInputPort)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: PortRef,
    pub target: PortRef,
}
