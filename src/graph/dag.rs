// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! DAG (Directed Acyclic Graph) index over stage dependencies
//!
//! Collapses port-level edges into node-level dependencies, detects cycles
//! and produces execution order and diagram renderings.

use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::Edge;
use crate::errors::TractifyError;

/// Node-level dependency graph
pub struct DagIndex {
    graph: DiGraph<String, ()>,
    labels: HashMap<NodeIndex, String>,
    name_to_index: HashMap<String, NodeIndex>,
}

impl DagIndex {
    /// Index `(name, label)` nodes connected by `edges`
    ///
    /// Edges naming unknown nodes are ignored; the graph builder rejects
    /// them before an index is ever built.
    pub fn new<'a>(nodes: impl IntoIterator<Item = (&'a str, String)>, edges: &[Edge]) -> Self {
        let mut graph = DiGraph::new();
        let mut labels = HashMap::new();
        let mut name_to_index = HashMap::new();

        for (name, label) in nodes {
            let idx = graph.add_node(name.to_string());
            labels.insert(idx, label);
            name_to_index.insert(name.to_string(), idx);
        }

        for edge in edges {
            let (Some(&from), Some(&to)) = (
                name_to_index.get(&edge.source.node),
                name_to_index.get(&edge.target.node),
            ) else {
                continue;
            };
            // Only one dependency per node pair
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, ());
            }
        }

        Self {
            graph,
            labels,
            name_to_index,
        }
    }

    /// Validate that the graph is acyclic
    pub fn validate_acyclic(&self) -> Result<(), TractifyError> {
        self.topological_order().map(|_| ())
    }

    /// Names of the nodes on one cycle, first node repeated at the end
    fn find_cycle(&self) -> Vec<String> {
        for component in tarjan_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.graph.contains_edge(n, n));
            if !is_cycle {
                continue;
            }
            // tarjan_scc yields members in reverse finishing order; reverse
            // it so the listing follows edge direction for simple cycles.
            let mut names: Vec<String> = component
                .iter()
                .rev()
                .map(|n| self.graph[*n].clone())
                .collect();
            if let Some(first) = names.first().cloned() {
                names.push(first);
            }
            return names;
        }
        Vec::new()
    }

    /// Topologically sorted node names
    pub fn topological_order(&self) -> Result<Vec<String>, TractifyError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n].clone()).collect())
            .map_err(|_| TractifyError::CircularDependency {
                stages: self.find_cycle(),
            })
    }

    /// Nodes that must run before `name`
    pub fn dependencies(&self, name: &str) -> Option<Vec<String>> {
        self.neighbors(name, petgraph::Direction::Incoming)
    }

    /// Nodes that consume outputs of `name`
    pub fn dependents(&self, name: &str) -> Option<Vec<String>> {
        self.neighbors(name, petgraph::Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, direction: petgraph::Direction) -> Option<Vec<String>> {
        let node = self.name_to_index.get(name)?;
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(*node, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        Some(names)
    }

    /// Check if `a` depends (directly or transitively) on `b`
    pub fn depends_on(&self, a: &str, b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(b) else {
            return false;
        };

        a != b && has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for idx in self.graph.node_indices() {
            out.push_str(&format!(
                "    {}[\"{} ({})\"]\n",
                self.graph[idx], self.graph[idx], self.labels[&idx]
            ));
        }

        for edge in self.graph.raw_edges() {
            out.push_str(&format!(
                "    {} --> {}\n",
                self.graph[edge.source()],
                self.graph[edge.target()]
            ));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self, title: &str) -> String {
        let mut out = format!("digraph \"{}\" {{\n", title);
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for idx in self.graph.node_indices() {
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\\n({})\"];\n",
                self.graph[idx], self.graph[idx], self.labels[&idx]
            ));
        }
        out.push('\n');

        for edge in self.graph.raw_edges() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.graph[edge.source()],
                self.graph[edge.target()]
            ));
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self) -> Result<String, TractifyError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, name) in order.iter().enumerate() {
            let idx = self.name_to_index[name];
            let deps = self.dependencies(name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, name, self.labels[&idx]));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}
