// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Pipeline graph model
//!
//! Stages with typed ports, edges between them, a builder that checks every
//! connection, and the sealed [`PipelineGraph`] handed to the orchestrator.

mod builder;
mod config;
mod dag;
mod node;
mod pipeline;
mod validation;

pub use builder::GraphBuilder;
pub use config::ExecutionConfig;
pub use dag::DagIndex;
pub use node::{Edge, NodeKind, Port, PortRef, PortType, StageNode, Value, INPUT_NODE, OUTPUT_NODE};
pub use pipeline::{PipelineGraph, Sink};
pub use validation::{GraphValidator, ValidationResult};
