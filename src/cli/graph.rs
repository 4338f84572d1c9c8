// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Graph command - render the tractography graph

use miette::Result;

use super::build::build_graph;
use super::{fail, load_settings, GraphFormat, TractArgs};

/// Run the graph command
pub async fn run(tract: TractArgs, format: GraphFormat, _verbose: bool) -> Result<()> {
    let settings = load_settings(tract.settings.as_deref())?;
    let graph = build_graph(&tract, settings)?;

    let output = match format {
        GraphFormat::Text => graph.to_text().map_err(fail)?,
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
        GraphFormat::Json => graph.to_json().map_err(fail)?,
    };

    println!("{}", output);

    Ok(())
}
