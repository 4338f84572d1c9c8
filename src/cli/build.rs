// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Build command - assemble the tractography graph for one session

use colored::Colorize;
use miette::Result;
use tracing::warn;

use super::{fail, load_settings, write_graph_files, TractArgs};
use crate::geometry::GradientTable;
use crate::graph::PipelineGraph;
use crate::settings::Settings;
use crate::utils::{
    print_field, print_header, print_info, print_section, print_success, print_warning,
};
use crate::workflow::PipelineGraphBuilder;

/// Run the build command
pub async fn run(tract: TractArgs, dry_run: bool, verbose: bool) -> Result<()> {
    let settings = load_settings(tract.settings.as_deref())?;

    print_header("Building tractography graph");
    print_field("Participant", tract.subject_id());
    print_field("Session", tract.session_id());
    print_field("Algorithm", &tract.gen5tt_algo);

    print_section("Inputs");
    report_inputs(&tract);
    check_gradients(&tract, &settings);

    let graph = build_graph(&tract, settings)?;
    let fingerprint = graph.fingerprint().map_err(fail)?;

    print_section("Graph");
    print_field("Name", graph.name());
    print_field("Stages", graph.stages().count());
    print_field("Outputs", graph.sinks().len());
    print_field("Fingerprint", &fingerprint[..16]);

    if verbose {
        print_section("Outputs");
        for sink in graph.sinks() {
            println!(
                "  {} {}",
                format!("{:<22}", sink.role).dimmed(),
                sink.destination().display()
            );
        }
    }

    println!();
    if dry_run {
        print_info("Dry run: graph files not written");
        return Ok(());
    }

    let dir = tract.output_dir.join("scratch").join(graph.name());
    for path in write_graph_files(&graph, &dir).map_err(fail)? {
        print_success(&format!("Wrote {}", path.display()));
    }
    println!();
    println!("{}", "Graph built successfully!".green().bold());

    Ok(())
}

/// Build the graph described by `tract`, scratch space under `<output>/scratch`
pub(crate) fn build_graph(tract: &TractArgs, settings: Settings) -> Result<PipelineGraph> {
    let builder = PipelineGraphBuilder::new(settings);
    let config = builder
        .config()
        .clone()
        .with_work_dir(tract.output_dir.join("scratch"));

    builder
        .with_config(config)
        .build(
            &tract.gen5tt_algo,
            tract.subject_id(),
            tract.session_id(),
            &tract.inputs(),
            tract.num_tracts,
        )
        .map_err(fail)
}

fn report_inputs(tract: &TractArgs) {
    let mut files = vec![
        ("T1", &tract.t1_file),
        ("Diffusion", &tract.eddy_file),
        ("b-vectors", &tract.bvec_file),
        ("b-values", &tract.bval_file),
        ("Template", &tract.template_file),
        ("Atlas", &tract.atlas_file),
    ];
    if let Some(fs_file) = &tract.fs_file {
        files.push(("Segmentation", fs_file));
    }

    for (label, path) in files {
        if path.exists() {
            print_success(&format!("{}: {}", label, path.display()));
        } else {
            print_warning(&format!("{} not found yet: {}", label, path.display()));
        }
    }
}

/// Warn about gradient sets sampled on one hemisphere only
fn check_gradients(tract: &TractArgs, settings: &Settings) {
    if !tract.bvec_file.exists() || !tract.bval_file.exists() {
        return;
    }

    let hemisphere = GradientTable::from_fsl_files(&tract.bvec_file, &tract.bval_file)
        .and_then(|table| table.hemisphere(settings.b0_threshold));
    match hemisphere {
        Ok(h) if h.is_hemispherical => {
            warn!(pole = ?h.pole, "gradient directions are hemispherical");
            print_warning("Gradient directions cover only one hemisphere");
        }
        Ok(_) => print_success("Gradient directions cover the full sphere"),
        Err(e) => print_warning(&format!("Could not check gradient directions: {}", e)),
    }
}
