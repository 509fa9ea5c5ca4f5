//! TMR command-line tool
//!
//! Reads a Yosys JSON netlist, triplicates every module annotated for
//! triple modular redundancy and writes the transformed netlist back out.

mod args;

use clap::Parser;
use tmr_common::annotations;
use tmr_common::yosys_json::{read_design, write_design};
use tmr_engine::{propagate, run_design};
use tracing::info;

use args::Args;

/// Runs the TMR pass.
///
/// This function:
/// 1. Initializes logging
/// 2. Parses command-line arguments
/// 3. Loads the netlist and marks the selected modules
/// 4. Propagates annotations and runs the pass
/// 5. Writes the netlist and the optional report
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let config = args.to_config();

    info!("Loading design: {}", args.input.display());
    let mut design = read_design(&args.input)?;

    for name in &args.modules {
        let module = design
            .module_mut(name)
            .ok_or_else(|| format!("design has no module '{name}'"))?;
        module.attributes.set_flag(annotations::TRIPLICATE);
    }

    let marked = propagate(&mut design);
    info!(
        "Marked {} cell(s) and {} wire(s) in {} module(s)",
        marked.cells,
        marked.wires,
        marked.modules.len()
    );

    let reports = run_design(&mut design, &config)?;
    for report in &reports {
        println!(
            "{}: {} cone(s), {} voter(s), {} replica cell(s), {} unresolved net(s)",
            report.module,
            report.cones.len(),
            report.voters,
            report.replicated_cells,
            report.unresolved_nets.len()
        );
    }

    write_design(&design, &args.output)?;
    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&reports)?)?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
