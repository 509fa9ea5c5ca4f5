//! The top-level TMR pass over modules and designs.

use std::collections::VecDeque;
use std::time::Instant;

use itertools::Itertools;
use serde::Serialize;
use tmr_common::annotations;
use tmr_common::{Design, Module, TmrConfig, WireId};
use tracing::{info, warn};

use crate::cone::ConeSummary;
use crate::{
    ConnectivityIndex, EngineState, LogicCone, NodeRef, TmrError, VoterBuilder, find_multi_driven,
};

/// Summary of one module transformation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TmrReport {
    /// Module name.
    pub module: String,
    /// Every cone searched, in processing order.
    pub cones: Vec<ConeSummary>,
    /// Cones with no interior.
    pub empty_cones: usize,
    /// Replica cells created.
    pub replicated_cells: usize,
    /// Replica wires created.
    pub replicated_wires: usize,
    /// Voters inserted.
    pub voters: usize,
    /// Wire receiving the aggregated voter error, if any.
    pub error_sink: Option<String>,
    /// Nets split by wire repair.
    pub repaired_nets: Vec<String>,
    /// Nets wire repair declined to touch.
    pub skipped_nets: Vec<String>,
    /// Nets still driven more than once after the run.
    pub unresolved_nets: Vec<String>,
}

impl TmrReport {
    /// Number of cones with a non-empty interior.
    pub fn wired_cones(&self) -> usize {
        self.cones.len() - self.empty_cones
    }
}

/// Triplicates the annotated logic of `module`.
///
/// One cone is seeded per eligible output port other than the error sink.
/// Each cone is searched, replicated and wired in turn, and its input
/// terminals seed further cones until none remain. The voters' error outputs
/// are then aggregated into the error sink.
///
/// # Errors
/// Any cone failure aborts the run; see [`TmrError`]. With
/// [`TmrConfig::strict_repair`], nets left with several drivers are an error
/// too.
pub fn run_module(module: &mut Module, config: &TmrConfig) -> Result<TmrReport, TmrError> {
    let start = Instant::now();
    let mut report = TmrReport {
        module: module.name().to_owned(),
        ..TmrReport::default()
    };

    let sink = find_error_sink(module, config)?;
    report.error_sink = sink.map(|w| module.wire(w).name().to_owned());

    let index = ConnectivityIndex::build(module);
    let mut state = EngineState::new();
    let mut voters = VoterBuilder::new();

    let seeds: Vec<NodeRef> = module
        .ports()
        .filter(|(id, w)| w.is_output() && Some(*id) != sink)
        .map(|(id, _)| NodeRef::Wire(id))
        .filter(|seed| index.contains(*seed))
        .collect();
    let mut queue: VecDeque<LogicCone> = seeds
        .into_iter()
        .map(|seed| LogicCone::seeded_at(seed, module, &index, &mut state))
        .collect();

    while let Some(mut cone) = queue.pop_front() {
        cone.search(module, &index, &mut state)?;
        if cone.is_empty() {
            report.empty_cones += 1;
        }
        report.cones.push(cone.summary(module));

        let stats = cone.replicate(module)?;
        report.replicated_cells += stats.cells;
        report.replicated_wires += stats.wires;

        let outcome = cone.wire(module, &index, &mut voters)?;
        report.repaired_nets.extend(outcome.repaired);
        report.skipped_nets.extend(outcome.skipped);

        if config.check_netlist {
            module.check()?;
        }
        queue.extend(cone.build_successors(module, &index, &mut state));
    }

    report.voters = voters.voter_count();
    match sink {
        Some(sink) if report.voters > 0 => {
            let err = module.sig(sink);
            voters.finalise(module, &err)?;
        }
        Some(_) => warn!(
            "module '{}': no voters inserted; error sink left undriven",
            report.module
        ),
        None if report.voters > 0 => warn!(
            "module '{}': no error sink; {} voter error output(s) left unconnected",
            report.module, report.voters
        ),
        None => {}
    }

    report.unresolved_nets = find_multi_driven(module);
    if !report.unresolved_nets.is_empty() {
        if config.strict_repair {
            return Err(TmrError::UnresolvedDrivers {
                module: report.module,
                nets: report.unresolved_nets,
            });
        }
        warn!(
            "module '{}': {} net(s) still have multiple drivers: {}",
            report.module,
            report.unresolved_nets.len(),
            report.unresolved_nets.iter().format(", ")
        );
    }

    if config.check_netlist {
        module.check()?;
    }

    info!(
        "module '{}': {} cone(s) ({} empty), {} voter(s), {} replica cell(s), {} replica wire(s) \
         in {:?}",
        report.module,
        report.cones.len(),
        report.empty_cones,
        report.voters,
        report.replicated_cells,
        report.replicated_wires,
        start.elapsed()
    );
    Ok(report)
}

/// Runs [`run_module`] over the modules selected by `config`.
///
/// With no explicit selection, every module annotated with `tamara_triplicate`
/// and not `tamara_ignore` is transformed.
///
/// # Errors
/// [`TmrError::UnknownModule`] for a selected module that does not exist, or
/// the first module failure.
pub fn run_design(design: &mut Design, config: &TmrConfig) -> Result<Vec<TmrReport>, TmrError> {
    let names: Vec<String> = if config.modules.is_empty() {
        design
            .modules()
            .filter(|m| {
                m.attributes.is_set(annotations::TRIPLICATE)
                    && !m.attributes.is_set(annotations::IGNORE)
            })
            .map(|m| m.name().to_owned())
            .collect()
    } else {
        config.modules.clone()
    };

    if names.is_empty() {
        warn!("no module is annotated with '{}'; nothing to do", annotations::TRIPLICATE);
    }

    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let module = design
            .module_mut(&name)
            .ok_or_else(|| TmrError::UnknownModule(name.clone()))?;
        reports.push(run_module(module, config)?);
    }
    Ok(reports)
}

/// The configured error sink, or the wire tagged `tamara_error_sink`.
fn find_error_sink(module: &Module, config: &TmrConfig) -> Result<Option<WireId>, TmrError> {
    match &config.error_sink {
        Some(name) => module
            .wire_by_name(name)
            .map(Some)
            .ok_or_else(|| TmrError::UnknownErrorSink {
                module: module.name().to_owned(),
                name: name.clone(),
            }),
        None => Ok(module
            .wires()
            .find(|(_, w)| w.attributes.is_set(annotations::ERROR_SINK))
            .map(|(id, _)| id)),
    }
}
