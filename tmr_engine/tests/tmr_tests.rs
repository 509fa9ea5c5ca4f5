#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

mod common;

use std::collections::HashSet;

use rstest::rstest;
use tmr_common::annotations;
use tmr_common::sim::Simulator;
use tmr_common::{
    CellKind, Module, NetlistError, SigSpec, TmrConfig, and_tree, counter, enabled_counter, fanout,
    ignored_consumer, multi_output, not_dff, pipeline, special_wiring,
};
use tmr_engine::{TmrError, find_multi_driven};

use common::{init_test_logger, transform};

type Fixture = fn() -> Result<Module, NetlistError>;

fn data_ports(module: &Module) -> (Vec<String>, Vec<String>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (_, wire) in module.ports() {
        if wire.attributes.is_set(annotations::ERROR_SINK) || wire.name() == "clk" {
            continue;
        }
        if wire.is_input() {
            inputs.push(wire.name().to_owned());
        } else {
            outputs.push(wire.name().to_owned());
        }
    }
    (inputs, outputs)
}

/// Drives both modules with every input combination for a few cycles and
/// compares the outputs after each edge.
fn assert_equivalent(
    original: &Module,
    transformed: &Module,
    cycles: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let (inputs, outputs) = data_ports(original);
    let mut reference = Simulator::new(original)?;
    let mut dut = Simulator::new(transformed)?;
    for vector in 0u64..(1 << inputs.len()) {
        for (i, name) in inputs.iter().enumerate() {
            reference.set(name, (vector >> i) & 1)?;
            dut.set(name, (vector >> i) & 1)?;
        }
        for cycle in 0..cycles {
            reference.clock()?;
            dut.clock()?;
            for name in &outputs {
                assert_eq!(
                    dut.get(name)?,
                    reference.get(name)?,
                    "output {name}, vector {vector:#b}, cycle {cycle}"
                );
            }
            assert_eq!(dut.get("err")?, 0, "err raised without a fault, vector {vector:#b}");
        }
    }
    Ok(())
}

#[rstest]
#[case::not_dff(not_dff as Fixture, 1)]
#[case::and_tree(and_tree as Fixture, 1)]
#[case::fanout(fanout as Fixture, 2)]
#[case::pipeline(pipeline as Fixture, 3)]
#[case::counter(counter as Fixture, 1)]
#[case::enabled_counter(enabled_counter as Fixture, 1)]
fn transformed_fixtures_are_equivalent(
    #[case] fixture: Fixture,
    #[case] voters: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let config = TmrConfig::builder().check_netlist(true).strict_repair(true).build();
    let (original, transformed, report) = transform(fixture(), &config)?;

    assert_eq!(report.voters, voters);
    assert_with_context!(
        find_multi_driven(&transformed).is_empty(),
        format!("{}: {:?}", report.module, report.unresolved_nets)
    );
    transformed.check()?;
    assert_equivalent(&original, &transformed, 3)?;
    Ok(())
}

#[rstest]
#[case::not_dff(not_dff as Fixture)]
#[case::and_tree(and_tree as Fixture)]
#[case::fanout(fanout as Fixture)]
#[case::pipeline(pipeline as Fixture)]
#[case::counter(counter as Fixture)]
#[case::enabled_counter(enabled_counter as Fixture)]
fn interiors_are_disjoint_and_terminals_legal(
    #[case] fixture: Fixture,
) -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (original, _, report) = transform(fixture(), &TmrConfig::default())?;

    let mut seen = HashSet::new();
    for cone in &report.cones {
        for name in &cone.interior {
            assert_invariant!(
                seen.insert(name.clone()),
                format!("'{name}' is interior to two cones")
            );
        }
        for name in &cone.inputs {
            let legal = original.wire_by_name(name).is_some_and(|w| original.wire(w).is_port())
                || original
                    .cell_by_name(name)
                    .is_some_and(|c| original.cell(c).kind.is_sequential());
            assert_invariant!(legal, format!("cone {}: illegal terminal '{name}'", cone.id));
        }
    }
    Ok(())
}

#[test]
fn not_dff_is_fully_triplicated() -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (_, m, report) = transform(not_dff(), &TmrConfig::default())?;

    let cone = &report.cones[0];
    assert_eq!(cone.output, "o");
    assert_eq!(cone.cut_point.as_deref(), Some("inv"));
    assert_eq!(cone.inputs, vec!["ff_reg"]);
    assert_eq!(report.wired_cones(), 1);

    let design_nots = m
        .cells()
        .filter(|(_, c)| c.kind == CellKind::Not && !c.attributes.has(annotations::VOTER))
        .count();
    assert_eq!(design_nots, 3);
    assert_eq!(m.count_cells(&CellKind::Dff), 3);
    assert_eq!(report.voters, 1);

    let err = m.sig_by_name("err")?;
    assert!(m.connections().iter().any(|(lhs, _)| lhs == &err));
    Ok(())
}

#[test]
fn single_fault_is_masked_and_flagged() -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (_, mut m, _) = transform(not_dff(), &TmrConfig::default())?;
    let faulty = m
        .cell_by_name("ff_reg__replica1_cone0__")
        .ok_or("replica register missing")?;
    m.cell_mut(faulty).set_port("D", SigSpec::constant(1, 1));

    let mut sim = Simulator::new(&m)?;
    sim.set("a", 1)?;
    sim.clock()?;
    assert_eq!(sim.get("o")?, 0);
    assert_eq!(sim.get("err")?, 0);

    sim.set("a", 0)?;
    sim.clock()?;
    assert_eq!(sim.get("o")?, 1);
    assert_eq!(sim.get("err")?, 1);
    Ok(())
}

#[rstest]
#[case::not_dff(not_dff as Fixture, "ff_reg", 1)]
#[case::pipeline_first_stage(pipeline as Fixture, "r1", 1)]
#[case::pipeline_second_stage(pipeline as Fixture, "r2", 2)]
#[case::counter(counter as Fixture, "state", 1)]
#[case::counter_second_replica(counter as Fixture, "state", 2)]
fn stuck_replica_register_is_masked_and_flagged(
    #[case] fixture: Fixture,
    #[case] register: &str,
    #[case] replica: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (original, mut m, _) = transform(fixture(), &TmrConfig::default())?;
    let (faulty, _) = m
        .cells()
        .find(|(_, c)| {
            c.attributes.get_str(annotations::REPLICA_OF) == Some(register)
                && c.attributes.get_int(annotations::REPLICA) == Some(replica)
        })
        .ok_or("replica register missing")?;
    let width = m.cell(faulty).port("D").map_or(1, SigSpec::width);
    m.cell_mut(faulty).set_port("D", SigSpec::constant(0, width));

    let (inputs, outputs) = data_ports(&original);
    let mut reference = Simulator::new(&original)?;
    let mut dut = Simulator::new(&m)?;
    let mut flagged = false;
    for vector in 0u64..(1 << inputs.len()) {
        for (i, name) in inputs.iter().enumerate() {
            reference.set(name, (vector >> i) & 1)?;
            dut.set(name, (vector >> i) & 1)?;
        }
        for cycle in 0..3 {
            reference.clock()?;
            dut.clock()?;
            for name in &outputs {
                assert_eq!(
                    dut.get(name)?,
                    reference.get(name)?,
                    "output {name} not masked, vector {vector:#b}, cycle {cycle}"
                );
            }
            flagged |= dut.get("err")? == 1;
        }
    }
    assert!(flagged, "stuck replica of '{register}' never raised err");
    Ok(())
}

#[rstest]
#[case::one_voter(not_dff as Fixture, 0)]
#[case::two_voters(fanout as Fixture, 1)]
#[case::three_voters(pipeline as Fixture, 2)]
fn error_outputs_are_chained(
    #[case] fixture: Fixture,
    #[case] chain: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (_, m, _) = transform(fixture(), &TmrConfig::default())?;
    let chained = m
        .cells()
        .filter(|(_, c)| c.attributes.get_str(annotations::VOTER) == Some("error_chain"))
        .count();
    assert_eq!(chained, chain);
    Ok(())
}

#[test]
fn register_driven_output_gets_no_voter_of_its_own() -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (_, m, report) = transform(counter(), &TmrConfig::default())?;
    assert_eq!(report.cones.len(), 2);
    assert!(report.cones[0].interior.is_empty());
    assert!(report.cones[0].cut_point.is_none());
    assert_eq!(report.cones[1].cut_point.as_deref(), Some("incr"));
    assert_eq!(m.count_cells(&CellKind::Add), 3);
    assert_eq!(m.count_cells(&CellKind::Dff), 3);
    Ok(())
}

#[rstest]
#[case::plain(counter as Fixture, CellKind::Dff)]
#[case::with_enable(enabled_counter as Fixture, CellKind::Dffe)]
fn register_driving_a_port_is_triplicated(
    #[case] fixture: Fixture,
    #[case] kind: CellKind,
) -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let config = TmrConfig::builder().strict_repair(true).check_netlist(true).build();
    let (_, m, report) = transform(fixture(), &config)?;
    assert_eq!(m.count_cells(&kind), 3);
    assert!(report.unresolved_nets.is_empty());
    assert!(find_multi_driven(&m).is_empty());
    let _ = Simulator::new(&m)?;

    let q = m.sig_by_name("q")?;
    let drivers = m
        .cells()
        .filter(|(_, c)| c.kind == kind && c.port("Q") == Some(&q))
        .collect::<Vec<_>>();
    assert_eq!(drivers.len(), 1);
    assert!(drivers[0].1.attributes.is_set(annotations::ORIGINAL));
    Ok(())
}

#[test]
fn multi_output_cut_point_aborts() {
    init_test_logger();
    let result = transform(multi_output(), &TmrConfig::default());
    assert!(matches!(
        result,
        Err(TmrError::MultiOutput { ref name, count: 2, .. }) if name == "fa"
    ));
}

#[test]
fn partially_covered_output_aborts() {
    init_test_logger();
    let result = transform(special_wiring(), &TmrConfig::default());
    assert!(matches!(result, Err(TmrError::SpecialWiring { ref name, .. }) if name == "o"));
}

#[test]
fn ignored_consumer_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (_, m, report) = transform(ignored_consumer(), &TmrConfig::default())?;
    assert_eq!(report.unresolved_nets, vec!["t"]);
    assert!(report.skipped_nets.contains(&"t".to_owned()));
    let keep = m.cell(m.cell_by_name("g_keep").ok_or("g_keep missing")?);
    assert!(!keep.attributes.has(annotations::CONE));
    Ok(())
}

#[test]
fn strict_repair_rejects_unresolved_nets() {
    init_test_logger();
    let config = TmrConfig::builder().strict_repair(true).build();
    let result = transform(ignored_consumer(), &config);
    assert!(matches!(result, Err(TmrError::UnresolvedDrivers { ref nets, .. }) if nets == &["t"]));
}

#[test]
fn explicit_error_sink_overrides_the_annotation() -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let mut module = not_dff()?;
    let alarm = module.add_wire("alarm", 1)?;
    let config = TmrConfig::builder().error_sink("alarm").build();
    let (_, m, report) = transform(Ok(module), &config)?;
    assert_eq!(report.error_sink.as_deref(), Some("alarm"));
    let alarm = m.sig(alarm);
    assert!(m.connections().iter().any(|(lhs, _)| lhs == &alarm));
    Ok(())
}

#[test]
fn report_serializes_for_tooling() -> Result<(), Box<dyn std::error::Error>> {
    init_test_logger();
    let (_, _, report) = transform(fanout(), &TmrConfig::default())?;
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["module"], "fanout");
    assert_eq!(json["voters"], 2);
    assert_eq!(json["cones"].as_array().map(Vec::len), Some(report.cones.len()));
    assert_eq!(json["error_sink"], "err");
    Ok(())
}
