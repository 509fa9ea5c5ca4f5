//! Small reference designs shared by the workspace's tests and demos.
//!
//! Every module is annotated with `tamara_triplicate` at module level and has a
//! 1-bit `err` output carrying `tamara_error_sink`, so running the propagation
//! pass followed by the TMR pass is enough to transform it.

use crate::annotations;
use crate::design::{CellId, CellKind, Module, NetlistError, PortDirection, SigSpec};

/// Adds a named cell with the given port bindings and the usual Yosys width
/// parameters.
fn gate(
    module: &mut Module,
    name: &str,
    kind: CellKind,
    ports: &[(&str, &SigSpec)],
) -> Result<CellId, NetlistError> {
    let id = module.add_cell(name, kind)?;
    let cell = module.cell_mut(id);
    for (port, sig) in ports {
        cell.set_port(*port, (*sig).clone());
    }
    if cell.kind.is_unary() || cell.kind.is_binary() {
        for (port, sig) in ports {
            cell.parameters
                .set_int(format!("{port}_WIDTH"), i64::from(sig.width()));
            if *port != "Y" {
                cell.parameters.set_int(format!("{port}_SIGNED"), 0);
            }
        }
    } else if cell.kind.is_sequential() {
        let width = cell.port("D").map_or(0, SigSpec::width);
        cell.parameters.set_int("WIDTH", i64::from(width));
        cell.parameters.set_int("CLK_POLARITY", 1);
    } else {
        let width = cell.port("Y").map_or(0, SigSpec::width);
        cell.parameters.set_int("WIDTH", i64::from(width));
    }
    Ok(id)
}

/// Creates a module annotated for triplication.
fn annotated(name: &str) -> Module {
    let mut module = Module::new(name);
    module.attributes.set_flag(annotations::TRIPLICATE);
    module.attributes.set_flag("top");
    module
}

/// Adds the 1-bit `err` output tagged as the error sink.
fn error_port(module: &mut Module) -> Result<(), NetlistError> {
    let err = module.add_port("err", 1, PortDirection::Output)?;
    module.wire_mut(err).attributes.set_flag(annotations::ERROR_SINK);
    Ok(())
}

/// `o = !ff` where `ff` is registered from input `a`.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn not_dff() -> Result<Module, NetlistError> {
    let mut m = annotated("not_dff_tmr");
    let clk = m.add_port("clk", 1, PortDirection::Input)?;
    let a = m.add_port("a", 1, PortDirection::Input)?;
    let o = m.add_port("o", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let ff = m.add_wire("ff", 1)?;
    let (clk, a, o, ff) = (m.sig(clk), m.sig(a), m.sig(o), m.sig(ff));

    gate(&mut m, "ff_reg", CellKind::Dff, &[("CLK", &clk), ("D", &a), ("Q", &ff)])?;
    gate(&mut m, "inv", CellKind::Not, &[("A", &ff), ("Y", &o)])?;
    Ok(m)
}

/// `o = (a & b) & (c & d)`, purely combinational.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn and_tree() -> Result<Module, NetlistError> {
    let mut m = annotated("and_tree");
    let ins = ["a", "b", "c", "d"]
        .into_iter()
        .map(|n| m.add_port(n, 1, PortDirection::Input))
        .collect::<Result<Vec<_>, _>>()?;
    let o = m.add_port("o", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let ab = m.add_wire("ab", 1)?;
    let cd = m.add_wire("cd", 1)?;
    let [a, b, c, d] = [ins[0], ins[1], ins[2], ins[3]].map(|w| m.sig(w));
    let (o, ab, cd) = (m.sig(o), m.sig(ab), m.sig(cd));

    gate(&mut m, "and_ab", CellKind::And, &[("A", &a), ("B", &b), ("Y", &ab)])?;
    gate(&mut m, "and_cd", CellKind::And, &[("A", &c), ("B", &d), ("Y", &cd)])?;
    gate(&mut m, "and_o", CellKind::And, &[("A", &ab), ("B", &cd), ("Y", &o)])?;
    Ok(m)
}

/// `t = a & b` shared by `o1 = !t` and `o2 = t ^ a`.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn fanout() -> Result<Module, NetlistError> {
    let mut m = annotated("fanout");
    let a = m.add_port("a", 1, PortDirection::Input)?;
    let b = m.add_port("b", 1, PortDirection::Input)?;
    let o1 = m.add_port("o1", 1, PortDirection::Output)?;
    let o2 = m.add_port("o2", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let t = m.add_wire("t", 1)?;
    let (a, b, o1, o2, t) = (m.sig(a), m.sig(b), m.sig(o1), m.sig(o2), m.sig(t));

    gate(&mut m, "g_and", CellKind::And, &[("A", &a), ("B", &b), ("Y", &t)])?;
    gate(&mut m, "g_not", CellKind::Not, &[("A", &t), ("Y", &o1)])?;
    gate(&mut m, "g_xor", CellKind::Xor, &[("A", &t), ("B", &a), ("Y", &o2)])?;
    Ok(m)
}

/// Two register stages: `q1 <= a ^ b`, `q2 <= !q1`, `o = q2 | c`.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn pipeline() -> Result<Module, NetlistError> {
    let mut m = annotated("pipeline");
    let clk = m.add_port("clk", 1, PortDirection::Input)?;
    let a = m.add_port("a", 1, PortDirection::Input)?;
    let b = m.add_port("b", 1, PortDirection::Input)?;
    let c = m.add_port("c", 1, PortDirection::Input)?;
    let o = m.add_port("o", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let [x, q1, y, q2] = ["x", "q1", "y", "q2"].map(|n| m.add_wire(n, 1));
    let (x, q1, y, q2) = (m.sig(x?), m.sig(q1?), m.sig(y?), m.sig(q2?));
    let (clk, a, b, c, o) = (m.sig(clk), m.sig(a), m.sig(b), m.sig(c), m.sig(o));

    gate(&mut m, "g_in", CellKind::Xor, &[("A", &a), ("B", &b), ("Y", &x)])?;
    gate(&mut m, "r1", CellKind::Dff, &[("CLK", &clk), ("D", &x), ("Q", &q1)])?;
    gate(&mut m, "g_mid", CellKind::Not, &[("A", &q1), ("Y", &y)])?;
    gate(&mut m, "r2", CellKind::Dff, &[("CLK", &clk), ("D", &y), ("Q", &q2)])?;
    gate(&mut m, "g_out", CellKind::Or, &[("A", &q2), ("B", &c), ("Y", &o)])?;
    Ok(m)
}

/// 2-bit counter whose register drives the output port directly.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn counter() -> Result<Module, NetlistError> {
    let mut m = annotated("counter");
    let clk = m.add_port("clk", 1, PortDirection::Input)?;
    let q = m.add_port("q", 2, PortDirection::Output)?;
    error_port(&mut m)?;
    let next = m.add_wire("next", 2)?;
    let one = SigSpec::constant(1, 2);
    let (clk, q, next) = (m.sig(clk), m.sig(q), m.sig(next));

    gate(&mut m, "incr", CellKind::Add, &[("A", &q), ("B", &one), ("Y", &next)])?;
    gate(&mut m, "state", CellKind::Dff, &[("CLK", &clk), ("D", &next), ("Q", &q)])?;
    Ok(m)
}

/// 1-bit toggle register with an enable: `q <= a ? q : !q`, with `q` on the
/// output port.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn enabled_counter() -> Result<Module, NetlistError> {
    let mut m = annotated("enabled_counter");
    let clk = m.add_port("clk", 1, PortDirection::Input)?;
    let a = m.add_port("a", 1, PortDirection::Input)?;
    let q = m.add_port("q", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let [next, en] = ["next", "en"].map(|n| m.add_wire(n, 1));
    let (next, en) = (m.sig(next?), m.sig(en?));
    let (clk, a, q) = (m.sig(clk), m.sig(a), m.sig(q));

    gate(&mut m, "flip", CellKind::Not, &[("A", &q), ("Y", &next)])?;
    gate(&mut m, "en_inv", CellKind::Not, &[("A", &a), ("Y", &en)])?;
    gate(
        &mut m,
        "state",
        CellKind::Dffe,
        &[("CLK", &clk), ("EN", &en), ("D", &next), ("Q", &q)],
    )?;
    Ok(m)
}

/// Output driven by the sum bit of a `$fa`, whose carry goes elsewhere.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn multi_output() -> Result<Module, NetlistError> {
    let mut m = annotated("multi_output");
    let [a, b, c] = ["a", "b", "c"].map(|n| m.add_port(n, 1, PortDirection::Input));
    let (a, b, c) = (m.sig(a?), m.sig(b?), m.sig(c?));
    let sum = m.add_port("sum", 1, PortDirection::Output)?;
    let carry = m.add_port("carry", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let (sum, carry) = (m.sig(sum), m.sig(carry));

    gate(
        &mut m,
        "fa",
        CellKind::Fa,
        &[("A", &a), ("B", &b), ("C", &c), ("X", &carry), ("Y", &sum)],
    )?;
    Ok(m)
}

/// 2-bit output whose bits come from two different gates.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn special_wiring() -> Result<Module, NetlistError> {
    let mut m = annotated("special_wiring");
    let a = m.add_port("a", 1, PortDirection::Input)?;
    let b = m.add_port("b", 1, PortDirection::Input)?;
    let o = m.add_port("o", 2, PortDirection::Output)?;
    error_port(&mut m)?;
    let (a, b) = (m.sig(a), m.sig(b));
    let lo: SigSpec = m.sig(o).bit(0).into_iter().collect();
    let hi: SigSpec = m.sig(o).bit(1).into_iter().collect();

    gate(&mut m, "g_lo", CellKind::Not, &[("A", &a), ("Y", &lo)])?;
    gate(&mut m, "g_hi", CellKind::Not, &[("A", &b), ("Y", &hi)])?;
    Ok(m)
}

/// `t = a & b` feeding a triplicated `o1 = !t` and an excluded `o2 = t | b`.
///
/// # Errors
/// Only fails if the builder itself is broken.
pub fn ignored_consumer() -> Result<Module, NetlistError> {
    let mut m = annotated("ignored_consumer");
    let a = m.add_port("a", 1, PortDirection::Input)?;
    let b = m.add_port("b", 1, PortDirection::Input)?;
    let o1 = m.add_port("o1", 1, PortDirection::Output)?;
    let o2 = m.add_port("o2", 1, PortDirection::Output)?;
    error_port(&mut m)?;
    let t = m.add_wire("t", 1)?;
    let (a, b, o1, o2, t) = (m.sig(a), m.sig(b), m.sig(o1), m.sig(o2), m.sig(t));

    gate(&mut m, "g_and", CellKind::And, &[("A", &a), ("B", &b), ("Y", &t)])?;
    gate(&mut m, "g_not", CellKind::Not, &[("A", &t), ("Y", &o1)])?;
    let keep = gate(&mut m, "g_keep", CellKind::Or, &[("A", &t), ("B", &b), ("Y", &o2)])?;
    m.cell_mut(keep).attributes.set_flag(annotations::IGNORE);
    let o2 = m.wire_by_name("o2").ok_or_else(|| NetlistError::not_found("wire", "o2"))?;
    m.wire_mut(o2).attributes.set_flag(annotations::IGNORE);
    Ok(m)
}
