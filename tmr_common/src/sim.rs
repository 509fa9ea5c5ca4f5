//! Two-valued cycle simulator for small modules.
//!
//! Every flip-flop shares one implicit clock: [`Simulator::clock`] applies a
//! single active edge to all of them regardless of the `CLK` binding. Latches
//! are transparent while their enable is active. Undefined constants read as
//! zero.

use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use crate::design::{Cell, CellId, CellKind, Module, PortDirection, SigBit, SigMap, SigSpec};

/// Errors raised while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A net has more than one driver.
    #[error("net '{net}' has {count} drivers")]
    MultipleDrivers {
        /// Name of the first offending bit.
        net: String,
        /// Number of drivers found.
        count: usize,
    },

    /// Combinational evaluation did not reach a fixed point.
    #[error("combinational loop: no fixed point after {iterations} iterations")]
    CombinationalLoop {
        /// Iterations attempted.
        iterations: usize,
    },

    /// The cell type has no simulation model.
    #[error("cell '{cell}' of type {kind} cannot be simulated")]
    Unsupported {
        /// Cell name.
        cell: String,
        /// Cell type.
        kind: String,
    },

    /// No wire with the requested name exists.
    #[error("no wire named '{0}'")]
    UnknownWire(String),
}

/// Simulation state over one module.
#[derive(Debug)]
pub struct Simulator<'a> {
    /// The module under simulation.
    module: &'a Module,
    /// Canonicalization of connected bits.
    sigmap: SigMap,
    /// Current value of every canonical wire bit.
    values: HashMap<SigBit, bool>,
    /// Stored value of every flip-flop and latch.
    state: HashMap<CellId, Vec<bool>>,
}

impl<'a> Simulator<'a> {
    /// Prepares a simulation of `module`.
    ///
    /// # Errors
    /// Returns [`SimError::MultipleDrivers`] if any net has several drivers,
    /// counting cell outputs and input ports.
    pub fn new(module: &'a Module) -> Result<Self, SimError> {
        let sigmap = SigMap::new(module);
        let mut drivers: HashMap<SigBit, usize> = HashMap::new();
        for (_, cell) in module.cells() {
            for (_, dir, sig) in cell.ports_with_direction() {
                if dir == PortDirection::Output {
                    for bit in sig.iter().map(|b| sigmap.find(*b)).filter(|b| !b.is_const()) {
                        *drivers.entry(bit).or_default() += 1;
                    }
                }
            }
        }
        for (id, wire) in module.ports() {
            if wire.is_input() {
                let sig = module.sig(id);
                let bits = sig.iter().map(|b| sigmap.find(*b));
                for bit in bits.filter(|b| !b.is_const()) {
                    *drivers.entry(bit).or_default() += 1;
                }
            }
        }
        if let Some((bit, count)) = drivers
            .iter()
            .filter(|(_, c)| **c > 1)
            .min_by_key(|(b, _)| **b)
        {
            return Err(SimError::MultipleDrivers {
                net: module.bit_name(*bit),
                count: *count,
            });
        }

        let state = module
            .cells()
            .filter(|(_, c)| c.kind.is_sequential())
            .map(|(id, c)| (id, vec![false; c.port("Q").map_or(0, SigSpec::width) as usize]))
            .collect();

        Ok(Self {
            module,
            sigmap,
            values: HashMap::new(),
            state,
        })
    }

    /// Drives the named wire with the low bits of `value`.
    ///
    /// # Errors
    /// Returns [`SimError::UnknownWire`] if there is no such wire.
    pub fn set(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let sig = self.wire_sig(name)?;
        for (i, bit) in sig.iter().enumerate() {
            let canonical = self.sigmap.find(*bit);
            if !canonical.is_const() {
                self.values.insert(canonical, i < 64 && (value >> i) & 1 == 1);
            }
        }
        Ok(())
    }

    /// Reads the named wire as an integer, LSB first.
    ///
    /// # Errors
    /// Returns [`SimError::UnknownWire`] if there is no such wire.
    pub fn get(&self, name: &str) -> Result<u64, SimError> {
        let sig = self.wire_sig(name)?;
        Ok(self
            .read(&sig)
            .iter()
            .enumerate()
            .take(64)
            .fold(0, |acc, (i, v)| acc | (u64::from(*v) << i)))
    }

    /// Propagates values through combinational logic until nothing changes.
    ///
    /// # Errors
    /// Returns [`SimError::CombinationalLoop`] if no fixed point is reached,
    /// or [`SimError::Unsupported`] for cell types without a model.
    pub fn settle(&mut self) -> Result<(), SimError> {
        let module = self.module;
        let limit = module.cell_count() + 2;
        for iteration in 0..limit {
            let mut changed = false;
            for (id, cell) in module.cells() {
                for (port, value) in self.eval(id, cell)? {
                    if let Some(sig) = cell.port(port) {
                        changed |= self.write(sig, &value);
                    }
                }
            }
            if !changed {
                trace!("settled after {} iteration(s)", iteration + 1);
                return Ok(());
            }
        }
        Err(SimError::CombinationalLoop { iterations: limit })
    }

    /// Settles, applies one active clock edge to every flip-flop, and settles again.
    ///
    /// # Errors
    /// Propagates errors from [`Simulator::settle`].
    pub fn clock(&mut self) -> Result<(), SimError> {
        self.settle()?;
        let module = self.module;
        let mut next = Vec::new();
        for (id, cell) in module.cells() {
            if cell.kind.is_sequential() && !cell.kind.is_latch() {
                next.push((id, self.next_state(id, cell)));
            }
        }
        for (id, value) in next {
            self.state.insert(id, value);
        }
        self.settle()
    }

    fn wire_sig(&self, name: &str) -> Result<SigSpec, SimError> {
        self.module
            .sig_by_name(name)
            .map_err(|_| SimError::UnknownWire(name.to_owned()))
    }

    fn read_bit(&self, bit: SigBit) -> bool {
        match self.sigmap.find(bit) {
            SigBit::One => true,
            SigBit::Zero | SigBit::Undef => false,
            canonical => self.values.get(&canonical).copied().unwrap_or(false),
        }
    }

    fn read(&self, sig: &SigSpec) -> Vec<bool> {
        sig.iter().map(|bit| self.read_bit(*bit)).collect()
    }

    fn port(&self, cell: &Cell, port: &str) -> Vec<bool> {
        cell.port(port).map(|sig| self.read(sig)).unwrap_or_default()
    }

    /// Whether a single-bit control port is at its active level.
    fn active(&self, cell: &Cell, port: &str, polarity: &str) -> bool {
        let level = self.port(cell, port).first().copied().unwrap_or(false);
        level == (cell.param_int(polarity, 1) != 0)
    }

    /// Writes `value` to the wire bits of `sig`, returning whether anything changed.
    fn write(&mut self, sig: &SigSpec, value: &[bool]) -> bool {
        let mut changed = false;
        for (bit, v) in sig.iter().zip(value) {
            let canonical = self.sigmap.find(*bit);
            if canonical.is_const() {
                continue;
            }
            if self.values.insert(canonical, *v) != Some(*v) {
                changed = true;
            }
        }
        changed
    }

    /// Output values of one cell given the current net values.
    fn eval(
        &mut self,
        id: CellId,
        cell: &Cell,
    ) -> Result<Vec<(&'static str, Vec<bool>)>, SimError> {
        let y_width = cell.port("Y").map_or(0, SigSpec::width) as usize;
        let a = || resize(self.port(cell, "A"), y_width);
        let b = || resize(self.port(cell, "B"), y_width);
        let y = match &cell.kind {
            CellKind::Buf => a(),
            CellKind::Not => a().iter().map(|v| !v).collect(),
            CellKind::And => zip_with(&a(), &b(), |x, y| x & y),
            CellKind::Or => zip_with(&a(), &b(), |x, y| x | y),
            CellKind::Xor => zip_with(&a(), &b(), |x, y| x ^ y),
            CellKind::Xnor => zip_with(&a(), &b(), |x, y| !(x ^ y)),
            CellKind::Mux => {
                if self.port(cell, "S").first().copied().unwrap_or(false) {
                    b()
                } else {
                    a()
                }
            }
            CellKind::ReduceAnd => {
                let a = self.port(cell, "A");
                resize(vec![!a.is_empty() && a.iter().all(|v| *v)], y_width)
            }
            CellKind::ReduceOr => resize(vec![self.port(cell, "A").iter().any(|v| *v)], y_width),
            CellKind::ReduceXor => resize(
                vec![self.port(cell, "A").iter().fold(false, |acc, v| acc ^ v)],
                y_width,
            ),
            CellKind::LogicNot => resize(vec![!self.port(cell, "A").iter().any(|v| *v)], y_width),
            CellKind::LogicAnd => resize(
                vec![
                    self.port(cell, "A").iter().any(|v| *v)
                        && self.port(cell, "B").iter().any(|v| *v),
                ],
                y_width,
            ),
            CellKind::LogicOr => resize(
                vec![
                    self.port(cell, "A").iter().any(|v| *v)
                        || self.port(cell, "B").iter().any(|v| *v),
                ],
                y_width,
            ),
            CellKind::Eq | CellKind::Ne => {
                let (a, b) = (self.port(cell, "A"), self.port(cell, "B"));
                let width = a.len().max(b.len());
                let equal = resize(a, width) == resize(b, width);
                resize(vec![equal == matches!(cell.kind, CellKind::Eq)], y_width)
            }
            CellKind::Add => {
                let (a, b) = (a(), b());
                let mut carry = false;
                a.iter()
                    .zip(&b)
                    .map(|(x, y)| {
                        let sum = x ^ y ^ carry;
                        carry = (x & y) | (carry & (x ^ y));
                        sum
                    })
                    .collect()
            }
            CellKind::Fa => {
                let (a, b, c) = (self.port(cell, "A"), self.port(cell, "B"), self.port(cell, "C"));
                let x = a
                    .iter()
                    .zip(&b)
                    .zip(&c)
                    .map(|((a, b), c)| (a & b) | (a & c) | (b & c))
                    .collect();
                let y = a.iter().zip(&b).zip(&c).map(|((a, b), c)| a ^ b ^ c).collect();
                return Ok(vec![("X", x), ("Y", y)]);
            }
            kind if kind.is_sequential() => {
                return Ok(vec![("Q", self.sequential_output(id, cell))]);
            }
            other => {
                return Err(SimError::Unsupported {
                    cell: cell.name().to_owned(),
                    kind: other.to_string(),
                });
            }
        };
        Ok(vec![("Y", y)])
    }

    /// Current `Q` of a flip-flop or latch, applying asynchronous resets and
    /// latch transparency to the stored state.
    fn sequential_output(&mut self, id: CellId, cell: &Cell) -> Vec<bool> {
        let width = self.state.get(&id).map_or(0, Vec::len);
        let arst = matches!(cell.kind, CellKind::Adff | CellKind::Adffe | CellKind::Adlatch)
            && self.active(cell, "ARST", "ARST_POLARITY");
        let value = if arst {
            int_bits(cell.param_int("ARST_VALUE", 0), width)
        } else if cell.kind.is_latch() && self.active(cell, "EN", "EN_POLARITY") {
            resize(self.port(cell, "D"), width)
        } else {
            return self.state.get(&id).cloned().unwrap_or_default();
        };
        self.state.insert(id, value.clone());
        value
    }

    /// State a flip-flop takes on the next active clock edge.
    fn next_state(&self, id: CellId, cell: &Cell) -> Vec<bool> {
        let current = self.state.get(&id).cloned().unwrap_or_default();
        let width = current.len();
        let d = resize(self.port(cell, "D"), width);
        let en = || self.active(cell, "EN", "EN_POLARITY");
        let srst = || self.active(cell, "SRST", "SRST_POLARITY");
        let arst = || self.active(cell, "ARST", "ARST_POLARITY");
        let srst_value = || int_bits(cell.param_int("SRST_VALUE", 0), width);
        let arst_value = || int_bits(cell.param_int("ARST_VALUE", 0), width);
        match cell.kind {
            CellKind::Dff => d,
            CellKind::Dffe => {
                if en() { d } else { current }
            }
            CellKind::Adff => {
                if arst() { arst_value() } else { d }
            }
            CellKind::Adffe => {
                if arst() {
                    arst_value()
                } else if en() {
                    d
                } else {
                    current
                }
            }
            CellKind::Sdff => {
                if srst() { srst_value() } else { d }
            }
            CellKind::Sdffe => {
                if srst() {
                    srst_value()
                } else if en() {
                    d
                } else {
                    current
                }
            }
            CellKind::Sdffce => {
                if !en() {
                    current
                } else if srst() {
                    srst_value()
                } else {
                    d
                }
            }
            _ => current,
        }
    }
}

/// Zero-extends or truncates to `width`.
fn resize(mut bits: Vec<bool>, width: usize) -> Vec<bool> {
    bits.resize(width, false);
    bits
}

fn zip_with(a: &[bool], b: &[bool], f: impl Fn(bool, bool) -> bool) -> Vec<bool> {
    a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect()
}

/// The low `width` bits of `value`.
fn int_bits(value: i64, width: usize) -> Vec<bool> {
    (0..width).map(|i| i < 64 && (value >> i) & 1 == 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::PortDirection;

    fn half_adder() -> Module {
        let mut m = Module::new("ha");
        let a = m.add_port("a", 1, PortDirection::Input).unwrap();
        let b = m.add_port("b", 1, PortDirection::Input).unwrap();
        let s = m.add_port("s", 1, PortDirection::Output).unwrap();
        let c = m.add_port("c", 1, PortDirection::Output).unwrap();
        let (sa, sb) = (m.sig(a), m.sig(b));
        let (_, x) = m.add_xor(sa.clone(), sb.clone()).unwrap();
        let (_, y) = m.add_and(sa, sb).unwrap();
        m.connect(m.sig(s), x).unwrap();
        m.connect(m.sig(c), y).unwrap();
        m
    }

    #[test]
    fn half_adder_truth_table() {
        let m = half_adder();
        let mut sim = Simulator::new(&m).unwrap();
        for (a, b) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            sim.set("a", a).unwrap();
            sim.set("b", b).unwrap();
            sim.settle().unwrap();
            assert_eq!(sim.get("s").unwrap(), a ^ b);
            assert_eq!(sim.get("c").unwrap(), a & b);
        }
    }

    #[test]
    fn two_drivers_are_rejected() {
        let mut m = half_adder();
        let s = m.sig_by_name("s").unwrap();
        let a = m.sig_by_name("a").unwrap();
        m.add_unary(CellKind::Buf, a, s);
        assert!(matches!(
            Simulator::new(&m),
            Err(SimError::MultipleDrivers { count: 2, .. })
        ));
    }

    #[test]
    fn ring_oscillator_never_settles() {
        let mut m = Module::new("ring");
        let w = m.add_wire("w", 1).unwrap();
        let sig = m.sig(w);
        m.add_unary(CellKind::Not, sig.clone(), sig);
        let mut sim = Simulator::new(&m).unwrap();
        assert!(matches!(sim.settle(), Err(SimError::CombinationalLoop { .. })));
    }

    #[test]
    fn dff_captures_on_clock() {
        let mut m = Module::new("reg");
        let clk = m.add_port("clk", 1, PortDirection::Input).unwrap();
        let d = m.add_port("d", 2, PortDirection::Input).unwrap();
        let q = m.add_port("q", 2, PortDirection::Output).unwrap();
        let (clk, d, q) = (m.sig(clk), m.sig(d), m.sig(q));
        m.add_dff("r", clk, d, q).unwrap();
        let mut sim = Simulator::new(&m).unwrap();
        sim.set("d", 2).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get("q").unwrap(), 0);
        sim.clock().unwrap();
        assert_eq!(sim.get("q").unwrap(), 2);
    }
}
