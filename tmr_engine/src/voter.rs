//! Majority voters and error aggregation.
//!
//! Each voter bit computes
//!
//! ```text
//! out = (a & b) | (b & c) | (a & c)
//! err = (!a & c) | (a & !b) | (b & !c)
//! ```
//!
//! `err` is high exactly when the three copies disagree. Per-bit errors of a
//! wide voter are reduced with `$reduce_or`, and [`VoterBuilder::finalise`]
//! ORs every voter's error into the module's error sink.

use tmr_common::annotations;
use tmr_common::{CellId, CellKind, Module, SigBit, SigSpec};
use tracing::{debug, info};

use crate::TmrError;

/// Builds voters in one module and collects their error outputs.
#[derive(Debug, Default)]
pub struct VoterBuilder {
    /// One 1-bit error signal per voter, in creation order.
    errors: Vec<SigSpec>,
}

impl VoterBuilder {
    /// A builder with no voters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of voters built.
    pub fn voter_count(&self) -> usize {
        self.errors.len()
    }

    /// Error outputs collected so far.
    pub fn error_signals(&self) -> &[SigSpec] {
        &self.errors
    }

    /// Inserts a voter driving `out` from the three copies `a`, `b` and `c`.
    ///
    /// Returns the voter's 1-bit error signal, which is also retained for
    /// [`finalise`](Self::finalise).
    ///
    /// # Errors
    /// [`TmrError::VoterWidth`] if the four signals differ in width.
    pub fn build(
        &mut self,
        module: &mut Module,
        a: &SigSpec,
        b: &SigSpec,
        c: &SigSpec,
        out: &SigSpec,
    ) -> Result<SigSpec, TmrError> {
        let width = out.width();
        if a.width() != width || b.width() != width || c.width() != width {
            return Err(TmrError::VoterWidth {
                a: a.width(),
                b: b.width(),
                c: c.width(),
                out: width,
            });
        }

        let mut cells = Vec::new();
        let mut err_bits = SigSpec::new();
        for (((a, b), c), out) in a.iter().zip(b.iter()).zip(c.iter()).zip(out.iter()) {
            let err = majority_bit(module, *a, *b, *c, *out, &mut cells)?;
            err_bits.append(&err);
        }

        let error = if width > 1 {
            let (cell, y) = module.add_reduce_or(err_bits);
            cells.push(cell);
            y
        } else {
            err_bits
        };

        let voter = i64::try_from(self.errors.len()).unwrap_or(i64::MAX);
        for cell in &cells {
            module.cell_mut(*cell).attributes.set_int(annotations::VOTER, voter);
        }
        for wire in error.wires() {
            module.wire_mut(wire).attributes.set_int(annotations::VOTER, voter);
        }
        debug!("voter {voter}: {width} bit(s), {} cell(s)", cells.len());

        self.errors.push(error.clone());
        Ok(error)
    }

    /// ORs every collected error signal into the 1-bit `err` sink.
    ///
    /// A single voter's error is connected to the sink directly; otherwise a
    /// chain of two-input ORs is built whose last gate drives the sink.
    ///
    /// # Errors
    /// - [`TmrError::ErrorSinkWidth`] if `err` is not a single bit.
    /// - [`TmrError::NoVoters`] if no voter was built.
    pub fn finalise(self, module: &mut Module, err: &SigSpec) -> Result<(), TmrError> {
        if err.width() != 1 {
            return Err(TmrError::ErrorSinkWidth { width: err.width() });
        }
        match self.errors.as_slice() {
            [] => return Err(TmrError::NoVoters),
            [single] => module.connect(err.clone(), single.clone())?,
            [first, middle @ .., last] => {
                let mut acc = first.clone();
                for next in middle {
                    let (cell, y) = module.add_or(acc, next.clone())?;
                    module
                        .cell_mut(cell)
                        .attributes
                        .set_str(annotations::VOTER, "error_chain");
                    acc = y;
                }
                let cell = module.add_binary(CellKind::Or, acc, last.clone(), err.clone());
                module
                    .cell_mut(cell)
                    .attributes
                    .set_str(annotations::VOTER, "error_chain");
            }
        }
        info!(
            "aggregated {} voter error signal(s) into '{}'",
            self.errors.len(),
            err.iter()
                .next()
                .map_or_else(String::new, |bit| module.bit_name(*bit))
        );
        Ok(())
    }
}

/// Builds one voter bit and returns its error bit.
fn majority_bit(
    module: &mut Module,
    a: SigBit,
    b: SigBit,
    c: SigBit,
    out: SigBit,
    cells: &mut Vec<CellId>,
) -> Result<SigSpec, TmrError> {
    let [a, b, c, out] = [a, b, c, out].map(SigSpec::from_bit);

    let (and_ab, ab) = module.add_and(a.clone(), b.clone())?;
    let (and_bc, bc) = module.add_and(b.clone(), c.clone())?;
    let (and_ac, ac) = module.add_and(a.clone(), c.clone())?;
    let (or_pair, ab_bc) = module.add_or(ab, bc)?;
    let or_out = module.add_binary(CellKind::Or, ab_bc, ac, out);

    let (not_a, na) = module.add_not(a.clone());
    let (not_b, nb) = module.add_not(b.clone());
    let (not_c, nc) = module.add_not(c.clone());
    let (and_nac, t1) = module.add_and(na, c)?;
    let (and_anb, t2) = module.add_and(a, nb)?;
    let (and_bnc, t3) = module.add_and(b, nc)?;
    let (or_t12, t12) = module.add_or(t1, t2)?;
    let (or_err, err) = module.add_or(t12, t3)?;

    cells.extend([
        and_ab, and_bc, and_ac, or_pair, or_out, not_a, not_b, not_c, and_nac, and_anb, and_bnc,
        or_t12, or_err,
    ]);
    Ok(err)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tmr_common::sim::Simulator;
    use tmr_common::PortDirection;

    use super::*;

    fn voter_module(width: u32) -> Module {
        let mut m = Module::new("voter");
        for name in ["a", "b", "c"] {
            m.add_port(name, width, PortDirection::Input).unwrap();
        }
        m.add_port("y", width, PortDirection::Output).unwrap();
        m.add_port("err", 1, PortDirection::Output).unwrap();
        let [a, b, c, y, err] = ["a", "b", "c", "y", "err"].map(|n| m.sig_by_name(n).unwrap());
        let mut voters = VoterBuilder::new();
        voters.build(&mut m, &a, &b, &c, &y).unwrap();
        voters.finalise(&mut m, &err).unwrap();
        m
    }

    #[test]
    fn truth_table() {
        let m = voter_module(1);
        m.check().unwrap();
        let mut sim = Simulator::new(&m).unwrap();
        for bits in 0u64..8 {
            let (a, b, c) = (bits & 1, (bits >> 1) & 1, (bits >> 2) & 1);
            sim.set("a", a).unwrap();
            sim.set("b", b).unwrap();
            sim.set("c", c).unwrap();
            sim.settle().unwrap();
            let expected = u64::from(a + b + c >= 2);
            assert_eq!(sim.get("y").unwrap(), expected, "a={a} b={b} c={c}");
            let disagree = u64::from(!(a == b && b == c));
            assert_eq!(sim.get("err").unwrap(), disagree, "a={a} b={b} c={c}");
        }
    }

    #[test]
    fn wide_voter_reduces_errors() {
        let m = voter_module(4);
        assert_eq!(m.count_cells(&CellKind::ReduceOr), 1);
        let mut sim = Simulator::new(&m).unwrap();
        sim.set("a", 0b1010).unwrap();
        sim.set("b", 0b1010).unwrap();
        sim.set("c", 0b0110).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get("y").unwrap(), 0b1010);
        assert_eq!(sim.get("err").unwrap(), 1);
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut m = Module::new("bad");
        let a = m.add_wire("a", 2).unwrap();
        let y = m.add_wire("y", 1).unwrap();
        let (a, y) = (m.sig(a), m.sig(y));
        let err = VoterBuilder::new().build(&mut m, &a, &a, &a, &y);
        assert!(matches!(err, Err(TmrError::VoterWidth { a: 2, out: 1, .. })));
    }

    #[test]
    fn finalise_without_voters_fails() {
        let mut m = Module::new("empty");
        let err = m.add_wire("err", 1).unwrap();
        let err = m.sig(err);
        assert!(matches!(
            VoterBuilder::new().finalise(&mut m, &err),
            Err(TmrError::NoVoters)
        ));
    }

    #[test]
    fn error_sink_must_be_one_bit() {
        let mut m = Module::new("wide_sink");
        let err = m.add_wire("err", 2).unwrap();
        let err = m.sig(err);
        assert!(matches!(
            VoterBuilder::new().finalise(&mut m, &err),
            Err(TmrError::ErrorSinkWidth { width: 2 })
        ));
    }

    #[test]
    fn several_voters_are_chained() {
        let mut m = Module::new("chain");
        let sigs: Vec<SigSpec> = (0..3)
            .map(|i| {
                let w = m.add_wire(format!("v{i}"), 1).unwrap();
                m.sig(w)
            })
            .collect();
        let err = m.add_wire("err", 1).unwrap();
        let err = m.sig(err);
        let mut voters = VoterBuilder::new();
        for (i, out) in sigs.iter().enumerate() {
            let ins: Vec<SigSpec> = (0..3)
                .map(|k| {
                    let w = m.add_wire(format!("in{i}_{k}"), 1).unwrap();
                    m.sig(w)
                })
                .collect();
            voters.build(&mut m, &ins[0], &ins[1], &ins[2], out).unwrap();
        }
        assert_eq!(voters.error_signals().len(), 3);
        assert!(voters.error_signals().iter().all(|e| e.width() == 1));
        let ors_before = m.count_cells(&CellKind::Or);
        voters.finalise(&mut m, &err).unwrap();
        assert_eq!(m.count_cells(&CellKind::Or), ors_before + 2);
        assert!(m.connections().is_empty());
    }

    /// `count` independent 1-bit voters whose errors are chained into `err`.
    fn chained_voters(count: usize) -> Module {
        let mut m = Module::new("chained");
        let mut voters = VoterBuilder::new();
        for i in 0..count {
            let [a, b, c] = ["a", "b", "c"].map(|n| {
                let w = m.add_port(format!("{n}{i}"), 1, PortDirection::Input).unwrap();
                m.sig(w)
            });
            let y = m.add_port(format!("y{i}"), 1, PortDirection::Output).unwrap();
            let y = m.sig(y);
            voters.build(&mut m, &a, &b, &c, &y).unwrap();
        }
        let err = m.add_port("err", 1, PortDirection::Output).unwrap();
        let err = m.sig(err);
        voters.finalise(&mut m, &err).unwrap();
        m
    }

    #[rstest]
    #[case::two(2)]
    #[case::three(3)]
    #[case::five(5)]
    fn any_disagreeing_voter_raises_the_chained_error(#[case] count: usize) {
        let m = chained_voters(count);
        m.check().unwrap();
        let mut sim = Simulator::new(&m).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get("err").unwrap(), 0);

        for i in 0..count {
            for input in ["a", "b", "c"] {
                let name = format!("{input}{i}");
                sim.set(&name, 1).unwrap();
                sim.settle().unwrap();
                assert_eq!(sim.get("err").unwrap(), 1, "{name} alone disagrees");
                assert_eq!(sim.get(&format!("y{i}")).unwrap(), 0, "{name} is outvoted");
                sim.set(&name, 0).unwrap();
            }
        }
        sim.settle().unwrap();
        assert_eq!(sim.get("err").unwrap(), 0);
    }
}
