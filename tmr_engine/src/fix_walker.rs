//! Post-replication wire repair.
//!
//! Replica cells start with the same port bindings as their original, so
//! after replication a net driven by the original cell is driven three times
//! over. Fix walkers find such nets and split them so that each copy drives,
//! and is consumed from, its own net.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use tmr_common::annotations;
use tmr_common::{AttrMap, CellId, Module, PortDirection, SigBit, SigMap, WireId};
use tracing::{debug, warn};

use crate::TmrError;

/// Nets a walker touched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    /// Nets that were split into per-replica nets.
    pub repaired: Vec<String>,
    /// Nets that looked repairable but were left alone.
    pub skipped: Vec<String>,
}

impl FixOutcome {
    /// Appends `other` to this outcome.
    pub fn merge(&mut self, other: Self) {
        self.repaired.extend(other.repaired);
        self.skipped.extend(other.skipped);
    }
}

/// A netlist repair strategy run after every cone is wired.
pub trait FixWalker {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Repairs `module` in place.
    ///
    /// # Errors
    /// Fatal repair failures.
    fn fix(&self, module: &mut Module) -> Result<FixOutcome, TmrError>;
}

/// Runs a list of walkers in order.
pub struct FixWalkerManager {
    /// Walkers in run order.
    walkers: Vec<Box<dyn FixWalker>>,
}

impl Default for FixWalkerManager {
    fn default() -> Self {
        Self::new().with(MultiDriverFixer)
    }
}

impl FixWalkerManager {
    /// A manager with no walkers.
    pub fn new() -> Self {
        Self { walkers: Vec::new() }
    }

    /// Adds `walker` to the end of the list.
    #[must_use]
    pub fn with(mut self, walker: impl FixWalker + 'static) -> Self {
        self.walkers.push(Box::new(walker));
        self
    }

    /// Number of registered walkers.
    pub fn len(&self) -> usize {
        self.walkers.len()
    }

    /// Whether no walker is registered.
    pub fn is_empty(&self) -> bool {
        self.walkers.is_empty()
    }

    /// Runs every walker over `module`.
    ///
    /// # Errors
    /// Stops at the first walker that fails.
    pub fn run(&self, module: &mut Module) -> Result<FixOutcome, TmrError> {
        let mut outcome = FixOutcome::default();
        for walker in &self.walkers {
            let step = walker.fix(module)?;
            debug!(
                "fix walker '{}': {} repaired, {} skipped",
                walker.name(),
                step.repaired.len(),
                step.skipped.len()
            );
            outcome.merge(step);
        }
        Ok(outcome)
    }
}

/// One bit of one cell port.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PortBit {
    /// The cell.
    cell: CellId,
    /// Port name.
    port: String,
    /// Bit position within the port.
    index: usize,
}

/// Driver and consumer port bits per canonical net bit.
#[derive(Debug, Default)]
struct BitUsage {
    /// Output port bits per net bit.
    drivers: IndexMap<SigBit, Vec<PortBit>>,
    /// Input and inout port bits per net bit.
    consumers: IndexMap<SigBit, Vec<PortBit>>,
}

impl BitUsage {
    /// Scans every cell port of `module`.
    fn collect(module: &Module, sigmap: &SigMap) -> Self {
        let mut usage = Self::default();
        for (cell, c) in module.cells() {
            for (port, dir, sig) in c.ports_with_direction() {
                for (index, bit) in sig.iter().enumerate() {
                    let bit = sigmap.find(*bit);
                    if bit.is_const() {
                        continue;
                    }
                    let slot = match dir {
                        PortDirection::Output => &mut usage.drivers,
                        PortDirection::Input | PortDirection::Inout => &mut usage.consumers,
                    };
                    slot.entry(bit).or_default().push(PortBit {
                        cell,
                        port: port.to_owned(),
                        index,
                    });
                }
            }
        }
        usage
    }
}

/// Replica index of an object: 0 for originals.
fn replica_index(attrs: &AttrMap) -> i64 {
    attrs.get_int(annotations::REPLICA).unwrap_or(0)
}

/// Orders `sources` as original, replica 1, replica 2 if they are exactly
/// the three copies of one cone-tagged cell.
fn replica_family(module: &Module, sources: &[PortBit]) -> Option<[PortBit; 3]> {
    let mut slots: [Option<PortBit>; 3] = Default::default();
    let mut family: Option<&str> = None;
    for source in sources {
        let cell = module.cell(source.cell);
        if !cell.attributes.has(annotations::CONE) {
            return None;
        }
        let (k, root) = match replica_index(&cell.attributes) {
            0 => (0, cell.name()),
            k @ 1..=2 => (k as usize, cell.attributes.get_str(annotations::REPLICA_OF)?),
            _ => return None,
        };
        if *family.get_or_insert(root) != root || slots[k].replace(source.clone()).is_some() {
            return None;
        }
    }
    let [Some(original), Some(first), Some(second)] = slots else {
        return None;
    };
    Some([original, first, second])
}

/// Splits nets driven by an original cell and both of its replicas.
///
/// For every such net, replica `k` is rebound to the net's own replica `k`
/// (or to a fresh tagged net if the net was never replicated), along with
/// every consumer that is replica `k`. Original consumers stay on the
/// original net, and a port net stays driven by the original copy. A net
/// with a consumer that is not cone-tagged is skipped with a warning, since
/// that consumer cannot be assigned a copy.
#[derive(Clone, Copy, Debug, Default)]
pub struct MultiDriverFixer;

impl FixWalker for MultiDriverFixer {
    fn name(&self) -> &'static str {
        "multi_driver"
    }

    fn fix(&self, module: &mut Module) -> Result<FixOutcome, TmrError> {
        let sigmap = SigMap::new(module);
        let usage = BitUsage::collect(module, &sigmap);

        let mut replica_wires: HashMap<(String, i64), WireId> = module
            .wires()
            .filter_map(|(id, w)| {
                let of = w.attributes.get_str(annotations::REPLICA_OF)?;
                Some(((of.to_owned(), replica_index(&w.attributes)), id))
            })
            .collect();

        let mut outcome = FixOutcome::default();
        for (bit, sources) in &usage.drivers {
            if sources.len() != 3 {
                continue;
            }
            let Some((wire, offset)) = bit.as_wire() else {
                continue;
            };
            let net = module.bit_name(*bit);
            let Some(family) = replica_family(module, sources) else {
                if sources
                    .iter()
                    .any(|s| module.cell(s.cell).attributes.has(annotations::CONE))
                {
                    warn!(
                        "net '{net}' has three drivers that are not one replica family; leaving it"
                    );
                    outcome.skipped.push(net);
                }
                continue;
            };

            let sinks = usage.consumers.get(bit).map_or(&[][..], Vec::as_slice);
            if let Some(sink) = sinks
                .iter()
                .find(|s| !module.cell(s.cell).attributes.has(annotations::CONE))
            {
                warn!(
                    "net '{net}' feeds '{}', which is not triplicated; \
                     leaving the net with three drivers",
                    module.cell(sink.cell).name()
                );
                outcome.skipped.push(net);
                continue;
            }

            let wire_name = module.wire(wire).name().to_owned();
            for k in 1..=2i64 {
                let target = match replica_wires.get(&(wire_name.clone(), k)) {
                    Some(target) => *target,
                    None => {
                        let width = module.wire(wire).width;
                        let fresh = module.fresh_wire(&format!("{wire_name}_replica{k}"), width);
                        let attrs = &mut module.wire_mut(fresh).attributes;
                        attrs.set_int(annotations::REPLICA, k);
                        attrs.set_str(annotations::REPLICA_OF, wire_name.as_str());
                        replica_wires.insert((wire_name.clone(), k), fresh);
                        fresh
                    }
                };
                let new_bit = SigBit::wire(target, offset);
                let driver = &family[k as usize];
                module.cell_mut(driver.cell).rebind_bit(&driver.port, driver.index, new_bit);
                for sink in sinks {
                    if replica_index(&module.cell(sink.cell).attributes) == k {
                        module.cell_mut(sink.cell).rebind_bit(&sink.port, sink.index, new_bit);
                    }
                }
            }
            debug!("split net '{net}' across its three copies");
            outcome.repaired.push(net);
        }
        Ok(outcome)
    }
}

/// Nets that still have more than one driver among cone-tagged and voter cells.
pub fn find_multi_driven(module: &Module) -> Vec<String> {
    let sigmap = SigMap::new(module);
    let usage = BitUsage::collect(module, &sigmap);
    usage
        .drivers
        .iter()
        .filter(|(_, sources)| {
            sources
                .iter()
                .filter(|s| {
                    let attrs = &module.cell(s.cell).attributes;
                    attrs.has(annotations::CONE) || attrs.has(annotations::VOTER)
                })
                .count()
                > 1
        })
        .map(|(bit, _)| module.bit_name(*bit))
        .collect()
}

#[cfg(test)]
mod tests {
    use tmr_common::{CellKind, PortDirection};

    use super::*;

    /// `a -> g -> t -> h -> o` with `g` and `h` triplicated by hand.
    fn triplicated_chain(tag_consumers: bool) -> Module {
        let mut m = Module::new("chain");
        let a = m.add_port("a", 1, PortDirection::Input).unwrap();
        let o = m.add_port("o", 1, PortDirection::Output).unwrap();
        let t = m.add_wire("t", 1).unwrap();
        let (a, o, t) = (m.sig(a), m.sig(o), m.sig(t));
        let g = m.add_unary(CellKind::Not, a, t.clone());
        let h = m.add_unary(CellKind::Not, t, o);
        let mut tagged = vec![(g, "g")];
        if tag_consumers {
            tagged.push((h, "h"));
        }
        for (cell, name) in tagged {
            m.cell_mut(cell).attributes.set_int(annotations::CONE, 0);
            let original = m.cell(cell).name().to_owned();
            for k in 1..=2 {
                let r = m.add_cell_like(cell, format!("{name}_r{k}")).unwrap();
                let attrs = &mut m.cell_mut(r).attributes;
                attrs.set_int(annotations::REPLICA, k);
                attrs.set_str(annotations::REPLICA_OF, original.as_str());
            }
        }
        m
    }

    #[test]
    fn triple_driven_net_is_split() {
        let mut m = triplicated_chain(true);
        assert_eq!(find_multi_driven(&m), vec!["t", "o"]);
        let outcome = MultiDriverFixer.fix(&mut m).unwrap();
        assert_eq!(outcome.repaired, vec!["t", "o"]);
        assert!(find_multi_driven(&m).is_empty());

        let (t1, _) = m
            .wires()
            .find(|(_, w)| {
                w.attributes.get_str(annotations::REPLICA_OF) == Some("t")
                    && w.attributes.get_int(annotations::REPLICA) == Some(1)
            })
            .unwrap();
        let t1 = m.sig(t1);
        assert_eq!(m.cell(m.cell_by_name("g_r1").unwrap()).port("Y"), Some(&t1));
        assert_eq!(m.cell(m.cell_by_name("h_r1").unwrap()).port("A"), Some(&t1));
        let t = m.sig_by_name("t").unwrap();
        assert_ne!(m.cell(m.cell_by_name("h_r2").unwrap()).port("A"), Some(&t));
    }

    #[test]
    fn output_port_keeps_the_original_driver() {
        let mut m = triplicated_chain(true);
        MultiDriverFixer.fix(&mut m).unwrap();
        let o = m.sig_by_name("o").unwrap();
        let drivers: Vec<&str> = m
            .cells()
            .filter(|(_, c)| c.port("Y") == Some(&o))
            .map(|(_, c)| c.name())
            .collect();
        assert_eq!(drivers.len(), 1);
        assert!(!m.cell(m.cell_by_name(drivers[0]).unwrap()).attributes.has(annotations::REPLICA));
        for name in ["h_r1", "h_r2"] {
            let y = m.cell(m.cell_by_name(name).unwrap()).port("Y").unwrap();
            assert_ne!(y, &o, "{name} still drives the port");
        }
    }

    #[test]
    fn untagged_consumer_is_skipped() {
        let mut m = triplicated_chain(false);
        let outcome = MultiDriverFixer.fix(&mut m).unwrap();
        assert!(outcome.repaired.is_empty());
        assert_eq!(outcome.skipped, vec!["t"]);
        assert_eq!(find_multi_driven(&m), vec!["t"]);
    }

    #[test]
    fn manager_runs_registered_walkers() {
        let manager = FixWalkerManager::default();
        assert_eq!(manager.len(), 1);
        let mut m = triplicated_chain(true);
        assert_eq!(manager.run(&mut m).unwrap().repaired.len(), 2);
        assert!(FixWalkerManager::new().run(&mut m).unwrap().repaired.is_empty());
    }
}
