//! Connectivity index over the objects annotated for triplication.

mod attachments;
mod connectivity_graph;

pub use attachments::{Attachment, AttachmentRole, AttachmentSite, AttachmentTable};
pub use connectivity_graph::ConnectivityGraph;

use std::collections::HashSet;
use std::time::Instant;

use tmr_common::annotations;
use tmr_common::{AttrMap, Module, PortDirection, WireId};
use tracing::info;

use crate::NodeRef;

/// Drive relation and original signal attachments of one module, captured
/// once before any mutation.
///
/// Only eligible objects are indexed: they carry `tamara_triplicate`, and carry
/// none of `tamara_ignore`, `tamara_replica` or `tamara_voter`. Objects created later
/// (replicas, voters, repair nets) are never added.
#[derive(Clone, Debug, Default)]
pub struct ConnectivityIndex {
    /// Who drives whom.
    graph: ConnectivityGraph,
    /// Original signal expressions per wire.
    attachments: AttachmentTable,
    /// Every indexed object.
    indexed: HashSet<NodeRef>,
}

impl ConnectivityIndex {
    /// Whether an object with these attributes takes part in triplication.
    pub fn is_eligible(attrs: &AttrMap) -> bool {
        attrs.is_set(annotations::TRIPLICATE)
            && !attrs.is_set(annotations::IGNORE)
            && !attrs.has(annotations::REPLICA)
            && !attrs.has(annotations::VOTER)
    }

    /// Indexes `module`.
    pub fn build(module: &Module) -> Self {
        let start = Instant::now();

        let mut indexed = HashSet::new();
        indexed.extend(
            module
                .wires()
                .filter(|(_, w)| Self::is_eligible(&w.attributes))
                .map(|(id, _)| NodeRef::Wire(id)),
        );
        indexed.extend(
            module
                .cells()
                .filter(|(_, c)| Self::is_eligible(&c.attributes))
                .map(|(id, _)| NodeRef::Cell(id)),
        );

        let mut graph = ConnectivityGraph::default();
        let mut attachments = AttachmentTable::default();

        for (cell_id, cell) in module.cells() {
            let cell_ref = NodeRef::Cell(cell_id);
            if !indexed.contains(&cell_ref) {
                continue;
            }
            for (port, dir, sig) in cell.ports_with_direction() {
                for wire in sig.wires() {
                    let wire_ref = NodeRef::Wire(wire);
                    if !indexed.contains(&wire_ref) {
                        continue;
                    }
                    let role = if dir == PortDirection::Output {
                        graph.add_edge(cell_ref, wire_ref);
                        AttachmentRole::Source
                    } else {
                        graph.add_edge(wire_ref, cell_ref);
                        AttachmentRole::Sink
                    };
                    attachments.push(
                        wire,
                        Attachment {
                            site: AttachmentSite::CellPort {
                                cell: cell_id,
                                port: port.to_owned(),
                            },
                            role,
                            sig: sig.clone(),
                        },
                    );
                }
            }
        }

        for (index, (lhs, rhs)) in module.connections().iter().enumerate() {
            for (l, r) in lhs.iter().zip(rhs.iter()) {
                if let (Some((driven, _)), Some((driver, _))) = (l.as_wire(), r.as_wire()) {
                    let (driven, driver) = (NodeRef::Wire(driven), NodeRef::Wire(driver));
                    if driven != driver && indexed.contains(&driven) && indexed.contains(&driver) {
                        graph.add_edge(driver, driven);
                    }
                }
            }
            for (sig, role) in [(lhs, AttachmentRole::Source), (rhs, AttachmentRole::Sink)] {
                for wire in sig.wires() {
                    if indexed.contains(&NodeRef::Wire(wire)) {
                        attachments.push(
                            wire,
                            Attachment {
                                site: AttachmentSite::Connection { index },
                                role,
                                sig: sig.clone(),
                            },
                        );
                    }
                }
            }
        }

        info!(
            "connectivity index for '{}': {} objects, {} drive edges ({:?})",
            module.name(),
            indexed.len(),
            graph.edge_count(),
            start.elapsed()
        );

        Self {
            graph,
            attachments,
            indexed,
        }
    }

    /// Whether `node` is indexed.
    pub fn contains(&self, node: NodeRef) -> bool {
        self.indexed.contains(&node)
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.indexed.len()
    }

    /// Whether nothing in the module is eligible.
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty()
    }

    /// Indexed objects that drive `node` ("what drives me").
    pub fn drivers(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.graph.drivers(node)
    }

    /// Indexed objects driven by `node`.
    pub fn consumers(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.graph.consumers(node)
    }

    /// Whether any indexed object drives `node`.
    pub fn has_drivers(&self, node: NodeRef) -> bool {
        self.graph.driver_count(node) > 0
    }

    /// Original signal expressions `wire` took part in.
    pub fn attachments(&self, wire: WireId) -> &[Attachment] {
        self.attachments.get(wire)
    }

    /// Number of original expressions that drive `wire`.
    pub fn source_count(&self, wire: WireId) -> usize {
        self.attachments.source_count(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmr_common::{Design, not_dff};

    fn indexed_not_dff() -> (Module, ConnectivityIndex) {
        let mut design = Design::from(not_dff().unwrap());
        crate::propagate(&mut design);
        let module = design.module("not_dff_tmr").unwrap().clone();
        let index = ConnectivityIndex::build(&module);
        (module, index)
    }

    #[test]
    fn wire_drivers_are_cells() {
        let (m, index) = indexed_not_dff();
        let ff = NodeRef::Wire(m.wire_by_name("ff").unwrap());
        let reg = NodeRef::Cell(m.cell_by_name("ff_reg").unwrap());
        let inv = NodeRef::Cell(m.cell_by_name("inv").unwrap());
        assert_eq!(index.drivers(ff).collect::<Vec<_>>(), vec![reg]);
        assert_eq!(index.consumers(ff).collect::<Vec<_>>(), vec![inv]);
        assert_eq!(index.drivers(inv).collect::<Vec<_>>(), vec![ff]);
    }

    #[test]
    fn inputs_have_no_drivers() {
        let (m, index) = indexed_not_dff();
        let a = NodeRef::Wire(m.wire_by_name("a").unwrap());
        assert!(index.contains(a));
        assert!(!index.has_drivers(a));
    }

    #[test]
    fn attachments_record_original_ports() {
        let (m, index) = indexed_not_dff();
        let o = m.wire_by_name("o").unwrap();
        let attachments = index.attachments(o);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].role, AttachmentRole::Source);
        assert_eq!(index.source_count(o), 1);
    }

    #[test]
    fn unannotated_modules_index_nothing() {
        let index = ConnectivityIndex::build(&not_dff().unwrap());
        assert!(index.is_empty());
    }
}
