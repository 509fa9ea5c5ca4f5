use indexmap::{IndexMap, IndexSet};

use crate::NodeRef;

type DriveMap = IndexMap<NodeRef, IndexSet<NodeRef>>;

/// Bidirectional drive relation between cells and wires.
#[derive(Clone, Debug, Default)]
pub struct ConnectivityGraph {
    /// Maps each object to the objects that drive it.
    drivers: DriveMap,
    /// Maps each object to the objects it drives.
    consumers: DriveMap,
}

impl ConnectivityGraph {
    /// Records that `driver` drives `driven`.
    pub fn add_edge(&mut self, driver: NodeRef, driven: NodeRef) {
        self.drivers.entry(driven).or_default().insert(driver);
        self.consumers.entry(driver).or_default().insert(driven);
    }

    /// Objects driving `node`, in insertion order.
    pub fn drivers(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.drivers.get(&node).into_iter().flatten().copied()
    }

    /// Objects driven by `node`, in insertion order.
    pub fn consumers(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.consumers.get(&node).into_iter().flatten().copied()
    }

    /// Number of objects driving `node`.
    pub fn driver_count(&self, node: NodeRef) -> usize {
        self.drivers.get(&node).map_or(0, IndexSet::len)
    }

    /// Number of drive edges.
    pub fn edge_count(&self) -> usize {
        self.drivers.values().map(IndexSet::len).sum()
    }
}
