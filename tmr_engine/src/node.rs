//! Graph nodes: netlist objects wrapped with their role in a cone.

use std::fmt;

use contracts::*;
use tmr_common::annotations;
use tmr_common::{AttrMap, CellId, Module, WireId};
use tracing::{debug, warn};

use crate::{ConeId, ConnectivityIndex, TmrError};

/// Identity of a netlist object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    /// A cell.
    Cell(CellId),
    /// A wire.
    Wire(WireId),
}

impl NodeRef {
    /// Name of the object.
    pub fn name(self, module: &Module) -> &str {
        match self {
            Self::Cell(id) => module.cell(id).name(),
            Self::Wire(id) => module.wire(id).name(),
        }
    }

    /// Attributes of the object.
    pub fn attributes(self, module: &Module) -> &AttrMap {
        match self {
            Self::Cell(id) => &module.cell(id).attributes,
            Self::Wire(id) => &module.wire(id).attributes,
        }
    }

    /// Mutable attributes of the object.
    pub fn attributes_mut(self, module: &mut Module) -> &mut AttrMap {
        match self {
            Self::Cell(id) => &mut module.cell_mut(id).attributes,
            Self::Wire(id) => &mut module.wire_mut(id).attributes,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(id) => write!(f, "{id}"),
            Self::Wire(id) => write!(f, "{id}"),
        }
    }
}

/// Role of a netlist object inside a cone search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A cell outside the flip-flop/latch family.
    Combinational(CellId),
    /// A flip-flop or latch: an opaque state boundary.
    Sequential(CellId),
    /// An internal wire with at least one indexed driver.
    Net(WireId),
    /// A module port, or a wire with no indexed driver.
    Boundary(WireId),
}

impl NodeKind {
    /// Wraps `object` with the variant matching its type and connectivity.
    pub fn classify(object: NodeRef, module: &Module, index: &ConnectivityIndex) -> Self {
        match object {
            NodeRef::Cell(id) if module.cell(id).kind.is_sequential() => Self::Sequential(id),
            NodeRef::Cell(id) => Self::Combinational(id),
            NodeRef::Wire(id) if module.wire(id).is_port() || !index.has_drivers(object) => {
                Self::Boundary(id)
            }
            NodeRef::Wire(id) => Self::Net(id),
        }
    }

    /// The wrapped object.
    pub const fn object(self) -> NodeRef {
        match self {
            Self::Combinational(id) | Self::Sequential(id) => NodeRef::Cell(id),
            Self::Net(id) | Self::Boundary(id) => NodeRef::Wire(id),
        }
    }

    /// Whether backward search stops here.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sequential(_) | Self::Boundary(_))
    }

    /// Short variant name for diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Combinational(_) => "combinational",
            Self::Sequential(_) => "sequential",
            Self::Net(_) => "net",
            Self::Boundary(_) => "boundary",
        }
    }
}

/// Opaque handle of a node inside a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
    /// Position in the arena.
    inner: u32,
}

impl NodeHandle {
    /// Returns the handle as a usize for array access.
    #[ensures(ret == self.inner as usize)]
    pub const fn as_usize(self) -> usize {
        self.inner as usize
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.inner)
    }
}

/// A netlist object as seen by one cone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
    /// Variant and wrapped object.
    pub kind: NodeKind,
    /// Owning cone; fixed at creation.
    cone: ConeId,
    /// Replica 1 and replica 2, once replicated.
    replicas: Option<[NodeRef; 2]>,
}

impl GraphNode {
    /// Wraps `kind` for cone `cone`.
    pub const fn new(kind: NodeKind, cone: ConeId) -> Self {
        Self {
            kind,
            cone,
            replicas: None,
        }
    }

    /// The owning cone.
    pub const fn cone(&self) -> ConeId {
        self.cone
    }

    /// The wrapped object.
    pub const fn object(&self) -> NodeRef {
        self.kind.object()
    }

    /// Replica 1 and replica 2, if known.
    pub const fn replicas(&self) -> Option<[NodeRef; 2]> {
        self.replicas
    }

    /// Drivers of this node's object, each wrapped for the same cone.
    pub fn compute_neighbours(&self, module: &Module, index: &ConnectivityIndex) -> Vec<Self> {
        index
            .drivers(self.object())
            .map(|driver| Self::new(NodeKind::classify(driver, module, index), self.cone))
            .collect()
    }

    /// Clones the wrapped object twice and tags all three copies with the cone.
    ///
    /// Boundary nets cannot be replicated. An object that already carries a
    /// cone tag is left alone and the node adopts the replicas found in the
    /// netlist, so repeated calls never create more than two copies.
    ///
    /// # Errors
    /// [`TmrError::ReplicateBoundary`] for boundary nodes, or a netlist error
    /// if a replica name is taken.
    pub fn replicate(&mut self, module: &mut Module) -> Result<(), TmrError> {
        let object = self.object();
        let name = object.name(module).to_owned();
        if let NodeKind::Boundary(_) = self.kind {
            return Err(TmrError::ReplicateBoundary {
                name,
                cone: self.cone,
            });
        }

        if let Some(existing) = object.attributes(module).get_int(annotations::CONE) {
            warn!(
                "'{name}' already belongs to cone {existing}; not replicating it again for cone {}",
                self.cone
            );
            self.adopt_replicas(module);
            return Ok(());
        }

        let cone = i64::from(self.cone.as_u32());
        let mut replicas = [object; 2];
        for (slot, k) in replicas.iter_mut().zip(1u8..=2) {
            let replica_name = annotations::replica_name(&name, k, self.cone.as_u32());
            let replica = match self.kind {
                NodeKind::Combinational(id) | NodeKind::Sequential(id) => {
                    NodeRef::Cell(module.add_cell_like(id, replica_name)?)
                }
                NodeKind::Net(id) | NodeKind::Boundary(id) => {
                    NodeRef::Wire(module.add_wire_like(id, replica_name)?)
                }
            };
            let attrs = replica.attributes_mut(module);
            attrs.set_int(annotations::CONE, cone);
            attrs.set_int(annotations::REPLICA, i64::from(k));
            attrs.set_str(annotations::REPLICA_OF, name.as_str());
            *slot = replica;
        }

        let attrs = object.attributes_mut(module);
        attrs.set_int(annotations::CONE, cone);
        attrs.set_flag(annotations::ORIGINAL);

        debug!("replicated {} '{name}' for cone {}", self.kind.label(), self.cone);
        self.replicas = Some(replicas);
        Ok(())
    }

    /// Whether the wrapped object was already replicated by some cone.
    pub fn is_replicated(&self, module: &Module) -> bool {
        self.object().attributes(module).has(annotations::CONE)
    }

    /// Picks up replicas created earlier for the wrapped object.
    pub(crate) fn adopt_replicas(&mut self, module: &Module) {
        self.replicas = find_replicas(module, self.object());
    }
}

/// Finds the replicas of `original` by their `tamara_replica_of`/`tamara_replica` tags.
pub fn find_replicas(module: &Module, original: NodeRef) -> Option<[NodeRef; 2]> {
    let name = original.name(module);
    let tagged = |attrs: &AttrMap, k: i64| {
        attrs.get_str(annotations::REPLICA_OF) == Some(name)
            && attrs.get_int(annotations::REPLICA) == Some(k)
    };
    let find = |k: i64| match original {
        NodeRef::Cell(_) => module
            .cells()
            .find(|(_, c)| tagged(&c.attributes, k))
            .map(|(id, _)| NodeRef::Cell(id)),
        NodeRef::Wire(_) => module
            .wires()
            .find(|(_, w)| tagged(&w.attributes, k))
            .map(|(id, _)| NodeRef::Wire(id)),
    };
    Some([find(1)?, find(2)?])
}

/// Arena of the nodes discovered by one cone.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    /// Nodes in allocation order.
    nodes: Vec<GraphNode>,
}

impl NodeArena {
    /// Stores `node` and returns its handle.
    #[ensures(ret.as_usize() + 1 == self.nodes.len())]
    pub fn alloc(&mut self, node: GraphNode) -> NodeHandle {
        let handle = NodeHandle {
            inner: self.nodes.len() as u32,
        };
        self.nodes.push(node);
        handle
    }

    /// The node behind `handle`.
    ///
    /// # Panics
    /// Panics if `handle` came from another arena.
    pub fn get(&self, handle: NodeHandle) -> &GraphNode {
        &self.nodes[handle.as_usize()]
    }

    /// Mutable access to the node behind `handle`.
    ///
    /// # Panics
    /// Panics if `handle` came from another arena.
    pub fn get_mut(&mut self, handle: NodeHandle) -> &mut GraphNode {
        &mut self.nodes[handle.as_usize()]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
