//! Logic cones: the unit of triplication.
//!
//! A cone is found by searching backwards from one output terminal until
//! every path ends at a flip-flop/latch or a boundary net. Everything strictly
//! inside is replicated twice and a voter is inserted at the cut point.

mod replicate;
mod search;
mod wire;

pub use replicate::ReplicationStats;

use serde::Serialize;
use tmr_common::Module;
use tracing::debug;

use crate::{
    ConeId, ConnectivityIndex, EngineState, GraphNode, NodeArena, NodeHandle, NodeKind, NodeRef,
};

/// Progress of a cone's backward search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    /// Created, not searched yet.
    Pending,
    /// The frontier is being expanded.
    Searching,
    /// The last node popped was an input terminal.
    TerminalFound,
    /// The frontier is empty.
    Done,
}

/// A bounded region of logic between one output terminal and its input
/// terminals.
#[derive(Clone, Debug)]
pub struct LogicCone {
    /// Unique id within the run.
    id: ConeId,
    /// Every node the search touched.
    arena: NodeArena,
    /// The seed.
    output: NodeHandle,
    /// Terminals reached at the fringe, in discovery order.
    inputs: Vec<NodeHandle>,
    /// Nodes to triplicate, in discovery order.
    interior: Vec<NodeHandle>,
    /// Interior element whose output the voter replaces.
    cut_point: Option<NodeHandle>,
    /// Search progress.
    state: SearchState,
}

impl LogicCone {
    /// Creates a cone seeded at `seed` and marks the seed as explored.
    pub fn new(seed: NodeKind, state: &mut EngineState) -> Self {
        let id = state.allocate_cone();
        state.mark_explored(seed.object());
        let mut arena = NodeArena::default();
        let output = arena.alloc(GraphNode::new(seed, id));
        Self {
            id,
            arena,
            output,
            inputs: Vec::new(),
            interior: Vec::new(),
            cut_point: None,
            state: SearchState::Pending,
        }
    }

    /// Creates a cone seeded at `object`, classifying it first.
    pub fn seeded_at(
        object: NodeRef,
        module: &Module,
        index: &ConnectivityIndex,
        state: &mut EngineState,
    ) -> Self {
        Self::new(NodeKind::classify(object, module, index), state)
    }

    /// The cone's id.
    pub const fn id(&self) -> ConeId {
        self.id
    }

    /// Search progress.
    pub const fn state(&self) -> SearchState {
        self.state
    }

    /// The node behind `handle`.
    pub fn node(&self, handle: NodeHandle) -> &GraphNode {
        self.arena.get(handle)
    }

    /// The output terminal (seed).
    pub fn output(&self) -> &GraphNode {
        self.arena.get(self.output)
    }

    /// Input terminals in discovery order.
    pub fn inputs(&self) -> impl Iterator<Item = &GraphNode> {
        self.inputs.iter().map(|h| self.arena.get(*h))
    }

    /// Interior nodes in discovery order.
    pub fn interior(&self) -> impl Iterator<Item = &GraphNode> {
        self.interior.iter().map(|h| self.arena.get(*h))
    }

    /// The voter cut point, once selected.
    pub fn cut_point(&self) -> Option<&GraphNode> {
        self.cut_point.map(|h| self.arena.get(h))
    }

    /// Whether the cone has no interior. Empty cones are never replicated or wired.
    pub fn is_empty(&self) -> bool {
        self.interior.is_empty()
    }

    /// Creates a cone for every input terminal that has indexed drivers and
    /// has not seeded a cone yet.
    pub fn build_successors(
        &self,
        module: &Module,
        index: &ConnectivityIndex,
        state: &mut EngineState,
    ) -> Vec<Self> {
        let mut successors = Vec::new();
        for node in self.inputs() {
            let object = node.object();
            if !index.has_drivers(object) || state.is_explored(object) {
                continue;
            }
            let cone = Self::new(node.kind, state);
            debug!(
                "cone {}: terminal '{}' seeds cone {}",
                self.id,
                object.name(module),
                cone.id
            );
            successors.push(cone);
        }
        successors
    }

    /// Names of the objects in this cone, for reports.
    pub fn summary(&self, module: &Module) -> ConeSummary {
        let names = |nodes: &[NodeHandle]| {
            nodes
                .iter()
                .map(|h| self.arena.get(*h).object().name(module).to_owned())
                .collect()
        };
        ConeSummary {
            id: self.id.as_u32(),
            output: self.output().object().name(module).to_owned(),
            inputs: names(&self.inputs),
            interior: names(&self.interior),
            cut_point: self.cut_point().map(|n| n.object().name(module).to_owned()),
        }
    }
}

/// Serializable description of one cone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConeSummary {
    /// Cone id.
    pub id: u32,
    /// Name of the output terminal.
    pub output: String,
    /// Names of the input terminals.
    pub inputs: Vec<String>,
    /// Names of the interior objects.
    pub interior: Vec<String>,
    /// Name of the voter cut point.
    pub cut_point: Option<String>,
}
