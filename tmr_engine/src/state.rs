use std::collections::{HashMap, HashSet};
use std::fmt;

use contracts::*;

use crate::NodeRef;

/// Identifier of a logic cone, unique within one engine run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConeId {
    /// The underlying raw integer id.
    inner: u32,
}

impl ConeId {
    /// Creates a cone id from a raw integer.
    #[ensures(ret.inner == id)]
    pub const fn new(id: u32) -> Self {
        Self { inner: id }
    }

    /// The raw integer id.
    pub const fn as_u32(self) -> u32 {
        self.inner
    }
}

impl fmt::Display for ConeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Run-wide bookkeeping for one module transformation.
///
/// Created fresh for every module so cone ids and the explored set never
/// leak between runs.
#[derive(Debug, Default)]
pub struct EngineState {
    /// Next cone id to hand out.
    next_cone: u32,
    /// Objects already used to seed a cone.
    explored: HashSet<NodeRef>,
    /// Interior objects and the cone that owns them.
    claimed: HashMap<NodeRef, ConeId>,
}

impl EngineState {
    /// A fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next cone id.
    #[ensures(ret.as_u32() + 1 == self.next_cone)]
    pub fn allocate_cone(&mut self) -> ConeId {
        let id = ConeId::new(self.next_cone);
        self.next_cone += 1;
        id
    }

    /// Number of cone ids handed out so far.
    pub const fn cones_allocated(&self) -> u32 {
        self.next_cone
    }

    /// Marks `node` as a cone seed. Returns false if it already was one.
    pub fn mark_explored(&mut self, node: NodeRef) -> bool {
        self.explored.insert(node)
    }

    /// Whether `node` has seeded a cone.
    pub fn is_explored(&self, node: NodeRef) -> bool {
        self.explored.contains(&node)
    }

    /// Records `node` as interior to `cone`. Returns the previous owner, if any.
    pub fn claim(&mut self, node: NodeRef, cone: ConeId) -> Option<ConeId> {
        self.claimed.insert(node, cone)
    }

    /// The cone whose interior holds `node`.
    pub fn claimed_by(&self, node: NodeRef) -> Option<ConeId> {
        self.claimed.get(&node).copied()
    }
}
