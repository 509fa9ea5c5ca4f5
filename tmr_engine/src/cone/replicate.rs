use serde::Serialize;
use tmr_common::Module;
use tracing::{debug, trace};

use super::LogicCone;
use crate::{GraphNode, NodeKind, NodeRef, TmrError};

/// Objects created by one replication step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationStats {
    /// New replica cells.
    pub cells: usize,
    /// New replica wires.
    pub wires: usize,
}

impl LogicCone {
    /// Replicates every interior node, then every non-boundary input
    /// terminal, then the output terminal if it is a flip-flop or latch.
    ///
    /// Terminals shared with a cone that already replicated them keep their
    /// existing replicas. Empty cones are left untouched.
    ///
    /// # Errors
    /// Propagates node replication failures.
    pub fn replicate(&mut self, module: &mut Module) -> Result<ReplicationStats, TmrError> {
        let mut stats = ReplicationStats::default();
        if self.is_empty() {
            debug!("cone {} is empty; nothing to replicate", self.id);
            return Ok(stats);
        }

        for &handle in &self.interior {
            let node = self.arena.get_mut(handle);
            let fresh = !node.is_replicated(module);
            node.replicate(module)?;
            if fresh {
                stats.count(node.object());
            }
        }

        for &handle in &self.inputs {
            let node = self.arena.get_mut(handle);
            if !matches!(node.kind, NodeKind::Boundary(_)) {
                replicate_terminal(node, module, &mut stats)?;
            }
        }

        let output = self.arena.get_mut(self.output);
        if matches!(output.kind, NodeKind::Sequential(_)) {
            replicate_terminal(output, module, &mut stats)?;
        }

        debug!(
            "cone {}: {} replica cell(s), {} replica wire(s)",
            self.id, stats.cells, stats.wires
        );
        Ok(stats)
    }
}

impl ReplicationStats {
    /// Counts the two replicas of `object`.
    const fn count(&mut self, object: NodeRef) {
        match object {
            NodeRef::Cell(_) => self.cells += 2,
            NodeRef::Wire(_) => self.wires += 2,
        }
    }
}

/// Replicates a terminal, or adopts the replicas an earlier cone made.
fn replicate_terminal(
    node: &mut GraphNode,
    module: &mut Module,
    stats: &mut ReplicationStats,
) -> Result<(), TmrError> {
    if node.is_replicated(module) {
        trace!(
            "cone {}: terminal '{}' already replicated",
            node.cone(),
            node.object().name(module)
        );
        node.adopt_replicas(module);
        return Ok(());
    }
    node.replicate(module)?;
    stats.count(node.object());
    Ok(())
}
