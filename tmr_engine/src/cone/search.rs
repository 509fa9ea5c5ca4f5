use std::collections::{HashSet, VecDeque};

use tmr_common::Module;
use tracing::{debug, trace};

use super::{LogicCone, SearchState};
use crate::{ConnectivityIndex, EngineState, NodeKind, NodeRef, TmrError};

impl LogicCone {
    /// Breadth-first backward search from the output terminal.
    ///
    /// The seed is always expanded. Every other node is either a terminal
    /// (sequential or boundary, recorded as an input and not expanded) or
    /// becomes interior. The first interior combinational element is the
    /// voter cut point. Objects already interior to another cone are never
    /// entered.
    ///
    /// # Errors
    /// [`TmrError::BadTerminal`] if the search dead-ends on a node that is
    /// not a legal terminal.
    pub fn search(
        &mut self,
        module: &Module,
        index: &ConnectivityIndex,
        state: &mut EngineState,
    ) -> Result<(), TmrError> {
        let mut frontier = VecDeque::from([self.output]);
        let mut visited: HashSet<NodeRef> = HashSet::from([self.output().object()]);
        self.state = SearchState::Searching;

        while let Some(handle) = frontier.pop_front() {
            let node = self.arena.get(handle);
            let (kind, object) = (node.kind, node.object());
            let is_seed = handle == self.output;

            if !is_seed && kind.is_terminal() {
                trace!("cone {}: terminal {} '{}'", self.id, kind.label(), object.name(module));
                self.state = SearchState::TerminalFound;
                self.inputs.push(handle);
                continue;
            }

            self.state = SearchState::Searching;
            let neighbours = node.compute_neighbours(module, index);
            if !is_seed {
                if neighbours.is_empty() {
                    self.inputs.push(handle);
                    continue;
                }
                self.interior.push(handle);
                state.claim(object, self.id);
                if self.cut_point.is_none() && matches!(kind, NodeKind::Combinational(_)) {
                    self.cut_point = Some(handle);
                }
            }

            for neighbour in neighbours {
                let next = neighbour.object();
                if state.claimed_by(next).is_some_and(|owner| owner != self.id) {
                    trace!("cone {}: '{}' belongs to another cone", self.id, next.name(module));
                    continue;
                }
                if visited.insert(next) {
                    frontier.push_back(self.arena.alloc(neighbour));
                }
            }
        }

        self.state = SearchState::Done;
        debug!(
            "cone {} from '{}': {} interior, {} input(s), cut point {}",
            self.id,
            self.output().object().name(module),
            self.interior.len(),
            self.inputs.len(),
            self.cut_point()
                .map_or("<none>", |n| n.object().name(module))
        );
        self.verify_input_nodes(module)
    }

    /// Checks that every recorded input terminal is sequential or boundary.
    ///
    /// # Errors
    /// [`TmrError::BadTerminal`] naming the first offending node.
    pub fn verify_input_nodes(&self, module: &Module) -> Result<(), TmrError> {
        match self.inputs().find(|n| !n.kind.is_terminal()) {
            Some(node) => Err(TmrError::bad_terminal(
                node.object().name(module),
                self.id,
                node.kind.label(),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmr_common::{CellKind, Design, PortDirection, SigSpec, and_tree, not_dff};

    fn prepared(module: Module) -> (Module, ConnectivityIndex) {
        let name = module.name().to_owned();
        let mut design = Design::from(module);
        crate::propagate(&mut design);
        let module = design.module(&name).unwrap().clone();
        let index = ConnectivityIndex::build(&module);
        (module, index)
    }

    fn search_from(
        module: &Module,
        index: &ConnectivityIndex,
        port: &str,
    ) -> Result<LogicCone, TmrError> {
        let mut state = EngineState::new();
        let seed = NodeRef::Wire(module.wire_by_name(port).unwrap());
        let mut cone = LogicCone::seeded_at(seed, module, index, &mut state);
        cone.search(module, index, &mut state)?;
        Ok(cone)
    }

    fn names<'a>(
        module: &Module,
        nodes: impl Iterator<Item = &'a crate::GraphNode>,
    ) -> Vec<String> {
        nodes.map(|n| n.object().name(module).to_owned()).collect()
    }

    #[test]
    fn not_dff_cone_stops_at_the_register() {
        let (m, index) = prepared(not_dff().unwrap());
        let cone = search_from(&m, &index, "o").unwrap();
        assert_eq!(cone.state(), SearchState::Done);
        assert_eq!(names(&m, cone.interior()), vec!["inv", "ff"]);
        assert_eq!(names(&m, cone.inputs()), vec!["ff_reg"]);
        assert_eq!(cone.cut_point().map(|n| n.object().name(&m)), Some("inv"));
    }

    #[test]
    fn and_tree_records_every_input() {
        let (m, index) = prepared(and_tree().unwrap());
        let cone = search_from(&m, &index, "o").unwrap();
        let mut inputs = names(&m, cone.inputs());
        inputs.sort();
        assert_eq!(inputs, vec!["a", "b", "c", "d"]);
        assert_eq!(cone.cut_point().map(|n| n.object().name(&m)), Some("and_o"));
        assert!(cone.inputs().all(|n| n.kind.is_terminal()));
    }

    #[test]
    fn output_driven_by_register_is_empty() {
        let (m, index) = prepared(tmr_common::counter().unwrap());
        let cone = search_from(&m, &index, "q").unwrap();
        assert!(cone.is_empty());
        assert!(cone.cut_point().is_none());
        assert_eq!(names(&m, cone.inputs()), vec!["state"]);
    }

    #[test]
    fn gate_without_drivers_is_an_illegal_terminal() {
        let mut m = Module::new("const_gate");
        m.attributes.set_flag(tmr_common::annotations::TRIPLICATE);
        let o = m.add_port("o", 1, PortDirection::Output).unwrap();
        let o = m.sig(o);
        m.add_unary(CellKind::Not, SigSpec::constant(0, 1), o);
        let (m, index) = prepared(m);
        assert!(matches!(
            search_from(&m, &index, "o"),
            Err(TmrError::BadTerminal { kind: "combinational", .. })
        ));
    }

    #[test]
    fn claimed_objects_are_not_entered_again() {
        let (m, index) = prepared(tmr_common::fanout().unwrap());
        let mut state = EngineState::new();
        let o1 = NodeRef::Wire(m.wire_by_name("o1").unwrap());
        let o2 = NodeRef::Wire(m.wire_by_name("o2").unwrap());
        let mut first = LogicCone::seeded_at(o1, &m, &index, &mut state);
        first.search(&m, &index, &mut state).unwrap();
        let mut second = LogicCone::seeded_at(o2, &m, &index, &mut state);
        second.search(&m, &index, &mut state).unwrap();
        assert_eq!(names(&m, first.interior()), vec!["g_not", "t", "g_and"]);
        assert_eq!(names(&m, second.interior()), vec!["g_xor"]);
        assert_eq!(names(&m, second.inputs()), vec!["a"]);
    }
}
