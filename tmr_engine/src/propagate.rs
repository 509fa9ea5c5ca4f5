//! Pushes a module-level `tamara_triplicate` annotation down to its contents.

use serde::Serialize;
use tmr_common::annotations;
use tmr_common::{AttrMap, CellId, Design, Module, WireId};
use tracing::info;

/// What [`propagate`] marked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PropagateReport {
    /// Modules whose contents were visited.
    pub modules: Vec<String>,
    /// Cells newly marked.
    pub cells: usize,
    /// Wires newly marked.
    pub wires: usize,
}

/// Marks every cell and wire of each annotated module with `tamara_triplicate`.
///
/// Modules and objects carrying `tamara_ignore` are skipped, as is anything
/// already marked.
pub fn propagate(design: &mut Design) -> PropagateReport {
    let mut report = PropagateReport::default();
    for module in design.modules_mut() {
        if !module.attributes.is_set(annotations::TRIPLICATE)
            || module.attributes.is_set(annotations::IGNORE)
        {
            continue;
        }
        let (cells, wires) = propagate_module(module);
        info!(
            "module '{}': marked {cells} cell(s) and {wires} wire(s) for triplication",
            module.name()
        );
        report.modules.push(module.name().to_owned());
        report.cells += cells;
        report.wires += wires;
    }
    report
}

/// Marks the contents of one module. Returns the number of cells and wires marked.
pub fn propagate_module(module: &mut Module) -> (usize, usize) {
    let mut cells = 0;
    for id in (0..module.cell_count()).map(CellId::from) {
        if mark(&mut module.cell_mut(id).attributes) {
            cells += 1;
        }
    }
    let mut wires = 0;
    for id in (0..module.wire_count()).map(WireId::from) {
        if mark(&mut module.wire_mut(id).attributes) {
            wires += 1;
        }
    }
    (cells, wires)
}

/// Sets the flag unless the object is ignored or already marked.
fn mark(attrs: &mut AttrMap) -> bool {
    if attrs.is_set(annotations::IGNORE) || attrs.is_set(annotations::TRIPLICATE) {
        return false;
    }
    attrs.set_flag(annotations::TRIPLICATE);
    true
}
