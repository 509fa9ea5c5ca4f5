use std::collections::HashMap;

use tracing::debug;

use super::{AttrMap, Cell, CellId, CellKind, NetlistError, PortDirection, SigBit, SigSpec, WireId};

/// A named, possibly multi-bit signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wire {
    /// Unique name within the module.
    pub(crate) name: String,
    /// Number of bits.
    pub width: u32,
    /// Port direction if this wire is a module port.
    pub port: Option<PortDirection>,
    /// Wire attributes.
    pub attributes: AttrMap,
}

impl Wire {
    /// The wire's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the wire is a module port.
    pub const fn is_port(&self) -> bool {
        self.port.is_some()
    }

    /// Whether the wire is an input (or inout) port.
    pub const fn is_input(&self) -> bool {
        matches!(self.port, Some(PortDirection::Input | PortDirection::Inout))
    }

    /// Whether the wire is an output (or inout) port.
    pub const fn is_output(&self) -> bool {
        matches!(self.port, Some(PortDirection::Output | PortDirection::Inout))
    }
}

/// A module: wires, cells and module-level connections.
///
/// Connections are stored as `(lhs, rhs)` pairs where `lhs` is driven by `rhs`.
#[derive(Clone, Debug)]
pub struct Module {
    /// Module name.
    name: String,
    /// Module attributes.
    pub attributes: AttrMap,
    /// Wire arena, indexed by [`WireId`].
    wires: Vec<Wire>,
    /// Cell arena, indexed by [`CellId`].
    cells: Vec<Cell>,
    /// Wire name lookup.
    wire_names: HashMap<String, WireId>,
    /// Cell name lookup.
    cell_names: HashMap<String, CellId>,
    /// Module-level connections.
    connections: Vec<(SigSpec, SigSpec)>,
    /// Counter for generated names.
    next_auto: u32,
}

impl Module {
    /// Creates an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: AttrMap::new(),
            wires: Vec::new(),
            cells: Vec::new(),
            wire_names: HashMap::new(),
            cell_names: HashMap::new(),
            connections: Vec::new(),
            next_auto: 0,
        }
    }

    /// The module's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ---------------------------------------------------------------------
    // Wires
    // ---------------------------------------------------------------------

    /// Adds a wire.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if the name is taken.
    pub fn add_wire(
        &mut self,
        name: impl Into<String>,
        width: u32,
    ) -> Result<WireId, NetlistError> {
        let name = name.into();
        if self.wire_names.contains_key(&name) {
            return Err(NetlistError::duplicate("wire", name));
        }
        let id = WireId::from(self.wires.len());
        self.wire_names.insert(name.clone(), id);
        self.wires.push(Wire {
            name,
            width,
            port: None,
            attributes: AttrMap::new(),
        });
        Ok(id)
    }

    /// Adds a wire and makes it a module port.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if the name is taken.
    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        width: u32,
        direction: PortDirection,
    ) -> Result<WireId, NetlistError> {
        let id = self.add_wire(name, width)?;
        self.wires[id.as_usize()].port = Some(direction);
        Ok(id)
    }

    /// Adds a wire with the width and attributes of `src`. The copy is never a port.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if the name is taken.
    pub fn add_wire_like(
        &mut self,
        src: WireId,
        name: impl Into<String>,
    ) -> Result<WireId, NetlistError> {
        let (width, attributes) = {
            let w = self.wire(src);
            (w.width, w.attributes.clone())
        };
        let id = self.add_wire(name, width)?;
        self.wires[id.as_usize()].attributes = attributes;
        Ok(id)
    }

    /// Adds a wire with a generated unique name.
    pub fn fresh_wire(&mut self, prefix: &str, width: u32) -> WireId {
        let name = self.new_id(prefix);
        let id = WireId::from(self.wires.len());
        self.wire_names.insert(name.clone(), id);
        self.wires.push(Wire {
            name,
            width,
            port: None,
            attributes: AttrMap::new(),
        });
        id
    }

    /// The wire with id `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this module.
    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.as_usize()]
    }

    /// Mutable access to the wire with id `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this module.
    pub fn wire_mut(&mut self, id: WireId) -> &mut Wire {
        &mut self.wires[id.as_usize()]
    }

    /// Looks up a wire by name.
    pub fn wire_by_name(&self, name: &str) -> Option<WireId> {
        self.wire_names.get(name).copied()
    }

    /// Iterates over all wires.
    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires
            .iter()
            .enumerate()
            .map(|(i, w)| (WireId::from(i), w))
    }

    /// Number of wires.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Sets or clears the port direction of a wire.
    pub fn set_port(&mut self, id: WireId, direction: Option<PortDirection>) {
        self.wires[id.as_usize()].port = direction;
    }

    /// Port wires in declaration order.
    pub fn ports(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires().filter(|(_, w)| w.is_port())
    }

    /// All bits of a wire.
    pub fn sig(&self, id: WireId) -> SigSpec {
        SigSpec::from_wire(id, self.wire(id).width)
    }

    /// All bits of the named wire.
    ///
    /// # Errors
    /// Returns [`NetlistError::NotFound`] if there is no such wire.
    pub fn sig_by_name(&self, name: &str) -> Result<SigSpec, NetlistError> {
        self.wire_by_name(name)
            .map(|id| self.sig(id))
            .ok_or_else(|| NetlistError::not_found("wire", name))
    }

    /// Human readable name of a bit, for diagnostics.
    pub fn bit_name(&self, bit: SigBit) -> String {
        match bit {
            SigBit::Wire { wire, offset } => {
                let w = self.wire(wire);
                if w.width == 1 {
                    w.name.clone()
                } else {
                    format!("{}[{offset}]", w.name)
                }
            }
            other => other.to_string(),
        }
    }

    // ---------------------------------------------------------------------
    // Cells
    // ---------------------------------------------------------------------

    /// Adds an unconnected cell.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if the name is taken.
    pub fn add_cell(
        &mut self,
        name: impl Into<String>,
        kind: CellKind,
    ) -> Result<CellId, NetlistError> {
        let name = name.into();
        if self.cell_names.contains_key(&name) {
            return Err(NetlistError::duplicate("cell", name));
        }
        Ok(self.push_cell(Cell::new(name, kind)))
    }

    /// Adds a copy of `src` (type, connections, parameters, attributes) under a new name.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if the name is taken.
    pub fn add_cell_like(
        &mut self,
        src: CellId,
        name: impl Into<String>,
    ) -> Result<CellId, NetlistError> {
        let name = name.into();
        if self.cell_names.contains_key(&name) {
            return Err(NetlistError::duplicate("cell", name));
        }
        let mut cell = self.cell(src).clone();
        cell.name = name;
        Ok(self.push_cell(cell))
    }

    /// Adds an unconnected cell with a generated unique name.
    pub fn fresh_cell(&mut self, kind: CellKind) -> CellId {
        let name = self.new_id(kind.as_str().trim_start_matches('$'));
        self.push_cell(Cell::new(name, kind))
    }

    /// Inserts a cell whose name is known to be free.
    fn push_cell(&mut self, cell: Cell) -> CellId {
        let id = CellId::from(self.cells.len());
        self.cell_names.insert(cell.name.clone(), id);
        self.cells.push(cell);
        id
    }

    /// The cell with id `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this module.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.as_usize()]
    }

    /// Mutable access to the cell with id `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this module.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.as_usize()]
    }

    /// Looks up a cell by name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.cell_names.get(name).copied()
    }

    /// Iterates over all cells.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (CellId::from(i), c))
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells of the given kind.
    pub fn count_cells(&self, kind: &CellKind) -> usize {
        self.cells.iter().filter(|c| &c.kind == kind).count()
    }

    /// Generates a name not used by any wire or cell, of the form `$prefix$n`.
    pub fn new_id(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("${prefix}${}", self.next_auto);
            self.next_auto += 1;
            if !self.wire_names.contains_key(&name) && !self.cell_names.contains_key(&name) {
                return name;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Connections
    // ---------------------------------------------------------------------

    /// Connects `lhs` so that it is driven by `rhs`.
    ///
    /// # Errors
    /// Returns [`NetlistError::WidthMismatch`] if the widths differ.
    pub fn connect(&mut self, lhs: SigSpec, rhs: SigSpec) -> Result<(), NetlistError> {
        if lhs.width() != rhs.width() {
            return Err(NetlistError::width_mismatch(
                format!("connection {lhs} <- {rhs}"),
                lhs.width(),
                rhs.width(),
            ));
        }
        self.connections.push((lhs, rhs));
        Ok(())
    }

    /// Module-level connections as `(lhs, rhs)` pairs.
    pub fn connections(&self) -> &[(SigSpec, SigSpec)] {
        &self.connections
    }

    // ---------------------------------------------------------------------
    // Gate helpers
    // ---------------------------------------------------------------------

    /// Adds a single-input gate driving `y`.
    pub fn add_unary(&mut self, kind: CellKind, a: SigSpec, y: SigSpec) -> CellId {
        debug_assert!(kind.is_unary(), "{kind} is not a unary gate");
        let id = self.fresh_cell(kind);
        let cell = self.cell_mut(id);
        cell.parameters.set_int("A_SIGNED", 0);
        cell.parameters.set_int("A_WIDTH", i64::from(a.width()));
        cell.parameters.set_int("Y_WIDTH", i64::from(y.width()));
        cell.set_port("A", a);
        cell.set_port("Y", y);
        id
    }

    /// Adds a two-input gate driving `y`.
    pub fn add_binary(&mut self, kind: CellKind, a: SigSpec, b: SigSpec, y: SigSpec) -> CellId {
        debug_assert!(kind.is_binary(), "{kind} is not a binary gate");
        let id = self.fresh_cell(kind);
        let cell = self.cell_mut(id);
        cell.parameters.set_int("A_SIGNED", 0);
        cell.parameters.set_int("B_SIGNED", 0);
        cell.parameters.set_int("A_WIDTH", i64::from(a.width()));
        cell.parameters.set_int("B_WIDTH", i64::from(b.width()));
        cell.parameters.set_int("Y_WIDTH", i64::from(y.width()));
        cell.set_port("A", a);
        cell.set_port("B", b);
        cell.set_port("Y", y);
        id
    }

    /// Adds `$not` over `a` driving a fresh wire.
    pub fn add_not(&mut self, a: SigSpec) -> (CellId, SigSpec) {
        let y = self.fresh_wire("not_y", a.width());
        let y = self.sig(y);
        (self.add_unary(CellKind::Not, a, y.clone()), y)
    }

    /// Adds `$and` over `a` and `b` driving a fresh wire.
    ///
    /// # Errors
    /// Returns [`NetlistError::WidthMismatch`] if the widths differ.
    pub fn add_and(&mut self, a: SigSpec, b: SigSpec) -> Result<(CellId, SigSpec), NetlistError> {
        self.add_bitwise(CellKind::And, a, b)
    }

    /// Adds `$or` over `a` and `b` driving a fresh wire.
    ///
    /// # Errors
    /// Returns [`NetlistError::WidthMismatch`] if the widths differ.
    pub fn add_or(&mut self, a: SigSpec, b: SigSpec) -> Result<(CellId, SigSpec), NetlistError> {
        self.add_bitwise(CellKind::Or, a, b)
    }

    /// Adds `$xor` over `a` and `b` driving a fresh wire.
    ///
    /// # Errors
    /// Returns [`NetlistError::WidthMismatch`] if the widths differ.
    pub fn add_xor(&mut self, a: SigSpec, b: SigSpec) -> Result<(CellId, SigSpec), NetlistError> {
        self.add_bitwise(CellKind::Xor, a, b)
    }

    /// Shared body of the equal-width bitwise helpers.
    fn add_bitwise(
        &mut self,
        kind: CellKind,
        a: SigSpec,
        b: SigSpec,
    ) -> Result<(CellId, SigSpec), NetlistError> {
        if a.width() != b.width() {
            return Err(NetlistError::width_mismatch(
                format!("{kind} inputs"),
                a.width(),
                b.width(),
            ));
        }
        let y = self.fresh_wire(&format!("{}_y", kind.as_str().trim_start_matches('$')), a.width());
        let y = self.sig(y);
        Ok((self.add_binary(kind, a, b, y.clone()), y))
    }

    /// Adds `$reduce_or` over `a` driving a fresh 1-bit wire.
    pub fn add_reduce_or(&mut self, a: SigSpec) -> (CellId, SigSpec) {
        let y = self.fresh_wire("reduce_or_y", 1);
        let y = self.sig(y);
        (self.add_unary(CellKind::ReduceOr, a, y.clone()), y)
    }

    /// Adds a positive-edge `$dff`.
    ///
    /// # Errors
    /// Returns [`NetlistError::DuplicateName`] if the name is taken, or
    /// [`NetlistError::WidthMismatch`] if `d` and `q` differ in width.
    pub fn add_dff(
        &mut self,
        name: impl Into<String>,
        clk: SigSpec,
        d: SigSpec,
        q: SigSpec,
    ) -> Result<CellId, NetlistError> {
        if d.width() != q.width() {
            return Err(NetlistError::width_mismatch("$dff D/Q", d.width(), q.width()));
        }
        let id = self.add_cell(name, CellKind::Dff)?;
        let cell = self.cell_mut(id);
        cell.parameters.set_int("WIDTH", i64::from(d.width()));
        cell.parameters.set_int("CLK_POLARITY", 1);
        cell.set_port("CLK", clk);
        cell.set_port("D", d);
        cell.set_port("Q", q);
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Consistency
    // ---------------------------------------------------------------------

    /// Checks structural consistency: every bit refers to an existing wire
    /// bit, known cell types bind exactly their library ports, width
    /// parameters agree with port widths, and connections have matching
    /// widths with a non-constant left-hand side.
    ///
    /// # Errors
    /// Returns [`NetlistError::Inconsistent`] describing the first problem found.
    pub fn check(&self) -> Result<(), NetlistError> {
        for (id, cell) in self.cells() {
            if self.cell_names.get(&cell.name) != Some(&id) {
                return Err(
                    self.inconsistent(format!("cell '{}' is not indexed by name", cell.name))
                );
            }
            for (port, sig) in &cell.connections {
                self.check_sig(sig, || format!("cell '{}' port {port}", cell.name))?;
            }
            if let Some(ports) = cell.kind.ports() {
                for (port, _) in ports {
                    if !cell.connections.contains_key(*port) {
                        return Err(self.inconsistent(format!(
                            "cell '{}' ({}) has unbound port {port}",
                            cell.name, cell.kind
                        )));
                    }
                }
                if let Some(port) = cell
                    .connections
                    .keys()
                    .find(|p| cell.kind.port_direction(p).is_none())
                {
                    return Err(self.inconsistent(format!(
                        "cell '{}' ({}) binds unknown port {port}",
                        cell.name, cell.kind
                    )));
                }
                self.check_widths(cell)?;
            }
        }

        for (id, wire) in self.wires() {
            if self.wire_names.get(&wire.name) != Some(&id) {
                return Err(
                    self.inconsistent(format!("wire '{}' is not indexed by name", wire.name))
                );
            }
        }

        for (lhs, rhs) in &self.connections {
            self.check_sig(lhs, || format!("connection lhs {lhs}"))?;
            self.check_sig(rhs, || format!("connection rhs {rhs}"))?;
            if lhs.width() != rhs.width() {
                return Err(self.inconsistent(format!(
                    "connection {lhs} <- {rhs} has mismatched widths"
                )));
            }
            if lhs.iter().any(SigBit::is_const) {
                return Err(self.inconsistent(format!(
                    "connection {lhs} <- {rhs} drives a constant"
                )));
            }
        }

        debug!(
            "module '{}' consistent: {} cells, {} wires",
            self.name,
            self.cells.len(),
            self.wires.len()
        );
        Ok(())
    }

    /// Validates every wire bit of `sig`.
    fn check_sig(&self, sig: &SigSpec, context: impl Fn() -> String) -> Result<(), NetlistError> {
        for (wire, offset) in sig.iter().filter_map(SigBit::as_wire) {
            let Some(w) = self.wires.get(wire.as_usize()) else {
                return Err(self.inconsistent(format!("{}: dangling wire id {wire}", context())));
            };
            if offset >= w.width {
                return Err(self.inconsistent(format!(
                    "{}: bit {offset} out of range for '{}' ({} bits)",
                    context(),
                    w.name,
                    w.width
                )));
            }
        }
        Ok(())
    }

    /// Compares width parameters against bound port widths.
    fn check_widths(&self, cell: &Cell) -> Result<(), NetlistError> {
        let checks: &[(&str, &[&str])] = if cell.kind.is_sequential() {
            &[("WIDTH", &["D", "Q"])]
        } else if matches!(cell.kind, CellKind::Mux) {
            &[("WIDTH", &["A", "B", "Y"])]
        } else if matches!(cell.kind, CellKind::Fa) {
            &[("WIDTH", &["A", "B", "C", "X", "Y"])]
        } else {
            &[("A_WIDTH", &["A"]), ("B_WIDTH", &["B"]), ("Y_WIDTH", &["Y"])]
        };
        for (param, ports) in checks {
            let Some(expected) = cell.parameters.get_int(param) else {
                continue;
            };
            for port in *ports {
                if let Some(sig) = cell.port(port) {
                    if i64::from(sig.width()) != expected {
                        return Err(self.inconsistent(format!(
                            "cell '{}' port {port} is {} bits but {param} = {expected}",
                            cell.name,
                            sig.width()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Helper to create an inconsistency error for this module.
    fn inconsistent(&self, reason: String) -> NetlistError {
        NetlistError::inconsistent(&self.name, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_wire_names_are_rejected() {
        let mut m = Module::new("m");
        m.add_wire("a", 1).unwrap();
        assert!(matches!(
            m.add_wire("a", 2),
            Err(NetlistError::DuplicateName { kind: "wire", .. })
        ));
    }

    #[test]
    fn generated_names_skip_existing_ones() {
        let mut m = Module::new("m");
        m.add_wire("$t$0", 1).unwrap();
        assert_eq!(m.new_id("t"), "$t$1");
    }

    #[test]
    fn cloned_cells_keep_connections() {
        let mut m = Module::new("m");
        let a = m.add_port("a", 1, PortDirection::Input).unwrap();
        let (inv, y) = m.add_not(m.sig(a));
        let copy = m.add_cell_like(inv, "inv_copy").unwrap();
        assert_eq!(m.cell(copy).port("A"), Some(&m.sig(a)));
        assert_eq!(m.cell(copy).port("Y"), Some(&y));
        assert_eq!(m.count_cells(&CellKind::Not), 2);
    }

    #[test]
    fn check_rejects_width_parameter_mismatch() {
        let mut m = Module::new("m");
        let a = m.add_wire("a", 2).unwrap();
        let (inv, _) = m.add_not(m.sig(a));
        m.cell_mut(inv).parameters.set_int("A_WIDTH", 3);
        assert!(matches!(m.check(), Err(NetlistError::Inconsistent { .. })));
    }

    #[test]
    fn check_rejects_unbound_ports() {
        let mut m = Module::new("m");
        m.add_cell("lonely", CellKind::And).unwrap();
        assert!(m.check().is_err());
    }

    #[test]
    fn connect_requires_equal_widths() {
        let mut m = Module::new("m");
        let a = m.add_wire("a", 2).unwrap();
        let b = m.add_wire("b", 1).unwrap();
        assert!(m.connect(m.sig(a), m.sig(b)).is_err());
    }
}
