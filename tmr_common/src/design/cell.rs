use indexmap::IndexMap;

use super::{AttrMap, CellKind, PortDirection, SigBit, SigSpec};

/// A typed primitive with named ports bound to signals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Unique name within the module.
    pub(crate) name: String,
    /// Cell type.
    pub kind: CellKind,
    /// Port bindings in insertion order.
    pub connections: IndexMap<String, SigSpec>,
    /// Cell parameters (`WIDTH`, `A_WIDTH`, `CLK_POLARITY`, ...).
    pub parameters: AttrMap,
    /// Cell attributes.
    pub attributes: AttrMap,
    /// Explicit port directions, used for cell types outside the known library.
    pub port_directions: IndexMap<String, PortDirection>,
}

impl Cell {
    /// Creates an unconnected cell.
    pub fn new(name: impl Into<String>, kind: CellKind) -> Self {
        Self {
            name: name.into(),
            kind,
            connections: IndexMap::new(),
            parameters: AttrMap::new(),
            attributes: AttrMap::new(),
            port_directions: IndexMap::new(),
        }
    }

    /// The cell's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds `port` to `sig`, replacing any previous binding.
    pub fn set_port(&mut self, port: impl Into<String>, sig: SigSpec) {
        self.connections.insert(port.into(), sig);
    }

    /// The signal bound to `port`.
    pub fn port(&self, port: &str) -> Option<&SigSpec> {
        self.connections.get(port)
    }

    /// Rebinds a single bit of `port`. Returns false if the port or bit does not exist.
    pub fn rebind_bit(&mut self, port: &str, index: usize, bit: SigBit) -> bool {
        match self
            .connections
            .get_mut(port)
            .and_then(|sig| sig.bits_mut().get_mut(index))
        {
            Some(slot) => {
                *slot = bit;
                true
            }
            None => false,
        }
    }

    /// Direction of `port`.
    ///
    /// Known cell types answer from the cell library; other types use the
    /// directions recorded at import. Unknown ports default to input.
    pub fn port_direction(&self, port: &str) -> PortDirection {
        self.kind
            .port_direction(port)
            .or_else(|| self.port_directions.get(port).copied())
            .unwrap_or(PortDirection::Input)
    }

    /// Names of the bound ports that drive signals.
    pub fn output_ports(&self) -> Vec<&str> {
        self.connections
            .keys()
            .filter(|port| self.port_direction(port) == PortDirection::Output)
            .map(String::as_str)
            .collect()
    }

    /// Port bindings paired with their direction.
    pub fn ports_with_direction(&self) -> impl Iterator<Item = (&str, PortDirection, &SigSpec)> {
        self.connections
            .iter()
            .map(|(port, sig)| (port.as_str(), self.port_direction(port), sig))
    }

    /// Integer parameter with a default.
    pub fn param_int(&self, key: &str, default: i64) -> i64 {
        self.parameters.get_int(key).unwrap_or(default)
    }
}
