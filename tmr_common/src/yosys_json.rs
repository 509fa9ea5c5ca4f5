//! Reading and writing netlists in the Yosys `write_json` format.
//!
//! Import turns numbered nets into wires: the first wire that claims a net
//! number owns it (input ports, then output ports, then public names, then
//! hidden names) and every later wire sharing the number is tied to the owner
//! with a module-level connection. Export renumbers bits through a
//! [`SigMap`] so connected bits share one net number again.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::design::{
    AttrMap, AttrValue, CellKind, Design, Module, NetlistError, PortDirection, SigBit, SigMap,
    SigSpec,
};

/// Top-level Yosys JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct YosysJson {
    /// Tool that produced the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Modules by name.
    #[serde(default)]
    pub modules: IndexMap<String, JsonModule>,
}

/// One module of a Yosys JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JsonModule {
    /// Module attributes.
    #[serde(default)]
    pub attributes: IndexMap<String, JsonValue>,
    /// Module ports.
    #[serde(default)]
    pub ports: IndexMap<String, JsonPort>,
    /// Cell instances.
    #[serde(default)]
    pub cells: IndexMap<String, JsonCell>,
    /// Named nets.
    #[serde(default)]
    pub netnames: IndexMap<String, JsonNet>,
}

/// Port direction as spelled in Yosys JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonDirection {
    /// Input port.
    Input,
    /// Output port.
    Output,
    /// Bidirectional port.
    Inout,
}

impl From<JsonDirection> for PortDirection {
    fn from(dir: JsonDirection) -> Self {
        match dir {
            JsonDirection::Input => Self::Input,
            JsonDirection::Output => Self::Output,
            JsonDirection::Inout => Self::Inout,
        }
    }
}

impl From<PortDirection> for JsonDirection {
    fn from(dir: PortDirection) -> Self {
        match dir {
            PortDirection::Input => Self::Input,
            PortDirection::Output => Self::Output,
            PortDirection::Inout => Self::Inout,
        }
    }
}

/// A module port.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonPort {
    /// Port direction.
    pub direction: JsonDirection,
    /// Net numbers or constants, LSB first.
    pub bits: Vec<JsonBit>,
}

/// A cell instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonCell {
    /// Non-zero for auto-generated names.
    #[serde(default)]
    pub hide_name: u8,
    /// Cell type, e.g. `$and`.
    #[serde(rename = "type")]
    pub cell_type: String,
    /// Cell parameters.
    #[serde(default)]
    pub parameters: IndexMap<String, JsonValue>,
    /// Cell attributes.
    #[serde(default)]
    pub attributes: IndexMap<String, JsonValue>,
    /// Direction of each port.
    #[serde(default)]
    pub port_directions: IndexMap<String, JsonDirection>,
    /// Port bindings.
    #[serde(default)]
    pub connections: IndexMap<String, Vec<JsonBit>>,
}

/// A named net.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonNet {
    /// Non-zero for auto-generated names.
    #[serde(default)]
    pub hide_name: u8,
    /// Net numbers or constants, LSB first.
    pub bits: Vec<JsonBit>,
    /// Net attributes.
    #[serde(default)]
    pub attributes: IndexMap<String, JsonValue>,
}

/// A bit reference: a net number or a constant (`"0"`, `"1"`, `"x"`, `"z"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonBit {
    /// Numbered net.
    Net(u64),
    /// Constant.
    Const(String),
}

/// Attribute or parameter value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonValue {
    /// String encoding (binary digits for integers).
    Str(String),
    /// Plain JSON number, emitted by some Yosys versions.
    Int(i64),
}

// -------------------------------------------------------------------------
// Public entry points
// -------------------------------------------------------------------------

/// Reads a design from a Yosys JSON file.
///
/// # Errors
/// Fails on I/O errors, invalid JSON or malformed netlist content.
pub fn read_design(path: impl AsRef<Path>) -> Result<Design, NetlistError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let design = design_from_str(&text)?;
    info!("loaded {} module(s) from {}", design.len(), path.display());
    Ok(design)
}

/// Writes a design to a Yosys JSON file.
///
/// # Errors
/// Fails on I/O or serialization errors.
pub fn write_design(design: &Design, path: impl AsRef<Path>) -> Result<(), NetlistError> {
    let path = path.as_ref();
    std::fs::write(path, design_to_string(design)?)?;
    info!("wrote {} module(s) to {}", design.len(), path.display());
    Ok(())
}

/// Parses a design from Yosys JSON text.
///
/// # Errors
/// Fails on invalid JSON or malformed netlist content.
pub fn design_from_str(text: &str) -> Result<Design, NetlistError> {
    let json: YosysJson = serde_json::from_str(text)?;
    design_from_json(&json)
}

/// Renders a design as pretty-printed Yosys JSON.
///
/// # Errors
/// Fails if serialization fails.
pub fn design_to_string(design: &Design) -> Result<String, NetlistError> {
    Ok(serde_json::to_string_pretty(&design_to_json(design))?)
}

/// Converts a parsed document into a [`Design`].
///
/// # Errors
/// Fails on unknown constant spellings or duplicate names.
pub fn design_from_json(json: &YosysJson) -> Result<Design, NetlistError> {
    let mut design = Design::new();
    for (name, module) in &json.modules {
        design.add_module(import_module(name, module)?)?;
    }
    Ok(design)
}

/// Converts a [`Design`] into a serializable document.
pub fn design_to_json(design: &Design) -> YosysJson {
    YosysJson {
        creator: Some(format!("tmr {}", env!("CARGO_PKG_VERSION"))),
        modules: design
            .modules()
            .map(|m| (m.name().to_owned(), export_module(m)))
            .collect(),
    }
}

// -------------------------------------------------------------------------
// Import
// -------------------------------------------------------------------------

/// A wire to create during import, in ownership priority order.
struct PendingWire<'a> {
    /// Wire name.
    name: &'a str,
    /// Bits as listed in the document.
    bits: &'a [JsonBit],
    /// Port direction, if a port.
    port: Option<PortDirection>,
    /// Attributes from `netnames`, if listed there.
    attributes: Option<&'a IndexMap<String, JsonValue>>,
}

fn import_module(name: &str, json: &JsonModule) -> Result<Module, NetlistError> {
    let mut module = Module::new(name);
    module.attributes = decode_attrs(&json.attributes);

    let mut pending: Vec<PendingWire<'_>> = Vec::new();
    let inputs = json.ports.iter().filter(|(_, p)| p.direction == JsonDirection::Input);
    let others = json.ports.iter().filter(|(_, p)| p.direction != JsonDirection::Input);
    for (port_name, port) in inputs.chain(others) {
        pending.push(PendingWire {
            name: port_name,
            bits: &port.bits,
            port: Some(port.direction.into()),
            attributes: json.netnames.get(port_name).map(|n| &n.attributes),
        });
    }
    let nets = json.netnames.iter().filter(|(n, _)| !json.ports.contains_key(*n));
    let (public, hidden): (Vec<_>, Vec<_>) = nets.partition(|(_, n)| n.hide_name == 0);
    for (net_name, net) in public.into_iter().chain(hidden) {
        pending.push(PendingWire {
            name: net_name,
            bits: &net.bits,
            port: None,
            attributes: Some(&net.attributes),
        });
    }

    let mut owner: HashMap<u64, SigBit> = HashMap::new();
    for wire in pending {
        let id = module.add_wire(wire.name, wire.bits.len() as u32)?;
        module.set_port(id, wire.port);
        if let Some(attrs) = wire.attributes {
            module.wire_mut(id).attributes = decode_attrs(attrs);
        }

        let mut lhs = SigSpec::new();
        let mut rhs = SigSpec::new();
        for (offset, bit) in wire.bits.iter().enumerate() {
            let here = SigBit::wire(id, offset as u32);
            match bit {
                JsonBit::Net(n) => match owner.get(n) {
                    Some(existing) => {
                        lhs.push(here);
                        rhs.push(*existing);
                    }
                    None => {
                        owner.insert(*n, here);
                    }
                },
                JsonBit::Const(s) => {
                    lhs.push(here);
                    rhs.push(decode_const(s)?);
                }
            }
        }
        if !lhs.is_empty() {
            module.connect(lhs, rhs)?;
        }
    }

    for (cell_name, json_cell) in &json.cells {
        let kind = CellKind::from_type_str(&json_cell.cell_type);
        let is_other = kind.is_other();
        let id = module.add_cell(cell_name.as_str(), kind)?;

        let mut connections = IndexMap::new();
        for (port, bits) in &json_cell.connections {
            let mut sig = SigSpec::new();
            for bit in bits {
                sig.push(match bit {
                    JsonBit::Net(n) => match owner.get(n) {
                        Some(existing) => *existing,
                        None => {
                            let auto = module.fresh_wire("auto", 1);
                            let bit = SigBit::wire(auto, 0);
                            owner.insert(*n, bit);
                            debug!("net {n} has no name; created '{}'", module.wire(auto).name());
                            bit
                        }
                    },
                    JsonBit::Const(s) => decode_const(s)?,
                });
            }
            connections.insert(port.clone(), sig);
        }

        let cell = module.cell_mut(id);
        cell.connections = connections;
        cell.parameters = decode_attrs(&json_cell.parameters);
        cell.attributes = decode_attrs(&json_cell.attributes);
        if is_other {
            cell.port_directions = json_cell
                .port_directions
                .iter()
                .map(|(port, dir)| (port.clone(), PortDirection::from(*dir)))
                .collect();
        }
    }

    debug!(
        "imported module '{}': {} wires, {} cells, {} connections",
        module.name(),
        module.wire_count(),
        module.cell_count(),
        module.connections().len()
    );
    Ok(module)
}

fn decode_const(s: &str) -> Result<SigBit, NetlistError> {
    match s {
        "0" => Ok(SigBit::Zero),
        "1" => Ok(SigBit::One),
        "x" | "z" => Ok(SigBit::Undef),
        other => Err(NetlistError::malformed(format!("unknown constant bit '{other}'"))),
    }
}

/// Whether `s` consists only of Yosys constant digits.
fn is_bit_string(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| matches!(c, '0' | '1' | 'x' | 'z'))
}

fn decode_value(value: &JsonValue) -> AttrValue {
    match value {
        JsonValue::Int(v) => AttrValue::Int(*v),
        JsonValue::Str(s) if is_bit_string(s) => {
            let v = s
                .chars()
                .fold(0u64, |acc, c| acc.wrapping_shl(1) | u64::from(c == '1'));
            AttrValue::Int(v as i64)
        }
        JsonValue::Str(s) => match s.strip_suffix(' ') {
            Some(stripped) if is_bit_string(stripped) => AttrValue::Str(stripped.to_owned()),
            _ => AttrValue::Str(s.clone()),
        },
    }
}

fn decode_attrs(attrs: &IndexMap<String, JsonValue>) -> AttrMap {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

// -------------------------------------------------------------------------
// Export
// -------------------------------------------------------------------------

/// Assigns net numbers to canonical bits.
struct BitNumbering {
    /// Canonicalization of connected bits.
    sigmap: SigMap,
    /// Numbers assigned so far.
    ids: HashMap<SigBit, u64>,
    /// Next free number; Yosys reserves 0 and 1.
    next: u64,
}

impl BitNumbering {
    fn new(module: &Module) -> Self {
        Self {
            sigmap: SigMap::new(module),
            ids: HashMap::new(),
            next: 2,
        }
    }

    fn bit(&mut self, bit: SigBit) -> JsonBit {
        match self.sigmap.find(bit) {
            SigBit::Zero => JsonBit::Const("0".into()),
            SigBit::One => JsonBit::Const("1".into()),
            SigBit::Undef => JsonBit::Const("x".into()),
            canonical => {
                let next = &mut self.next;
                let id = *self.ids.entry(canonical).or_insert_with(|| {
                    let id = *next;
                    *next += 1;
                    id
                });
                JsonBit::Net(id)
            }
        }
    }

    fn sig(&mut self, sig: &SigSpec) -> Vec<JsonBit> {
        sig.iter().map(|bit| self.bit(*bit)).collect()
    }
}

fn export_module(module: &Module) -> JsonModule {
    let mut numbering = BitNumbering::new(module);

    let mut ports = IndexMap::new();
    for (id, wire) in module.ports() {
        if let Some(dir) = wire.port {
            ports.insert(
                wire.name().to_owned(),
                JsonPort {
                    direction: dir.into(),
                    bits: numbering.sig(&module.sig(id)),
                },
            );
        }
    }

    let mut netnames = IndexMap::new();
    for (id, wire) in module.wires() {
        netnames.insert(
            wire.name().to_owned(),
            JsonNet {
                hide_name: u8::from(wire.name().starts_with('$')),
                bits: numbering.sig(&module.sig(id)),
                attributes: encode_attrs(&wire.attributes),
            },
        );
    }

    let mut cells = IndexMap::new();
    for (_, cell) in module.cells() {
        cells.insert(
            cell.name().to_owned(),
            JsonCell {
                hide_name: u8::from(cell.name().starts_with('$')),
                cell_type: cell.kind.as_str().to_owned(),
                parameters: encode_attrs(&cell.parameters),
                attributes: encode_attrs(&cell.attributes),
                port_directions: cell
                    .connections
                    .keys()
                    .map(|port| (port.clone(), cell.port_direction(port).into()))
                    .collect(),
                connections: cell
                    .connections
                    .iter()
                    .map(|(port, sig)| (port.clone(), numbering.sig(sig)))
                    .collect(),
            },
        );
    }

    JsonModule {
        attributes: encode_attrs(&module.attributes),
        ports,
        cells,
        netnames,
    }
}

fn encode_value(value: &AttrValue) -> JsonValue {
    match value {
        AttrValue::Int(v) if (0..=i64::from(u32::MAX)).contains(v) => {
            JsonValue::Str(format!("{:032b}", *v as u32))
        }
        AttrValue::Int(v) => JsonValue::Str(format!("{:064b}", *v as u64)),
        AttrValue::Str(s) if is_bit_string(s) => JsonValue::Str(format!("{s} ")),
        AttrValue::Str(s) => JsonValue::Str(s.clone()),
    }
}

fn encode_attrs(attrs: &AttrMap) -> IndexMap<String, JsonValue> {
    attrs
        .iter()
        .map(|(k, v)| (k.to_owned(), encode_value(v)))
        .collect()
}
