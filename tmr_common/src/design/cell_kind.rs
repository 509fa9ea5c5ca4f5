use std::fmt;
use std::fmt::Formatter;
use std::hash::Hash;

/// Direction of a cell or module port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortDirection {
    /// Signal flows into the cell / module.
    Input,
    /// Signal flows out of the cell / module.
    Output,
    /// Bidirectional.
    Inout,
}

impl PortDirection {
    /// Yosys JSON spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Inout => "inout",
        }
    }
}

/// Categorizes the Yosys internal cell library into the types the engine
/// understands.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKind {
    /// Buffer / Identity gate (`$buf`, `$pos`).
    Buf,
    /// Inverter gate.
    Not,
    /// Bitwise AND gate.
    And,
    /// Bitwise OR gate.
    Or,
    /// Bitwise XOR gate.
    Xor,
    /// Bitwise XNOR gate.
    Xnor,
    /// Multiplexer: `Y = S ? B : A`.
    Mux,
    /// AND-reduction of all input bits.
    ReduceAnd,
    /// OR-reduction of all input bits.
    ReduceOr,
    /// XOR-reduction of all input bits.
    ReduceXor,
    /// Logical negation (`!A`).
    LogicNot,
    /// Logical AND (`A && B`).
    LogicAnd,
    /// Logical OR (`A || B`).
    LogicOr,
    /// Equality comparator.
    Eq,
    /// Inequality comparator.
    Ne,
    /// Adder.
    Add,
    /// Full adder with carry (`X`) and sum (`Y`) outputs.
    Fa,
    /// Plain D flip-flop.
    Dff,
    /// D flip-flop with enable.
    Dffe,
    /// D flip-flop with asynchronous reset.
    Adff,
    /// D flip-flop with asynchronous reset and enable.
    Adffe,
    /// D flip-flop with synchronous reset.
    Sdff,
    /// D flip-flop with synchronous reset and enable, reset over enable.
    Sdffe,
    /// D flip-flop with synchronous reset and enable, enable over reset.
    Sdffce,
    /// Transparent latch.
    Dlatch,
    /// Transparent latch with asynchronous reset.
    Adlatch,
    /// Any other cell type (user module instance or unsupported primitive).
    Other(String),
}

impl CellKind {
    /// Parses a Yosys cell type name.
    pub fn from_type_str(ty: &str) -> Self {
        match ty {
            "$buf" | "$pos" => Self::Buf,
            "$not" => Self::Not,
            "$and" => Self::And,
            "$or" => Self::Or,
            "$xor" => Self::Xor,
            "$xnor" => Self::Xnor,
            "$mux" => Self::Mux,
            "$reduce_and" => Self::ReduceAnd,
            "$reduce_or" | "$reduce_bool" => Self::ReduceOr,
            "$reduce_xor" => Self::ReduceXor,
            "$logic_not" => Self::LogicNot,
            "$logic_and" => Self::LogicAnd,
            "$logic_or" => Self::LogicOr,
            "$eq" => Self::Eq,
            "$ne" => Self::Ne,
            "$add" => Self::Add,
            "$fa" => Self::Fa,
            "$dff" => Self::Dff,
            "$dffe" => Self::Dffe,
            "$adff" => Self::Adff,
            "$adffe" => Self::Adffe,
            "$sdff" => Self::Sdff,
            "$sdffe" => Self::Sdffe,
            "$sdffce" => Self::Sdffce,
            "$dlatch" => Self::Dlatch,
            "$adlatch" => Self::Adlatch,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The Yosys cell type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Buf => "$buf",
            Self::Not => "$not",
            Self::And => "$and",
            Self::Or => "$or",
            Self::Xor => "$xor",
            Self::Xnor => "$xnor",
            Self::Mux => "$mux",
            Self::ReduceAnd => "$reduce_and",
            Self::ReduceOr => "$reduce_or",
            Self::ReduceXor => "$reduce_xor",
            Self::LogicNot => "$logic_not",
            Self::LogicAnd => "$logic_and",
            Self::LogicOr => "$logic_or",
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Add => "$add",
            Self::Fa => "$fa",
            Self::Dff => "$dff",
            Self::Dffe => "$dffe",
            Self::Adff => "$adff",
            Self::Adffe => "$adffe",
            Self::Sdff => "$sdff",
            Self::Sdffe => "$sdffe",
            Self::Sdffce => "$sdffce",
            Self::Dlatch => "$dlatch",
            Self::Adlatch => "$adlatch",
            Self::Other(name) => name,
        }
    }

    /// Returns true for the flip-flop and latch family.
    #[must_use]
    pub const fn is_sequential(&self) -> bool {
        matches!(
            self,
            Self::Dff
                | Self::Dffe
                | Self::Adff
                | Self::Adffe
                | Self::Sdff
                | Self::Sdffe
                | Self::Sdffce
                | Self::Dlatch
                | Self::Adlatch
        )
    }

    /// Returns true for latches, which are transparent while enabled.
    #[must_use]
    pub const fn is_latch(&self) -> bool {
        matches!(self, Self::Dlatch | Self::Adlatch)
    }

    /// Returns true if the type is not part of the known cell library.
    #[must_use]
    pub const fn is_other(&self) -> bool {
        matches!(self, Self::Other(_))
    }

    /// Returns true for single-input gates with an `A` input and `Y` output.
    #[must_use]
    pub const fn is_unary(&self) -> bool {
        matches!(
            self,
            Self::Buf
                | Self::Not
                | Self::ReduceAnd
                | Self::ReduceOr
                | Self::ReduceXor
                | Self::LogicNot
        )
    }

    /// Returns true for two-input gates with `A`, `B` inputs and a `Y` output.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Or
                | Self::Xor
                | Self::Xnor
                | Self::LogicAnd
                | Self::LogicOr
                | Self::Eq
                | Self::Ne
                | Self::Add
        )
    }

    /// Ports of this cell type with their direction, or `None` for [`CellKind::Other`].
    #[must_use]
    pub const fn ports(&self) -> Option<&'static [(&'static str, PortDirection)]> {
        use PortDirection::{Input as I, Output as O};
        let ports: &'static [(&'static str, PortDirection)] = match self {
            Self::Buf
            | Self::Not
            | Self::ReduceAnd
            | Self::ReduceOr
            | Self::ReduceXor
            | Self::LogicNot => &[("A", I), ("Y", O)],
            Self::And
            | Self::Or
            | Self::Xor
            | Self::Xnor
            | Self::LogicAnd
            | Self::LogicOr
            | Self::Eq
            | Self::Ne
            | Self::Add => &[("A", I), ("B", I), ("Y", O)],
            Self::Mux => &[("A", I), ("B", I), ("S", I), ("Y", O)],
            Self::Fa => &[("A", I), ("B", I), ("C", I), ("X", O), ("Y", O)],
            Self::Dff => &[("CLK", I), ("D", I), ("Q", O)],
            Self::Dffe => &[("CLK", I), ("EN", I), ("D", I), ("Q", O)],
            Self::Adff => &[("CLK", I), ("ARST", I), ("D", I), ("Q", O)],
            Self::Adffe => &[("CLK", I), ("ARST", I), ("EN", I), ("D", I), ("Q", O)],
            Self::Sdff => &[("CLK", I), ("SRST", I), ("D", I), ("Q", O)],
            Self::Sdffe | Self::Sdffce => &[("CLK", I), ("SRST", I), ("EN", I), ("D", I), ("Q", O)],
            Self::Dlatch => &[("EN", I), ("D", I), ("Q", O)],
            Self::Adlatch => &[("EN", I), ("ARST", I), ("D", I), ("Q", O)],
            Self::Other(_) => return None,
        };
        Some(ports)
    }

    /// Direction of `port` for known cell types.
    #[must_use]
    pub fn port_direction(&self, port: &str) -> Option<PortDirection> {
        self.ports()?
            .iter()
            .find(|(name, _)| *name == port)
            .map(|(_, dir)| *dir)
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("$dff", true)]
    #[case("$sdffce", true)]
    #[case("$adlatch", true)]
    #[case("$not", false)]
    #[case("$fa", false)]
    #[case("my_module", false)]
    fn sequential_family(#[case] ty: &str, #[case] expected: bool) {
        assert_eq!(CellKind::from_type_str(ty).is_sequential(), expected);
    }

    #[rstest]
    #[case("$and")]
    #[case("$dffe")]
    #[case("$reduce_or")]
    #[case("custom_cell")]
    fn type_names_survive_parsing(#[case] ty: &str) {
        assert_eq!(CellKind::from_type_str(ty).as_str(), ty);
    }

    #[test]
    fn fa_has_two_outputs() {
        let outputs = CellKind::Fa
            .ports()
            .unwrap()
            .iter()
            .filter(|(_, d)| *d == PortDirection::Output)
            .count();
        assert_eq!(outputs, 2);
    }

    #[test]
    fn other_cells_have_no_known_ports() {
        assert_eq!(CellKind::Other("blackbox".into()).port_direction("A"), None);
    }
}
