use std::fmt;

use super::WireId;

/// A single bit of a signal: either a constant or one bit of a wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SigBit {
    /// Constant low.
    Zero,
    /// Constant high.
    One,
    /// Undefined value (Yosys `x`/`z`).
    Undef,
    /// Bit `offset` of `wire`.
    Wire {
        /// The wire.
        wire: WireId,
        /// Bit position inside the wire, LSB first.
        offset: u32,
    },
}

impl SigBit {
    /// A wire bit.
    pub const fn wire(wire: WireId, offset: u32) -> Self {
        Self::Wire { wire, offset }
    }

    /// A constant bit for `value`.
    pub const fn constant(value: bool) -> Self {
        if value { Self::One } else { Self::Zero }
    }

    /// Whether this bit is a constant (including undefined).
    pub const fn is_const(&self) -> bool {
        !matches!(self, Self::Wire { .. })
    }

    /// The wire this bit belongs to, if any.
    pub const fn as_wire(&self) -> Option<(WireId, u32)> {
        match *self {
            Self::Wire { wire, offset } => Some((wire, offset)),
            _ => None,
        }
    }
}

impl fmt::Display for SigBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "1'0"),
            Self::One => write!(f, "1'1"),
            Self::Undef => write!(f, "1'x"),
            Self::Wire { wire, offset } => write!(f, "{wire}[{offset}]"),
        }
    }
}

/// An ordered concatenation of bits, LSB first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SigSpec {
    /// The bits.
    bits: Vec<SigBit>,
}

impl SigSpec {
    /// An empty signal.
    pub const fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// All bits of a wire of the given width.
    pub fn from_wire(wire: WireId, width: u32) -> Self {
        (0..width).map(|offset| SigBit::wire(wire, offset)).collect()
    }

    /// A single bit.
    pub fn from_bit(bit: SigBit) -> Self {
        Self { bits: vec![bit] }
    }

    /// A constant of `width` bits holding the low bits of `value`.
    pub fn constant(value: u64, width: u32) -> Self {
        (0..width)
            .map(|i| SigBit::constant(i < 64 && (value >> i) & 1 == 1))
            .collect()
    }

    /// Number of bits.
    pub fn width(&self) -> u32 {
        self.bits.len() as u32
    }

    /// Whether the signal has no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The bits, LSB first.
    pub fn bits(&self) -> &[SigBit] {
        &self.bits
    }

    /// Mutable access to the bits.
    pub fn bits_mut(&mut self) -> &mut [SigBit] {
        &mut self.bits
    }

    /// Bit `index`.
    pub fn bit(&self, index: usize) -> Option<SigBit> {
        self.bits.get(index).copied()
    }

    /// Appends the bits of `other`.
    pub fn append(&mut self, other: &Self) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Appends one bit.
    pub fn push(&mut self, bit: SigBit) {
        self.bits.push(bit);
    }

    /// Iterates over the bits.
    pub fn iter(&self) -> std::slice::Iter<'_, SigBit> {
        self.bits.iter()
    }

    /// Distinct wires referenced by this signal, in order of first appearance.
    pub fn wires(&self) -> Vec<WireId> {
        let mut seen = Vec::new();
        for (wire, _) in self.bits.iter().filter_map(SigBit::as_wire) {
            if !seen.contains(&wire) {
                seen.push(wire);
            }
        }
        seen
    }
}

impl FromIterator<SigBit> for SigSpec {
    fn from_iter<T: IntoIterator<Item = SigBit>>(iter: T) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SigSpec {
    type Item = &'a SigBit;
    type IntoIter = std::slice::Iter<'a, SigBit>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.iter()
    }
}

impl From<SigBit> for SigSpec {
    fn from(bit: SigBit) -> Self {
        Self::from_bit(bit)
    }
}

impl fmt::Display for SigSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, bit) in self.bits.iter().rev().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{bit}")?;
        }
        write!(f, "}}")
    }
}
