use contracts::*;
use std::fmt;
use std::hash::Hash;

/// Index of a wire inside its owning [`Module`](super::Module).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId {
    /// The underlying raw integer index.
    inner: u32,
}

impl WireId {
    /// Creates a wire id from a raw integer.
    #[ensures(ret.inner == id)]
    pub const fn new(id: u32) -> Self {
        Self { inner: id }
    }

    /// Returns the index as a usize for array access.
    #[ensures(ret == self.inner as usize)]
    pub const fn as_usize(self) -> usize {
        self.inner as usize
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.inner)
    }
}

impl From<usize> for WireId {
    #[inline]
    fn from(id: usize) -> Self {
        Self { inner: id as u32 }
    }
}

impl From<WireId> for usize {
    #[inline]
    fn from(id: WireId) -> Self {
        id.inner as Self
    }
}

/// Index of a cell inside its owning [`Module`](super::Module).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    /// The underlying raw integer index.
    inner: u32,
}

impl CellId {
    /// Creates a cell id from a raw integer.
    #[ensures(ret.inner == id)]
    pub const fn new(id: u32) -> Self {
        Self { inner: id }
    }

    /// Returns the index as a usize for array access.
    #[ensures(ret == self.inner as usize)]
    pub const fn as_usize(self) -> usize {
        self.inner as usize
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.inner)
    }
}

impl From<usize> for CellId {
    #[inline]
    fn from(id: usize) -> Self {
        Self { inner: id as u32 }
    }
}

impl From<CellId> for usize {
    #[inline]
    fn from(id: CellId) -> Self {
        id.inner as Self
    }
}
