use indexmap::IndexMap;
use tmr_common::{CellId, SigSpec, WireId};

/// Where a wire is referenced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentSite {
    /// A cell port binding.
    CellPort {
        /// The cell.
        cell: CellId,
        /// Port name.
        port: String,
    },
    /// One side of a module-level connection.
    Connection {
        /// Index into the module's connection list.
        index: usize,
    },
}

/// Whether an attachment drives the wire or reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentRole {
    /// The site drives the wire.
    Source,
    /// The site reads the wire.
    Sink,
}

/// One original signal expression a wire takes part in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Where the expression sits.
    pub site: AttachmentSite,
    /// Direction relative to the wire.
    pub role: AttachmentRole,
    /// The full signal expression at the site, as it was before any rewrite.
    pub sig: SigSpec,
}

/// Pre-mutation attachments of every indexed wire.
#[derive(Clone, Debug, Default)]
pub struct AttachmentTable {
    /// Attachments per wire, in discovery order.
    by_wire: IndexMap<WireId, Vec<Attachment>>,
}

impl AttachmentTable {
    /// Records an attachment of `wire`.
    pub fn push(&mut self, wire: WireId, attachment: Attachment) {
        self.by_wire.entry(wire).or_default().push(attachment);
    }

    /// All attachments of `wire`.
    pub fn get(&self, wire: WireId) -> &[Attachment] {
        self.by_wire.get(&wire).map_or(&[], Vec::as_slice)
    }

    /// Number of attachments of `wire` that drive it.
    pub fn source_count(&self, wire: WireId) -> usize {
        self.get(wire)
            .iter()
            .filter(|a| a.role == AttachmentRole::Source)
            .count()
    }
}
