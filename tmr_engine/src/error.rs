use thiserror::Error;
use tmr_common::NetlistError;

use crate::ConeId;

/// Fatal conditions that abort a TMR run.
///
/// Every structural variant names the offending object, the cone it was
/// found in and the rule it breaks.
#[derive(Debug, Error)]
pub enum TmrError {
    /// `replicate` was asked to copy a boundary net.
    #[error("cone {cone}: '{name}' is a boundary net and cannot be replicated")]
    ReplicateBoundary {
        /// Net name.
        name: String,
        /// Owning cone.
        cone: ConeId,
    },

    /// Search recorded an input terminal that is neither sequential nor boundary.
    #[error(
        "cone {cone}: input terminal '{name}' is a {kind} node; \
         terminals must be sequential or boundary"
    )]
    BadTerminal {
        /// Object name.
        name: String,
        /// Owning cone.
        cone: ConeId,
        /// Variant that was found.
        kind: &'static str,
    },

    /// The selected voter cut point is not an element.
    #[error("cone {cone}: the voter cut point is not a cell")]
    NoCutPoint {
        /// The cone.
        cone: ConeId,
    },

    /// The cut point has no recorded replicas.
    #[error("cone {cone}: cut point '{name}' was not replicated")]
    NotReplicated {
        /// Object name.
        name: String,
        /// Owning cone.
        cone: ConeId,
    },

    /// The cut point cell does not have exactly one output port.
    #[error("cone {cone}: cell '{name}' has {count} output ports; a voter needs exactly one")]
    MultiOutput {
        /// Cell name.
        name: String,
        /// Owning cone.
        cone: ConeId,
        /// Number of output ports found.
        count: usize,
    },

    /// The cone's output net is only partially driven by the cone.
    #[error(
        "cone {cone}: output '{name}' has {drivers} separate drivers; \
         partially covered outputs are unsupported"
    )]
    SpecialWiring {
        /// Net name.
        name: String,
        /// Owning cone.
        cone: ConeId,
        /// Number of original driver attachments.
        drivers: usize,
    },

    /// Voter inputs and output differ in width.
    #[error("voter inputs must match the output width: a={a}, b={b}, c={c}, out={out}")]
    VoterWidth {
        /// Width of input `a`.
        a: u32,
        /// Width of input `b`.
        b: u32,
        /// Width of input `c`.
        c: u32,
        /// Width of the output.
        out: u32,
    },

    /// The error sink is not a single bit.
    #[error("error sink is {width} bits wide; it must be a single bit")]
    ErrorSinkWidth {
        /// Actual width.
        width: u32,
    },

    /// `finalise` was called before any voter was built.
    #[error("no voters were built; there is no error signal to aggregate")]
    NoVoters,

    /// The configured error sink wire does not exist.
    #[error("module '{module}' has no error sink wire '{name}'")]
    UnknownErrorSink {
        /// Module name.
        module: String,
        /// Requested wire.
        name: String,
    },

    /// A selected module does not exist.
    #[error("design has no module '{0}'")]
    UnknownModule(String),

    /// Nets still have several drivers after repair and strict mode is on.
    #[error(
        "module '{module}': {} net(s) still have multiple drivers after repair: {}",
        .nets.len(),
        .nets.join(", ")
    )]
    UnresolvedDrivers {
        /// Module name.
        module: String,
        /// Offending nets.
        nets: Vec<String>,
    },

    /// Error reported by the netlist model.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
}

impl TmrError {
    /// Helper to create a bad-terminal error.
    pub fn bad_terminal(name: impl Into<String>, cone: ConeId, kind: &'static str) -> Self {
        Self::BadTerminal {
            name: name.into(),
            cone,
            kind,
        }
    }
}
