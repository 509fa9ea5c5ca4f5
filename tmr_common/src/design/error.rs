use thiserror::Error;

/// Errors raised by the netlist model and its importers.
#[derive(Debug, Error)]
pub enum NetlistError {
    /// Two objects of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// Object kind (`wire`, `cell`, `module`).
        kind: &'static str,
        /// Offending name.
        name: String,
    },

    /// A lookup by name failed.
    #[error("no {kind} named '{name}'")]
    NotFound {
        /// Object kind.
        kind: &'static str,
        /// Requested name.
        name: String,
    },

    /// Two signals that must have equal width do not.
    #[error("width mismatch in {context}: {left} vs {right} bits")]
    WidthMismatch {
        /// Where the mismatch occurred.
        context: String,
        /// Width of the first signal.
        left: u32,
        /// Width of the second signal.
        right: u32,
    },

    /// A structural consistency check failed.
    #[error("module '{module}' is inconsistent: {reason}")]
    Inconsistent {
        /// Module name.
        module: String,
        /// What is wrong.
        reason: String,
    },

    /// The JSON netlist could not be interpreted.
    #[error("malformed netlist: {0}")]
    Malformed(String),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Reading or writing a netlist file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NetlistError {
    /// Helper to create a duplicate-name error.
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Helper to create a lookup failure.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Helper to create a width mismatch.
    pub fn width_mismatch(context: impl Into<String>, left: u32, right: u32) -> Self {
        Self::WidthMismatch {
            context: context.into(),
            left,
            right,
        }
    }

    /// Helper to create a consistency failure.
    pub fn inconsistent(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Helper to create a malformed-input error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
