//! Attribute names shared between the propagation pass, the TMR engine and
//! downstream tooling.
//!
//! Every object the engine creates or rewrites carries one or more of these
//! so that any member of a replica triple (and every voter cell) can be found
//! again from the netlist alone.

/// Marks a module, cell or wire as eligible for triplication.
pub const TRIPLICATE: &str = "tamara_triplicate";

/// Excludes a module, cell or wire from triplication.
pub const IGNORE: &str = "tamara_ignore";

/// Integer id of the logic cone that owns an object.
pub const CONE: &str = "tamara_cone";

/// Replica index (1 or 2) of a cloned object.
pub const REPLICA: &str = "tamara_replica";

/// Name of the object a replica was cloned from.
pub const REPLICA_OF: &str = "tamara_replica_of";

/// Set on the original member of a replica triple.
pub const ORIGINAL: &str = "tamara_original";

/// Integer id of the voter instance a cell or wire belongs to.
pub const VOTER: &str = "tamara_voter";

/// Marks the 1-bit wire that receives the aggregated voter error.
pub const ERROR_SINK: &str = "tamara_error_sink";

/// Name suffix given to the `k`-th replica of `name` in cone `cone`.
pub fn replica_name(name: &str, k: u8, cone: u32) -> String {
    format!("{name}__replica{k}_cone{cone}__")
}
