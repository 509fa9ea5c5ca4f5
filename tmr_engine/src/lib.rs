//! Logic-cone discovery, replication and voter insertion for triple modular
//! redundancy.
//!
//! A run over one module proceeds as:
//! 1. [`ConnectivityIndex::build`] records who drives what among the objects
//!    annotated for triplication.
//! 2. One [`LogicCone`] is seeded per output port and searched backwards to
//!    the nearest flip-flops and boundary nets.
//! 3. Each cone's interior is replicated twice, a majority [`VoterBuilder`]
//!    voter is inserted at its cut point and the [`FixWalkerManager`] repairs
//!    nets left with several drivers.
//! 4. Cones seeded at the previous cones' input terminals follow until the
//!    whole module is covered, then every voter's error output is ORed into
//!    the module's error sink.
//!
//! [`run_module`] and [`run_design`] drive the whole sequence.

pub mod cone;
mod error;
pub mod fix_walker;
pub mod index;
pub mod node;
mod pass;
pub mod propagate;
mod state;
pub mod voter;

pub use cone::{ConeSummary, LogicCone, ReplicationStats, SearchState};
pub use error::TmrError;
pub use fix_walker::{FixOutcome, FixWalker, FixWalkerManager, MultiDriverFixer, find_multi_driven};
pub use index::ConnectivityIndex;
pub use node::{GraphNode, NodeArena, NodeHandle, NodeKind, NodeRef};
pub use pass::{TmrReport, run_design, run_module};
pub use propagate::{PropagateReport, propagate};
pub use state::{ConeId, EngineState};
pub use voter::VoterBuilder;
