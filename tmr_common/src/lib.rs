//! Common netlist model and shared types for the TMR workspace.
//!
//! This crate provides the host netlist (modules, cells, wires and signal
//! expressions), the `tamara_*` annotation vocabulary, configuration, Yosys JSON
//! import/export, a small cycle simulator and the reference designs used
//! across the workspace's tests.

pub mod annotations;
mod config;
pub mod design;
mod fixtures;
pub mod sim;
pub mod yosys_json;

pub use crate::config::*;
pub use crate::design::*;
pub use crate::fixtures::*;
