#![allow(dead_code)]

use std::sync::OnceLock;

use tmr_common::{Design, Module, NetlistError, TmrConfig};
use tmr_engine::{TmrError, TmrReport, propagate, run_design};

pub fn init_test_logger() {
    static INIT: OnceLock<()> = OnceLock::new();
    let _ = INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Propagates annotations and runs the TMR pass over a single-module design.
pub fn transform(
    fixture: Result<Module, NetlistError>,
    config: &TmrConfig,
) -> Result<(Module, Module, TmrReport), TmrError> {
    let original = fixture?;
    let name = original.name().to_owned();
    let mut design = Design::from(original.clone());
    propagate(&mut design);
    let mut reports = run_design(&mut design, config)?;
    let report = reports.pop().ok_or_else(|| TmrError::UnknownModule(name.clone()))?;
    let transformed = design
        .module(&name)
        .cloned()
        .ok_or(TmrError::UnknownModule(name))?;
    Ok((original, transformed, report))
}

/// Assert that a condition holds, with detailed error message
#[macro_export]
macro_rules! assert_with_context {
    ($cond:expr, $context:expr) => {
        if !$cond {
            panic!(
                "Assertion failed: {}\nContext: {}",
                stringify!($cond),
                $context
            );
        }
    };
}

/// Assert that an invariant holds
#[macro_export]
macro_rules! assert_invariant {
    ($cond:expr, $invariant_name:expr) => {
        if !$cond {
            panic!(
                "Invariant violated: {}\nCondition: {}",
                $invariant_name,
                stringify!($cond)
            );
        }
    };
}
