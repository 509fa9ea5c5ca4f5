//! Configuration for the TMR pass.

use serde::{Deserialize, Serialize};

/// Options controlling a TMR run.
///
/// Serializable so a run can be described in a JSON file next to the netlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmrConfig {
    /// Name of the 1-bit wire that receives the aggregated voter error.
    /// When unset, the wire carrying `tamara_error_sink` is used.
    pub error_sink: Option<String>,
    /// Fail the run instead of warning when a multi-driven net survives wire repair.
    pub strict_repair: bool,
    /// Run the netlist consistency check after each structural mutation.
    pub check_netlist: bool,
    /// Modules to transform. Empty selects every module annotated for triplication.
    pub modules: Vec<String>,
}

impl TmrConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> TmrConfigBuilder {
        TmrConfigBuilder::default()
    }
}

/// Builder for [`TmrConfig`].
#[derive(Clone, Debug, Default)]
pub struct TmrConfigBuilder {
    /// Configuration under construction.
    config: TmrConfig,
}

impl TmrConfigBuilder {
    /// Sets the error sink wire name.
    pub fn error_sink(mut self, name: impl Into<String>) -> Self {
        self.config.error_sink = Some(name.into());
        self
    }

    /// Sets whether unresolved multi-driven nets are fatal.
    pub const fn strict_repair(mut self, strict: bool) -> Self {
        self.config.strict_repair = strict;
        self
    }

    /// Sets whether to check netlist consistency after mutations.
    pub const fn check_netlist(mut self, check: bool) -> Self {
        self.config.check_netlist = check;
        self
    }

    /// Adds a module to the selection.
    pub fn module(mut self, name: impl Into<String>) -> Self {
        self.config.modules.push(name.into());
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> TmrConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = TmrConfig::builder()
            .error_sink("err")
            .strict_repair(true)
            .module("top")
            .build();
        assert_eq!(cfg.error_sink.as_deref(), Some("err"));
        assert!(cfg.strict_repair);
        assert!(!cfg.check_netlist);
        assert_eq!(cfg.modules, vec!["top".to_owned()]);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let cfg: TmrConfig = serde_json::from_str(r#"{ "strict_repair": true }"#).unwrap();
        assert_eq!(cfg, TmrConfig::builder().strict_repair(true).build());
    }
}
