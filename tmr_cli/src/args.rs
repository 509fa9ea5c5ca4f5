use std::path::PathBuf;

use clap::Parser;
use tmr_common::TmrConfig;

/// TMR - Triplicate annotated logic in a Yosys JSON netlist
#[derive(Parser, Debug)]
#[command(name = "tmr")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input netlist (Yosys JSON)
    pub input: PathBuf,

    /// Path to write the transformed netlist to
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Module to triplicate, even if it carries no `tamara_triplicate` attribute (repeatable)
    #[arg(short = 'm', long = "module")]
    pub modules: Vec<String>,

    /// Name of the 1-bit wire that receives the aggregated voter error
    #[arg(long)]
    pub error_sink: Option<String>,

    /// Fail instead of warning when a net keeps several drivers after repair
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Check netlist consistency after every cone
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Write a JSON report of every cone and voter to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Args {
    /// Convert command-line arguments into internal configuration
    pub fn to_config(&self) -> TmrConfig {
        let mut builder = TmrConfig::builder()
            .strict_repair(self.strict)
            .check_netlist(self.check);
        if let Some(sink) = &self.error_sink {
            builder = builder.error_sink(sink.as_str());
        }
        for module in &self.modules {
            builder = builder.module(module.as_str());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let args = Args::parse_from([
            "tmr",
            "in.json",
            "-o",
            "out.json",
            "-m",
            "top",
            "--error-sink",
            "alarm",
            "--strict",
        ]);
        let config = args.to_config();
        assert_eq!(config.modules, vec!["top"]);
        assert_eq!(config.error_sink.as_deref(), Some("alarm"));
        assert!(config.strict_repair);
        assert!(!config.check_netlist);
    }

    #[test]
    fn defaults_select_annotated_modules() {
        let args = Args::parse_from(["tmr", "in.json", "--output", "out.json"]);
        assert_eq!(args.to_config(), TmrConfig::default());
    }
}
