//! Driver configuration surface, parsed from the command line ('s
//! external interface).

use std::path::PathBuf;

use clap::Parser;

/// Reconstruct a typed memory graph from a stopped debugger session.
#[derive(Debug, Parser)]
#[command(name = "memoracle", version, about, long_about = None)]
pub struct Config {
    /// Symbol or `file:line` to break at before the traversal starts.
    #[arg(long, value_name = "LOCATION")]
    pub breakpoint: Option<String>,

    /// How many times the chosen breakpoint must be hit before the
    /// traversal begins. `1` (the default) stops and traverses on the
    /// first hit.
    #[arg(long, default_value_t = 1)]
    pub iterations: u64,

    /// Where to write the Graphviz DOT rendering of the traversed graph.
    #[arg(long, short, value_name = "PATH", default_value = "memorygraph.dot")]
    pub output: PathBuf,

    /// Also instrument the matching deallocator, purging freed blocks from
    /// the allocation tracker as the inferior runs.
    #[arg(long)]
    pub track_deallocations: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_one_iteration_and_the_spec_named_output_file() {
        let config = Config::parse_from(["memoracle"]);
        assert_eq!(config.iterations, 1);
        assert_eq!(config.output, PathBuf::from("memorygraph.dot"));
        assert!(!config.track_deallocations);
    }

    #[test]
    fn flags_parse() {
        let config = Config::parse_from([
            "memoracle",
            "--breakpoint",
            "main",
            "--iterations",
            "5000",
            "--output",
            "out.dot",
            "--track-deallocations",
        ]);
        assert_eq!(config.breakpoint.as_deref(), Some("main"));
        assert_eq!(config.iterations, 5000);
        assert_eq!(config.output, PathBuf::from("out.dot"));
        assert!(config.track_deallocations);
    }
}
