//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sketchlearn_smt::facts::EncodingMode;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Learn width-bounded policy sketches from precomputed problem classes.\n\n\
    Typical session:\n  \
    1. sketchlearn facts problems.json\n  \
    2. sketchlearn learn problems.json --out sketch.txt\n  \
    3. sketchlearn verify problems.json sketch.txt\n\n\
    Learning options can be given as a JSON file with --config; flags override it.";

#[derive(Parser)]
#[command(name = "sketchlearn")]
#[command(about = "Learn and verify policy sketches for classical planning domains")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// JSON file with learner options
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum EncodingArg {
    D2,
    Explicit,
}

impl From<EncodingArg> for EncodingMode {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::D2 => EncodingMode::D2,
            EncodingArg::Explicit => EncodingMode::Explicit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SolverArg {
    /// External z3 process
    Z3,
    /// In-process enumeration, for small problem classes
    Exhaustive,
}

/// Flags that override the options file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct LearnFlags {
    /// Novelty width of the tuple graphs
    #[arg(long)]
    pub(crate) width: Option<usize>,

    /// Rule encoding
    #[arg(long, value_enum)]
    pub(crate) encoding: Option<EncodingArg>,

    /// Rule slots in explicit mode
    #[arg(long)]
    pub(crate) max_rules: Option<usize>,

    /// Require the selected features to separate goals from non-goals
    #[arg(long)]
    pub(crate) goal_separation: bool,

    /// Require every subgoal to be the closest compatible state
    #[arg(long)]
    pub(crate) optimal_width: bool,

    /// Wall-clock budget in seconds (0 = unbounded)
    #[arg(long)]
    pub(crate) timeout: Option<u64>,

    /// Budget of one solver call in seconds (0 = unbounded)
    #[arg(long)]
    pub(crate) solver_timeout: Option<u64>,

    /// Keep every generated feature
    #[arg(long)]
    pub(crate) no_prune: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Learn a sketch that solves every instance of a problem class
    Learn {
        /// Problem-class JSON file
        problems: PathBuf,

        #[command(flatten)]
        flags: LearnFlags,

        /// Solver backend
        #[arg(long, value_enum, default_value = "z3")]
        solver: SolverArg,

        /// Path to the z3 executable
        #[arg(long, default_value = "z3")]
        z3: String,

        /// Write the sketch as policy text
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the minimized sketch as policy text
        #[arg(long)]
        minimized_out: Option<PathBuf>,

        /// Write every fact set into this directory
        #[arg(long)]
        dump_facts: Option<PathBuf>,

        /// Output format: text or json
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a stored sketch against every instance of a problem class
    Verify {
        /// Problem-class JSON file
        problems: PathBuf,

        /// Sketch in policy text
        sketch: PathBuf,

        /// Output format: text or json
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the fact set of the first learning iteration
    Facts {
        /// Problem-class JSON file
        problems: PathBuf,

        /// Rule encoding
        #[arg(long, value_enum)]
        encoding: Option<EncodingArg>,
    },
}
