// Command handler for: Facts

use std::path::PathBuf;

use sketchlearn_engine::RefinementLoop;
use sketchlearn_smt::backends::exhaustive::ExhaustiveSolver;

use super::helpers::{load_options, prepare, read_problem};
use crate::cli::EncodingArg;

/// Prints the fact set the learner would hand to the solver first.
pub(crate) fn run_facts_command(
    problems: PathBuf,
    config: Option<PathBuf>,
    encoding: Option<EncodingArg>,
) -> miette::Result<()> {
    let problem = read_problem(&problems)?;
    let mut options = load_options(config.as_deref())?;
    if let Some(encoding) = encoding {
        options.encoding = encoding.into();
    }
    let prepared = prepare(&problem, &options)?;
    // Encoding never calls the solver.
    let learner = RefinementLoop::new(&problem, &problem, ExhaustiveSolver::new(), options);
    let facts = learner
        .first_iteration_facts(&prepared.instances)
        .map_err(|e| miette::miette!("{e}"))?;
    print!("{facts}");
    Ok(())
}
