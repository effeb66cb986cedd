// Command handler for: Learn

use std::path::PathBuf;

use serde::Serialize;
use sketchlearn_engine::statistics::LearningStatistics;
use sketchlearn_engine::{LearnError, LearnerOptions, LearningOutcome, RefinementLoop};
use sketchlearn_ir::instance::InstanceData;
use sketchlearn_ir::problem::ProblemClass;
use sketchlearn_smt::backends::exhaustive::ExhaustiveSolver;
use sketchlearn_smt::backends::z3_process::Z3Solver;
use sketchlearn_smt::solver::ConstraintSolver;
use tracing::{error, info, warn};

use super::helpers::{
    apply_flags, is_json, load_options, prepare, print_json, read_problem, write_text,
};
use crate::cli::{LearnFlags, OutputFormat, SolverArg};

pub(crate) struct LearnArgs {
    pub(crate) problems: PathBuf,
    pub(crate) config: Option<PathBuf>,
    pub(crate) flags: LearnFlags,
    pub(crate) solver: SolverArg,
    pub(crate) z3: String,
    pub(crate) out: Option<PathBuf>,
    pub(crate) minimized_out: Option<PathBuf>,
    pub(crate) dump_facts: Option<PathBuf>,
    pub(crate) format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct LearnReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sketch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimized: Option<String>,
    rejected_instances: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<LearningStatistics>,
}

/// Runs the learner and returns the process exit code.
pub(crate) fn run_learn_command(args: LearnArgs) -> miette::Result<i32> {
    let problem = read_problem(&args.problems)?;
    let mut options = load_options(args.config.as_deref())?;
    apply_flags(&mut options, &args.flags);
    let prepared = prepare(&problem, &options)?;
    let rejected: Vec<String> = prepared.rejected.iter().map(|r| r.name.clone()).collect();

    let result = match args.solver {
        SolverArg::Z3 => {
            let solver = Z3Solver::with_command(args.z3.clone());
            learn_with(&problem, &prepared.instances, solver, options, &args)
        }
        SolverArg::Exhaustive => {
            learn_with(&problem, &prepared.instances, ExhaustiveSolver::new(), options, &args)
        }
    };

    match result {
        Ok(outcome) => {
            let sketch = outcome.sketch.to_policy_text();
            let minimized = outcome.minimized.to_policy_text();
            if let Some(path) = &args.out {
                write_text(path, &sketch)?;
            }
            if let Some(path) = &args.minimized_out {
                write_text(path, &minimized)?;
            }
            report(
                args.format,
                LearnReport {
                    status: "sketch_found",
                    error: None,
                    sketch: Some(sketch),
                    minimized: Some(minimized),
                    rejected_instances: rejected,
                    statistics: Some(outcome.statistics),
                },
            )?;
            Ok(0)
        }
        Err(e) => {
            let code = e.exit_code();
            let message = e.to_string();
            let (status, best) = match e {
                LearnError::Timeout { best } => {
                    let best = best.map(|sketch| sketch.to_policy_text());
                    match (&best, &args.out) {
                        (Some(text), Some(path)) => {
                            warn!(path = %path.display(), "Timed out; writing the best training sketch");
                            write_text(path, text)?;
                        }
                        _ => warn!("Timed out"),
                    }
                    ("timeout", best)
                }
                LearnError::NoSketchAtWidth { .. } => {
                    error!("{message}");
                    ("no_sketch", None)
                }
                LearnError::SolverInconclusive { .. } => {
                    error!("{message}");
                    ("inconclusive", None)
                }
                other => return Err(miette::miette!("learning failed: {other}")),
            };
            report(
                args.format,
                LearnReport {
                    status,
                    error: Some(message),
                    sketch: best,
                    minimized: None,
                    rejected_instances: rejected,
                    statistics: None,
                },
            )?;
            Ok(code)
        }
    }
}

fn learn_with<S: ConstraintSolver>(
    problem: &ProblemClass,
    instances: &[InstanceData],
    solver: S,
    options: LearnerOptions,
    args: &LearnArgs,
) -> Result<LearningOutcome, LearnError> {
    info!(
        solver = solver.name(),
        instances = instances.len(),
        width = options.width,
        encoding = ?options.encoding,
        "Learning sketch"
    );
    let mut learner = RefinementLoop::new(problem, problem, solver, options);
    if let Some(dir) = &args.dump_facts {
        learner = learner.with_fact_dump(dir.clone());
    }
    learner.run(instances)
}

fn report(format: OutputFormat, report: LearnReport) -> miette::Result<()> {
    if is_json(format) {
        return print_json(&report);
    }
    println!("Result: {}", report.status);
    if let Some(error) = &report.error {
        println!("Reason: {error}");
    }
    if !report.rejected_instances.is_empty() {
        println!("Rejected: {}", report.rejected_instances.join(", "));
    }
    if let Some(sketch) = &report.sketch {
        println!("\nSketch:\n{sketch}");
    }
    let minimized = report.minimized.as_ref().filter(|m| Some(*m) != report.sketch.as_ref());
    if let Some(minimized) = minimized {
        println!("Minimized sketch:\n{minimized}");
    }
    if let Some(statistics) = &report.statistics {
        print!("{statistics}");
    }
    Ok(())
}
