// Command handler for: Verify

use std::path::PathBuf;

use serde::Serialize;
use sketchlearn_engine::features::evaluate_features;
use sketchlearn_engine::verifier::SketchVerifier;
use sketchlearn_ir::feature::FeaturePool;
use sketchlearn_ir::sketch::Sketch;
use tracing::debug;

use super::helpers::{is_json, load_options, prepare, print_json, read_problem};
use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
pub(crate) struct InstanceVerdict {
    pub(crate) instance: String,
    pub(crate) num_states: usize,
    pub(crate) solved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_width: Option<usize>,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    sketch: String,
    solved: usize,
    failed: usize,
    rejected_instances: Vec<String>,
    instances: Vec<InstanceVerdict>,
}

/// Returns the exit code: 0 when every instance is solved, 1 otherwise.
pub(crate) fn run_verify_command(
    problems: PathBuf,
    sketch_path: PathBuf,
    config: Option<PathBuf>,
    format: OutputFormat,
) -> miette::Result<i32> {
    let problem = read_problem(&problems)?;
    let options = load_options(config.as_deref())?;
    let text = std::fs::read_to_string(&sketch_path)
        .map_err(|e| miette::miette!("cannot read {}: {e}", sketch_path.display()))?;
    let pool: FeaturePool = problem.features.iter().cloned().collect();
    let sketch = Sketch::parse_policy_text(&text, &pool)
        .map_err(|e| miette::miette!("{}: {e}", sketch_path.display()))?;
    let prepared = prepare(&problem, &options)?;

    let verifier = SketchVerifier::from_options(&options);
    let mut verdicts = Vec::with_capacity(prepared.instances.len());
    for instance in &prepared.instances {
        let table = evaluate_features(
            &problem,
            sketch.features().iter().map(|(id, feature)| (*id, feature)),
            instance,
        )
        .map_err(|e| miette::miette!("{e}"))?;
        let verdict = match verifier.solves(&sketch, instance, &table) {
            Ok(witness) => InstanceVerdict {
                instance: instance.name.clone(),
                num_states: instance.num_states(),
                solved: true,
                failure: None,
                max_width: witness.max_width(),
            },
            Err(failure) => InstanceVerdict {
                instance: instance.name.clone(),
                num_states: instance.num_states(),
                solved: false,
                failure: Some(failure.to_string()),
                max_width: None,
            },
        };
        debug!(instance = %verdict.instance, solved = verdict.solved, "Verified instance");
        verdicts.push(verdict);
    }

    let solved = verdicts.iter().filter(|v| v.solved).count();
    let report = VerifyReport {
        sketch: sketch.to_policy_text(),
        solved,
        failed: verdicts.len() - solved,
        rejected_instances: prepared.rejected.iter().map(|r| r.name.clone()).collect(),
        instances: verdicts,
    };
    let code = i32::from(report.failed > 0);
    if is_json(format) {
        print_json(&report)?;
    } else {
        print!("{}", render_verify_text(&report.instances));
        println!("{} of {} instances solved", report.solved, report.instances.len());
    }
    Ok(code)
}

pub(crate) fn render_verify_text(verdicts: &[InstanceVerdict]) -> String {
    let mut out = String::new();
    for verdict in verdicts {
        match &verdict.failure {
            None => out.push_str(&format!(
                "ok    {} ({} states, width {})\n",
                verdict.instance,
                verdict.num_states,
                verdict.max_width.unwrap_or(0)
            )),
            Some(failure) => out.push_str(&format!(
                "FAIL  {} ({} states): {failure}\n",
                verdict.instance, verdict.num_states
            )),
        }
    }
    out
}
