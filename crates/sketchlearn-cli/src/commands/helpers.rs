// Shared helpers of the command handlers: input loading, option merging and
// output writing.

use std::path::Path;

use miette::IntoDiagnostic;
use serde::Serialize;
use sketchlearn_engine::instances::{prepare_instances, PreparedInstances};
use sketchlearn_engine::LearnerOptions;
use sketchlearn_ir::problem::ProblemClass;

use crate::cli::{LearnFlags, OutputFormat};

pub(crate) fn read_problem(path: &Path) -> miette::Result<ProblemClass> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("cannot read {}: {e}", path.display()))?;
    ProblemClass::from_json(&text).map_err(|e| miette::miette!("{}: {e}", path.display()))
}

/// Options from `--config`, or the defaults.
pub(crate) fn load_options(config: Option<&Path>) -> miette::Result<LearnerOptions> {
    let Some(path) = config else {
        return Ok(LearnerOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| miette::miette!("invalid options in {}: {e}", path.display()))
}

pub(crate) fn apply_flags(options: &mut LearnerOptions, flags: &LearnFlags) {
    if let Some(width) = flags.width {
        options.width = width;
    }
    if let Some(encoding) = flags.encoding {
        options.encoding = encoding.into();
    }
    if let Some(max_rules) = flags.max_rules {
        options.max_num_rules = max_rules;
    }
    if flags.goal_separation {
        options.goal_separation = true;
    }
    if flags.optimal_width {
        options.optimal_width = true;
    }
    if let Some(timeout) = flags.timeout {
        options.timeout_secs = timeout;
    }
    if let Some(solver_timeout) = flags.solver_timeout {
        options.solver_timeout_secs = solver_timeout;
    }
    if flags.no_prune {
        options.prune_features = false;
    }
}

/// Prepared instances of `problem`, failing when none survived.
pub(crate) fn prepare(
    problem: &ProblemClass,
    options: &LearnerOptions,
) -> miette::Result<PreparedInstances> {
    let prepared = prepare_instances(problem, &problem.instances, options);
    if prepared.instances.is_empty() {
        miette::bail!(
            "no instance survived preparation ({} rejected)",
            prepared.rejected.len()
        );
    }
    Ok(prepared)
}

pub(crate) fn write_text(path: &Path, text: &str) -> miette::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    std::fs::write(path, text)
        .map_err(|e| miette::miette!("cannot write {}: {e}", path.display()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> miette::Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{text}");
    Ok(())
}

pub(crate) fn is_json(format: OutputFormat) -> bool {
    format == OutputFormat::Json
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchlearn_smt::facts::EncodingMode;

    use crate::cli::EncodingArg;

    #[test]
    fn flags_override_only_what_they_set() {
        let mut options = LearnerOptions {
            width: 2,
            max_num_rules: 7,
            ..LearnerOptions::default()
        };
        let flags = LearnFlags {
            encoding: Some(EncodingArg::Explicit),
            timeout: Some(30),
            no_prune: true,
            ..LearnFlags::default()
        };
        apply_flags(&mut options, &flags);
        assert_eq!(options.width, 2);
        assert_eq!(options.max_num_rules, 7);
        assert_eq!(options.encoding, EncodingMode::Explicit);
        assert_eq!(options.timeout_secs, 30);
        assert!(!options.prune_features);
        assert!(!options.goal_separation);
    }

    #[test]
    fn missing_config_means_defaults() {
        assert_eq!(load_options(None).expect("defaults"), LearnerOptions::default());
    }

    #[test]
    fn config_file_is_partial() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"max_num_rules": 2}"#).expect("write");
        let options = load_options(Some(&path)).expect("options");
        assert_eq!(options.max_num_rules, 2);
        assert_eq!(options.width, 1);
    }
}
