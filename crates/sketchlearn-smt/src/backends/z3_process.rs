use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use sketchlearn_ir::sexpr::{self, SExpr};
use thiserror::Error;
use tracing::debug;

use crate::backends::smtlib_printer::query_to_smtlib;
use crate::encoder::{lower, symbol_of, OptimizationQuery};
use crate::facts::FactSet;
use crate::solver::{ConstraintSolver, SolveOutcome, SolveStatus, SolverModel};

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("z3 I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("z3 not found: {0}")]
    NotFound(String),
    #[error("z3 error: {0}")]
    SolverError(String),
    #[error("Failed to parse z3 output: {0}")]
    ParseError(String),
}

/// Runs each query through a fresh `z3 -in -smt2` process.
#[derive(Debug, Clone)]
pub struct Z3Solver {
    command: String,
    timeout_secs: u64,
    dump_dir: Option<PathBuf>,
    calls: usize,
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Z3Solver {
    pub fn new() -> Self {
        Self::with_command("z3")
    }

    pub fn with_command(cmd: impl Into<String>) -> Self {
        Self {
            command: cmd.into(),
            timeout_secs: 0,
            dump_dir: None,
            calls: 0,
        }
    }

    /// Per-call solver budget; 0 disables it.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Write every script to `dir/query_NNNN.smt2` before running it.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn script(&self, query: &OptimizationQuery) -> String {
        let timeout_ms = (self.timeout_secs > 0).then(|| self.timeout_secs.saturating_mul(1000));
        let mut script = query_to_smtlib(query, timeout_ms);
        script.push_str("(check-sat)\n");
        if !query.declarations.is_empty() {
            let names: Vec<&str> = query.variable_names().collect();
            script.push_str(&format!("(get-value ({}))\n", names.join(" ")));
        }
        script.push_str("(get-info :reason-unknown)\n(exit)\n");
        script
    }

    fn run(&self, script: String) -> Result<String, Z3Error> {
        let mut child = Command::new(&self.command)
            .args(["-in", "-smt2"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Z3Error::NotFound(format!("{}: {e}", self.command)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Z3Error::SolverError("failed to capture z3 stdin".into()))?;
        // Separate writer so a chatty solver cannot block on a full stdout pipe.
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            stdin.write_all(script.as_bytes())?;
            stdin.flush()
        });
        let output = child.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(Z3Error::SolverError("z3 input writer panicked".into())),
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(Z3Error::SolverError(format!(
                "No response from z3 (status {}). stderr: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(stdout)
    }
}

impl ConstraintSolver for Z3Solver {
    type Error = Z3Error;

    fn solve(&mut self, facts: &FactSet) -> Result<SolveOutcome, Z3Error> {
        let query = lower(facts);
        let script = self.script(&query);
        self.calls += 1;
        if let Some(dir) = &self.dump_dir {
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(format!("query_{:04}.smt2", self.calls)), &script)?;
        }
        debug!(
            call = self.calls,
            variables = query.declarations.len(),
            assertions = query.assertions.len(),
            "Running z3"
        );
        let stdout = self.run(script)?;
        parse_response(&stdout, facts, !query.declarations.is_empty())
    }

    fn set_time_budget(&mut self, secs: u64) {
        self.timeout_secs = secs;
    }

    fn name(&self) -> &str {
        "z3"
    }
}

/// Interpret the replies to `check-sat`, `get-value` and `get-info`.
fn parse_response(
    stdout: &str,
    facts: &FactSet,
    expect_model: bool,
) -> Result<SolveOutcome, Z3Error> {
    let replies = sexpr::parse(stdout).map_err(|e| Z3Error::ParseError(e.to_string()))?;
    let mut rest = replies.iter();
    let status = loop {
        match rest.next() {
            Some(SExpr::Atom(atom)) if matches!(atom.as_str(), "sat" | "unsat" | "unknown") => {
                break atom.as_str();
            }
            Some(reply) if reply.head() == Some("error") => {
                return Err(Z3Error::SolverError(error_message(reply)));
            }
            Some(_) => continue,
            None => return Err(Z3Error::ParseError("missing check-sat result".into())),
        }
    };
    let rest: Vec<&SExpr> = rest.collect();

    match status {
        "unsat" => Ok(SolveOutcome::without_model(SolveStatus::Unsat)),
        "unknown" => {
            let reason = rest
                .iter()
                .find(|reply| reply.head() == Some(":reason-unknown"))
                .and_then(|reply| reply.as_list()?.get(1).cloned())
                .map(|value| match value {
                    SExpr::Str(s) | SExpr::Atom(s) => s,
                    SExpr::List(_) => "unknown".into(),
                })
                .unwrap_or_else(|| "unknown".into());
            if ["timeout", "canceled", "interrupted"]
                .iter()
                .any(|needle| reason.contains(needle))
            {
                Ok(SolveOutcome::without_model(SolveStatus::Interrupted))
            } else {
                Ok(SolveOutcome::without_model(SolveStatus::Unknown(reason)))
            }
        }
        _ => {
            let assignment = rest.iter().find_map(|reply| {
                let pairs = reply.as_list()?;
                let is_model = !pairs.is_empty()
                    && pairs
                        .iter()
                        .all(|p| p.as_list().is_some_and(|p| p.len() == 2));
                is_model.then_some(pairs)
            });
            let symbols = match assignment {
                Some(pairs) => pairs
                    .iter()
                    .filter_map(|pair| {
                        let pair = pair.as_list()?;
                        let name = pair.first()?.as_atom()?;
                        (pair.get(1)?.as_atom()? == "true").then(|| symbol_of(name))?
                    })
                    .collect(),
                None if expect_model => {
                    let detail = rest
                        .iter()
                        .find(|reply| reply.head() == Some("error"))
                        .map(|reply| error_message(reply))
                        .unwrap_or_else(|| "no get-value reply".into());
                    return Err(Z3Error::ParseError(detail));
                }
                None => Vec::new(),
            };
            let model = SolverModel::new(symbols);
            let cost = facts.cost_of(&model.selected_features());
            Ok(SolveOutcome::optimal(model.with_cost(cost)))
        }
    }
}

fn error_message(reply: &SExpr) -> String {
    reply
        .as_list()
        .and_then(|items| items.get(1))
        .and_then(|item| item.as_str().or_else(|| item.as_atom()))
        .unwrap_or("unspecified error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use sketchlearn_ir::feature::FeatureKind;

    use super::*;
    use crate::facts::{EncodingOptions, Fact};
    use crate::solver::Symbol;

    fn facts() -> FactSet {
        let mut facts = FactSet::new(EncodingOptions::default());
        facts.push(Fact::Feature {
            feature: 0,
            complexity: 2,
            kind: FeatureKind::Boolean,
        });
        facts.push(Fact::Feature {
            feature: 1,
            complexity: 5,
            kind: FeatureKind::Numerical,
        });
        facts
    }

    #[test]
    fn sat_reply_yields_true_symbols_and_cost() {
        let stdout = "sat\n((sel_0 true)\n (sel_1 false)\n (good_0 true))\n(:reason-unknown \"\")\n";
        let outcome = parse_response(stdout, &facts(), true).expect("reply should parse");
        assert_eq!(outcome.status, SolveStatus::OptimalSat);
        let model = outcome.model.expect("sat carries a model");
        assert_eq!(model.symbols, vec![Symbol::Select(0), Symbol::Good(0)]);
        assert_eq!(model.cost, Some(2));
        assert_eq!(model.selected_features(), BTreeSet::from([0]));
    }

    #[test]
    fn unsat_reply_ignores_model_errors() {
        let stdout = "unsat\n(error \"line 9 column 10: model is not available\")\n(:reason-unknown \"\")\n";
        let outcome = parse_response(stdout, &facts(), true).expect("reply should parse");
        assert_eq!(outcome.status, SolveStatus::Unsat);
        assert!(outcome.model.is_none());
    }

    #[test]
    fn unknown_reply_distinguishes_timeouts() {
        let timeout = "unknown\n(error \"model is not available\")\n(:reason-unknown \"canceled\")\n";
        let outcome = parse_response(timeout, &facts(), true).expect("reply should parse");
        assert_eq!(outcome.status, SolveStatus::Interrupted);

        let other = "unknown\n(:reason-unknown \"incomplete quantifiers\")\n";
        let outcome = parse_response(other, &facts(), true).expect("reply should parse");
        assert_eq!(
            outcome.status,
            SolveStatus::Unknown("incomplete quantifiers".into())
        );
    }

    #[test]
    fn errors_before_check_sat_are_reported() {
        let stdout = "(error \"line 3: unknown constant sel_9\")\nsat\n";
        match parse_response(stdout, &facts(), true) {
            Err(Z3Error::SolverError(message)) => assert!(message.contains("sel_9")),
            other => panic!("expected solver error, got: {other:?}"),
        }
    }

    #[test]
    fn script_requests_values_of_every_declaration() {
        let solver = Z3Solver::new().with_timeout_secs(2);
        let query = lower(&facts());
        let script = solver.script(&query);
        assert!(script.contains("(set-option :timeout 2000)"));
        assert!(script.contains("(get-value (sel_0 sel_1))"));
        assert!(script.trim_end().ends_with("(exit)"));
    }

    #[test]
    fn missing_binary_is_reported_as_not_found() {
        let mut solver = Z3Solver::with_command("definitely-not-a-z3-binary");
        match solver.solve(&facts()) {
            Err(Z3Error::NotFound(message)) => {
                assert!(message.contains("definitely-not-a-z3-binary"))
            }
            other => panic!("expected not-found error, got: {other:?}"),
        }
    }
}
