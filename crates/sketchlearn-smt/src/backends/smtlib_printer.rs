use std::fmt::Write;

use crate::encoder::OptimizationQuery;
use crate::terms::{SmtSort, SmtTerm};

/// Print an SmtTerm as SMT-LIB2 format.
pub fn to_smtlib(term: &SmtTerm) -> String {
    let mut out = String::new();
    write_term(term, &mut out);
    out
}

fn write_list(op: &str, terms: &[SmtTerm], out: &mut String) {
    out.push('(');
    out.push_str(op);
    for term in terms {
        out.push(' ');
        write_term(term, out);
    }
    out.push(')');
}

fn write_term(term: &SmtTerm, out: &mut String) {
    match term {
        SmtTerm::Var(name) => out.push_str(name),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                let _ = write!(out, "(- {})", n.unsigned_abs());
            } else {
                let _ = write!(out, "{n}");
            }
        }
        SmtTerm::BoolLit(b) => out.push_str(if *b { "true" } else { "false" }),
        SmtTerm::Sum(terms) => match terms.as_slice() {
            [] => out.push('0'),
            [single] => write_term(single, out),
            _ => write_list("+", terms, out),
        },
        SmtTerm::Eq(lhs, rhs) => {
            out.push_str("(= ");
            write_term(lhs, out);
            out.push(' ');
            write_term(rhs, out);
            out.push(')');
        }
        SmtTerm::And(terms) => match terms.as_slice() {
            [] => out.push_str("true"),
            [single] => write_term(single, out),
            _ => write_list("and", terms, out),
        },
        SmtTerm::Or(terms) => match terms.as_slice() {
            [] => out.push_str("false"),
            [single] => write_term(single, out),
            _ => write_list("or", terms, out),
        },
        SmtTerm::Not(inner) => {
            out.push_str("(not ");
            write_term(inner, out);
            out.push(')');
        }
        SmtTerm::Implies(lhs, rhs) => {
            out.push_str("(=> ");
            write_term(lhs, out);
            out.push(' ');
            write_term(rhs, out);
            out.push(')');
        }
        SmtTerm::Ite(cond, then, els) => {
            out.push_str("(ite ");
            write_term(cond, out);
            out.push(' ');
            write_term(then, out);
            out.push(' ');
            write_term(els, out);
            out.push(')');
        }
    }
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    match sort {
        SmtSort::Bool => "Bool",
        SmtSort::Int => "Int",
    }
}

/// Declarations, assertions and the objective of `query`, optionally
/// preceded by a solver timeout. Does not include `(check-sat)`.
pub fn query_to_smtlib(query: &OptimizationQuery, timeout_ms: Option<u64>) -> String {
    let mut out = String::from("(set-option :produce-models true)\n");
    if let Some(ms) = timeout_ms {
        let _ = writeln!(out, "(set-option :timeout {ms})");
    }
    for (name, sort) in &query.declarations {
        let _ = writeln!(out, "(declare-const {name} {})", sort_to_smtlib(sort));
    }
    for assertion in &query.assertions {
        out.push_str("(assert ");
        write_term(assertion, &mut out);
        out.push_str(")\n");
    }
    out.push_str("(minimize ");
    write_term(&query.objective, &mut out);
    out.push_str(")\n");
    out
}
