/// Solver-agnostic term language for the sketch encodings.
///
/// Only quantifier-free Boolean structure and linear sums are needed: the
/// decision variables are Booleans and the objective is a weighted count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    IntLit(i64),
    BoolLit(bool),

    /// n-ary sum; empty sums are `0`.
    Sum(Vec<SmtTerm>),
    Eq(Box<SmtTerm>, Box<SmtTerm>),

    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn sum(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Sum(terms)
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(self, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(self), Box::new(then), Box::new(els))
    }

    /// `self` or its negation, depending on `positive`.
    pub fn literal(self, positive: bool) -> Self {
        if positive {
            self
        } else {
            self.not()
        }
    }

    /// Evaluate under an assignment of the Boolean variables.
    pub fn eval_bool(&self, assignment: &dyn Fn(&str) -> bool) -> bool {
        match self {
            SmtTerm::Var(name) => assignment(name),
            SmtTerm::BoolLit(b) => *b,
            SmtTerm::IntLit(n) => *n != 0,
            SmtTerm::Sum(_) => self.eval_int(assignment) != 0,
            SmtTerm::Eq(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (SmtTerm::IntLit(_) | SmtTerm::Sum(_) | SmtTerm::Ite(..), _) => {
                    lhs.eval_int(assignment) == rhs.eval_int(assignment)
                }
                _ => lhs.eval_bool(assignment) == rhs.eval_bool(assignment),
            },
            SmtTerm::And(terms) => terms.iter().all(|t| t.eval_bool(assignment)),
            SmtTerm::Or(terms) => terms.iter().any(|t| t.eval_bool(assignment)),
            SmtTerm::Not(inner) => !inner.eval_bool(assignment),
            SmtTerm::Implies(lhs, rhs) => !lhs.eval_bool(assignment) || rhs.eval_bool(assignment),
            SmtTerm::Ite(cond, then, els) => {
                if cond.eval_bool(assignment) {
                    then.eval_bool(assignment)
                } else {
                    els.eval_bool(assignment)
                }
            }
        }
    }

    /// Integer value under an assignment; Booleans count as `0`/`1`.
    pub fn eval_int(&self, assignment: &dyn Fn(&str) -> bool) -> i64 {
        match self {
            SmtTerm::IntLit(n) => *n,
            SmtTerm::Sum(terms) => terms.iter().map(|t| t.eval_int(assignment)).sum(),
            SmtTerm::Ite(cond, then, els) => {
                if cond.eval_bool(assignment) {
                    then.eval_int(assignment)
                } else {
                    els.eval_int(assignment)
                }
            }
            other => i64::from(other.eval_bool(assignment)),
        }
    }
}

/// Sort of a declared constant. The encodings only declare Booleans; the
/// integer objective is a term, never a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    Int,
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::Int => write!(f, "Int"),
        }
    }
}
