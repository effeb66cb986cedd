use sketchlearn_ir::instance::StateId;
use sketchlearn_ir::sketch::Sketch;
use sketchlearn_ir::IrError;
use sketchlearn_smt::solver::SolveStatus;
use thiserror::Error;

/// Fatal outcomes of a learning run.
#[derive(Debug, Error)]
pub enum LearnError {
    #[error("no sketch of width {width} solves the training instances")]
    NoSketchAtWidth { width: usize },
    #[error("solver was inconclusive ({status}): {reason}")]
    SolverInconclusive { status: SolveStatus, reason: String },
    #[error("learning timed out")]
    Timeout { best: Option<Box<Sketch>> },
    #[error("no instance survived preparation")]
    NoInstances,
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ir(#[from] IrError),
}

impl LearnError {
    /// Process exit code of the command-line learner.
    pub fn exit_code(&self) -> i32 {
        match self {
            LearnError::NoSketchAtWidth { .. } => 2,
            LearnError::Timeout { .. } => 3,
            _ => 1,
        }
    }
}

/// Why a sketch does not solve an instance. Recovered by refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    DeadEndReached {
        state: StateId,
    },
    UnboundedWidth {
        state: StateId,
    },
    /// A compatible state is closer than the first satisfied tuple.
    SuboptimalWidth {
        state: StateId,
        compatible_distance: usize,
        tuple_distance: usize,
    },
    Cycle {
        state: StateId,
    },
    GoalSeparation {
        goal: StateId,
        nongoal: StateId,
    },
    MissingTupleGraph {
        state: StateId,
    },
}

impl std::fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationFailure::DeadEndReached { state } => {
                write!(f, "sketch leads to the unsolvable state {state}")
            }
            VerificationFailure::UnboundedWidth { state } => {
                write!(f, "sketch fails to bound the width of state {state}")
            }
            VerificationFailure::SuboptimalWidth {
                state,
                compatible_distance,
                tuple_distance,
            } => write!(
                f,
                "state {state} has a compatible state at distance {compatible_distance} \
                 but its first satisfied tuple is at distance {tuple_distance}"
            ),
            VerificationFailure::Cycle { state } => write!(f, "sketch cycles through state {state}"),
            VerificationFailure::GoalSeparation { goal, nongoal } => write!(
                f,
                "selected features do not separate goal {goal} from non-goal {nongoal}"
            ),
            VerificationFailure::MissingTupleGraph { state } => {
                write!(f, "no tuple graph for reachable state {state}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_outcome() {
        assert_eq!(LearnError::NoSketchAtWidth { width: 1 }.exit_code(), 2);
        assert_eq!(LearnError::Timeout { best: None }.exit_code(), 3);
        assert_eq!(LearnError::NoInstances.exit_code(), 1);
        let inconclusive = LearnError::SolverInconclusive {
            status: SolveStatus::Interrupted,
            reason: "canceled".into(),
        };
        assert_eq!(inconclusive.exit_code(), 1);
        assert!(inconclusive.to_string().contains("INTERRUPTED"));
    }
}
