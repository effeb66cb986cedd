#![doc = include_str!("../README.md")]

//! Counterexample-guided sketch learning.

pub mod decode;
pub mod equivalence;
pub mod error;
pub mod features;
pub mod instances;
pub mod learner;
pub mod minimize;
pub mod options;
pub mod refinement;
pub mod statistics;
pub mod timeout;
pub mod verifier;

pub use error::{LearnError, VerificationFailure};
pub use learner::{LearningOutcome, RefinementLoop};
pub use options::LearnerOptions;
