#![doc = include_str!("../README.md")]

//! Intermediate representation for sketch learning.
//!
//! Everything the learner reasons about lives here: features and the
//! pool they are drawn from, the symbolic signatures of state pairs, the
//! class table that deduplicates them, instance data handed over by the
//! collaborators, and the sketches produced at the end.

pub mod class_table;
pub mod collaborators;
pub mod equivalence;
pub mod error;
pub mod feature;
pub mod instance;
pub mod problem;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod refinement;
pub mod sexpr;
pub mod signature;
pub mod sketch;
pub mod valuation;

pub use error::IrError;
