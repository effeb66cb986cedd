#![doc = include_str!("../README.md")]

//! Constraint encoding and solver integration for sketch learning.
//!
//! This crate turns the learner's class-space data into a solver-agnostic
//! fact base, lowers fact bases to SMT-LIB optimization queries, and reads
//! optimal models back as typed symbols.

pub mod backends;
pub mod encoder;
pub mod facts;
pub mod solver;
pub mod terms;
