//! Solver backends.

pub mod exhaustive;
pub mod smtlib_printer;
pub mod z3_process;
