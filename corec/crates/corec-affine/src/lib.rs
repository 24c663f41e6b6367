//! corec-affine — stage 4, the substructural (affine) checker (spec §4.4).
//!
//! Consumes stage 3's [`corec_sem::Elaboration`] and reports move/borrow
//! violations into a shared [`corec_util::Handler`]; produces no IR of its
//! own, so stage 5 runs directly off stage 3's TIR.

mod check;

pub use check::{check, check_function, Category, State};

pub use corec_util::{Code, DiagnosticBuilder, Handler};
