//! corec-sem — stage 3, type elaboration (spec §4.3).
//!
//! Turns the RIR and dependency order stage 2 produced into interned types,
//! a value table, per-function TIR, and the declaration lists stage 5 and
//! the driver consume.

pub mod decls;
mod elaborate;
pub mod tir;
pub mod types;
pub mod value;

pub use decls::Declarations;
pub use elaborate::{elaborate, Elaboration};
pub use tir::{ExtraRange, FunctionTir, TirId, TirInst, TirOp};
pub use types::{Primitive, Type, TypeId, TypeInterner};
pub use value::{Value, ValueCategory, ValueId, ValueKind, ValueTable};

pub use corec_util::{Code, DiagnosticBuilder};
