//! The value table (spec §3 "Values").

use corec_role::DefId;
use corec_util::{define_idx, Symbol};

use crate::tir::TirId;
use crate::types::TypeId;

define_idx!(
    /// Identifies one elaborated value.
    ValueId
);

/// A value's storage kind. Distinct from [`ValueCategory`]: a `Variable`
/// value is a place, a `Temporary` is usually an rvalue unless the
/// producing TIR instruction sharpens it (derefs through a mutable pointer,
/// indexing, field access).
#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Error,
    ExternFunction { def: DefId, symbol: Symbol },
    Function { def: DefId, symbol: Symbol },
    ExternVar { def: DefId },
    StringLit { offset: u32 },
    IntConst(i64),
    FloatConst(f64),
    NullConst,
    /// An immutable local (numeric local index into the owning function).
    ImmutableVariable(u32),
    /// A mutable local (numeric local index into the owning function).
    MutableVariable(u32),
    Temporary(TirId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueCategory {
    Invalid,
    Rvalue,
    Place,
    MutablePlace,
}

#[derive(Clone, Debug)]
pub struct Value {
    pub ty: TypeId,
    pub kind: ValueKind,
    pub category: ValueCategory,
}

impl Value {
    pub fn error(error_ty: TypeId) -> Self {
        Self {
            ty: error_ty,
            kind: ValueKind::Error,
            category: ValueCategory::Invalid,
        }
    }

    pub fn is_place(&self) -> bool {
        matches!(self.category, ValueCategory::Place | ValueCategory::MutablePlace)
    }

    pub fn is_mutable_place(&self) -> bool {
        self.category == ValueCategory::MutablePlace
    }
}

/// The global-plus-thread-local value table; a single table here since
/// stage 3 runs single-threaded in this build (see `DESIGN.md`).
#[derive(Default)]
pub struct ValueTable {
    values: corec_util::IndexVec<ValueId, Value>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) -> ValueId {
        self.values.push(value)
    }

    pub fn get(&self, id: ValueId) -> &Value {
        &self.values[id]
    }
}
