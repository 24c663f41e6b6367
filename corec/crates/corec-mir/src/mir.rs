//! The flat MIR instruction stream (spec §3 "MIR", §4.5).
//!
//! One global [`IndexVec<MirId, MirInst>`] holds every function's
//! instructions back to back; [`Mir::ends`] delimits them (`ends[0..n+1]`,
//! spec's invariant I3). Basic blocks are never materialized as a separate
//! type — they are the implicit spans between terminators (`Br`, `BrIf`,
//! `BrIfNot`, `Ret`, `RetVoid`).
//!
//! `MirInst` is an idiomatic Rust enum rather than the tag-plus-two-payload
//! shape `TirInst`/`AstNode` use: MIR's variable-arity site (`Call`'s
//! argument list) is the only one, and unlike TIR it is never read back by
//! position from a shared index, so a `Vec<MirId>` field costs nothing this
//! crate cares about (see `DESIGN.md`).

use corec_sem::{TypeId, ValueId};
use corec_util::{define_idx, IndexVec};

define_idx!(
    /// Identifies one instruction in the global MIR stream.
    MirId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirCastOp {
    Itof,
    Ftoi,
    Sext,
    Zext,
    Itrunc,
    Ftrunc,
    Fext,
    PtrCast,
    ArrayToSlice,
}

/// One MIR instruction (spec §3's op list, carried 1-to-1 except where noted
/// per variant).
#[derive(Clone, Debug)]
pub enum MirInst {
    /// A stack slot for a place that needs one (spec §4.5: "let-bindings
    /// emit `ALLOC` followed by `ASSIGN`").
    Alloc { ty: TypeId },
    /// The `index`-th incoming parameter.
    Param { index: u32, ty: TypeId },
    Int { ty: TypeId, value: i64 },
    Float { ty: TypeId, value: f64 },
    Str { offset: u32 },
    Null { ty: TypeId },
    /// Carries through an already-elaborated [`ValueId`] that needs no
    /// further runtime computation (a function pointer, an extern variable,
    /// a poisoned/error value) — spec §3's `TIR_VALUE` op.
    TirValue { value: ValueId, ty: TypeId },
    /// The address of a place, spec §4.5's `ADDRESS` (a named place) and
    /// `ADDRESS_OF_TEMPORARY` (an `Alloc`'d, then-stored rvalue) lowerings.
    Address { base: MirId, mutable: bool },
    Deref { ptr: MirId, ty: TypeId },
    Assign { place: MirId, value: MirId },
    NewSlice { ptr: MirId, len: MirId, ty: TypeId },
    Binary { op: MirBinOp, ty: TypeId, lhs: MirId, rhs: MirId },
    Cast { op: MirCastOp, ty: TypeId, operand: MirId },
    Call { callee: MirId, args: Vec<MirId>, ty: TypeId },
    Index { base: MirId, index: MirId, ty: TypeId },
    SliceIndex { base: MirId, index: MirId, ty: TypeId },
    ConstIndex { base: MirId, index: u64, ty: TypeId },
    Access { base: MirId, field_offset: u32, ty: TypeId },
    /// Builds a struct or array value from its field/element values in
    /// declaration order (TIR's `STRUCT_INIT`/`ARRAY_INIT`).
    Aggregate { elems: Vec<MirId>, ty: TypeId },
    Br { target: MirId },
    BrIf { cond: MirId, target: MirId },
    BrIfNot { cond: MirId, target: MirId },
    Ret { value: MirId },
    RetVoid,
}

impl MirInst {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            MirInst::Br { .. } | MirInst::BrIf { .. } | MirInst::BrIfNot { .. } | MirInst::Ret { .. } | MirInst::RetVoid
        )
    }
}

/// The whole-program MIR: one flat stream plus function boundaries.
pub struct Mir {
    pub insts: IndexVec<MirId, MirInst>,
    /// `ends[0] == MirId(0)`; `ends[i+1]` is one past function `i`'s last
    /// instruction (spec's `ends[0..n+1]`).
    pub ends: Vec<MirId>,
}

impl Mir {
    /// The `[start, end)` instruction range of function `i` (0-indexed in
    /// lowering order, matching `Elaboration::decls::functions`).
    pub fn function_range(&self, i: usize) -> std::ops::Range<u32> {
        self.ends[i].0..self.ends[i + 1].0
    }
}
