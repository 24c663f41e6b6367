//! TIR→MIR lowering (spec §4.5).
//!
//! A single forward pass per function, grounded in the teacher's
//! `Builder`/`lower_expr`/`lower_stmt` split (`faxc-mir/src/builder.rs`,
//! `lower/hir_to_mir.rs`) but adapted from a per-function `Vec<BasicBlock>`
//! to the flat global stream spec §3 requires. [`FunctionLowerer::resolve`]
//! plays the role of the teacher's `lower_expr`: it walks a TIR value
//! backward to its defining instruction on first use and memoizes the
//! result, so MIR ids come out in evaluation (not TIR array) order — the
//! same role [`FunctionLowerer::lower_range`] plays for statements, which
//! only ever carries control flow and forces evaluation of otherwise-unused
//! expression statements.

use std::ops::Range;

use corec_sem::{Elaboration, FunctionTir, TirId, TirOp, TypeId, ValueCategory, ValueId, ValueKind};
use corec_util::{FxHashMap, IndexVec};

use crate::mir::{Mir, MirBinOp, MirCastOp, MirId, MirInst};

/// Lowers every function in `elaboration`'s declaration order into one flat
/// MIR stream.
pub fn lower(elaboration: &Elaboration) -> Mir {
    let mut insts: IndexVec<MirId, MirInst> = IndexVec::new();
    let mut ends = vec![insts.next_id()];
    for &def in &elaboration.decls.functions {
        if let Some(tir) = elaboration.functions.get(&def) {
            lower_function(elaboration, &mut insts, tir);
        }
        ends.push(insts.next_id());
    }
    Mir { insts, ends }
}

fn lower_function(elaboration: &Elaboration, insts: &mut IndexVec<MirId, MirInst>, tir: &FunctionTir) {
    let mut is_let_local = vec![false; tir.locals.len()];
    for inst in tir.insts.iter() {
        if matches!(inst.op, TirOp::Let | TirOp::Mut) {
            is_let_local[inst.a as usize] = true;
        }
    }

    let mut lowerer = FunctionLowerer {
        elaboration,
        tir,
        insts,
        tir_result: FxHashMap::default(),
        value_cache: FxHashMap::default(),
        params: vec![None; tir.locals.len()],
        continue_targets: Vec::new(),
        break_stack: Vec::new(),
        owned: compute_owned(tir),
    };

    // Parameters are exactly the locals never targeted by a `Let`/`Mut`
    // (those get materialized lazily through their initializer instead, spec
    // §4.3's local-aliasing scheme — see `corec-sem`'s `ValueKind` docs).
    let mut param_index = 0u32;
    for idx in 0..tir.locals.len() {
        if !is_let_local[idx] {
            let ty = elaboration.values.get(tir.locals[idx]).ty;
            let id = lowerer.emit(MirInst::Param { index: param_index, ty });
            lowerer.params[idx] = Some(id);
            param_index += 1;
        }
    }

    lowerer.lower_range(0..tir.insts.len() as u32);

    let needs_ret_void = lowerer
        .insts
        .last_id()
        .map(|id| !lowerer.insts[id].is_terminator())
        .unwrap_or(true);
    if needs_ret_void {
        lowerer.emit(MirInst::RetVoid);
    }
}

/// Marks every instruction id that lives inside some `If`/`Loop`/`Switch`
/// region elsewhere in the function. A region's instructions are always
/// emitted into the flat stream *before* the instruction that owns them
/// (spec §4.5), so a top-level `lower_range` over `[0, len)` must skip them
/// here and let the owning instruction's own recursive `lower_range` call
/// lower them instead — otherwise a branch's body would be lowered twice:
/// once unconditionally during the flat walk, once more (correctly) inside
/// `lower_if`/`lower_loop`/`lower_switch`.
fn compute_owned(tir: &FunctionTir) -> Vec<bool> {
    let mut owned = vec![false; tir.insts.len()];
    let mut mark = |r: Range<u32>, owned: &mut Vec<bool>| {
        for i in r {
            owned[i as usize] = true;
        }
    };
    for inst in tir.insts.iter() {
        match inst.op {
            TirOp::If => {
                let (cond, then_r, else_r) = tir.if_regions(inst.b);
                mark(cond, &mut owned);
                mark(then_r, &mut owned);
                mark(else_r, &mut owned);
            }
            TirOp::Loop => {
                let (cond, body) = tir.loop_regions(inst.b);
                mark(cond, &mut owned);
                mark(body, &mut owned);
            }
            TirOp::Switch => {
                let extra = inst.b as usize;
                let count = tir.extra[extra] as usize;
                for i in 0..count {
                    let word = extra + 1 + i * 4;
                    mark(tir.extra[word + 1]..tir.extra[word + 2], &mut owned);
                }
            }
            _ => {}
        }
    }
    owned
}

struct FunctionLowerer<'a> {
    elaboration: &'a Elaboration,
    tir: &'a FunctionTir,
    insts: &'a mut IndexVec<MirId, MirInst>,
    /// Memoizes a TIR instruction's already-lowered result (spec §4.5: "a
    /// single forward pass", but driven by first use rather than array
    /// order, see module docs).
    tir_result: FxHashMap<TirId, MirId>,
    value_cache: FxHashMap<ValueId, MirId>,
    /// `var->mir` map (spec §4.5): `Some` for a genuine parameter slot,
    /// `None` for a `let`/`mut` local, which aliases its initializer.
    params: Vec<Option<MirId>>,
    continue_targets: Vec<MirId>,
    break_stack: Vec<Vec<MirId>>,
    owned: Vec<bool>,
}

impl<'a> FunctionLowerer<'a> {
    fn emit(&mut self, inst: MirInst) -> MirId {
        self.insts.push(inst)
    }

    fn patch_target(&mut self, id: MirId, target: MirId) {
        match &mut self.insts[id] {
            MirInst::Br { target: t } | MirInst::BrIf { target: t, .. } | MirInst::BrIfNot { target: t, .. } => {
                *t = target;
            }
            other => unreachable!("patch_target on non-branch instruction {other:?}"),
        }
    }

    /// Lowers `value` to a MIR id, recursing into its defining TIR
    /// instruction (if any) the first time it is needed. This is the
    /// `lower_expr` role from the teacher's `hir_to_mir.rs`.
    fn resolve(&mut self, value: ValueId) -> MirId {
        if let Some(&id) = self.value_cache.get(&value) {
            return id;
        }
        let elaboration = self.elaboration;
        let v = elaboration.values.get(value);
        let ty = v.ty;
        let kind = v.kind.clone();
        let mir_id = match kind {
            ValueKind::IntConst(value) => self.emit(MirInst::Int { ty, value }),
            ValueKind::FloatConst(value) => self.emit(MirInst::Float { ty, value }),
            ValueKind::NullConst => self.emit(MirInst::Null { ty }),
            ValueKind::StringLit { offset } => self.emit(MirInst::Str { offset }),
            ValueKind::ImmutableVariable(idx) | ValueKind::MutableVariable(idx) => {
                if let Some(slot) = self.params[idx as usize] {
                    slot
                } else {
                    let aliased = self.tir.locals[idx as usize];
                    self.resolve(aliased)
                }
            }
            ValueKind::Temporary(tir_id) => self.lower_temporary(tir_id, ty),
            ValueKind::Function { .. } | ValueKind::ExternFunction { .. } | ValueKind::ExternVar { .. } | ValueKind::Error => {
                self.emit(MirInst::TirValue { value, ty })
            }
        };
        self.value_cache.insert(value, mir_id);
        mir_id
    }

    /// Lowers the TIR instruction that produced `tir_id`'s `Temporary`
    /// value, memoizing so a value used twice is computed once.
    fn lower_temporary(&mut self, tir_id: TirId, ty: TypeId) -> MirId {
        if let Some(&id) = self.tir_result.get(&tir_id) {
            return id;
        }
        let inst = self.tir.insts[tir_id];
        let mir_id = match inst.op {
            TirOp::Add
            | TirOp::Sub
            | TirOp::Mul
            | TirOp::Div
            | TirOp::Rem
            | TirOp::BitAnd
            | TirOp::BitOr
            | TirOp::BitXor
            | TirOp::Shl
            | TirOp::Shr
            | TirOp::Eq
            | TirOp::Ne
            | TirOp::Lt
            | TirOp::Le
            | TirOp::Gt
            | TirOp::Ge => {
                let lhs = self.resolve(ValueId(inst.a));
                let rhs = self.resolve(ValueId(inst.b));
                self.emit(MirInst::Binary { op: map_bin_op(inst.op), ty, lhs, rhs })
            }
            TirOp::Deref => {
                let ptr = self.resolve(ValueId(inst.a));
                self.emit(MirInst::Deref { ptr, ty })
            }
            TirOp::AddressOf => {
                let base = self.resolve(ValueId(inst.a));
                let mutable = self.elaboration.values.get(ValueId(inst.a)).category == ValueCategory::MutablePlace;
                self.emit(MirInst::Address { base, mutable })
            }
            TirOp::AddressOfRvalue => {
                let value = self.resolve(ValueId(inst.a));
                let operand_ty = self.elaboration.values.get(ValueId(inst.a)).ty;
                let slot = self.emit(MirInst::Alloc { ty: operand_ty });
                self.emit(MirInst::Assign { place: slot, value });
                self.emit(MirInst::Address { base: slot, mutable: true })
            }
            TirOp::Call => {
                let callee = self.resolve(ValueId(inst.a));
                let arg_ids: Vec<u32> = self.tir.counted_extra(inst.b).to_vec();
                let args: Vec<MirId> = arg_ids.into_iter().map(|a| self.resolve(ValueId(a))).collect();
                self.emit(MirInst::Call { callee, args, ty })
            }
            TirOp::Index => {
                let base = self.resolve(ValueId(inst.a));
                let index = self.resolve(ValueId(inst.b));
                self.emit(MirInst::Index { base, index, ty })
            }
            TirOp::Slice => {
                let base = self.resolve(ValueId(inst.a));
                let index = self.resolve(ValueId(inst.b));
                self.emit(MirInst::SliceIndex { base, index, ty })
            }
            TirOp::Itof => self.lower_cast(inst.a, MirCastOp::Itof, ty),
            TirOp::Ftoi => self.lower_cast(inst.a, MirCastOp::Ftoi, ty),
            TirOp::Sext => self.lower_cast(inst.a, MirCastOp::Sext, ty),
            TirOp::Zext => self.lower_cast(inst.a, MirCastOp::Zext, ty),
            TirOp::Itrunc => self.lower_cast(inst.a, MirCastOp::Itrunc, ty),
            TirOp::Ftrunc => self.lower_cast(inst.a, MirCastOp::Ftrunc, ty),
            TirOp::Fext => self.lower_cast(inst.a, MirCastOp::Fext, ty),
            TirOp::PtrCast => self.lower_cast(inst.a, MirCastOp::PtrCast, ty),
            TirOp::ArrayToSlice => self.lower_cast(inst.a, MirCastOp::ArrayToSlice, ty),
            TirOp::NewSlice => {
                let ptr = self.resolve(ValueId(inst.a));
                let len = self.resolve(ValueId(inst.b));
                self.emit(MirInst::NewSlice { ptr, len, ty })
            }
            TirOp::FieldAccess => {
                let base = self.resolve(ValueId(inst.a));
                self.emit(MirInst::Access { base, field_offset: inst.b, ty })
            }
            TirOp::StructInit | TirOp::ArrayInit => {
                let elem_ids: Vec<u32> = self.tir.counted_extra(inst.a).to_vec();
                let elems: Vec<MirId> = elem_ids.into_iter().map(|e| self.resolve(ValueId(e))).collect();
                self.emit(MirInst::Aggregate { elems, ty })
            }
            TirOp::Switch => self.lower_switch(inst, ty),
            other => unreachable!("TirOp {other:?} never produces a Temporary value"),
        };
        self.tir_result.insert(tir_id, mir_id);
        mir_id
    }

    fn lower_cast(&mut self, operand: u32, op: MirCastOp, ty: TypeId) -> MirId {
        let operand = self.resolve(ValueId(operand));
        self.emit(MirInst::Cast { op, ty, operand })
    }

    /// Walks `[range.start, range.end)` for its statements; value-producing
    /// instructions in this span are skipped here and lowered lazily the
    /// first time a statement's [`resolve`] needs them.
    fn lower_range(&mut self, range: Range<u32>) {
        let mut cursor = range.start;
        while cursor < range.end {
            if self.owned[cursor as usize] {
                cursor += 1;
                continue;
            }
            let id = TirId(cursor);
            let inst = self.tir.insts[id];
            match inst.op {
                TirOp::If => self.lower_if(inst),
                TirOp::Loop => self.lower_loop(inst),
                TirOp::Let | TirOp::Mut => {
                    self.resolve(ValueId(inst.b));
                }
                TirOp::Nop => {
                    self.resolve(ValueId(inst.a));
                }
                TirOp::Return => {
                    if inst.b != 0 {
                        let value = self.resolve(ValueId(inst.a));
                        self.emit(MirInst::Ret { value });
                    } else {
                        self.emit(MirInst::RetVoid);
                    }
                }
                TirOp::Break => {
                    let br = self.emit(MirInst::Br { target: MirId(0) });
                    if let Some(list) = self.break_stack.last_mut() {
                        list.push(br);
                    }
                }
                TirOp::Continue => {
                    if let Some(&target) = self.continue_targets.last() {
                        self.emit(MirInst::Br { target });
                    }
                }
                // Used as bare statements (their value discarded): force
                // evaluation of each constituent the same way `Nop` does,
                // without materializing the aggregate itself.
                TirOp::StructInit | TirOp::ArrayInit => {
                    let elem_ids: Vec<u32> = self.tir.counted_extra(inst.a).to_vec();
                    for e in elem_ids {
                        self.resolve(ValueId(e));
                    }
                }
                // A switch used as a statement: evaluate whichever arm runs,
                // discard its result. `lower_switch` needs a result type
                // only to type the temporary it materializes into, which a
                // discarded statement never reads, so `Error` is harmless.
                TirOp::Switch => {
                    self.lower_switch(inst, self.elaboration.types.error);
                }
                TirOp::Assign => {
                    let new_value = self.resolve(ValueId(inst.b));
                    if self.elaboration.values.get(ValueId(inst.a)).category == ValueCategory::MutablePlace {
                        let place = self.assign_target_address(ValueId(inst.a));
                        self.emit(MirInst::Assign { place, value: new_value });
                    }
                    // Otherwise this is a `mut`-local rebind: bookkeeping
                    // only (spec §4.3's local-aliasing scheme, see
                    // `corec-sem`'s `ValueKind` docs) — later reads of the
                    // local already resolve to the rebound value through
                    // `tir.locals`.
                }
                // Value-producing ops reachable only through `resolve`.
                _ => {}
            }
            cursor = id.0 + 1;
        }
    }

    /// `IF` lowering (spec §4.5): condition, `BR_IF_NOT` false-target,
    /// true-body, fall-through `BR` to exit (skipped with no else-block),
    /// false-body, exit.
    fn lower_if(&mut self, inst: corec_sem::TirInst) {
        let (_, then_region, else_region) = self.tir.if_regions(inst.b);
        let cond = self.resolve(ValueId(inst.a));
        let br_if_not = self.emit(MirInst::BrIfNot { cond, target: MirId(0) });

        self.lower_range(then_region);
        let has_else = !else_region.is_empty();
        let br_fallthrough = has_else.then(|| self.emit(MirInst::Br { target: MirId(0) }));

        let else_start = self.insts.next_id();
        self.patch_target(br_if_not, else_start);
        self.lower_range(else_region);

        let exit = self.insts.next_id();
        if let Some(id) = br_fallthrough {
            self.patch_target(id, exit);
        }
    }

    /// `LOOP` lowering (spec §4.5): entry `BR` to the condition block,
    /// condition, `BR_IF_NOT` exit, body, `BR` back to the condition.
    /// `BREAK`/`CONTINUE` patch to exit/condition respectively.
    fn lower_loop(&mut self, inst: corec_sem::TirInst) {
        let (_, body_region) = self.tir.loop_regions(inst.b);

        let entry_br = self.emit(MirInst::Br { target: MirId(0) });
        let cond_block_start = self.insts.next_id();
        self.patch_target(entry_br, cond_block_start);

        let cond = self.resolve(ValueId(inst.a));
        let br_if_not = self.emit(MirInst::BrIfNot { cond, target: MirId(0) });

        self.continue_targets.push(cond_block_start);
        self.break_stack.push(Vec::new());
        self.lower_range(body_region);
        self.emit(MirInst::Br { target: cond_block_start });

        let exit = self.insts.next_id();
        self.patch_target(br_if_not, exit);
        for id in self.break_stack.pop().unwrap() {
            self.patch_target(id, exit);
        }
        self.continue_targets.pop();
    }

    /// `SWITCH` lowering: materialize-then-read, the same idiom
    /// `AddressOfRvalue` uses for a value with no single defining
    /// instruction. Each arm compares the scrutinee (skipped for the
    /// sentinel/else arm), lowers its body, and assigns its result into one
    /// shared slot; all arms converge on one exit that reads the slot back.
    fn lower_switch(&mut self, inst: corec_sem::TirInst, ty: TypeId) -> MirId {
        let slot = self.emit(MirInst::Alloc { ty });
        let scrutinee = self.resolve(ValueId(inst.a));
        let extra = inst.b as usize;
        let count = self.tir.extra[extra] as usize;

        let mut pending_branch: Option<MirId> = None;
        let mut exits: Vec<MirId> = Vec::new();
        for i in 0..count {
            let word = extra + 1 + i * 4;
            let pattern = self.tir.extra[word];
            let region = self.tir.extra[word + 1]..self.tir.extra[word + 2];
            let result = self.tir.extra[word + 3];

            if let Some(br) = pending_branch.take() {
                let arm_start = self.insts.next_id();
                self.patch_target(br, arm_start);
            }
            if pattern != u32::MAX {
                let rhs = self.resolve(ValueId(pattern));
                let cmp = self.emit(MirInst::Binary {
                    op: MirBinOp::Eq,
                    ty: self.elaboration.types.bool_,
                    lhs: scrutinee,
                    rhs,
                });
                pending_branch = Some(self.emit(MirInst::BrIfNot { cond: cmp, target: MirId(0) }));
            }

            self.lower_range(region);
            let value = self.resolve(ValueId(result));
            self.emit(MirInst::Assign { place: slot, value });
            exits.push(self.emit(MirInst::Br { target: MirId(0) }));
        }

        let exit = self.insts.next_id();
        for id in exits {
            self.patch_target(id, exit);
        }
        if let Some(br) = pending_branch {
            self.patch_target(br, exit);
        }

        let ptr = self.emit(MirInst::Address { base: slot, mutable: true });
        self.emit(MirInst::Deref { ptr, ty })
    }

    /// The writable address a mutable-place [`ValueId`] assigns through: a
    /// `Deref`'s own pointer operand, or (for anything else, e.g. an extern
    /// variable) the place's resolved value itself, mirroring how `resolve`
    /// already treats those as address-like via `MirInst::TirValue`.
    fn assign_target_address(&mut self, place: ValueId) -> MirId {
        if let ValueKind::Temporary(tir_id) = self.elaboration.values.get(place).kind {
            if self.tir.insts[tir_id].op == TirOp::Deref {
                return self.resolve(ValueId(self.tir.insts[tir_id].a));
            }
        }
        self.resolve(place)
    }
}

fn map_bin_op(op: TirOp) -> MirBinOp {
    match op {
        TirOp::Add => MirBinOp::Add,
        TirOp::Sub => MirBinOp::Sub,
        TirOp::Mul => MirBinOp::Mul,
        TirOp::Div => MirBinOp::Div,
        TirOp::Rem => MirBinOp::Rem,
        TirOp::BitAnd => MirBinOp::BitAnd,
        TirOp::BitOr => MirBinOp::BitOr,
        TirOp::BitXor => MirBinOp::BitXor,
        TirOp::Shl => MirBinOp::Shl,
        TirOp::Shr => MirBinOp::Shr,
        TirOp::Eq => MirBinOp::Eq,
        TirOp::Ne => MirBinOp::Ne,
        TirOp::Lt => MirBinOp::Lt,
        TirOp::Le => MirBinOp::Le,
        TirOp::Gt => MirBinOp::Gt,
        TirOp::Ge => MirBinOp::Ge,
        other => unreachable!("{other:?} is not a binary op"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{AstBuilder, AstNode, BinaryOp as AstBinaryOp, ExtraRange as AstExtraRange, File as AstFile, Program};
    use corec_role::{analyze, collect, Builtins};
    use corec_sem::elaborate;
    use corec_util::{Handler, SourceIndex, Symbol};

    fn build_program_with_if_return() -> Program {
        // fn f() -> i32 { if 1 { return 2; } else { return 3; } }
        let mut b = AstBuilder::new();
        let cond = b.push(AstNode::IntLit(1), SourceIndex(0));
        let two = b.push(AstNode::IntLit(2), SourceIndex(1));
        let ret_then = b.push(AstNode::Return(Some(two)), SourceIndex(2));
        let then_stmts = b.push_extra(&[ret_then]);
        let then_block = b.push(AstNode::Block { stmts: then_stmts }, SourceIndex(3));
        let three = b.push(AstNode::IntLit(3), SourceIndex(4));
        let ret_else = b.push(AstNode::Return(Some(three)), SourceIndex(5));
        let else_stmts = b.push_extra(&[ret_else]);
        let else_block = b.push(AstNode::Block { stmts: else_stmts }, SourceIndex(6));
        let if_stmt = b.push(
            AstNode::If { cond, then_block, else_block: Some(else_block) },
            SourceIndex(7),
        );
        let ret_ty = b.push(AstNode::Ident(Symbol::intern("i32")), SourceIndex(8));
        let body_stmts = b.push_extra(&[if_stmt]);
        let body = b.push(AstNode::Block { stmts: body_stmts }, SourceIndex(9));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("f"),
                is_public: true,
                type_params: AstExtraRange::EMPTY,
                params: AstExtraRange::EMPTY,
                ret: Some(ret_ty),
                body,
            },
            SourceIndex(10),
        );
        let ast = b.finish();
        let mut program = Program::new();
        program.add_file(AstFile {
            path: Symbol::intern("a.corec"),
            module: Symbol::intern("main"),
            imports: Vec::new(),
            items: vec![func],
            ast,
        });
        program
    }

    fn build_elaboration(program: &Program) -> (Elaboration, Handler) {
        let handler = Handler::new();
        let globals = collect(program, &handler);
        let builtins = Builtins::new();
        let roles = analyze(program, &globals, &builtins, &handler);
        let elaboration = elaborate(program, &globals, &roles, &builtins, &handler);
        (elaboration, handler)
    }

    #[test]
    fn if_else_lowers_to_two_terminated_arms() {
        let program = build_program_with_if_return();
        let (elaboration, handler) = build_elaboration(&program);
        assert!(!handler.has_errors());
        let mir = lower(&elaboration);
        assert_eq!(mir.ends.len(), 2);
        let terminators = mir.insts.iter().filter(|i| i.is_terminator()).count();
        // entry BR_IF_NOT, RET in the then-arm, RET in the else-arm.
        assert_eq!(terminators, 3);
    }

    #[test]
    fn binary_operands_share_one_addition() {
        let mut b = AstBuilder::new();
        let one = b.push(AstNode::IntLit(1), SourceIndex(0));
        let two = b.push(AstNode::IntLit(2), SourceIndex(1));
        let add = b.push(
            AstNode::Binary { op: AstBinaryOp::Add, left: one, right: two },
            SourceIndex(2),
        );
        let ret = b.push(AstNode::Return(Some(add)), SourceIndex(3));
        let stmts = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts }, SourceIndex(4));
        let ret_ty = b.push(AstNode::Ident(Symbol::intern("i64")), SourceIndex(5));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("f"),
                is_public: true,
                type_params: AstExtraRange::EMPTY,
                params: AstExtraRange::EMPTY,
                ret: Some(ret_ty),
                body: block,
            },
            SourceIndex(6),
        );
        let ast = b.finish();
        let mut program = Program::new();
        program.add_file(AstFile {
            path: Symbol::intern("a.corec"),
            module: Symbol::intern("main"),
            imports: Vec::new(),
            items: vec![func],
            ast,
        });
        let (elaboration, handler) = build_elaboration(&program);
        assert!(!handler.has_errors());
        let mir = lower(&elaboration);
        let last_is_terminator = mir.insts.last_id().map(|id| mir.insts[id].is_terminator()).unwrap_or(false);
        assert!(last_is_terminator);
    }

    #[test]
    fn switch_arm_bodies_lower_exactly_once() {
        // fn f() -> i64 { return switch (1) { 1 => 10 + 1, _ => 20 }; }
        let mut b = AstBuilder::new();
        let discr = b.push(AstNode::IntLit(1), SourceIndex(0));
        let pat1 = b.push(AstNode::IntLit(1), SourceIndex(1));
        let ten = b.push(AstNode::IntLit(10), SourceIndex(2));
        let one = b.push(AstNode::IntLit(1), SourceIndex(3));
        let add = b.push(
            AstNode::Binary { op: AstBinaryOp::Add, left: ten, right: one },
            SourceIndex(4),
        );
        let arm1 = b.push(AstNode::SwitchArm { pattern: Some(pat1), value: add }, SourceIndex(5));
        let twenty = b.push(AstNode::IntLit(20), SourceIndex(6));
        let arm2 = b.push(AstNode::SwitchArm { pattern: None, value: twenty }, SourceIndex(7));
        let arms = b.push_extra(&[arm1, arm2]);
        let switch = b.push(AstNode::Switch { discr: Some(discr), arms }, SourceIndex(8));
        let ret = b.push(AstNode::Return(Some(switch)), SourceIndex(9));
        let stmts = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts }, SourceIndex(10));
        let ret_ty = b.push(AstNode::Ident(Symbol::intern("i64")), SourceIndex(11));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("f"),
                is_public: true,
                type_params: AstExtraRange::EMPTY,
                params: AstExtraRange::EMPTY,
                ret: Some(ret_ty),
                body: block,
            },
            SourceIndex(12),
        );
        let ast = b.finish();
        let mut program = Program::new();
        program.add_file(AstFile {
            path: Symbol::intern("a.corec"),
            module: Symbol::intern("main"),
            imports: Vec::new(),
            items: vec![func],
            ast,
        });
        let (elaboration, handler) = build_elaboration(&program);
        assert!(!handler.has_errors());
        let mir = lower(&elaboration);
        let add_count = mir
            .insts
            .iter()
            .filter(|i| matches!(i, MirInst::Binary { op: MirBinOp::Add, .. }))
            .count();
        assert_eq!(add_count, 1, "the 10+1 arm body must lower exactly once, not once per flat-stream pass");
    }
}
