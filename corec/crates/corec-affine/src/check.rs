//! Stage 4 (spec §4.4): the substructural (affine) checker.
//!
//! Walks each function's TIR once, tracking a [`State`] per linear local and
//! forking/merging that state across `If`/`Loop` regions (spec §4.5's
//! `[start, end)` region encoding on the `If`/`Loop` instructions is what
//! makes this possible without a CFG — see `corec_sem::tir`). Non-linear
//! locals are never tracked: spec §4.4 says they are "freely copyable" and
//! ignored on rvalue use.

use std::ops::Range;

use corec_role::DefId;
use corec_sem::{Elaboration, FunctionTir, TirId, TirInst, TirOp, ValueCategory, ValueId, ValueKind};
use corec_util::{Code, DiagnosticBuilder, FxHashMap, FxHashSet, Handler};

/// A linear local's move/borrow state (spec §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    NotConsumed,
    Consumed,
    Borrowed,
    BorrowedMut,
}

/// The category an instruction expects of an operand it reads (spec §4.4's
/// table). [`Category::Statement`] covers a value that appears only in
/// statement position (spec's expression-statement passthrough) and never
/// itself moves anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Rvalue,
    Lvalue,
    LvalueMut,
    Statement,
}

/// Checks every function in `elaboration`, emitting diagnostics into
/// `handler`. Produces no IR — spec §4.4's output is "pass/fail with
/// diagnostics".
pub fn check(elaboration: &Elaboration, handler: &Handler) {
    for (&def, tir) in &elaboration.functions {
        check_function(elaboration, def, tir, handler);
    }
}

/// Checks a single function. Each function's TIR is independent of every
/// other's, so a driver may call this from separate worker threads for
/// different `def`s, sharing only `elaboration` (read-only) and `handler`
/// (internally synchronized) — this is the unit `corec-drv` dispatches
/// across its thread pool for stage 4.
pub fn check_function(elaboration: &Elaboration, def: DefId, tir: &FunctionTir, handler: &Handler) {
    let mut checker = Checker {
        elaboration,
        tir,
        def,
        handler,
        states: FxHashMap::default(),
        loop_depth: 0,
        owned: compute_owned(tir),
    };
    checker.walk_range(0..tir.insts.len() as u32);
}

/// Marks every instruction id that lives inside some `If`/`Loop`/`Switch`
/// region elsewhere in the function. `walk_range`'s top-level pass over
/// `[0, len)` must skip these: a region's instructions sit *before* the
/// instruction that owns them in the flat stream (spec §4.5), so without
/// this mask the flat walk would visit a branch's body unconditionally on
/// the way to the instruction that is supposed to gate it.
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

struct Checker<'a> {
    elaboration: &'a Elaboration,
    tir: &'a FunctionTir,
    #[allow(dead_code)]
    def: DefId,
    handler: &'a Handler,
    states: FxHashMap<u32, State>,
    loop_depth: u32,
    owned: Vec<bool>,
}

impl<'a> Checker<'a> {
    fn local_index(&self, value: ValueId) -> Option<u32> {
        match self.elaboration.values.get(value).kind {
            ValueKind::ImmutableVariable(i) | ValueKind::MutableVariable(i) => Some(i),
            _ => None,
        }
    }

    fn is_linear_local(&self, idx: u32) -> bool {
        let value = self.tir.locals[idx as usize];
        let ty = self.elaboration.values.get(value).ty;
        self.elaboration.types.is_linear(ty, |_| false)
    }

    fn category_of(&self, value: ValueId) -> Category {
        match self.elaboration.values.get(value).category {
            ValueCategory::Rvalue => Category::Rvalue,
            ValueCategory::Place => Category::Lvalue,
            ValueCategory::MutablePlace => Category::LvalueMut,
            ValueCategory::Invalid => Category::Statement,
        }
    }

    fn error(&self, code: Code, message: impl Into<String>) {
        self.handler.emit(DiagnosticBuilder::error(code, message).build());
    }

    /// Applies one use of `value` under `category` to its local's state, if
    /// `value` names a tracked (linear) local.
    fn use_value(&mut self, value: ValueId, category: Category) {
        let Some(idx) = self.local_index(value) else { return };
        if !self.is_linear_local(idx) {
            return;
        }
        let state = self.states.get(&idx).copied().unwrap_or(State::NotConsumed);
        let (next, err) = transition(state, category, self.loop_depth > 0);
        if let Some(code) = err {
            self.error(code, format!("{}", code.name()));
        }
        self.states.insert(idx, next);
    }

    /// Processes instructions in `[range.start, range.end)`, recursing into
    /// nested `If`/`Loop` regions rather than treating them as flat.
    fn walk_range(&mut self, range: Range<u32>) {
        let mut cursor = range.start;
        while cursor < range.end {
            if self.owned[cursor as usize] {
                cursor += 1;
                continue;
            }
            let id = TirId(cursor);
            let inst = self.tir.insts[id];
            match inst.op {
                TirOp::If => {
                    let (cond, then_region, else_region) = self.tir.if_regions(inst.b);
                    self.walk_range(cond);
                    self.use_value(ValueId(inst.a), Category::Rvalue);

                    let mut then_states = self.states.clone();
                    let mut else_states = self.states.clone();
                    std::mem::swap(&mut self.states, &mut then_states);
                    self.walk_range(then_region);
                    std::mem::swap(&mut self.states, &mut then_states);
                    std::mem::swap(&mut self.states, &mut else_states);
                    self.walk_range(else_region);
                    std::mem::swap(&mut self.states, &mut else_states);

                    self.states = merge_states(&then_states, &else_states);
                }
                TirOp::Loop => {
                    let (cond, body) = self.tir.loop_regions(inst.b);
                    self.walk_range(cond);
                    self.use_value(ValueId(inst.a), Category::Rvalue);

                    self.loop_depth += 1;
                    self.walk_range(body);
                    self.loop_depth -= 1;
                }
                TirOp::Switch => {
                    self.use_value(ValueId(inst.a), Category::Rvalue);
                    let extra = inst.b as usize;
                    let count = self.tir.extra[extra] as usize;
                    let base = self.states.clone();
                    let mut merged: Option<FxHashMap<u32, State>> = None;
                    for i in 0..count {
                        let word = extra + 1 + i * 4;
                        let pattern = self.tir.extra[word];
                        let region = self.tir.extra[word + 1]..self.tir.extra[word + 2];
                        let result = self.tir.extra[word + 3];
                        if pattern != u32::MAX {
                            self.use_value(ValueId(pattern), Category::Rvalue);
                        }

                        let mut arm_states = base.clone();
                        std::mem::swap(&mut self.states, &mut arm_states);
                        self.walk_range(region);
                        self.use_value(ValueId(result), Category::Rvalue);
                        std::mem::swap(&mut self.states, &mut arm_states);

                        merged = Some(match merged {
                            Some(acc) => merge_states(&acc, &arm_states),
                            None => arm_states,
                        });
                    }
                    if let Some(merged) = merged {
                        self.states = merged;
                    }
                }
                _ => self.classify(inst),
            }
            cursor = id.0 + 1;
        }
    }

    fn classify(&mut self, inst: TirInst) {
        match inst.op {
            TirOp::Let | TirOp::Mut => {
                self.use_value(ValueId(inst.b), Category::Rvalue);
            }
            TirOp::Nop => {
                self.use_value(ValueId(inst.a), Category::Statement);
            }
            TirOp::Return => {
                if inst.b != 0 {
                    self.use_value(ValueId(inst.a), Category::Rvalue);
                }
            }
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
                self.use_value(ValueId(inst.a), Category::Rvalue);
                self.use_value(ValueId(inst.b), Category::Rvalue);
            }
            TirOp::Deref | TirOp::AddressOf | TirOp::AddressOfRvalue => {
                let category = self.category_of(ValueId(inst.a));
                self.use_value(ValueId(inst.a), category);
            }
            TirOp::Assign => {
                let place = ValueId(inst.a);
                let place_ty = self.elaboration.values.get(place).ty;
                if self.elaboration.types.is_linear(place_ty, |_| false) {
                    self.error(Code::LinearAssignment, "assignment to a linear place");
                }
                self.use_value(place, Category::LvalueMut);
                self.use_value(ValueId(inst.b), Category::Rvalue);
            }
            TirOp::Call => {
                self.use_value(ValueId(inst.a), Category::Rvalue);
                let args: Vec<u32> = self.tir.counted_extra(inst.b).to_vec();
                for arg in args {
                    self.use_value(ValueId(arg), Category::Rvalue);
                }
            }
            TirOp::Index | TirOp::Slice => {
                self.use_value(ValueId(inst.a), Category::Rvalue);
            }
            TirOp::Itof
            | TirOp::Ftoi
            | TirOp::Sext
            | TirOp::Zext
            | TirOp::Itrunc
            | TirOp::Ftrunc
            | TirOp::Fext
            | TirOp::PtrCast
            | TirOp::ArrayToSlice => {
                self.use_value(ValueId(inst.a), Category::Rvalue);
            }
            TirOp::StructInit | TirOp::ArrayInit => {
                let elems: Vec<u32> = self.tir.counted_extra(inst.a).to_vec();
                for elem in elems {
                    self.use_value(ValueId(elem), Category::Rvalue);
                }
            }
            TirOp::NewSlice => {
                self.use_value(ValueId(inst.a), Category::Rvalue);
                self.use_value(ValueId(inst.b), Category::Rvalue);
            }
            TirOp::FieldAccess => {
                let category = self.category_of(ValueId(inst.a));
                self.use_value(ValueId(inst.a), category);
            }
            TirOp::Break | TirOp::Continue => {}
            TirOp::If | TirOp::Loop | TirOp::Switch => unreachable!("handled in walk_range"),
        }
    }
}

/// Merges two forked branches' states at a control-flow join: any local
/// whose state differs between arms is conservatively promoted to
/// `CONSUMED` (spec §4.4).
fn merge_states(a: &FxHashMap<u32, State>, b: &FxHashMap<u32, State>) -> FxHashMap<u32, State> {
    let keys: FxHashSet<u32> = a.keys().chain(b.keys()).copied().collect();
    let mut merged = FxHashMap::default();
    for key in keys {
        let x = a.get(&key).copied().unwrap_or(State::NotConsumed);
        let y = b.get(&key).copied().unwrap_or(State::NotConsumed);
        merged.insert(key, if x == y { x } else { State::Consumed });
    }
    merged
}

/// The state × category rule table (spec §4.4).
fn transition(state: State, category: Category, in_loop: bool) -> (State, Option<Code>) {
    use Category::*;
    use State::*;
    match (state, category) {
        (NotConsumed, Rvalue) => {
            if in_loop {
                (Consumed, Some(Code::ConsumedInLoop))
            } else {
                (Consumed, None)
            }
        }
        (NotConsumed, Lvalue | LvalueMut | Statement) => (NotConsumed, None),
        (Consumed, _) => (Consumed, Some(Code::ConsumedValueUsed)),
        (Borrowed, Rvalue) => (Borrowed, Some(Code::MoveBorrowed)),
        (Borrowed, Lvalue | Statement) => (Borrowed, None),
        (Borrowed, LvalueMut) => (Borrowed, Some(Code::BorrowedMutableShared)),
        (BorrowedMut, Rvalue) => (BorrowedMut, Some(Code::MoveBorrowed)),
        (BorrowedMut, Lvalue) => (BorrowedMut, Some(Code::BorrowedMutableShared)),
        (BorrowedMut, LvalueMut) => (BorrowedMut, Some(Code::MultipleMutableBorrows)),
        (BorrowedMut, Statement) => (BorrowedMut, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{AstBuilder, AstNode, ExtraRange as AstExtraRange, File as AstFile, Program};
    use corec_role::{analyze, collect, Builtins};
    use corec_sem::elaborate;
    use corec_util::{SourceIndex, Symbol};

    fn build_program_with_loop_consume() -> Program {
        // function f() { let x = 1; while x { } }
        // Not a real linear type, so this only exercises the walker without
        // panics; full linear-local coverage needs an affine-tagged newtype
        // fixture (see DESIGN.md).
        let mut b = AstBuilder::new();
        let one = b.push(AstNode::IntLit(1), SourceIndex(0));
        let let_x = b.push(
            AstNode::Let { name: Symbol::intern("x"), ty: None, init: one },
            SourceIndex(1),
        );
        let ident_x = b.push(AstNode::Ident(Symbol::intern("x")), SourceIndex(2));
        let empty_block = b.push(AstNode::Block { stmts: AstExtraRange::EMPTY }, SourceIndex(3));
        let while_stmt = b.push(AstNode::While { cond: ident_x, body: empty_block }, SourceIndex(4));
        let stmts = b.push_extra(&[let_x, while_stmt]);
        let block = b.push(AstNode::Block { stmts }, SourceIndex(5));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("f"),
                is_public: true,
                type_params: AstExtraRange::EMPTY,
                params: AstExtraRange::EMPTY,
                ret: None,
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
        program
    }

    #[test]
    fn non_linear_locals_never_error() {
        let program = build_program_with_loop_consume();
        let handler = Handler::new();
        let globals = collect(&program, &handler);
        let builtins = Builtins::new();
        let roles = analyze(&program, &globals, &builtins, &handler);
        let elaboration = elaborate(&program, &globals, &roles, &builtins, &handler);
        check(&elaboration, &handler);
        assert!(!handler.has_errors());
    }
}
