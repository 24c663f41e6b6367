//! Stage 3 (spec §4.3): elaborate RIR into interned types, the value table,
//! and per-function TIR.
//!
//! The two mutual entry points from spec §4.3 are [`Elaborator::analyze_value`]
//! and [`Elaborator::analyze_type`]; a third, [`Elaborator::analyze_stmt`],
//! elaborates a statement into a TIR instruction id or `None` for pure
//! declarations (type/struct/enum/newtype declarations carry no runtime
//! effect).
//!
//! Besides the two-phase signature/body walk, this stage also owns: the
//! string table backing `StringLit` (§4.3's offset scheme), struct field
//! layout (needed by `FieldAccess`, `size_of`, `align_of`), enum member
//! constant values, and single-parameter-list generic inference at call
//! sites (unify each argument's natural type against its parameter, spec
//! §4.3's `id(42)` example).

use corec_ast::{Ast, AstId, AstNode, BinaryOp as AstBinaryOp, Program, UnaryOp as AstUnaryOp};
use corec_role::{Builtins, DefId, DefKind, GlobalSymbols, RirTag, RoleAnalysis};
use corec_util::{FxHashMap, FxHashSet, Handler, Idx, Span, Symbol};

use crate::decls::Declarations;
use crate::tir::{FunctionTir, TirOp};
use crate::types::{Primitive, Type, TypeId, TypeInterner};
use crate::value::{Value, ValueCategory, ValueId, ValueKind, ValueTable};
use crate::{Code, DiagnosticBuilder};

/// Everything stage 3 produces.
pub struct Elaboration {
    pub types: TypeInterner,
    pub values: ValueTable,
    pub functions: FxHashMap<DefId, FunctionTir>,
    pub decls: Declarations,
    /// The whole program's string-literal table: each entry is a 4-byte LE
    /// length prefix followed by the literal's escaped bytes and a null
    /// terminator, at the offset `ValueKind::StringLit` carries (spec §4.3).
    pub strings: Vec<u8>,
}

pub fn elaborate(
    program: &Program,
    globals: &GlobalSymbols,
    roles: &RoleAnalysis,
    builtins: &Builtins,
    handler: &Handler,
) -> Elaboration {
    let mut elaborator = Elaborator {
        program,
        globals,
        roles,
        builtins,
        handler,
        types: TypeInterner::new(),
        values: ValueTable::new(),
        functions: FxHashMap::default(),
        decls: Declarations::default(),
        struct_types: FxHashMap::default(),
        struct_fields: FxHashMap::default(),
        struct_layout: FxHashMap::default(),
        enum_types: FxHashMap::default(),
        enum_members: FxHashMap::default(),
        def_values: FxHashMap::default(),
        strings: Vec::new(),
        fn_ret_types: FxHashMap::default(),
        fn_type_param_scopes: FxHashMap::default(),
        type_param_scope: FxHashMap::default(),
    };

    for &def in &roles.order {
        elaborator.elaborate_signature(def);
    }
    for &def in &globals.functions {
        elaborator.elaborate_body(def);
    }

    Elaboration {
        types: elaborator.types,
        values: elaborator.values,
        functions: elaborator.functions,
        decls: elaborator.decls,
        strings: elaborator.strings,
    }
}

struct Elaborator<'a> {
    program: &'a Program,
    globals: &'a GlobalSymbols,
    roles: &'a RoleAnalysis,
    builtins: &'a Builtins,
    handler: &'a Handler,
    types: TypeInterner,
    values: ValueTable,
    functions: FxHashMap<DefId, FunctionTir>,
    decls: Declarations,
    struct_types: FxHashMap<DefId, TypeId>,
    /// Per struct: `(field name, field type, byte offset)` in declaration
    /// order, computed once at signature time (spec §4.3's `x.f` access and
    /// `size_of`/`align_of` both read this).
    struct_fields: FxHashMap<DefId, Vec<(Symbol, TypeId, u32)>>,
    struct_layout: FxHashMap<DefId, (u64, u64)>,
    enum_types: FxHashMap<DefId, TypeId>,
    /// Per enum: `(member name, discriminant)`, defaulted sequentially from
    /// the previous member's value plus one when a member has no explicit
    /// initializer.
    enum_members: FxHashMap<DefId, Vec<(Symbol, i64)>>,
    def_values: FxHashMap<DefId, ValueId>,
    strings: Vec<u8>,
    fn_ret_types: FxHashMap<DefId, TypeId>,
    /// A generic function's `T`-name-to-`TypeParameter` scope, built while
    /// elaborating its signature and replayed while elaborating its body
    /// (stage 3 elaborates every signature before any body).
    fn_type_param_scopes: FxHashMap<DefId, FxHashMap<corec_role::LocalSlot, TypeId>>,
    type_param_scope: FxHashMap<corec_role::LocalSlot, TypeId>,
}

struct Body<'f> {
    file: corec_util::FileId,
    def: DefId,
    tir: FunctionTir,
    locals: FxHashMap<corec_role::LocalSlot, u32>,
    /// Local indices introduced by `mut` (as opposed to `let`); only these
    /// may be the target of a plain-identifier assignment.
    mutable_locals: FxHashSet<u32>,
    ret_ty: TypeId,
    _marker: std::marker::PhantomData<&'f ()>,
}

enum Folded {
    Int(i64),
    Float(f64),
}

impl<'a> Elaborator<'a> {
    fn ast(&self, file: corec_util::FileId) -> &Ast {
        &self.program.files[file].ast
    }

    fn node_span(&self, file: corec_util::FileId, id: AstId) -> Span {
        Span::point(file, self.ast(file).source(id).0)
    }

    fn error(&self, file: corec_util::FileId, id: AstId, code: Code, message: impl Into<String>) {
        self.handler.emit(
            DiagnosticBuilder::error(code, message)
                .span(self.node_span(file, id))
                .build(),
        );
    }

    /// A scratch function body for elaborating a value outside any real
    /// function (const initializers, array-length expressions, enum member
    /// discriminants).
    fn scratch_body(&self, file: corec_util::FileId) -> Body<'static> {
        Body {
            file,
            def: DefId(u32::MAX),
            tir: FunctionTir::new(),
            locals: FxHashMap::default(),
            mutable_locals: FxHashSet::default(),
            ret_ty: self.types.error,
            _marker: std::marker::PhantomData,
        }
    }

    /// Finds the `LocalSlot` a declaration-site AST node (a `TypeParam`) was
    /// given by stage 2, by scanning the file's local table. Unlike an
    /// identifier *reference*, the declaration node itself is never tagged
    /// in the RIR, so this can't go through `roles.rir`.
    fn find_local_slot(&self, file: corec_util::FileId, ast: AstId) -> Option<corec_role::LocalSlot> {
        let locals = &self.roles.locals[file];
        for i in 0..locals.len() {
            let slot = corec_role::LocalSlot::from_usize(i);
            if locals.entry(slot).ast == ast {
                return Some(slot);
            }
        }
        None
    }

    /// Writes one string literal's bytes into the shared table and returns
    /// its offset (spec §4.3): a 4-byte LE length prefix, the escaped bytes,
    /// then a null terminator.
    fn intern_string(&mut self, sym: Symbol) -> u32 {
        let offset = self.strings.len() as u32;
        let bytes = decode_escapes(sym.as_str());
        self.strings.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.strings.extend_from_slice(&bytes);
        self.strings.push(0);
        offset
    }

    /// The size and alignment, in bytes, of a fully-elaborated type (spec
    /// §4.3's `size_of`/`align_of`). Types with no concrete runtime layout
    /// at this stage (generics, function values, tag types) report `(0, 1)`.
    fn type_layout(&self, ty: TypeId) -> (u64, u64) {
        match self.types.get(ty).clone() {
            Type::Primitive(Primitive::Void) => (0, 1),
            Type::Primitive(Primitive::Bool | Primitive::Byte | Primitive::I8) => (1, 1),
            Type::Primitive(Primitive::I16) => (2, 2),
            Type::Primitive(Primitive::I32 | Primitive::F32 | Primitive::Char) => (4, 4),
            Type::Primitive(Primitive::I64 | Primitive::Isize | Primitive::F64) => (8, 8),
            Type::Ptr { .. } | Type::MultiPtr { .. } => (8, 8),
            // A slice is a pointer plus a length, both word-sized (§3's
            // value shape for `Type::Slice`).
            Type::Slice { .. } => (16, 8),
            Type::Array { len, elem } => {
                let (esize, ealign) = self.type_layout(elem);
                (esize * len, ealign.max(1))
            }
            Type::Newtype { inner, .. } => self.type_layout(inner),
            Type::Struct { def, .. } => self.struct_layout.get(&def).copied().unwrap_or((0, 1)),
            Type::Enum { .. } => (8, 8),
            Type::TypeParameter { .. } | Type::Function { .. } | Type::Tagged { .. } | Type::Error => (0, 1),
        }
    }

    /// Lays out a struct's fields left to right, padding for each field's
    /// own alignment and rounding the total up to the struct's own maximum
    /// field alignment.
    fn layout_fields(&self, field_types: &[TypeId]) -> (Vec<u64>, u64, u64) {
        let mut offsets = Vec::with_capacity(field_types.len());
        let mut offset = 0u64;
        let mut max_align = 1u64;
        for &ty in field_types {
            let (size, align) = self.type_layout(ty);
            let align = align.max(1);
            offset = round_up(offset, align);
            offsets.push(offset);
            offset += size;
            max_align = max_align.max(align);
        }
        (offsets, round_up(offset, max_align), max_align)
    }

    /// Elaborates one global's type-level shape (struct field types, enum
    /// representation, newtype underlying type, function/extern signature)
    /// in `roles.order`, so that every reference used while elaborating a
    /// later definition already has a concrete [`TypeId`] or [`ValueId`].
    fn elaborate_signature(&mut self, def: DefId) {
        let d = self.globals.defs[def];
        let file = d.file;
        match d.kind {
            DefKind::Struct => {
                let AstNode::Struct { fields, .. } = self.ast(file).node(d.ast).clone() else {
                    return;
                };
                let mut names = Vec::new();
                let mut field_types = Vec::new();
                let fields_ids_1: Vec<AstId> = self.ast(file).extra(fields).to_vec();
                for &f in &fields_ids_1 {
                    if let AstNode::Field { name, ty } = *self.ast(file).node(f) {
                        names.push(name);
                        field_types.push(self.analyze_type(file, ty));
                    }
                }
                let is_empty = field_types.is_empty();
                let ty = self.types.alloc_nominal(Type::Struct {
                    def,
                    type_args: Vec::new(),
                });
                self.struct_types.insert(def, ty);
                let (offsets, size, align) = self.layout_fields(&field_types);
                self.struct_layout.insert(def, (size, align));
                self.struct_fields.insert(
                    def,
                    names
                        .into_iter()
                        .zip(field_types)
                        .zip(offsets)
                        .map(|((name, ty), offset)| (name, ty, offset as u32))
                        .collect(),
                );
                if is_empty {
                    self.error(file, d.ast, Code::EmptyStruct, "struct has no fields");
                }
                self.decls.structs.push(def);
            }
            DefKind::Enum => {
                let ty = self.types.alloc_nominal(Type::Enum { def });
                self.enum_types.insert(def, ty);
                let AstNode::Enum { repr, members, .. } = self.ast(file).node(d.ast).clone() else {
                    return;
                };
                let repr_ty = match repr {
                    Some(repr) => {
                        let repr_ty = self.analyze_type(file, repr);
                        if !self.types.is_integer(repr_ty) {
                            self.error(file, repr, Code::EnumReprNotInteger, "enum representation must be an integer type");
                        }
                        repr_ty
                    }
                    None => self.types.i64,
                };
                let member_ids: Vec<AstId> = self.ast(file).extra(members).to_vec();
                let mut entries = Vec::with_capacity(member_ids.len());
                let mut next = 0i64;
                for &m in &member_ids {
                    if let AstNode::EnumMember { name, value } = *self.ast(file).node(m) {
                        let discr = match value {
                            Some(v) => {
                                let mut scratch = self.scratch_body(file);
                                let val = self.analyze_value(&mut scratch, v, Some(repr_ty));
                                match self.values.get(val).kind {
                                    ValueKind::IntConst(n) => n,
                                    _ => next,
                                }
                            }
                            None => next,
                        };
                        entries.push((name, discr));
                        next = discr + 1;
                    }
                }
                self.enum_members.insert(def, entries);
            }
            DefKind::Newtype => {
                if let AstNode::Newtype { underlying, .. } = self.ast(file).node(d.ast).clone() {
                    let inner = self.analyze_type(file, underlying);
                    let ty = self.types.alloc_nominal(Type::Newtype {
                        def,
                        inner,
                        tag_args: Vec::new(),
                    });
                    self.struct_types.insert(def, ty);
                }
            }
            DefKind::Function => {
                if let AstNode::Function { type_params, params, ret, .. } = self.ast(file).node(d.ast).clone() {
                    let tp_ids: Vec<AstId> = self.ast(file).extra(type_params).to_vec();
                    let mut scope = FxHashMap::default();
                    for (index, &tp) in tp_ids.iter().enumerate() {
                        if let Some(slot) = self.find_local_slot(file, tp) {
                            let ty = self.types.alloc_nominal(Type::TypeParameter { def, index: index as u32 });
                            scope.insert(slot, ty);
                        }
                    }
                    self.type_param_scope = scope.clone();

                    let mut param_types = Vec::new();
                    let params_ids_2: Vec<AstId> = self.ast(file).extra(params).to_vec();
                    for &p in &params_ids_2 {
                        if let AstNode::Param { ty, .. } = *self.ast(file).node(p) {
                            param_types.push(self.analyze_type(file, ty));
                        }
                    }
                    let ret_ty = ret.map(|r| self.analyze_type(file, r)).unwrap_or(self.types.void);
                    self.type_param_scope = FxHashMap::default();
                    self.fn_type_param_scopes.insert(def, scope);
                    self.fn_ret_types.insert(def, ret_ty);

                    let fn_ty = self.types.intern(Type::Function {
                        params: param_types,
                        ret: ret_ty,
                        type_params: tp_ids.len() as u32,
                    });
                    if d.name.as_str() == "main" {
                        let is_nullary = matches!(self.ast(file).node(d.ast), AstNode::Function { params, .. } if self.ast(file).extra(*params).is_empty());
                        if !is_nullary || ret_ty != self.types.void {
                            self.error(file, d.ast, Code::MainSignature, "`main` must take no parameters and return nothing");
                        }
                    }
                    let value = self.values.push(Value {
                        ty: fn_ty,
                        kind: ValueKind::Function { def, symbol: d.name },
                        category: ValueCategory::Rvalue,
                    });
                    self.def_values.insert(def, value);
                    self.decls.functions.push(def);
                    if d.name.as_str() == "main" {
                        self.decls.main = Some(value);
                    }
                }
            }
            DefKind::ExternFunction => {
                if let AstNode::ExternFunction { params, ret, .. } = self.ast(file).node(d.ast).clone() {
                    let mut param_types = Vec::new();
                    let params_ids_3: Vec<AstId> = self.ast(file).extra(params).to_vec();
                    for &p in &params_ids_3 {
                        if let AstNode::Param { ty, .. } = *self.ast(file).node(p) {
                            param_types.push(self.analyze_type(file, ty));
                        }
                    }
                    let ret_ty = ret.map(|r| self.analyze_type(file, r)).unwrap_or(self.types.void);
                    let fn_ty = self.types.intern(Type::Function {
                        params: param_types,
                        ret: ret_ty,
                        type_params: 0,
                    });
                    let value = self.values.push(Value {
                        ty: fn_ty,
                        kind: ValueKind::ExternFunction { def, symbol: d.name },
                        category: ValueCategory::Rvalue,
                    });
                    self.def_values.insert(def, value);
                    self.decls.extern_functions.push(def);
                }
            }
            DefKind::ExternVar => {
                if let AstNode::ExternVar { ty, .. } = self.ast(file).node(d.ast).clone() {
                    let var_ty = self.analyze_type(file, ty);
                    let value = self.values.push(Value {
                        ty: var_ty,
                        kind: ValueKind::ExternVar { def },
                        category: ValueCategory::MutablePlace,
                    });
                    self.def_values.insert(def, value);
                    self.decls.extern_vars.push(def);
                }
            }
            DefKind::Const => {
                if let AstNode::Const { ty, init, .. } = self.ast(file).node(d.ast).clone() {
                    let hint = ty.map(|t| self.analyze_type(file, t));
                    let value = self.analyze_const_value(file, init, hint);
                    self.def_values.insert(def, value);
                }
            }
        }
    }

    fn elaborate_body(&mut self, def: DefId) {
        let d = self.globals.defs[def];
        let file = d.file;
        let AstNode::Function { params, body, .. } = self.ast(file).node(d.ast).clone() else {
            return;
        };
        self.type_param_scope = self.fn_type_param_scopes.get(&def).cloned().unwrap_or_default();
        let ret_ty = self.fn_ret_types.get(&def).copied().unwrap_or(self.types.void);
        let mut b = Body {
            file,
            def,
            tir: FunctionTir::new(),
            locals: FxHashMap::default(),
            mutable_locals: FxHashSet::default(),
            ret_ty,
            _marker: std::marker::PhantomData,
        };

        let params_ids_4: Vec<AstId> = self.ast(file).extra(params).to_vec();
        for &p in &params_ids_4 {
            if let AstNode::Param { ty, .. } = *self.ast(file).node(p) {
                let pty = self.analyze_type(file, ty);
                let local_idx = b.tir.locals.len() as u32;
                let value = self.values.push(Value {
                    ty: pty,
                    kind: ValueKind::ImmutableVariable(local_idx),
                    category: ValueCategory::Place,
                });
                b.tir.locals.push(value);
                if let RirTag::LocalId = self.roles.rir[file].tag(p) {
                    let slot = self.roles.rir[file].data(p).local.unwrap();
                    b.locals.insert(slot, local_idx);
                }
            }
        }

        self.elaborate_stmt_list(&mut b, body);
        self.functions.insert(def, b.tir);
        self.type_param_scope = FxHashMap::default();
    }

    fn elaborate_stmt_list(&mut self, b: &mut Body, block: AstId) {
        if let AstNode::Block { stmts } = *self.ast(b.file).node(block) {
            let ids: Vec<AstId> = self.ast(b.file).extra(stmts).to_vec();
            for &s in &ids {
                self.analyze_stmt(b, s);
            }
        }
    }

    /// Produces a TIR instruction id for a statement, or `None` for pure
    /// declarations that emit no runtime effect.
    fn analyze_stmt(&mut self, b: &mut Body, id: AstId) -> Option<crate::tir::TirId> {
        let node = self.ast(b.file).node(id).clone();
        match node {
            AstNode::Let { ty, init, .. } | AstNode::Mut { ty, init, .. } => {
                let is_mut = matches!(node, AstNode::Mut { .. });
                let hint = ty.map(|t| self.analyze_type(b.file, t));
                let mut value = self.analyze_value(b, init, hint);
                if let Some(target) = hint {
                    value = self.apply_implicit_conversion(b, id, value, target);
                }
                let local_idx = b.tir.new_local(value);
                if is_mut {
                    b.mutable_locals.insert(local_idx);
                }
                if let RirTag::LocalId = self.roles.rir[b.file].tag(id) {
                    let slot = self.roles.rir[b.file].data(id).local.unwrap();
                    b.locals.insert(slot, local_idx);
                }
                let op = if is_mut { TirOp::Mut } else { TirOp::Let };
                Some(b.tir.push(op, id, local_idx, value_index(value)))
            }
            AstNode::ExprStmt(e) => {
                let value = self.analyze_value(b, e, None);
                Some(b.tir.push(TirOp::Nop, id, value_index(value), 0))
            }
            AstNode::Return(e) => {
                let a = match e {
                    Some(expr) if b.ret_ty == self.types.void => {
                        self.error(b.file, id, Code::ReturnWithValue, "function returns nothing");
                        value_index(self.analyze_value(b, expr, None))
                    }
                    Some(expr) => {
                        let v = self.analyze_value(b, expr, Some(b.ret_ty));
                        let v = self.apply_implicit_conversion(b, id, v, b.ret_ty);
                        value_index(v)
                    }
                    None => {
                        if b.ret_ty != self.types.void {
                            self.error(b.file, id, Code::ReturnWithoutValue, "function must return a value");
                        }
                        0
                    }
                };
                Some(b.tir.push(TirOp::Return, id, a, e.is_some() as u32))
            }
            AstNode::If { cond, then_block, else_block } => {
                let cond_start = b.tir.insts.len() as u32;
                let c = self.analyze_value(b, cond, Some(self.types.bool_));
                let cond_end = b.tir.insts.len() as u32;
                let then_start = cond_end;
                self.elaborate_stmt_list(b, then_block);
                let then_end = b.tir.insts.len() as u32;
                let else_start = then_end;
                if let Some(e) = else_block {
                    self.elaborate_stmt_list(b, e);
                }
                let else_end = b.tir.insts.len() as u32;
                // Branch regions, spec §4.5: condition, then-body, else-body,
                // each a `[start, end)` range into this function's flat TIR
                // stream, so lowering can carve them into basic blocks.
                let extra = b.tir.push_extra(&[cond_start, cond_end, then_start, then_end, else_start, else_end]);
                Some(b.tir.push(TirOp::If, id, value_index(c), extra.start))
            }
            AstNode::While { cond, body } => {
                let cond_start = b.tir.insts.len() as u32;
                let c = self.analyze_value(b, cond, Some(self.types.bool_));
                let cond_end = b.tir.insts.len() as u32;
                let body_start = cond_end;
                self.elaborate_stmt_list(b, body);
                let body_end = b.tir.insts.len() as u32;
                let extra = b.tir.push_extra(&[cond_start, cond_end, body_start, body_end]);
                Some(b.tir.push(TirOp::Loop, id, value_index(c), extra.start))
            }
            AstNode::For { init, cond, step, body } => {
                if let Some(init) = init {
                    self.analyze_stmt(b, init);
                }
                let cond_start = b.tir.insts.len() as u32;
                let c = match cond {
                    Some(cond) => self.analyze_value(b, cond, Some(self.types.bool_)),
                    None => self.values.push(Value {
                        ty: self.types.bool_,
                        kind: ValueKind::IntConst(1),
                        category: ValueCategory::Rvalue,
                    }),
                };
                let cond_end = b.tir.insts.len() as u32;
                let body_start = cond_end;
                self.elaborate_stmt_list(b, body);
                // The step runs inside the body region, so `continue` (which
                // jumps back to the condition) skips it; a fully C-shaped
                // `for` would need its own region word (see DESIGN.md).
                if let Some(step) = step {
                    self.analyze_stmt(b, step);
                }
                let body_end = b.tir.insts.len() as u32;
                let extra = b.tir.push_extra(&[cond_start, cond_end, body_start, body_end]);
                Some(b.tir.push(TirOp::Loop, id, value_index(c), extra.start))
            }
            AstNode::Switch { discr, arms } => {
                let value = self.analyze_switch(b, id, discr, arms, None);
                Some(b.tir.push(TirOp::Nop, id, value_index(value), 0))
            }
            AstNode::Assign { place, value } => {
                self.analyze_assign(b, id, place, value);
                None
            }
            AstNode::CompoundAssign { op, place, value } => {
                self.analyze_compound_assign(b, id, op, place, value);
                None
            }
            AstNode::Block { .. } => {
                self.elaborate_stmt_list(b, id);
                None
            }
            AstNode::Break(_) => Some(b.tir.push(TirOp::Break, id, 0, 0)),
            AstNode::Continue => Some(b.tir.push(TirOp::Continue, id, 0, 0)),
            AstNode::Const { .. } => None,
            _ => {
                let value = self.analyze_value(b, id, None);
                Some(b.tir.push(TirOp::Nop, id, value_index(value), 0))
            }
        }
    }

    /// `analyze_value(node, hint) -> ValueId` (spec §4.3).
    fn analyze_value(&mut self, b: &mut Body, id: AstId, hint: Option<TypeId>) -> ValueId {
        let node = self.ast(b.file).node(id).clone();
        match node {
            AstNode::IntLit(v) => {
                let ty = hint.filter(|&t| self.types.is_integer(t)).unwrap_or(self.types.i64);
                self.values.push(Value {
                    ty,
                    kind: ValueKind::IntConst(v),
                    category: ValueCategory::Rvalue,
                })
            }
            AstNode::FloatLit(v) => {
                let ty = hint.filter(|&t| self.types.is_float(t)).unwrap_or(self.types.f64);
                self.values.push(Value {
                    ty,
                    kind: ValueKind::FloatConst(v),
                    category: ValueCategory::Rvalue,
                })
            }
            AstNode::BoolLit(v) => self.values.push(Value {
                ty: self.types.bool_,
                kind: ValueKind::IntConst(v as i64),
                category: ValueCategory::Rvalue,
            }),
            AstNode::NullLit => self.values.push(Value {
                ty: self.types.void,
                kind: ValueKind::NullConst,
                category: ValueCategory::Rvalue,
            }),
            AstNode::StringLit(sym) => {
                let offset = self.intern_string(sym);
                self.values.push(Value {
                    ty: self.types.intern(Type::Ptr { mutable: false, elem: self.types.byte }),
                    kind: ValueKind::StringLit { offset },
                    category: ValueCategory::Rvalue,
                })
            }
            AstNode::Ident(_) => self.resolve_ident_value(b, id),
            AstNode::Binary { op, left, right } => self.analyze_binary(b, id, op, left, right),
            AstNode::Call { callee, args } => self.analyze_call(b, id, callee, args),
            AstNode::Unary { op, operand } => self.analyze_unary(b, id, op, operand),
            AstNode::AddressOf { mutable, operand } => {
                let operand_value = self.analyze_value(b, operand, None);
                let operand_ty = self.values.get(operand_value).ty;
                let ptr_ty = self.types.intern(Type::Ptr { mutable, elem: operand_ty });
                if self.values.get(operand_value).is_place() {
                    if mutable && !self.values.get(operand_value).is_mutable_place() {
                        self.error(b.file, id, Code::AddressOfOperandRole, "cannot take a mutable reference to an immutable place");
                    }
                    let tir = b.tir.push(TirOp::AddressOf, id, value_index(operand_value), 0);
                    self.values.push(Value { ty: ptr_ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
                } else {
                    let tir = b.tir.push(TirOp::AddressOfRvalue, id, value_index(operand_value), 0);
                    self.values.push(Value { ty: ptr_ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
                }
            }
            AstNode::Deref(operand) => {
                let inner = self.analyze_value(b, operand, None);
                let ty = match self.types.get(self.values.get(inner).ty).clone() {
                    Type::Ptr { elem, mutable } | Type::MultiPtr { elem, mutable } => {
                        let category = if mutable {
                            ValueCategory::MutablePlace
                        } else {
                            ValueCategory::Place
                        };
                        let tir = b.tir.push(TirOp::Deref, id, value_index(inner), 0);
                        return self.values.push(Value {
                            ty: elem,
                            kind: ValueKind::Temporary(tir),
                            category,
                        });
                    }
                    _ => self.types.error,
                };
                self.values.push(Value::error(ty))
            }
            AstNode::Index { base, index } => self.analyze_index(b, id, base, index),
            AstNode::Slice { base, lo, hi } => self.analyze_slice(b, id, base, lo, hi),
            AstNode::Access { base, field } => self.analyze_access(b, id, base, field),
            AstNode::InferredAccess { field } => {
                let def = hint.and_then(|h| match self.types.get(h) {
                    Type::Enum { def } => Some(*def),
                    _ => None,
                });
                self.resolve_enum_member(b, id, def, field)
            }
            AstNode::ListLit { elems } => self.analyze_list_lit(b, id, elems, hint),
            AstNode::Switch { discr, arms } => self.analyze_switch(b, id, discr, arms, hint),
            _ => self.values.push(Value::error(self.types.error)),
        }
    }

    fn analyze_unary(&mut self, b: &mut Body, id: AstId, op: AstUnaryOp, operand: AstId) -> ValueId {
        let operand_value = self.analyze_value(b, operand, None);
        let ty = self.values.get(operand_value).ty;
        match op {
            AstUnaryOp::Neg => {
                if !self.types.is_integer(ty) && !self.types.is_float(ty) {
                    self.error(b.file, id, Code::UnaryOperandMismatch, "negation needs a numeric operand");
                    return self.values.push(Value::error(self.types.error));
                }
                match self.values.get(operand_value).kind.clone() {
                    ValueKind::IntConst(v) => {
                        let folded = v.checked_neg().unwrap_or_else(|| {
                            self.error(b.file, id, Code::ConstIntOverflow, "constant integer overflow");
                            0
                        });
                        return self.values.push(Value { ty, kind: ValueKind::IntConst(folded), category: ValueCategory::Rvalue });
                    }
                    ValueKind::FloatConst(v) => {
                        return self.values.push(Value { ty, kind: ValueKind::FloatConst(-v), category: ValueCategory::Rvalue });
                    }
                    _ => {}
                }
                let zero = self.values.push(Value {
                    ty,
                    kind: if self.types.is_float(ty) { ValueKind::FloatConst(0.0) } else { ValueKind::IntConst(0) },
                    category: ValueCategory::Rvalue,
                });
                let tir = b.tir.push(TirOp::Sub, id, value_index(zero), value_index(operand_value));
                self.values.push(Value { ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
            }
            AstUnaryOp::Not => {
                if ty != self.types.bool_ {
                    self.error(b.file, id, Code::UnaryOperandMismatch, "`!` needs a bool operand");
                    return self.values.push(Value::error(self.types.error));
                }
                if let ValueKind::IntConst(v) = self.values.get(operand_value).kind {
                    return self.values.push(Value {
                        ty: self.types.bool_,
                        kind: ValueKind::IntConst((v == 0) as i64),
                        category: ValueCategory::Rvalue,
                    });
                }
                let zero = self.values.push(Value { ty: self.types.bool_, kind: ValueKind::IntConst(0), category: ValueCategory::Rvalue });
                let tir = b.tir.push(TirOp::Eq, id, value_index(operand_value), value_index(zero));
                self.values.push(Value { ty: self.types.bool_, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
            }
            AstUnaryOp::BitNot => {
                if !self.types.is_integer(ty) {
                    self.error(b.file, id, Code::UnaryOperandMismatch, "`~` needs an integer operand");
                    return self.values.push(Value::error(self.types.error));
                }
                if let ValueKind::IntConst(v) = self.values.get(operand_value).kind {
                    return self.values.push(Value { ty, kind: ValueKind::IntConst(!v), category: ValueCategory::Rvalue });
                }
                let neg1 = self.values.push(Value { ty, kind: ValueKind::IntConst(-1), category: ValueCategory::Rvalue });
                let tir = b.tir.push(TirOp::BitXor, id, value_index(operand_value), value_index(neg1));
                self.values.push(Value { ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
            }
        }
    }

    fn analyze_index(&mut self, b: &mut Body, id: AstId, base: AstId, index: AstId) -> ValueId {
        let base_value = self.analyze_value(b, base, None);
        let index_value = self.analyze_value(b, index, Some(self.types.isize_));
        let index_ty = self.values.get(index_value).ty;
        if !self.types.is_integer(index_ty) {
            self.error(b.file, index, Code::ArrayIndexTypeNotArrayLength, "index must be an integer");
        }
        let base_ty = self.values.get(base_value).ty;
        match self.types.get(base_ty).clone() {
            Type::Array { elem, .. } => {
                let category = self.values.get(base_value).category;
                let tir = b.tir.push(TirOp::Index, id, value_index(base_value), value_index(index_value));
                self.values.push(Value { ty: elem, kind: ValueKind::Temporary(tir), category })
            }
            Type::Slice { elem, mutable } => {
                let category = if mutable { ValueCategory::MutablePlace } else { ValueCategory::Place };
                let tir = b.tir.push(TirOp::Slice, id, value_index(base_value), value_index(index_value));
                self.values.push(Value { ty: elem, kind: ValueKind::Temporary(tir), category })
            }
            _ => {
                self.error(b.file, id, Code::IndexOperandRole, "value is not indexable");
                self.values.push(Value::error(self.types.error))
            }
        }
    }

    /// `a[lo:hi]` range slicing. The resulting pointer is taken over the
    /// whole base value rather than offset by `lo` elements (no
    /// pointer-arithmetic MIR op exists yet), so the construction is exact
    /// only when `lo == 0` — see DESIGN.md.
    fn analyze_slice(&mut self, b: &mut Body, id: AstId, base: AstId, lo: Option<AstId>, hi: Option<AstId>) -> ValueId {
        let base_value = self.analyze_value(b, base, None);
        let base_ty = self.values.get(base_value).ty;
        let (elem, mutable, known_len) = match self.types.get(base_ty).clone() {
            Type::Array { elem, len } => (elem, self.values.get(base_value).is_mutable_place(), Some(len as i64)),
            Type::Slice { elem, mutable } => (elem, mutable, None),
            _ => {
                self.error(b.file, id, Code::IndexOperandRole, "value is not sliceable");
                return self.values.push(Value::error(self.types.error));
            }
        };
        let lo_value = match lo {
            Some(l) => self.analyze_value(b, l, Some(self.types.isize_)),
            None => self.values.push(Value { ty: self.types.isize_, kind: ValueKind::IntConst(0), category: ValueCategory::Rvalue }),
        };
        let hi_value = match hi {
            Some(h) => self.analyze_value(b, h, Some(self.types.isize_)),
            None => match known_len {
                Some(n) => self.values.push(Value { ty: self.types.isize_, kind: ValueKind::IntConst(n), category: ValueCategory::Rvalue }),
                None => {
                    self.error(b.file, id, Code::CannotInferType, "slice needs an explicit upper bound");
                    self.values.push(Value::error(self.types.error))
                }
            },
        };
        let len_tir = b.tir.push(TirOp::Sub, id, value_index(hi_value), value_index(lo_value));
        let len_value = self.values.push(Value { ty: self.types.isize_, kind: ValueKind::Temporary(len_tir), category: ValueCategory::Rvalue });

        let ptr_op = if self.values.get(base_value).is_place() { TirOp::AddressOf } else { TirOp::AddressOfRvalue };
        let ptr_ty = self.types.intern(Type::Ptr { mutable, elem });
        let ptr_tir = b.tir.push(ptr_op, id, value_index(base_value), 0);
        let ptr_value = self.values.push(Value { ty: ptr_ty, kind: ValueKind::Temporary(ptr_tir), category: ValueCategory::Rvalue });

        let slice_tir = b.tir.push(TirOp::NewSlice, id, value_index(ptr_value), value_index(len_value));
        let slice_ty = self.types.intern(Type::Slice { mutable, elem });
        self.values.push(Value { ty: slice_ty, kind: ValueKind::Temporary(slice_tir), category: ValueCategory::Rvalue })
    }

    fn analyze_access(&mut self, b: &mut Body, id: AstId, base: AstId, field: Symbol) -> ValueId {
        match self.roles.rir[b.file].tag(id) {
            RirTag::TypeAccess => {
                let base_value = self.analyze_value(b, base, None);
                let base_ty = self.values.get(base_value).ty;
                match self.types.get(base_ty).clone() {
                    Type::Struct { def, .. } => self.field_access(b, id, base_value, def, field),
                    _ => {
                        self.error(b.file, id, Code::AccessOperandRole, "value has no fields");
                        self.values.push(Value::error(self.types.error))
                    }
                }
            }
            RirTag::ScopeAccess => {
                let enum_def = match self.roles.rir[b.file].tag(base) {
                    RirTag::GlobalId => self.roles.rir[b.file].data(base).global,
                    _ => None,
                };
                self.resolve_enum_member(b, id, enum_def, field)
            }
            _ => {
                self.error(b.file, id, Code::AccessOperandRole, "invalid field access");
                self.values.push(Value::error(self.types.error))
            }
        }
    }

    fn field_access(&mut self, b: &mut Body, id: AstId, base_value: ValueId, def: DefId, field: Symbol) -> ValueId {
        let Some(fields) = self.struct_fields.get(&def) else {
            return self.values.push(Value::error(self.types.error));
        };
        match fields.iter().find(|(name, ..)| *name == field).copied() {
            Some((_, ty, offset)) => {
                let category = self.values.get(base_value).category;
                let tir = b.tir.push(TirOp::FieldAccess, id, value_index(base_value), offset);
                self.values.push(Value { ty, kind: ValueKind::Temporary(tir), category })
            }
            None => {
                self.error(b.file, id, Code::UnknownField, "unknown field");
                self.values.push(Value::error(self.types.error))
            }
        }
    }

    fn resolve_enum_member(&mut self, b: &mut Body, id: AstId, def: Option<DefId>, field: Symbol) -> ValueId {
        let Some(def) = def else {
            self.error(b.file, id, Code::CannotInferType, "cannot infer enum type for member access");
            return self.values.push(Value::error(self.types.error));
        };
        let Some(members) = self.enum_members.get(&def) else {
            return self.values.push(Value::error(self.types.error));
        };
        match members.iter().find(|(name, _)| *name == field).copied() {
            Some((_, value)) => {
                let ty = self.enum_types.get(&def).copied().unwrap_or(self.types.error);
                self.values.push(Value { ty, kind: ValueKind::IntConst(value), category: ValueCategory::Rvalue })
            }
            None => {
                self.error(b.file, id, Code::UnknownField, "unknown enum member");
                self.values.push(Value::error(self.types.error))
            }
        }
    }

    fn analyze_list_lit(&mut self, b: &mut Body, id: AstId, elems: corec_ast::ExtraRange, hint: Option<TypeId>) -> ValueId {
        let elem_ids: Vec<AstId> = self.ast(b.file).extra(elems).to_vec();
        if elem_ids.is_empty() {
            self.error(b.file, id, Code::EmptyArray, "array literal must not be empty");
            return self.values.push(Value::error(self.types.error));
        }
        let elem_hint = hint.and_then(|h| match self.types.get(h) {
            Type::Array { elem, .. } => Some(*elem),
            _ => None,
        });
        let mut values = Vec::with_capacity(elem_ids.len());
        let mut elem_ty = None;
        for &e in &elem_ids {
            let v = self.analyze_value(b, e, elem_hint.or(elem_ty));
            let vty = self.values.get(v).ty;
            match elem_ty {
                None => elem_ty = Some(vty),
                Some(t) if t == vty => {}
                Some(_) => self.error(b.file, e, Code::ValueTypeMismatch, "array elements must share one type"),
            }
            values.push(value_index(v));
        }
        let elem_ty = elem_ty.unwrap_or(self.types.error);
        let extra_start = b.tir.push_counted_extra(&values);
        let tir = b.tir.push(TirOp::ArrayInit, id, extra_start, 0);
        let array_ty = self.types.intern(Type::Array { len: elem_ids.len() as u64, elem: elem_ty });
        self.values.push(Value { ty: array_ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
    }

    /// `switch` as a value-producing expression (spec §4.3): every arm's
    /// `[region_start, region_end)` plus its pattern and result value are
    /// recorded so both the affine checker and MIR lowering can walk the
    /// same branch-chain shape `If`/`Loop` already use.
    fn analyze_switch(&mut self, b: &mut Body, id: AstId, discr: Option<AstId>, arms: corec_ast::ExtraRange, hint: Option<TypeId>) -> ValueId {
        let Some(discr) = discr else {
            self.error(b.file, id, Code::CannotInferType, "switch needs a discriminant");
            return self.values.push(Value::error(self.types.error));
        };
        let discr_value = self.analyze_value(b, discr, None);
        let discr_ty = self.values.get(discr_value).ty;
        let arm_ids: Vec<AstId> = self.ast(b.file).extra(arms).to_vec();

        let mut seen: FxHashSet<i64> = FxHashSet::default();
        let mut has_else = false;
        for &arm in &arm_ids {
            if let AstNode::SwitchArm { pattern, .. } = *self.ast(b.file).node(arm) {
                match pattern {
                    None => {
                        if has_else {
                            self.error(b.file, arm, Code::DuplicateSwitchCase, "more than one else arm");
                        }
                        has_else = true;
                    }
                    Some(p) => {
                        if let AstNode::IntLit(v) = *self.ast(b.file).node(p) {
                            if !seen.insert(v) {
                                self.error(b.file, arm, Code::DuplicateSwitchCase, "duplicate switch case");
                            }
                        }
                    }
                }
            }
        }
        let exhaustive_without_else = match self.types.get(discr_ty).clone() {
            Type::Primitive(Primitive::Bool) => seen.contains(&0) && seen.contains(&1),
            Type::Enum { def } => self
                .enum_members
                .get(&def)
                .map(|members| members.iter().all(|(_, v)| seen.contains(v)))
                .unwrap_or(false),
            _ => false,
        };
        if !exhaustive_without_else && !has_else {
            self.error(b.file, id, Code::SwitchNotExhaustive, "switch is not exhaustive");
        }
        if has_else && exhaustive_without_else {
            self.error(b.file, id, Code::ElseCaseUnreachable, "else arm is unreachable");
        }

        let mut result_ty: Option<TypeId> = hint;
        let mut words: Vec<u32> = vec![arm_ids.len() as u32];
        for &arm in &arm_ids {
            let AstNode::SwitchArm { pattern, value } = *self.ast(b.file).node(arm) else {
                continue;
            };
            let pattern_idx = match pattern {
                Some(p) => value_index(self.analyze_value(b, p, Some(discr_ty))),
                None => u32::MAX,
            };
            let region_start = b.tir.insts.len() as u32;
            let arm_value = self.analyze_value(b, value, result_ty);
            let region_end = b.tir.insts.len() as u32;
            let arm_ty = self.values.get(arm_value).ty;
            match result_ty {
                None => result_ty = Some(arm_ty),
                Some(t) if t == arm_ty => {}
                Some(_) => self.error(b.file, arm, Code::SwitchIncompatibleCases, "switch arms have different types"),
            }
            words.push(pattern_idx);
            words.push(region_start);
            words.push(region_end);
            words.push(value_index(arm_value));
        }
        let result_ty = result_ty.unwrap_or(self.types.error);
        let extra = b.tir.push_extra(&words);
        let tir = b.tir.push(TirOp::Switch, id, value_index(discr_value), extra.start);
        self.values.push(Value { ty: result_ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
    }

    /// Finds the local index a plain-identifier assignment target names, if
    /// it is a `mut`-declared local (the only assignable-by-rebind shape);
    /// anything else (a `let` binding, a deref, an extern var) must go
    /// through the generic mutable-place path in [`Self::analyze_assign`].
    fn mutable_local_index(&self, b: &Body, place: AstId) -> Option<u32> {
        if !matches!(self.ast(b.file).node(place), AstNode::Ident(_)) {
            return None;
        }
        if self.roles.rir[b.file].tag(place) != RirTag::LocalId {
            return None;
        }
        let slot = self.roles.rir[b.file].data(place).local?;
        let idx = *b.locals.get(&slot)?;
        b.mutable_locals.contains(&idx).then_some(idx)
    }

    fn analyze_assign(&mut self, b: &mut Body, id: AstId, place: AstId, value: AstId) {
        if let Some(idx) = self.mutable_local_index(b, place) {
            let old = b.tir.locals[idx as usize];
            let target_ty = self.values.get(old).ty;
            let v = self.analyze_value(b, value, Some(target_ty));
            let converted = self.apply_implicit_conversion(b, id, v, target_ty);
            b.tir.locals[idx as usize] = converted;
            b.tir.push(TirOp::Assign, id, value_index(old), value_index(converted));
            return;
        }
        let place_value = self.analyze_value(b, place, None);
        if !self.values.get(place_value).is_mutable_place() {
            self.error(b.file, id, Code::NotAPlace, "assignment target is not a mutable place");
        }
        let target_ty = self.values.get(place_value).ty;
        let v = self.analyze_value(b, value, Some(target_ty));
        let converted = self.apply_implicit_conversion(b, id, v, target_ty);
        b.tir.push(TirOp::Assign, id, value_index(place_value), value_index(converted));
    }

    fn analyze_compound_assign(&mut self, b: &mut Body, id: AstId, op: AstBinaryOp, place: AstId, value: AstId) {
        let is_logical = matches!(op, AstBinaryOp::And | AstBinaryOp::Or);
        if let Some(idx) = self.mutable_local_index(b, place) {
            let old = b.tir.locals[idx as usize];
            let target_ty = self.values.get(old).ty;
            let rhs = self.analyze_value(b, value, Some(target_ty));
            let combined = self.combine_compound(b, id, op, is_logical, old, rhs, target_ty);
            let converted = self.apply_implicit_conversion(b, id, combined, target_ty);
            b.tir.locals[idx as usize] = converted;
            b.tir.push(TirOp::Assign, id, value_index(old), value_index(converted));
            return;
        }
        let place_value = self.analyze_value(b, place, None);
        if !self.values.get(place_value).is_mutable_place() {
            self.error(b.file, id, Code::NotAPlace, "assignment target is not a mutable place");
        }
        let target_ty = self.values.get(place_value).ty;
        let rhs = self.analyze_value(b, value, Some(target_ty));
        let combined = self.combine_compound(b, id, op, is_logical, place_value, rhs, target_ty);
        let converted = self.apply_implicit_conversion(b, id, combined, target_ty);
        b.tir.push(TirOp::Assign, id, value_index(place_value), value_index(converted));
    }

    /// `&&=`/`||=` fold eagerly rather than through [`Self::analyze_logical`]'s
    /// branch: both operands are already fully evaluated by the time this
    /// runs (the place was read, the rhs was analyzed), so short-circuiting
    /// would not change observable behavior here.
    fn combine_compound(
        &mut self,
        b: &mut Body,
        id: AstId,
        op: AstBinaryOp,
        is_logical: bool,
        place_value: ValueId,
        rhs: ValueId,
        ty: TypeId,
    ) -> ValueId {
        let tir_op = if is_logical {
            match op {
                AstBinaryOp::And => TirOp::BitAnd,
                AstBinaryOp::Or => TirOp::BitOr,
                _ => unreachable!(),
            }
        } else {
            map_binary_op(op)
        };
        let tir = b.tir.push(tir_op, id, value_index(place_value), value_index(rhs));
        self.values.push(Value { ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
    }

    fn resolve_ident_value(&mut self, b: &mut Body, id: AstId) -> ValueId {
        let tag = self.roles.rir[b.file].tag(id);
        let data = self.roles.rir[b.file].data(id);
        match tag {
            RirTag::LocalId => {
                let slot = data.local.unwrap();
                if let Some(&idx) = b.locals.get(&slot) {
                    let value = b.tir.locals[idx as usize];
                    return value;
                }
                self.values.push(Value::error(self.types.error))
            }
            RirTag::GlobalId => {
                let def = data.global.unwrap();
                self.def_values.get(&def).copied().unwrap_or_else(|| {
                    self.values.push(Value::error(self.types.error))
                })
            }
            _ => self.values.push(Value::error(self.types.error)),
        }
    }

    fn analyze_binary(
        &mut self,
        b: &mut Body,
        id: AstId,
        op: AstBinaryOp,
        left: AstId,
        right: AstId,
    ) -> ValueId {
        if matches!(op, AstBinaryOp::And | AstBinaryOp::Or) {
            return self.analyze_logical(b, id, op, left, right);
        }
        let lv = self.analyze_value(b, left, None);
        let rv = self.analyze_value(b, right, None);
        let lty = self.values.get(lv).ty;
        let rty = self.values.get(rv).ty;
        if lty != rty {
            self.error(b.file, id, Code::BinaryOperandMismatch, "operand types do not match");
            return self.values.push(Value::error(self.types.error));
        }

        if let (ValueKind::IntConst(l), ValueKind::IntConst(r)) =
            (self.values.get(lv).kind.clone(), self.values.get(rv).kind.clone())
        {
            if let Some(folded) = self.fold_int(b.file, id, op, l, r) {
                let result_ty = if is_comparison(op) { self.types.bool_ } else { lty };
                return self.values.push(Value {
                    ty: result_ty,
                    kind: ValueKind::IntConst(folded),
                    category: ValueCategory::Rvalue,
                });
            }
        }
        if let (ValueKind::FloatConst(l), ValueKind::FloatConst(r)) =
            (self.values.get(lv).kind.clone(), self.values.get(rv).kind.clone())
        {
            if let Some(folded) = fold_float(op, l, r) {
                return match folded {
                    Folded::Float(v) => self.values.push(Value { ty: lty, kind: ValueKind::FloatConst(v), category: ValueCategory::Rvalue }),
                    Folded::Int(v) => self.values.push(Value { ty: self.types.bool_, kind: ValueKind::IntConst(v), category: ValueCategory::Rvalue }),
                };
            }
        }

        let tir_op = map_binary_op(op);
        let result_ty = if is_comparison(op) { self.types.bool_ } else { lty };
        let tir = b.tir.push(tir_op, id, value_index(lv), value_index(rv));
        self.values.push(Value {
            ty: result_ty,
            kind: ValueKind::Temporary(tir),
            category: ValueCategory::Rvalue,
        })
    }

    /// `&&`/`||` lower to a two-arm [`TirOp::Switch`] on the left operand so
    /// the right operand is only ever elaborated into the arm that actually
    /// evaluates it at runtime (spec §4.3's short-circuit requirement).
    fn analyze_logical(&mut self, b: &mut Body, id: AstId, op: AstBinaryOp, left: AstId, right: AstId) -> ValueId {
        let lv = self.analyze_value(b, left, Some(self.types.bool_));
        if self.values.get(lv).ty != self.types.bool_ {
            self.error(b.file, id, Code::BinaryOperandMismatch, "operand must be bool");
        }

        let (true_start, true_end, true_result, false_start, false_end, false_result) = match op {
            AstBinaryOp::And => {
                let true_start = b.tir.insts.len() as u32;
                let r = self.analyze_value(b, right, Some(self.types.bool_));
                let true_end = b.tir.insts.len() as u32;
                let zero = self.values.push(Value { ty: self.types.bool_, kind: ValueKind::IntConst(0), category: ValueCategory::Rvalue });
                (true_start, true_end, value_index(r), true_end, true_end, value_index(zero))
            }
            AstBinaryOp::Or => {
                let point = b.tir.insts.len() as u32;
                let one = self.values.push(Value { ty: self.types.bool_, kind: ValueKind::IntConst(1), category: ValueCategory::Rvalue });
                let r = self.analyze_value(b, right, Some(self.types.bool_));
                let false_end = b.tir.insts.len() as u32;
                (point, point, value_index(one), point, false_end, value_index(r))
            }
            _ => unreachable!("analyze_logical only handles And/Or"),
        };
        let true_pat = value_index(self.values.push(Value { ty: self.types.bool_, kind: ValueKind::IntConst(1), category: ValueCategory::Rvalue }));
        let false_pat = value_index(self.values.push(Value { ty: self.types.bool_, kind: ValueKind::IntConst(0), category: ValueCategory::Rvalue }));
        let extra = b.tir.push_extra(&[2, true_pat, true_start, true_end, true_result, false_pat, false_start, false_end, false_result]);
        let tir = b.tir.push(TirOp::Switch, id, value_index(lv), extra.start);
        self.values.push(Value { ty: self.types.bool_, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
    }

    /// Constant folding for integer operands (spec §4.3). `And`/`Or` never
    /// reach here: [`Self::analyze_binary`] intercepts them into
    /// [`Self::analyze_logical`] before falling back to this.
    fn fold_int(&self, file: corec_util::FileId, id: AstId, op: AstBinaryOp, l: i64, r: i64) -> Option<i64> {
        let result = match op {
            AstBinaryOp::Add => l.checked_add(r),
            AstBinaryOp::Sub => l.checked_sub(r),
            AstBinaryOp::Mul => l.checked_mul(r),
            AstBinaryOp::Div => {
                if r == 0 || (l == i64::MIN && r == -1) {
                    None
                } else {
                    Some(l / r)
                }
            }
            AstBinaryOp::Rem => {
                if r == 0 {
                    None
                } else {
                    Some(l % r)
                }
            }
            AstBinaryOp::BitAnd => Some(l & r),
            AstBinaryOp::BitOr => Some(l | r),
            AstBinaryOp::BitXor => Some(l ^ r),
            AstBinaryOp::Shl => {
                if r < 0 {
                    self.error_shift(file, id);
                    return Some(0);
                }
                Some(if r >= 64 { 0 } else { l << r })
            }
            AstBinaryOp::Shr => {
                if r < 0 {
                    self.error_shift(file, id);
                    return Some(0);
                }
                Some(if r >= 64 { l >> 63 } else { l >> r })
            }
            AstBinaryOp::Eq => Some((l == r) as i64),
            AstBinaryOp::Ne => Some((l != r) as i64),
            AstBinaryOp::Lt => Some((l < r) as i64),
            AstBinaryOp::Le => Some((l <= r) as i64),
            AstBinaryOp::Gt => Some((l > r) as i64),
            AstBinaryOp::Ge => Some((l >= r) as i64),
            AstBinaryOp::And | AstBinaryOp::Or => unreachable!("handled by analyze_logical"),
        };
        match result {
            Some(v) => Some(v),
            None => {
                self.error(file, id, Code::ConstIntOverflow, "constant integer overflow");
                Some(0)
            }
        }
    }

    fn error_shift(&self, file: corec_util::FileId, id: AstId) {
        self.error(file, id, Code::NegativeShift, "shift amount must not be negative");
    }

    fn analyze_call(&mut self, b: &mut Body, id: AstId, callee: AstId, args: corec_ast::ExtraRange) -> ValueId {
        let callee_tag = self.roles.rir[b.file].tag(callee);
        if callee_tag == RirTag::BuiltinMacro {
            return self.analyze_macro_call(b, id, callee, args);
        }
        if callee_tag == RirTag::GlobalId {
            if let Some(def) = self.roles.rir[b.file].data(callee).global {
                if self.globals.defs[def].kind == DefKind::Struct {
                    return self.analyze_struct_construction(b, id, def, args);
                }
            }
        }
        let callee_value = self.analyze_value(b, callee, None);
        let callee_ty = self.values.get(callee_value).ty;
        let (param_types, ret_ty, type_params) = match self.types.get(callee_ty).clone() {
            Type::Function { params, ret, type_params } => (params, ret, type_params),
            _ => {
                self.error(b.file, id, Code::NotAFunctionOrStruct, "not callable");
                return self.values.push(Value::error(self.types.error));
            }
        };
        let arg_ids: Vec<AstId> = self.ast(b.file).extra(args).to_vec();
        if arg_ids.len() != param_types.len() {
            self.error(b.file, id, Code::ArgumentCount, "wrong number of arguments");
        }

        let mut subst: FxHashMap<u32, TypeId> = FxHashMap::default();
        let mut natural_values = Vec::with_capacity(arg_ids.len());
        for (i, &a) in arg_ids.iter().enumerate() {
            let hint = param_types.get(i).copied();
            let v = self.analyze_value(b, a, hint);
            if let Some(&pt) = param_types.get(i) {
                let at = self.values.get(v).ty;
                if !self.match_type_parameters(pt, at, &mut subst) {
                    self.error(b.file, a, Code::TypeArgumentInference, "argument type does not match parameter type");
                }
            }
            natural_values.push(v);
        }
        if type_params > 0 {
            for idx in 0..type_params {
                if !subst.contains_key(&idx) {
                    self.error(b.file, id, Code::TypeArgumentInference, "could not infer type parameter");
                }
            }
        }

        let mut arg_values = Vec::with_capacity(natural_values.len());
        for (i, v) in natural_values.into_iter().enumerate() {
            let converted = match param_types.get(i).copied() {
                Some(pt) => {
                    let target = self.substitute_type_params(pt, &subst);
                    self.apply_implicit_conversion(b, id, v, target)
                }
                None => v,
            };
            arg_values.push(value_index(converted));
        }
        let final_ret_ty = self.substitute_type_params(ret_ty, &subst);
        let extra_start = b.tir.push_counted_extra(&arg_values);
        let tir = b.tir.push(TirOp::Call, id, value_index(callee_value), extra_start);
        self.values.push(Value {
            ty: final_ret_ty,
            kind: ValueKind::Temporary(tir),
            category: ValueCategory::Rvalue,
        })
    }

    fn analyze_struct_construction(&mut self, b: &mut Body, id: AstId, def: DefId, args: corec_ast::ExtraRange) -> ValueId {
        let ty = self.struct_types.get(&def).copied().unwrap_or(self.types.error);
        let fields = self.struct_fields.get(&def).cloned().unwrap_or_default();
        let arg_ids: Vec<AstId> = self.ast(b.file).extra(args).to_vec();
        if arg_ids.len() != fields.len() {
            self.error(b.file, id, Code::FieldCount, "wrong number of struct fields");
        }
        let mut values = Vec::with_capacity(arg_ids.len());
        for (i, &a) in arg_ids.iter().enumerate() {
            let field_ty = fields.get(i).map(|(_, t, _)| *t);
            let v = self.analyze_value(b, a, field_ty);
            let converted = match field_ty {
                Some(t) => self.apply_implicit_conversion(b, id, v, t),
                None => v,
            };
            values.push(value_index(converted));
        }
        let extra_start = b.tir.push_counted_extra(&values);
        let tir = b.tir.push(TirOp::StructInit, id, extra_start, 0);
        self.values.push(Value { ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
    }

    /// Structurally unifies a (possibly generic) parameter type against an
    /// argument's natural type, binding each `TypeParameter` index it meets
    /// into `subst` (spec §4.3's `id(42)` scenario: `T := i64`).
    fn match_type_parameters(&self, param: TypeId, arg: TypeId, subst: &mut FxHashMap<u32, TypeId>) -> bool {
        if arg == self.types.error || param == self.types.error {
            return true;
        }
        match (self.types.get(param).clone(), self.types.get(arg).clone()) {
            (Type::TypeParameter { index, .. }, _) => match subst.get(&index) {
                Some(&bound) => bound == arg,
                None => {
                    subst.insert(index, arg);
                    true
                }
            },
            (Type::Ptr { mutable: pm, elem: pe }, Type::Ptr { mutable: am, elem: ae }) if pm == am => {
                self.match_type_parameters(pe, ae, subst)
            }
            (Type::MultiPtr { mutable: pm, elem: pe }, Type::MultiPtr { mutable: am, elem: ae }) if pm == am => {
                self.match_type_parameters(pe, ae, subst)
            }
            (Type::Slice { mutable: pm, elem: pe }, Type::Slice { mutable: am, elem: ae }) if pm == am => {
                self.match_type_parameters(pe, ae, subst)
            }
            (Type::Array { len: pl, elem: pe }, Type::Array { len: al, elem: ae }) if pl == al => {
                self.match_type_parameters(pe, ae, subst)
            }
            _ => param == arg,
        }
    }

    fn substitute_type_params(&mut self, ty: TypeId, subst: &FxHashMap<u32, TypeId>) -> TypeId {
        if subst.is_empty() {
            return ty;
        }
        match self.types.get(ty).clone() {
            Type::TypeParameter { index, .. } => subst.get(&index).copied().unwrap_or(ty),
            Type::Ptr { mutable, elem } => {
                let e = self.substitute_type_params(elem, subst);
                self.types.intern(Type::Ptr { mutable, elem: e })
            }
            Type::MultiPtr { mutable, elem } => {
                let e = self.substitute_type_params(elem, subst);
                self.types.intern(Type::MultiPtr { mutable, elem: e })
            }
            Type::Slice { mutable, elem } => {
                let e = self.substitute_type_params(elem, subst);
                self.types.intern(Type::Slice { mutable, elem: e })
            }
            Type::Array { len, elem } => {
                let e = self.substitute_type_params(elem, subst);
                self.types.intern(Type::Array { len, elem: e })
            }
            _ => ty,
        }
    }

    fn analyze_macro_call(&mut self, b: &mut Body, id: AstId, callee: AstId, args: corec_ast::ExtraRange) -> ValueId {
        let bid = self.roles.rir[b.file].data(callee).builtin;
        let name = bid.map(|bid| self.builtins.name(bid));
        let arg_ids: Vec<AstId> = self.ast(b.file).extra(args).to_vec();
        match name.map(|s| s.as_str()) {
            Some("size_of") | Some("align_of") => {
                let is_size = name.unwrap().as_str() == "size_of";
                let ty = match arg_ids.first() {
                    Some(&arg) => self.analyze_type(b.file, arg),
                    None => self.types.error,
                };
                if self.types.get(ty) == &Type::Error {
                    self.error(b.file, id, Code::UnknownSizeOrAlign, "unknown size or alignment");
                }
                let (size, align) = self.type_layout(ty);
                let n = if is_size { size } else { align };
                let tag = Symbol::intern(if is_size { "Size" } else { "Alignment" });
                let tagged_ty = self.types.intern(Type::Tagged { tag, args: vec![ty] });
                self.values.push(Value { ty: tagged_ty, kind: ValueKind::IntConst(n as i64), category: ValueCategory::Rvalue })
            }
            Some("zero_extend") => {
                if let Some(&arg) = arg_ids.first() {
                    let v = self.analyze_value(b, arg, None);
                    let tir = b.tir.push(TirOp::Zext, id, value_index(v), 0);
                    return self.values.push(Value {
                        ty: self.types.i64,
                        kind: ValueKind::Temporary(tir),
                        category: ValueCategory::Rvalue,
                    });
                }
                self.values.push(Value::error(self.types.error))
            }
            Some("slice") => {
                if arg_ids.len() != 2 {
                    self.error(b.file, id, Code::ArgumentCount, "`slice` takes a length and a pointer");
                    return self.values.push(Value::error(self.types.error));
                }
                let len_value = self.analyze_value(b, arg_ids[0], Some(self.types.isize_));
                let ptr_value = self.analyze_value(b, arg_ids[1], None);
                let ptr_ty = self.values.get(ptr_value).ty;
                let (mutable, elem) = match self.types.get(ptr_ty).clone() {
                    Type::Ptr { mutable, elem } | Type::MultiPtr { mutable, elem } => (mutable, elem),
                    _ => {
                        self.error(b.file, id, Code::SliceConstructorNeedsPointer, "`slice` needs a pointer argument");
                        return self.values.push(Value::error(self.types.error));
                    }
                };
                let tir = b.tir.push(TirOp::NewSlice, id, value_index(ptr_value), value_index(len_value));
                let slice_ty = self.types.intern(Type::Slice { mutable, elem });
                self.values.push(Value { ty: slice_ty, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue })
            }
            _ => self.values.push(Value::error(self.types.error)),
        }
    }

    /// Elaborates a const declaration's initializer, requiring a constant
    /// expression (spec's `ERROR_NOT_A_CONSTANT_INITIALIZER`).
    fn analyze_const_value(&mut self, file: corec_util::FileId, init: AstId, hint: Option<TypeId>) -> ValueId {
        let mut b = self.scratch_body(file);
        let value = self.analyze_value(&mut b, init, hint);
        if !matches!(
            self.values.get(value).kind,
            ValueKind::IntConst(_) | ValueKind::FloatConst(_) | ValueKind::NullConst | ValueKind::StringLit { .. }
        ) {
            self.error(file, init, Code::NotAConstantInitializer, "initializer is not a constant expression");
        }
        value
    }

    /// `analyze_type(node) -> TypeId` (spec §4.3).
    fn analyze_type(&mut self, file: corec_util::FileId, id: AstId) -> TypeId {
        let tag = self.roles.rir[file].tag(id);
        match tag {
            RirTag::GlobalId => {
                let def = self.roles.rir[file].data(id).global.unwrap();
                self.struct_types
                    .get(&def)
                    .or_else(|| self.enum_types.get(&def))
                    .copied()
                    .unwrap_or(self.types.error)
            }
            RirTag::BuiltinId => {
                let bid = self.roles.rir[file].data(id).builtin.unwrap();
                self.primitive_type(self.builtins.name(bid))
            }
            RirTag::Type => {
                let slot = self.roles.rir[file].data(id).local.unwrap();
                self.type_param_scope.get(&slot).copied().unwrap_or(self.types.error)
            }
            _ => match self.ast(file).node(id).clone() {
                AstNode::Ident(name) => self.primitive_type(name),
                AstNode::TypePtr { mutable, elem } => {
                    let e = self.analyze_type(file, elem);
                    self.types.intern(Type::Ptr { mutable, elem: e })
                }
                AstNode::TypeMultiPtr { mutable, elem } => {
                    let e = self.analyze_type(file, elem);
                    self.types.intern(Type::MultiPtr { mutable, elem: e })
                }
                AstNode::TypeArray { len, elem } => {
                    let e = self.analyze_type(file, elem);
                    let mut scratch = self.scratch_body(file);
                    let len_val = self.analyze_value(&mut scratch, len, Some(self.types.isize_));
                    let n = match self.values.get(len_val).kind {
                        ValueKind::IntConst(v) => v.max(0) as u64,
                        _ => 0,
                    };
                    self.types.intern(Type::Array { len: n, elem: e })
                }
                AstNode::TypeTagged { base, args } => {
                    let tag_name = match self.ast(file).node(base) {
                        AstNode::Ident(name) => *name,
                        _ => Symbol::intern("?"),
                    };
                    let arg_ids: Vec<AstId> = self.ast(file).extra(args).to_vec();
                    let arg_tys: Vec<TypeId> = arg_ids.iter().map(|&a| self.analyze_type(file, a)).collect();
                    self.types.intern(Type::Tagged { tag: tag_name, args: arg_tys })
                }
                _ => {
                    self.error(file, id, Code::ExpectedType, "expected a type");
                    self.types.error
                }
            },
        }
    }

    fn primitive_type(&self, name: Symbol) -> TypeId {
        match name.as_str() {
            "void" => self.types.void,
            "i8" => self.types.i8,
            "i16" => self.types.i16,
            "i32" => self.types.i32,
            "i64" => self.types.i64,
            "isize" => self.types.isize_,
            "f32" => self.types.f32,
            "f64" => self.types.f64,
            "bool" => self.types.bool_,
            "byte" => self.types.byte,
            "char" => self.types.char_,
            _ => self.types.error,
        }
    }

    /// The implicit conversion sequence (spec §4.3): array-ptr to slice,
    /// mutability weakening, type-erasing pointer cast, tag stripping. The
    /// first step that applies wins; an already-matching value passes
    /// through unchanged, and a value matching none of the steps is an
    /// error. The two "no-op" steps (weakening, stripping) reinterpret the
    /// value's type in place rather than emitting a `TirOp::Nop` temporary,
    /// since MIR lowering has no value-producing use for a bare `Nop`.
    fn apply_implicit_conversion(&mut self, b: &mut Body, id: AstId, value: ValueId, target: TypeId) -> ValueId {
        let from = self.values.get(value).ty;
        if from == target || from == self.types.error || target == self.types.error {
            return value;
        }

        if let Type::Slice { elem: target_elem, .. } = self.types.get(target).clone() {
            let array_elem = match self.types.get(from).clone() {
                Type::Array { elem, .. } => Some(elem),
                Type::Ptr { elem: arr, .. } | Type::MultiPtr { elem: arr, .. } => match self.types.get(arr).clone() {
                    Type::Array { elem, .. } => Some(elem),
                    _ => None,
                },
                _ => None,
            };
            if array_elem == Some(target_elem) {
                let tir = b.tir.push(TirOp::ArrayToSlice, id, value_index(value), 0);
                return self.values.push(Value { ty: target, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue });
            }
        }

        let weakened = match (self.types.get(from).clone(), self.types.get(target).clone()) {
            (Type::Ptr { mutable: true, elem: fe }, Type::Ptr { mutable: false, elem: te }) => fe == te,
            (Type::MultiPtr { mutable: true, elem: fe }, Type::MultiPtr { mutable: false, elem: te }) => fe == te,
            (Type::Slice { mutable: true, elem: fe }, Type::Slice { mutable: false, elem: te }) => fe == te,
            _ => false,
        };
        if weakened {
            let kind = self.values.get(value).kind.clone();
            let category = self.values.get(value).category;
            return self.values.push(Value { ty: target, kind, category });
        }

        let erasing = match (self.types.get(from).clone(), self.types.get(target).clone()) {
            (Type::Ptr { mutable: fm, .. }, Type::Ptr { mutable: tm, elem: te }) => te == self.types.byte && (fm || !tm),
            (Type::MultiPtr { mutable: fm, .. }, Type::MultiPtr { mutable: tm, elem: te }) => te == self.types.byte && (fm || !tm),
            _ => false,
        };
        if erasing {
            let tir = b.tir.push(TirOp::PtrCast, id, value_index(value), 0);
            return self.values.push(Value { ty: target, kind: ValueKind::Temporary(tir), category: ValueCategory::Rvalue });
        }

        if let Type::Newtype { inner, .. } = self.types.get(from).clone() {
            if inner == target {
                let kind = self.values.get(value).kind.clone();
                let category = self.values.get(value).category;
                return self.values.push(Value { ty: target, kind, category });
            }
        }

        self.error(b.file, id, Code::ExpectedValueType, "value cannot be implicitly converted to the expected type");
        value
    }
}

fn round_up(offset: u64, align: u64) -> u64 {
    if align <= 1 {
        return offset;
    }
    (offset + align - 1) / align * align
}

/// Decodes a string literal's escape sequences (spec §4.3's string table):
/// `\n \t \\ \' \" \xHH`; any other escaped character passes through as its
/// raw byte, and a malformed `\xHH` is dropped rather than rejected (stage 1
/// already validated literal syntax).
fn decode_escapes(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some('\'') => out.push(b'\''),
            Some('"') => out.push(b'"'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    let hex: String = [hi, lo].iter().collect();
                    if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                        out.push(byte);
                    }
                }
            }
            Some(other) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => {}
        }
    }
    out
}

fn value_index(id: ValueId) -> u32 {
    id.0
}

fn is_comparison(op: AstBinaryOp) -> bool {
    matches!(
        op,
        AstBinaryOp::Eq | AstBinaryOp::Ne | AstBinaryOp::Lt | AstBinaryOp::Le | AstBinaryOp::Gt | AstBinaryOp::Ge
    )
}

fn fold_float(op: AstBinaryOp, l: f64, r: f64) -> Option<Folded> {
    match op {
        AstBinaryOp::Add => Some(Folded::Float(l + r)),
        AstBinaryOp::Sub => Some(Folded::Float(l - r)),
        AstBinaryOp::Mul => Some(Folded::Float(l * r)),
        AstBinaryOp::Div => Some(Folded::Float(l / r)),
        AstBinaryOp::Eq => Some(Folded::Int((l == r) as i64)),
        AstBinaryOp::Ne => Some(Folded::Int((l != r) as i64)),
        AstBinaryOp::Lt => Some(Folded::Int((l < r) as i64)),
        AstBinaryOp::Le => Some(Folded::Int((l <= r) as i64)),
        AstBinaryOp::Gt => Some(Folded::Int((l > r) as i64)),
        AstBinaryOp::Ge => Some(Folded::Int((l >= r) as i64)),
        _ => None,
    }
}

fn map_binary_op(op: AstBinaryOp) -> TirOp {
    match op {
        AstBinaryOp::Add => TirOp::Add,
        AstBinaryOp::Sub => TirOp::Sub,
        AstBinaryOp::Mul => TirOp::Mul,
        AstBinaryOp::Div => TirOp::Div,
        AstBinaryOp::Rem => TirOp::Rem,
        AstBinaryOp::BitAnd => TirOp::BitAnd,
        AstBinaryOp::BitOr => TirOp::BitOr,
        AstBinaryOp::BitXor => TirOp::BitXor,
        AstBinaryOp::Shl => TirOp::Shl,
        AstBinaryOp::Shr => TirOp::Shr,
        AstBinaryOp::Eq => TirOp::Eq,
        AstBinaryOp::Ne => TirOp::Ne,
        AstBinaryOp::Lt => TirOp::Lt,
        AstBinaryOp::Le => TirOp::Le,
        AstBinaryOp::Gt => TirOp::Gt,
        AstBinaryOp::Ge => TirOp::Ge,
        AstBinaryOp::And | AstBinaryOp::Or => unreachable!("logical and/or short-circuit via analyze_logical, never lowered through map_binary_op"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_ast::{AstBuilder, ExtraRange as AstExtraRange, File as AstFile};
    use corec_role::{analyze, collect};
    use corec_util::SourceIndex;

    fn build_const_add_program() -> Program {
        let mut b = AstBuilder::new();
        let one = b.push(AstNode::IntLit(1), SourceIndex(0));
        let two = b.push(AstNode::IntLit(2), SourceIndex(1));
        let add = b.push(
            AstNode::Binary {
                op: AstBinaryOp::Add,
                left: one,
                right: two,
            },
            SourceIndex(2),
        );
        let ret_ty = b.push(AstNode::Ident(Symbol::intern("i64")), SourceIndex(3));
        let ret = b.push(AstNode::Return(Some(add)), SourceIndex(4));
        let extra = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts: extra }, SourceIndex(5));
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
        program
    }

    #[test]
    fn constant_addition_folds() {
        let program = build_const_add_program();
        let handler = Handler::new();
        let globals = collect(&program, &handler);
        let builtins = Builtins::new();
        let roles = analyze(&program, &globals, &builtins, &handler);
        let elaboration = elaborate(&program, &globals, &roles, &builtins, &handler);
        assert!(!handler.has_errors());
        assert_eq!(elaboration.functions.len(), 1);
    }

    fn build_unary_negation_program() -> Program {
        let mut b = AstBuilder::new();
        let five = b.push(AstNode::IntLit(5), SourceIndex(0));
        let neg = b.push(
            AstNode::Unary {
                op: AstUnaryOp::Neg,
                operand: five,
            },
            SourceIndex(1),
        );
        let ret_ty = b.push(AstNode::Ident(Symbol::intern("i64")), SourceIndex(2));
        let ret = b.push(AstNode::Return(Some(neg)), SourceIndex(3));
        let extra = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts: extra }, SourceIndex(4));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("g"),
                is_public: true,
                type_params: AstExtraRange::EMPTY,
                params: AstExtraRange::EMPTY,
                ret: Some(ret_ty),
                body: block,
            },
            SourceIndex(5),
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
    fn unary_negation_folds_to_a_constant() {
        let program = build_unary_negation_program();
        let handler = Handler::new();
        let globals = collect(&program, &handler);
        let builtins = Builtins::new();
        let roles = analyze(&program, &globals, &builtins, &handler);
        let elaboration = elaborate(&program, &globals, &roles, &builtins, &handler);
        assert!(!handler.has_errors());
        let def = *globals.functions.first().unwrap();
        let tir = &elaboration.functions[&def];
        let ret = tir.insts[crate::tir::TirId(0)];
        let v = ValueId(ret.a);
        assert!(matches!(elaboration.values.get(v).kind, ValueKind::IntConst(-5)));
    }
}
