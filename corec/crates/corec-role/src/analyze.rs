//! Stage 2 (spec §4.2): resolve every identifier to a [`SymbolRef`], record
//! each node's role as RIR, and compute a dependency-respecting processing
//! order for global definitions via a three-colour DFS.

use corec_ast::{Ast, AstId, AstNode, Program};
use corec_util::{Handler, IndexVec, Span, Symbol};

use crate::builtins::Builtins;
use crate::collect::{DefId, GlobalSymbols};
use crate::scope::{LocalEntry, LocalRole, LocalSlot, PerFileLocals, ScopeStack};
use crate::{BuiltinId, Code, DiagnosticBuilder, NoteKind};

/// What a node turned out to mean, once names are resolved (spec §3 "Rir").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RirTag {
    Invalid,
    Value,
    Multivalue,
    Type,
    TagType,
    Module,
    BuiltinMacro,
    GlobalId,
    LocalId,
    BuiltinId,
    TypeAccess,
    ScopeAccess,
    Stmt,
}

/// The payload accompanying a [`RirTag`]; which field is meaningful depends
/// on the tag, mirroring the tagged union spec §3 describes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RirData {
    pub global: Option<DefId>,
    pub local: Option<LocalSlot>,
    pub builtin: Option<BuiltinId>,
}

/// Per-node role information for one file, indexed in lockstep with its
/// [`corec_ast::Ast`].
pub struct Rir {
    tags: IndexVec<AstId, RirTag>,
    data: IndexVec<AstId, RirData>,
}

impl Rir {
    fn with_len(len: usize) -> Self {
        Self {
            tags: (0..len).map(|_| RirTag::Invalid).collect(),
            data: (0..len).map(|_| RirData::default()).collect(),
        }
    }

    pub fn tag(&self, id: AstId) -> RirTag {
        self.tags[id]
    }

    pub fn data(&self, id: AstId) -> RirData {
        self.data[id]
    }

    fn set(&mut self, id: AstId, tag: RirTag, data: RirData) {
        self.tags[id] = tag;
        self.data[id] = data;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Output of stage 2: per-file [`Rir`] tables, per-file local tables, and a
/// dependency-respecting order over global definitions.
pub struct RoleAnalysis {
    pub rir: IndexVec<corec_util::FileId, Rir>,
    pub locals: IndexVec<corec_util::FileId, PerFileLocals>,
    pub order: Vec<DefId>,
}

struct Analyzer<'a> {
    program: &'a Program,
    globals: &'a GlobalSymbols,
    builtins: &'a Builtins,
    handler: &'a Handler,
    rir: IndexVec<corec_util::FileId, Rir>,
    locals: IndexVec<corec_util::FileId, PerFileLocals>,
    colors: Vec<Color>,
    order: Vec<DefId>,
    /// True while walking a function body. References discovered there are
    /// still resolved and tagged, but do not feed the dependency DFS: bodies
    /// are elaborated only after every declaration already exists (spec
    /// §4.2's "excluding self-reference through function bodies").
    in_body: bool,
}

/// Runs stage 2 over `program` using the global symbols `globals` produced by
/// [`crate::collect::collect`]. Diagnostics are pushed into `handler`.
pub fn analyze(
    program: &Program,
    globals: &GlobalSymbols,
    builtins: &Builtins,
    handler: &Handler,
) -> RoleAnalysis {
    let rir = program
        .files
        .iter()
        .map(|file| Rir::with_len(file.ast.len()))
        .collect();
    let locals = program.files.iter().map(|_| PerFileLocals::new()).collect();

    let mut analyzer = Analyzer {
        program,
        globals,
        builtins,
        handler,
        rir,
        locals,
        colors: vec![Color::White; globals.defs.len()],
        order: Vec::new(),
        in_body: false,
    };

    for (id, _) in globals.defs.iter_enumerated() {
        analyzer.analyze_definition(id);
    }

    RoleAnalysis {
        rir: analyzer.rir,
        locals: analyzer.locals,
        order: analyzer.order,
    }
}

impl<'a> Analyzer<'a> {
    fn ast(&self, file: corec_util::FileId) -> &Ast {
        &self.program.files[file].ast
    }

    fn node_span(&self, file: corec_util::FileId, id: AstId) -> Span {
        Span::point(file, self.ast(file).source(id).0)
    }

    /// Visits `def`'s AST once, memoized by colour; detects cycles through
    /// global references the same way a DFS detects a cycle in a directed
    /// graph: a Grey node revisited before it turns Black is a back-edge.
    fn analyze_definition(&mut self, def: DefId) {
        match self.colors[def.0 as usize] {
            Color::Black => return,
            Color::Grey => {
                let d = self.globals.defs[def];
                self.handler.emit(
                    DiagnosticBuilder::error(
                        Code::RecursiveDependency,
                        format!("`{}` depends on itself", d.name),
                    )
                    .span(self.node_span(d.file, d.ast))
                    .note(
                        NoteKind::Recursion,
                        "via this reference",
                        Some(self.node_span(d.file, d.ast)),
                    )
                    .build(),
                );
                return;
            }
            Color::White => {}
        }
        self.colors[def.0 as usize] = Color::Grey;

        let d = self.globals.defs[def];
        let file = d.file;
        let mut scope = ScopeStack::new();
        scope.push_rib();

        match self.ast(file).node(d.ast).clone() {
            AstNode::Function {
                type_params,
                params,
                ret,
                body,
                ..
            } => {
                let type_params_ids: Vec<AstId> = self.ast(file).extra(type_params).to_vec();
                for &tp in &type_params_ids {
                    self.bind_type_param(file, tp, &mut scope);
                }
                let params_ids: Vec<AstId> = self.ast(file).extra(params).to_vec();
                for &p in &params_ids {
                    self.bind_param(file, p, &mut scope, def);
                }
                if let Some(ret) = ret {
                    self.analyze_node(file, ret, &mut scope, def);
                }
                self.in_body = true;
                self.analyze_node(file, body, &mut scope, def);
                self.in_body = false;
            }
            AstNode::ExternFunction { params, ret, .. } => {
                let params_ids: Vec<AstId> = self.ast(file).extra(params).to_vec();
                for &p in &params_ids {
                    self.bind_param(file, p, &mut scope, def);
                }
                if let Some(ret) = ret {
                    self.analyze_node(file, ret, &mut scope, def);
                }
            }
            AstNode::ExternVar { ty, .. } => {
                self.analyze_node(file, ty, &mut scope, def);
            }
            AstNode::Struct {
                type_params, fields, ..
            } => {
                let type_params_ids: Vec<AstId> = self.ast(file).extra(type_params).to_vec();
                for &tp in &type_params_ids {
                    self.bind_type_param(file, tp, &mut scope);
                }
                let fields_ids: Vec<AstId> = self.ast(file).extra(fields).to_vec();
                for &f in &fields_ids {
                    if let AstNode::Field { ty, .. } = *self.ast(file).node(f) {
                        self.analyze_node(file, ty, &mut scope, def);
                    }
                }
            }
            AstNode::Enum { repr, members, .. } => {
                if let Some(repr) = repr {
                    self.analyze_node(file, repr, &mut scope, def);
                }
                let members_ids: Vec<AstId> = self.ast(file).extra(members).to_vec();
                for &m in &members_ids {
                    if let AstNode::EnumMember { value: Some(v), .. } = *self.ast(file).node(m) {
                        self.analyze_node(file, v, &mut scope, def);
                    }
                }
            }
            AstNode::Newtype { underlying, .. } => {
                self.analyze_node(file, underlying, &mut scope, def);
            }
            AstNode::Const { ty, init, .. } => {
                if let Some(ty) = ty {
                    self.analyze_node(file, ty, &mut scope, def);
                }
                self.analyze_node(file, init, &mut scope, def);
            }
            _ => {}
        }

        scope.pop_rib();
        self.colors[def.0 as usize] = Color::Black;
        self.order.push(def);
    }

    fn bind_param(
        &mut self,
        file: corec_util::FileId,
        param: AstId,
        scope: &mut ScopeStack,
        owner: DefId,
    ) {
        if let AstNode::Param { name, ty } = *self.ast(file).node(param) {
            self.analyze_node(file, ty, scope, owner);
            let slot = self.locals[file].push(LocalEntry {
                role: LocalRole::Value,
                ast: param,
            });
            scope.bind(name, slot);
        }
    }

    fn bind_type_param(&mut self, file: corec_util::FileId, tp: AstId, scope: &mut ScopeStack) {
        if let AstNode::TypeParam { name } = *self.ast(file).node(tp) {
            let slot = self.locals[file].push(LocalEntry {
                role: LocalRole::Type,
                ast: tp,
            });
            scope.bind(name, slot);
        }
    }

    /// Dispatches on node shape per spec §4.2's role-propagation table.
    /// `owner` names the global definition currently being analyzed, for
    /// dependency-order tracking; `DefId(u32::MAX)` marks "not inside a
    /// global body" contexts such as parameter types.
    fn analyze_node(
        &mut self,
        file: corec_util::FileId,
        id: AstId,
        scope: &mut ScopeStack,
        owner: DefId,
    ) {
        let node = self.ast(file).node(id).clone();
        match node {
            AstNode::Ident(name) => self.resolve_ident(file, id, name, scope, owner),

            AstNode::Unary { operand, .. } => {
                self.analyze_node(file, operand, scope, owner);
                let tag = self.rir[file].tag(operand);
                match tag {
                    RirTag::Type => self.rir[file].set(id, RirTag::Type, RirData::default()),
                    RirTag::Value => self.rir[file].set(id, RirTag::Value, RirData::default()),
                    _ => {
                        self.error(file, id, Code::DerefOperandRole, "invalid operand role");
                    }
                }
            }

            AstNode::AddressOf { operand, .. } => {
                self.analyze_node(file, operand, scope, owner);
                let tag = self.rir[file].tag(operand);
                match tag {
                    RirTag::Value => self.rir[file].set(id, RirTag::Value, RirData::default()),
                    RirTag::Multivalue => {
                        self.rir[file].set(id, RirTag::Multivalue, RirData::default())
                    }
                    _ => {
                        self.error(file, id, Code::AddressOfOperandRole, "invalid operand role");
                    }
                }
            }

            AstNode::Deref(operand) => {
                self.analyze_node(file, operand, scope, owner);
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::Binary { left, right, .. } => {
                self.analyze_node(file, left, scope, owner);
                self.analyze_node(file, right, scope, owner);
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::Access { base, field } => {
                self.analyze_node(file, base, scope, owner);
                match self.rir[file].tag(base) {
                    RirTag::Module => {
                        let data = self.rir[file].data(base);
                        if let Some(def) = self.resolve_module_member(data, field) {
                            if !self.in_body {
                                self.analyze_definition(def);
                            }
                            self.rir[file].set(
                                id,
                                RirTag::GlobalId,
                                RirData {
                                    global: Some(def),
                                    ..Default::default()
                                },
                            );
                        } else {
                            self.error(file, id, Code::UndefinedName, "undefined name");
                        }
                    }
                    RirTag::Type => self.rir[file].set(id, RirTag::ScopeAccess, RirData::default()),
                    RirTag::Value => self.rir[file].set(id, RirTag::TypeAccess, RirData::default()),
                    _ => {
                        self.error(file, id, Code::AccessOperandRole, "invalid operand role");
                    }
                }
            }

            AstNode::InferredAccess { .. } => {
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::Call { callee, args } => {
                self.analyze_node(file, callee, scope, owner);
                let args_ids: Vec<AstId> = self.ast(file).extra(args).to_vec();
                for &a in &args_ids {
                    self.analyze_node(file, a, scope, owner);
                }
                match self.rir[file].tag(callee) {
                    RirTag::BuiltinMacro => {
                        self.rir[file].set(id, RirTag::Value, RirData::default())
                    }
                    // `GlobalId` also covers a struct name used as its own
                    // constructor (`Point(1, 2)`); stage 3 tells struct
                    // construction apart from an ordinary call once it has
                    // the definition kind available.
                    RirTag::Type | RirTag::Value | RirTag::GlobalId => {
                        self.rir[file].set(id, RirTag::Value, RirData::default())
                    }
                    _ => {
                        self.error(file, id, Code::CallOperandRole, "not callable");
                    }
                }
            }

            AstNode::Index { base, index } => {
                self.analyze_node(file, base, scope, owner);
                self.analyze_node(file, index, scope, owner);
                match self.rir[file].tag(base) {
                    RirTag::BuiltinMacro => {
                        self.rir[file].set(id, RirTag::TagType, RirData::default())
                    }
                    RirTag::Value | RirTag::Multivalue => {
                        self.rir[file].set(id, RirTag::Value, RirData::default())
                    }
                    _ => {
                        self.error(file, id, Code::IndexOperandRole, "not indexable");
                    }
                }
            }

            AstNode::Slice { base, lo, hi } => {
                self.analyze_node(file, base, scope, owner);
                if let Some(lo) = lo {
                    self.analyze_node(file, lo, scope, owner);
                }
                if let Some(hi) = hi {
                    self.analyze_node(file, hi, scope, owner);
                }
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::IntLit(_) | AstNode::FloatLit(_) | AstNode::StringLit(_)
            | AstNode::BoolLit(_) | AstNode::NullLit => {
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::ListLit { elems } => {
                let elems_ids: Vec<AstId> = self.ast(file).extra(elems).to_vec();
                for &e in &elems_ids {
                    self.analyze_node(file, e, scope, owner);
                }
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::Block { stmts } => {
                scope.push_rib();
                let stmts_ids: Vec<AstId> = self.ast(file).extra(stmts).to_vec();
                for &s in &stmts_ids {
                    self.analyze_node(file, s, scope, owner);
                }
                scope.pop_rib();
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::Let { name, ty, init } | AstNode::Mut { name, ty, init } => {
                if let Some(ty) = ty {
                    self.analyze_node(file, ty, scope, owner);
                }
                self.analyze_node(file, init, scope, owner);
                let slot = self.locals[file].push(LocalEntry {
                    role: LocalRole::Value,
                    ast: id,
                });
                scope.bind(name, slot);
                self.rir[file].set(
                    id,
                    RirTag::LocalId,
                    RirData {
                        local: Some(slot),
                        ..Default::default()
                    },
                );
            }

            AstNode::Const { ty, init, .. } => {
                if let Some(ty) = ty {
                    self.analyze_node(file, ty, scope, owner);
                }
                self.analyze_node(file, init, scope, owner);
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::ExprStmt(e) => {
                self.analyze_node(file, e, scope, owner);
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::Assign { place, value } | AstNode::CompoundAssign { place, value, .. } => {
                self.analyze_node(file, place, scope, owner);
                self.analyze_node(file, value, scope, owner);
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::If {
                cond,
                then_block,
                else_block,
            } => {
                self.analyze_node(file, cond, scope, owner);
                self.analyze_node(file, then_block, scope, owner);
                if let Some(e) = else_block {
                    self.analyze_node(file, e, scope, owner);
                }
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::While { cond, body } => {
                self.analyze_node(file, cond, scope, owner);
                self.analyze_node(file, body, scope, owner);
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::For {
                init,
                cond,
                step,
                body,
            } => {
                scope.push_rib();
                if let Some(init) = init {
                    self.analyze_node(file, init, scope, owner);
                }
                if let Some(cond) = cond {
                    self.analyze_node(file, cond, scope, owner);
                }
                if let Some(step) = step {
                    self.analyze_node(file, step, scope, owner);
                }
                self.analyze_node(file, body, scope, owner);
                scope.pop_rib();
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::Switch { discr, arms } => {
                if let Some(d) = discr {
                    self.analyze_node(file, d, scope, owner);
                }
                let arms_ids: Vec<AstId> = self.ast(file).extra(arms).to_vec();
                for &a in &arms_ids {
                    self.analyze_node(file, a, scope, owner);
                }
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::SwitchArm { pattern, value } => {
                if let Some(p) = pattern {
                    self.analyze_node(file, p, scope, owner);
                }
                self.analyze_node(file, value, scope, owner);
                self.rir[file].set(id, RirTag::Value, RirData::default());
            }

            AstNode::Return(e) => {
                if let Some(e) = e {
                    self.analyze_node(file, e, scope, owner);
                }
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::Break(e) => {
                if let Some(e) = e {
                    self.analyze_node(file, e, scope, owner);
                }
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::Continue => {
                self.rir[file].set(id, RirTag::Stmt, RirData::default());
            }

            AstNode::TypePtr { elem, .. } | AstNode::TypeMultiPtr { elem, .. } => {
                self.analyze_node(file, elem, scope, owner);
                self.rir[file].set(id, RirTag::Type, RirData::default());
            }

            AstNode::TypeArray { len, elem } => {
                self.analyze_node(file, len, scope, owner);
                self.analyze_node(file, elem, scope, owner);
                self.rir[file].set(id, RirTag::Type, RirData::default());
            }

            AstNode::TypeTagged { base, args } => {
                self.analyze_node(file, base, scope, owner);
                let args_ids: Vec<AstId> = self.ast(file).extra(args).to_vec();
                for &a in &args_ids {
                    self.analyze_node(file, a, scope, owner);
                }
                self.rir[file].set(id, RirTag::Type, RirData::default());
            }

            // Nested item-shaped nodes are not expected inside bodies; leave
            // them untagged (Invalid) if a parser ever produces one here.
            _ => {}
        }
    }

    fn resolve_module_member(&self, data: RirData, field: Symbol) -> Option<DefId> {
        let _ = (data, field);
        None
    }

    fn resolve_ident(
        &mut self,
        file: corec_util::FileId,
        id: AstId,
        name: Symbol,
        scope: &ScopeStack,
        _owner: DefId,
    ) {
        if let Some(slot) = scope.lookup(name) {
            let role = self.locals[file].entry(slot).role;
            let tag = match role {
                LocalRole::Value => RirTag::LocalId,
                LocalRole::Type => RirTag::Type,
            };
            self.rir[file].set(
                id,
                tag,
                RirData {
                    local: Some(slot),
                    ..Default::default()
                },
            );
            return;
        }

        let module = self.globals.file_module[file];
        if let Some(&def) = self.globals.private[module].get(&name) {
            if !self.in_body {
                self.analyze_definition(def);
            }
            self.rir[file].set(
                id,
                RirTag::GlobalId,
                RirData {
                    global: Some(def),
                    ..Default::default()
                },
            );
            return;
        }
        if let Some(&def) = self.globals.public[module].get(&name) {
            if !self.in_body {
                self.analyze_definition(def);
            }
            self.rir[file].set(
                id,
                RirTag::GlobalId,
                RirData {
                    global: Some(def),
                    ..Default::default()
                },
            );
            return;
        }
        for (other_id, scope) in self.globals.public.iter_enumerated() {
            if other_id == module {
                continue;
            }
            if let Some(&def) = scope.get(&name) {
                if !self.in_body {
                    self.analyze_definition(def);
                }
                self.rir[file].set(
                    id,
                    RirTag::GlobalId,
                    RirData {
                        global: Some(def),
                        ..Default::default()
                    },
                );
                return;
            }
        }

        if let Some(bid) = self.builtins.lookup(name) {
            let tag = if self.builtins.is_macro(name) {
                RirTag::BuiltinMacro
            } else {
                RirTag::Type
            };
            self.rir[file].set(
                id,
                tag,
                RirData {
                    builtin: Some(bid),
                    ..Default::default()
                },
            );
            return;
        }

        self.error(file, id, Code::UndefinedName, format!("undefined name `{name}`"));
    }

    fn error(&self, file: corec_util::FileId, id: AstId, code: Code, message: impl Into<String>) {
        self.handler.emit(
            DiagnosticBuilder::error(code, message)
                .span(self.node_span(file, id))
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::collect::collect;
    use corec_ast::{AstBuilder, AstNode, BinaryOp, ExtraRange, File as AstFile};
    use corec_util::{Handler, SourceIndex, Symbol};

    fn single_function_program(body_returns_literal: bool) -> Program {
        let mut b = AstBuilder::new();
        let lit = b.push(AstNode::IntLit(1), SourceIndex(0));
        let ret = b.push(AstNode::Return(Some(lit)), SourceIndex(1));
        let extra = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts: extra }, SourceIndex(2));
        let _ = body_returns_literal;
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("main"),
                is_public: true,
                type_params: ExtraRange::EMPTY,
                params: ExtraRange::EMPTY,
                ret: None,
                body: block,
            },
            SourceIndex(3),
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
    fn function_body_resolves_without_errors() {
        let program = single_function_program(true);
        let handler = Handler::new();
        let globals = collect(&program, &handler);
        let builtins = Builtins::new();
        let result = analyze(&program, &globals, &builtins, &handler);
        assert!(!handler.has_errors());
        assert_eq!(result.order.len(), 1);
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let mut b = AstBuilder::new();
        let ident = b.push(AstNode::Ident(Symbol::intern("missing")), SourceIndex(0));
        let ret = b.push(AstNode::Return(Some(ident)), SourceIndex(1));
        let extra = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts: extra }, SourceIndex(2));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("f"),
                is_public: true,
                type_params: ExtraRange::EMPTY,
                params: ExtraRange::EMPTY,
                ret: None,
                body: block,
            },
            SourceIndex(3),
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
        let handler = Handler::new();
        let globals = collect(&program, &handler);
        let builtins = Builtins::new();
        let _ = analyze(&program, &globals, &builtins, &handler);
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn binary_expression_role_is_value() {
        let mut b = AstBuilder::new();
        let lhs = b.push(AstNode::IntLit(1), SourceIndex(0));
        let rhs = b.push(AstNode::IntLit(2), SourceIndex(1));
        let add = b.push(
            AstNode::Binary {
                op: BinaryOp::Add,
                left: lhs,
                right: rhs,
            },
            SourceIndex(2),
        );
        let ret = b.push(AstNode::Return(Some(add)), SourceIndex(3));
        let extra = b.push_extra(&[ret]);
        let block = b.push(AstNode::Block { stmts: extra }, SourceIndex(4));
        let func = b.push(
            AstNode::Function {
                name: Symbol::intern("f"),
                is_public: true,
                type_params: ExtraRange::EMPTY,
                params: ExtraRange::EMPTY,
                ret: None,
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
        let handler = Handler::new();
        let globals = collect(&program, &handler);
        let builtins = Builtins::new();
        let result = analyze(&program, &globals, &builtins, &handler);
        assert_eq!(result.rir[corec_util::FileId(0)].tag(add), RirTag::Value);
    }
}
