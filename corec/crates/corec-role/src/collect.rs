//! Stage 1 (spec §4.1): walk every file's top-level items once, assign each
//! a [`DefId`], and bucket it into its module's public or private scope.
//! No recursion into bodies happens here — that is stage 2's job.

use corec_ast::{Ast, AstId, AstNode, File, Program};
use corec_util::{define_idx, FileId, FxHashMap, Handler, IndexVec, Span, Symbol};

use crate::{Code, DiagnosticBuilder, NoteKind};

fn node_span(ast: &Ast, file: FileId, id: AstId) -> Span {
    Span::point(file, ast.source(id).0)
}

define_idx!(
    /// Identifies one top-level definition (struct, enum, newtype, const,
    /// function, extern function, or extern var).
    DefId
);

define_idx!(
    /// Identifies a module by its declared name.
    ModuleId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefKind {
    Struct,
    Enum,
    Newtype,
    Const,
    Function,
    ExternFunction,
    ExternVar,
}

#[derive(Clone, Copy, Debug)]
pub struct Definition {
    pub ast: AstId,
    pub file: FileId,
    pub module: ModuleId,
    pub kind: DefKind,
    pub name: Symbol,
    pub is_public: bool,
}

/// The result of stage 1: every definition plus the per-module scopes used
/// to resolve names in stage 2.
#[derive(Default)]
pub struct GlobalSymbols {
    pub defs: IndexVec<DefId, Definition>,
    pub functions: Vec<DefId>,
    pub module_ids: FxHashMap<Symbol, ModuleId>,
    pub module_names: IndexVec<ModuleId, Symbol>,
    pub public: IndexVec<ModuleId, FxHashMap<Symbol, DefId>>,
    pub private: IndexVec<ModuleId, FxHashMap<Symbol, DefId>>,
    pub file_module: IndexVec<FileId, ModuleId>,
}

impl GlobalSymbols {
    fn module(&mut self, name: Symbol) -> ModuleId {
        if let Some(&id) = self.module_ids.get(&name) {
            return id;
        }
        let id = self.module_names.push(name);
        self.public.push(FxHashMap::default());
        self.private.push(FxHashMap::default());
        self.module_ids.insert(name, id);
        id
    }

    fn insert(&mut self, def: Definition, handler: &Handler, ast: &Ast) {
        let scope = if def.is_public {
            &mut self.public[def.module]
        } else {
            &mut self.private[def.module]
        };
        if let Some(&existing) = scope.get(&def.name) {
            let prev = self.defs[existing];
            handler.emit(
                DiagnosticBuilder::error(
                    Code::MultipleDefinition,
                    format!("`{}` is defined more than once", def.name),
                )
                .span(node_span(ast, def.file, def.ast))
                .note(
                    NoteKind::PreviousDefinition,
                    "previous definition is here",
                    Some(node_span(ast, prev.file, prev.ast)),
                )
                .build(),
            );
            return;
        }
        let id = self.defs.push(def);
        if def.kind == DefKind::Function {
            self.functions.push(id);
        }
        scope.insert(def.name, id);
    }
}

/// Runs stage 1 over every file in `program`, returning the global symbol
/// table. Diagnostics (duplicate definitions) are pushed into `handler`.
pub fn collect(program: &Program, handler: &Handler) -> GlobalSymbols {
    let mut globals = GlobalSymbols::default();
    for (file_id, file) in program.files.iter_enumerated() {
        collect_file(file_id, file, &mut globals, handler);
    }
    globals
}

fn collect_file(file_id: FileId, file: &File, globals: &mut GlobalSymbols, handler: &Handler) {
    let module = globals.module(file.module);
    globals.file_module.push(module);
    for &item in &file.items {
        collect_item(file_id, module, &file.ast, item, globals, handler);
    }
}

fn collect_item(
    file_id: FileId,
    module: ModuleId,
    ast: &Ast,
    item: AstId,
    globals: &mut GlobalSymbols,
    handler: &Handler,
) {
    let (kind, name, is_public) = match ast.node(item) {
        AstNode::Struct { name, is_public, .. } => (DefKind::Struct, *name, *is_public),
        AstNode::Enum { name, is_public, .. } => (DefKind::Enum, *name, *is_public),
        AstNode::Newtype { name, is_public, .. } => (DefKind::Newtype, *name, *is_public),
        AstNode::Const { name, .. } => (DefKind::Const, *name, true),
        AstNode::Function { name, is_public, .. } => (DefKind::Function, *name, *is_public),
        AstNode::ExternFunction { name, .. } => (DefKind::ExternFunction, *name, true),
        AstNode::ExternVar { name, .. } => (DefKind::ExternVar, *name, true),
        _ => return,
    };
    let def = Definition {
        ast: item,
        file: file_id,
        module,
        kind,
        name,
        is_public,
    };
    globals.insert(def, handler, ast);
}
