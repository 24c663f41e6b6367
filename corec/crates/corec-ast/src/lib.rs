//! corec-ast — the abstract syntax tree consumed at the core's boundary.
//!
//! Lexing and parsing are explicitly out of scope for this core (spec §1):
//! a parser is an external collaborator that hands the pipeline a populated
//! [`Ast`]. This crate only defines that tree's shape and a fixture
//! [`AstBuilder`] so tests (and `corec-drv`'s example harness) can construct
//! programs without a real front end.
//!
//! Every node has a stable opaque id ([`AstId`]) and lives in an
//! [`corec_util::IndexVec`] alongside a parallel `spans` table — the same
//! "structure of arrays keyed by id" idiom spec §9 describes, rendered with
//! an idiomatic Rust enum (`AstNode`) in place of the original's raw
//! tag + two `u32` payload fields (see `DESIGN.md`, "AST representation").
//! Variable-arity children (call arguments, struct fields, switch arms, ...)
//! are stored once in a shared `extra` vector and referenced by an
//! `(start, count)` pair ([`ExtraRange`]), matching spec §3 exactly.

use corec_util::{define_idx, FileId, IndexVec, SourceIndex, Symbol};

define_idx!(
    /// Identifies one node in an [`Ast`].
    AstId
);

/// A `(start, count)` reference into an [`Ast`]'s shared extra-data vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ExtraRange {
    pub start: u32,
    pub count: u32,
}

impl ExtraRange {
    pub const EMPTY: ExtraRange = ExtraRange { start: 0, count: 0 };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
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
    And,
    Or,
}

/// One AST node. The variant *is* the tag; its fields are the payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AstNode {
    // Literals
    IntLit(i64),
    FloatLit(f64),
    StringLit(Symbol),
    BoolLit(bool),
    NullLit,

    // Names
    Ident(Symbol),

    // Operators
    Unary { op: UnaryOp, operand: AstId },
    Binary { op: BinaryOp, left: AstId, right: AstId },
    AddressOf { mutable: bool, operand: AstId },
    Deref(AstId),

    // Calls, indexing, access
    Call { callee: AstId, args: ExtraRange },
    Index { base: AstId, index: AstId },
    Slice { base: AstId, lo: Option<AstId>, hi: Option<AstId> },
    Access { base: AstId, field: Symbol },
    InferredAccess { field: Symbol },

    // Aggregates
    ListLit { elems: ExtraRange },

    // Statements / blocks
    Block { stmts: ExtraRange },
    Let { name: Symbol, ty: Option<AstId>, init: AstId },
    Mut { name: Symbol, ty: Option<AstId>, init: AstId },
    Const { name: Symbol, ty: Option<AstId>, init: AstId },
    ExprStmt(AstId),
    Assign { place: AstId, value: AstId },
    CompoundAssign { op: BinaryOp, place: AstId, value: AstId },

    // Control flow
    If { cond: AstId, then_block: AstId, else_block: Option<AstId> },
    While { cond: AstId, body: AstId },
    For { init: Option<AstId>, cond: Option<AstId>, step: Option<AstId>, body: AstId },
    Switch { discr: Option<AstId>, arms: ExtraRange },
    SwitchArm { pattern: Option<AstId>, value: AstId },
    Return(Option<AstId>),
    Break(Option<AstId>),
    Continue,

    // Declarations
    Function {
        name: Symbol,
        is_public: bool,
        type_params: ExtraRange,
        params: ExtraRange,
        ret: Option<AstId>,
        body: AstId,
    },
    Param { name: Symbol, ty: AstId },
    TypeParam { name: Symbol },
    Struct {
        name: Symbol,
        is_public: bool,
        type_params: ExtraRange,
        fields: ExtraRange,
    },
    Field { name: Symbol, ty: AstId },
    Enum {
        name: Symbol,
        is_public: bool,
        repr: Option<AstId>,
        members: ExtraRange,
    },
    EnumMember { name: Symbol, value: Option<AstId> },
    Newtype {
        name: Symbol,
        is_public: bool,
        tag_arity: u32,
        underlying: AstId,
    },
    ExternFunction {
        name: Symbol,
        params: ExtraRange,
        ret: Option<AstId>,
    },
    ExternVar {
        name: Symbol,
        is_mut: bool,
        ty: AstId,
    },

    // Type forms
    TypePtr { mutable: bool, elem: AstId },
    TypeMultiPtr { mutable: bool, elem: AstId },
    TypeArray { len: AstId, elem: AstId },
    TypeTagged { base: AstId, args: ExtraRange },
}

/// A file's immutable AST: a node table plus the shared extra-data vector.
#[derive(Default)]
pub struct Ast {
    nodes: IndexVec<AstId, AstNode>,
    spans: IndexVec<AstId, SourceIndex>,
    extra: Vec<AstId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: AstId) -> &AstNode {
        &self.nodes[id]
    }

    pub fn source(&self, id: AstId) -> SourceIndex {
        self.spans[id]
    }

    pub fn extra(&self, range: ExtraRange) -> &[AstId] {
        let start = range.start as usize;
        let end = start + range.count as usize;
        &self.extra[start..end]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Incrementally builds an [`Ast`]. Stands in for the parser this core does
/// not implement (spec §1 Non-goals): tests and `corec-drv`'s example
/// programs call this the way a recursive-descent parser would.
#[derive(Default)]
pub struct AstBuilder {
    ast: Ast,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: AstNode, src: SourceIndex) -> AstId {
        let id = self.ast.nodes.push(node);
        let span_id = self.ast.spans.push(src);
        debug_assert_eq!(id, span_id);
        id
    }

    pub fn push_extra(&mut self, ids: &[AstId]) -> ExtraRange {
        let start = self.ast.extra.len() as u32;
        self.ast.extra.extend_from_slice(ids);
        ExtraRange {
            start,
            count: ids.len() as u32,
        }
    }

    pub fn finish(self) -> Ast {
        self.ast
    }
}

/// One source file's top-level declarations, grouped by its root module.
pub struct File {
    pub path: Symbol,
    pub module: Symbol,
    pub imports: Vec<Symbol>,
    pub items: Vec<AstId>,
    pub ast: Ast,
}

/// Every file participating in one compilation.
#[derive(Default)]
pub struct Program {
    pub files: IndexVec<FileId, File>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: File) -> FileId {
        self.files.push(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_stable_ids() {
        let mut b = AstBuilder::new();
        let one = b.push(AstNode::IntLit(1), SourceIndex(0));
        let two = b.push(AstNode::IntLit(2), SourceIndex(1));
        let add = b.push(
            AstNode::Binary {
                op: BinaryOp::Add,
                left: one,
                right: two,
            },
            SourceIndex(2),
        );
        let ast = b.finish();
        assert_eq!(ast.len(), 3);
        match ast.node(add) {
            AstNode::Binary { op: BinaryOp::Add, left, right } => {
                assert_eq!(*left, one);
                assert_eq!(*right, two);
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn extra_range_round_trips_children() {
        let mut b = AstBuilder::new();
        let a = b.push(AstNode::IntLit(1), SourceIndex(0));
        let c = b.push(AstNode::IntLit(2), SourceIndex(1));
        let args = b.push_extra(&[a, c]);
        let call_callee = b.push(AstNode::Ident(Symbol::intern("f")), SourceIndex(2));
        let call = b.push(AstNode::Call { callee: call_callee, args }, SourceIndex(3));
        let ast = b.finish();
        match ast.node(call) {
            AstNode::Call { args, .. } => {
                assert_eq!(ast.extra(*args), &[a, c]);
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }
}
