//! Per-file local scopes (spec §3 "Locals", §4.2).
//!
//! A local is indexed into a per-file table whose entries are `(role, AST
//! node)`; lexical scoping while walking a function body is a stack of
//! "ribs", each a name-to-slot map pushed on block entry and popped on
//! exit — the same rib-stack shape the teacher's `faxc-sem::ScopeTree`
//! uses for its lexical scopes, generalized here to carry a [`LocalRole`]
//! instead of a type-checked binding.

use corec_ast::AstId;
use corec_util::{define_idx, FxHashMap, IndexVec, Symbol};

define_idx!(
    /// Identifies one local binding within a single file's local table.
    LocalSlot
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalRole {
    Value,
    Type,
}

#[derive(Clone, Copy, Debug)]
pub struct LocalEntry {
    pub role: LocalRole,
    pub ast: AstId,
}

/// All locals introduced anywhere in one file, addressed by [`LocalSlot`].
#[derive(Default)]
pub struct PerFileLocals {
    entries: IndexVec<LocalSlot, LocalEntry>,
}

impl PerFileLocals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LocalEntry) -> LocalSlot {
        self.entries.push(entry)
    }

    pub fn entry(&self, slot: LocalSlot) -> LocalEntry {
        self.entries[slot]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One lexical block's bindings, pushed on block entry and popped on exit.
#[derive(Default)]
struct Rib {
    bindings: FxHashMap<Symbol, LocalSlot>,
}

/// A stack of [`Rib`]s used while walking a single function body.
///
/// Lookup walks innermost-to-outermost, matching ordinary lexical shadowing;
/// the scope stack is scratch state local to one function's role analysis
/// and does not outlive it.
#[derive(Default)]
pub struct ScopeStack {
    ribs: Vec<Rib>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rib(&mut self) {
        self.ribs.push(Rib::default());
    }

    pub fn pop_rib(&mut self) {
        self.ribs.pop().expect("pop_rib without matching push_rib");
    }

    /// Binds `name` to `slot` in the innermost rib, shadowing any outer
    /// binding of the same name.
    pub fn bind(&mut self, name: Symbol, slot: LocalSlot) {
        self.ribs
            .last_mut()
            .expect("bind called with no active rib")
            .bindings
            .insert(name, slot);
    }

    pub fn lookup(&self, name: Symbol) -> Option<LocalSlot> {
        self.ribs
            .iter()
            .rev()
            .find_map(|rib| rib.bindings.get(&name).copied())
    }

    pub fn depth(&self) -> usize {
        self.ribs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corec_util::Idx;

    #[test]
    fn inner_rib_shadows_outer() {
        let mut stack = ScopeStack::new();
        stack.push_rib();
        stack.bind(Symbol::intern("x"), LocalSlot::from_usize(0));
        stack.push_rib();
        stack.bind(Symbol::intern("x"), LocalSlot::from_usize(1));
        assert_eq!(stack.lookup(Symbol::intern("x")), Some(LocalSlot::from_usize(1)));
        stack.pop_rib();
        assert_eq!(stack.lookup(Symbol::intern("x")), Some(LocalSlot::from_usize(0)));
        stack.pop_rib();
        assert_eq!(stack.lookup(Symbol::intern("x")), None);
    }

    #[test]
    fn per_file_locals_round_trips_entries() {
        let mut locals = PerFileLocals::new();
        let ast_id = AstId::from_usize(3);
        let slot = locals.push(LocalEntry {
            role: LocalRole::Value,
            ast: ast_id,
        });
        let entry = locals.entry(slot);
        assert_eq!(entry.role, LocalRole::Value);
        assert_eq!(entry.ast, ast_id);
    }
}
