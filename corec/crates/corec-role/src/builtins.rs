//! The fixed built-in scope (spec §4.2, §6 "Built-ins (names fixed)").

use corec_util::{define_idx, FxHashMap, Symbol};

define_idx!(
    /// Identifies a built-in primitive type, tag type, or macro.
    BuiltinId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    Primitive,
    TagType,
    Macro,
}

pub struct Builtin {
    pub name: Symbol,
    pub kind: BuiltinKind,
}

/// The built-in scope: primitive type names, `Size`/`Alignment` tag types,
/// and the macro names `align_of`, `size_of`, `zero_extend`, `slice`,
/// `Affine`, `ArrayLength`.
pub struct Builtins {
    entries: Vec<Builtin>,
    by_name: FxHashMap<Symbol, BuiltinId>,
}

/// Fixed primitive names in id order; `PRIMITIVE_COUNT` mirrors spec §3's
/// "Primitive ids 0..N are reserved for built-ins" prefix.
pub const PRIMITIVE_NAMES: &[&str] = &[
    "invalid", "void", "i8", "i16", "i32", "i64", "isize", "f32", "f64", "bool", "byte", "char",
];

impl Builtins {
    pub fn new() -> Self {
        let mut b = Self {
            entries: Vec::new(),
            by_name: FxHashMap::default(),
        };
        for &name in PRIMITIVE_NAMES {
            b.register(name, BuiltinKind::Primitive);
        }
        b.register("Size", BuiltinKind::TagType);
        b.register("Alignment", BuiltinKind::TagType);
        for &name in &[
            "align_of",
            "size_of",
            "zero_extend",
            "slice",
            "Affine",
            "ArrayLength",
        ] {
            b.register(name, BuiltinKind::Macro);
        }
        b
    }

    fn register(&mut self, name: &str, kind: BuiltinKind) -> BuiltinId {
        let sym = Symbol::intern(name);
        let id = corec_util::Idx::from_usize(self.entries.len());
        self.entries.push(Builtin { name: sym, kind });
        self.by_name.insert(sym, id);
        id
    }

    pub fn lookup(&self, name: Symbol) -> Option<BuiltinId> {
        self.by_name.get(&name).copied()
    }

    pub fn kind(&self, id: BuiltinId) -> BuiltinKind {
        self.entries[corec_util::Idx::index(id)].kind
    }

    pub fn name(&self, id: BuiltinId) -> Symbol {
        self.entries[corec_util::Idx::index(id)].name
    }

    pub fn is_macro(&self, name: Symbol) -> bool {
        self.lookup(name)
            .is_some_and(|id| self.kind(id) == BuiltinKind::Macro)
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names_are_registered() {
        let b = Builtins::new();
        let id = b.lookup(Symbol::intern("i32")).expect("i32 registered");
        assert_eq!(b.kind(id), BuiltinKind::Primitive);
    }

    #[test]
    fn macros_are_registered_and_detected() {
        let b = Builtins::new();
        assert!(b.is_macro(Symbol::intern("size_of")));
        assert!(!b.is_macro(Symbol::intern("i32")));
    }

    #[test]
    fn tag_types_are_registered() {
        let b = Builtins::new();
        let id = b.lookup(Symbol::intern("Size")).unwrap();
        assert_eq!(b.kind(id), BuiltinKind::TagType);
    }
}
