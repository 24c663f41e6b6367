//! String interning.
//!
//! Every identifier, field name, and module name in the pipeline is interned
//! once into a global table; after that, comparing two names is a `u32`
//! comparison instead of a byte-for-byte string compare. The table is global
//! and append-only for the lifetime of a compilation (§3 "Lifecycles").

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::OnceLock;

/// An interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Symbol {
    pub fn intern(s: &str) -> Self {
        interner().intern(s)
    }

    pub fn as_str(self) -> &'static str {
        interner().resolve(self)
    }
}

struct Interner {
    inner: RwLock<InternerInner>,
}

struct InternerInner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

fn interner() -> &'static Interner {
    static INTERNER: OnceLock<Interner> = OnceLock::new();
    INTERNER.get_or_init(Interner::new)
}

impl Interner {
    fn new() -> Self {
        Self {
            inner: RwLock::new(InternerInner {
                map: FxHashMap::default(),
                strings: Vec::new(),
            }),
        }
    }

    fn intern(&self, s: &str) -> Symbol {
        if let Some(&id) = self.inner.read().map.get(s) {
            return Symbol(id);
        }

        let mut inner = self.inner.write();
        // Another writer may have interned `s` between the read-lock probe
        // above and acquiring the write lock.
        if let Some(&id) = inner.map.get(s) {
            return Symbol(id);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let id = inner.strings.len() as u32;
        inner.strings.push(leaked);
        inner.map.insert(leaked, id);
        Symbol(id)
    }

    fn resolve(&self, sym: Symbol) -> &'static str {
        self.inner.read().strings[sym.0 as usize]
    }
}

/// Built-in names registered once at startup so they have stable, predictable
/// symbols (spec §6: "These must be pre-registered in the global scope
/// exactly as spelled.").
pub mod kw {
    use super::Symbol;

    macro_rules! keywords {
        ($($name:ident => $text:literal),* $(,)?) => {
            $(
                pub fn $name() -> Symbol {
                    Symbol::intern($text)
                }
            )*
        };
    }

    keywords! {
        i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64", isize => "isize",
        f32 => "f32", f64 => "f64", bool_ => "bool", byte => "byte", char_ => "char",
        void => "void",
        size_of => "size_of", align_of => "align_of", zero_extend => "zero_extend",
        slice => "slice", affine => "Affine", array_length => "ArrayLength",
        size_tag => "Size", alignment_tag => "Alignment",
        main => "main",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_interns_to_same_symbol() {
        let a = Symbol::intern("hello");
        let b = Symbol::intern("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_interns_to_different_symbols() {
        let a = Symbol::intern("foo_unique_1");
        let b = Symbol::intern("bar_unique_2");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_as_str() {
        let sym = Symbol::intern("round_trip_case");
        assert_eq!(sym.as_str(), "round_trip_case");
    }

    #[test]
    fn builtin_keywords_are_stable() {
        assert_eq!(kw::i32().as_str(), "i32");
        assert_eq!(kw::size_of().as_str(), "size_of");
    }
}
