//! Structural and nominal type interning (spec §3 "Structural-type
//! interning", §4.3).
//!
//! Nominal kinds (`Primitive`, `Newtype`, `Struct`, `Enum`, `TypeParameter`)
//! get one id per declaration and are never deduplicated by shape — two
//! structs with identical fields are still different types. Every other
//! kind is structural: two occurrences of `*mut i32` must share one
//! [`TypeId`] (invariant I1). The interner is a single hash-consing table;
//! the teacher's two-level thread-local-then-global probe collapses to one
//! table here because stage 3's per-function work is not parallelized in
//! this build (see `DESIGN.md`).

use corec_role::DefId;
use corec_util::{define_idx, FxHashMap, IndexVec, Symbol};

define_idx!(
    /// Identifies one interned type.
    TypeId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    I8,
    I16,
    I32,
    I64,
    Isize,
    F32,
    F64,
    Bool,
    Byte,
    Char,
}

/// One interned type. Structural variants implement deep structural
/// equality via `#[derive(PartialEq, Eq, Hash)]`; nominal variants carry a
/// [`DefId`] so identity (not shape) decides equality, matching spec §3.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Error,
    Primitive(Primitive),
    /// A single-field wrapper introduced by `newtype NAME(TAGS) = INNER`.
    Newtype { def: DefId, inner: TypeId, tag_args: Vec<TypeId> },
    Struct { def: DefId, type_args: Vec<TypeId> },
    Enum { def: DefId },
    TypeParameter { def: DefId, index: u32 },

    Ptr { mutable: bool, elem: TypeId },
    MultiPtr { mutable: bool, elem: TypeId },
    Slice { mutable: bool, elem: TypeId },
    Array { len: u64, elem: TypeId },
    /// `type_params` is the number of leading [`Type::TypeParameter`]
    /// indices this function's signature introduces (spec §4.3 generics);
    /// zero for an ordinary function.
    Function { params: Vec<TypeId>, ret: TypeId, type_params: u32 },

    /// A `Size`/`Alignment` tag type indexed by another type, e.g.
    /// `Size[i32]`.
    Tagged { tag: Symbol, args: Vec<TypeId> },
}

/// The structural hash-consing table plus the fixed primitive prefix
/// (invariant I4: primitive ids are a compile-time constant prefix).
pub struct TypeInterner {
    types: IndexVec<TypeId, Type>,
    index: FxHashMap<Type, TypeId>,
    pub error: TypeId,
    pub void: TypeId,
    pub i8: TypeId,
    pub i16: TypeId,
    pub i32: TypeId,
    pub i64: TypeId,
    pub isize_: TypeId,
    pub f32: TypeId,
    pub f64: TypeId,
    pub bool_: TypeId,
    pub byte: TypeId,
    pub char_: TypeId,
}

impl TypeInterner {
    pub fn new() -> Self {
        let mut types = IndexVec::new();
        let mut push_prim = |types: &mut IndexVec<TypeId, Type>, p: Option<Primitive>| {
            types.push(match p {
                Some(p) => Type::Primitive(p),
                None => Type::Error,
            })
        };
        let error = push_prim(&mut types, None);
        let void = push_prim(&mut types, Some(Primitive::Void));
        let i8 = push_prim(&mut types, Some(Primitive::I8));
        let i16 = push_prim(&mut types, Some(Primitive::I16));
        let i32 = push_prim(&mut types, Some(Primitive::I32));
        let i64 = push_prim(&mut types, Some(Primitive::I64));
        let isize_ = push_prim(&mut types, Some(Primitive::Isize));
        let f32 = push_prim(&mut types, Some(Primitive::F32));
        let f64 = push_prim(&mut types, Some(Primitive::F64));
        let bool_ = push_prim(&mut types, Some(Primitive::Bool));
        let byte = push_prim(&mut types, Some(Primitive::Byte));
        let char_ = push_prim(&mut types, Some(Primitive::Char));

        Self {
            types,
            index: FxHashMap::default(),
            error,
            void,
            i8,
            i16,
            i32,
            i64,
            isize_,
            f32,
            f64,
            bool_,
            byte,
            char_,
        }
    }

    /// Interns a structural type, deduplicating by deep equality (I1).
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.index.get(&ty) {
            return id;
        }
        let id = self.types.push(ty.clone());
        self.index.insert(ty, id);
        id
    }

    /// Allocates a fresh nominal type that is never deduplicated by shape:
    /// a second `struct Foo {}` declaration still gets its own id, name
    /// collisions having already been rejected in stage 1.
    pub fn alloc_nominal(&mut self, ty: Type) -> TypeId {
        self.types.push(ty)
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id]
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            Type::Primitive(
                Primitive::I8
                    | Primitive::I16
                    | Primitive::I32
                    | Primitive::I64
                    | Primitive::Isize
                    | Primitive::Byte
            )
        )
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Primitive(Primitive::F32 | Primitive::F64))
    }

    pub fn bit_width(&self, id: TypeId) -> Option<u32> {
        match self.get(id) {
            Type::Primitive(Primitive::I8 | Primitive::Byte) => Some(8),
            Type::Primitive(Primitive::I16) => Some(16),
            Type::Primitive(Primitive::I32) => Some(32),
            Type::Primitive(Primitive::I64 | Primitive::Isize) => Some(64),
            _ => None,
        }
    }

    /// Linearity propagates through arrays, tagged wrappers, and structs (a
    /// struct is linear iff any field is linear); callers supply
    /// `struct_is_linear` since field-linearity needs the declaration table.
    pub fn is_linear(&self, id: TypeId, struct_is_linear: impl Fn(DefId) -> bool) -> bool {
        match self.get(id) {
            Type::Newtype { tag_args, .. } => {
                tag_args.iter().any(|&t| self.tagged_is_affine(t))
            }
            Type::Array { elem, .. } => self.is_linear(*elem, struct_is_linear),
            Type::Struct { def, .. } => struct_is_linear(*def),
            _ => false,
        }
    }

    fn tagged_is_affine(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Tagged { tag, .. } if tag.as_str() == "Affine")
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_pointer_shapes_share_one_id() {
        let mut interner = TypeInterner::new();
        let a = interner.intern(Type::Ptr {
            mutable: false,
            elem: interner.i32,
        });
        let b = interner.intern(Type::Ptr {
            mutable: false,
            elem: interner.i32,
        });
        assert_eq!(a, b);
    }

    #[test]
    fn different_mutability_is_a_different_type() {
        let mut interner = TypeInterner::new();
        let a = interner.intern(Type::Ptr {
            mutable: false,
            elem: interner.i32,
        });
        let b = interner.intern(Type::Ptr {
            mutable: true,
            elem: interner.i32,
        });
        assert_ne!(a, b);
    }

    #[test]
    fn nominal_types_are_never_deduplicated() {
        let mut interner = TypeInterner::new();
        let def = DefId(0);
        let a = interner.alloc_nominal(Type::Struct {
            def,
            type_args: vec![],
        });
        let b = interner.alloc_nominal(Type::Struct {
            def,
            type_args: vec![],
        });
        assert_ne!(a, b);
    }

    #[test]
    fn primitive_ids_are_stable_prefix() {
        let interner = TypeInterner::new();
        assert_eq!(interner.i32.0, 4);
        assert_eq!(interner.bool_.0, 9);
    }
}
