//! corec-role — stages 1 and 2 of the pipeline: global symbol collection
//! and role resolution (spec §4.1, §4.2).
//!
//! Stage 1 ([`collect`]) walks every file's top-level items once and
//! assigns each a [`DefId`], bucketed into module-public or module-private
//! scope. Stage 2 ([`analyze`]) resolves every identifier to a role (type,
//! value, module, built-in macro, type-tag, ...), records that role as RIR
//! for every AST node, and computes a dependency-respecting order over
//! global definitions via a three-colour DFS.

pub mod builtins;
pub mod collect;
pub mod scope;

mod analyze;

pub use builtins::{BuiltinId, BuiltinKind, Builtins};
pub use collect::{collect, DefId, DefKind, Definition, GlobalSymbols, ModuleId};
pub use scope::{LocalEntry, LocalRole, LocalSlot, PerFileLocals, ScopeStack};

pub use analyze::{analyze, Rir, RirData, RirTag, RoleAnalysis};

pub use corec_util::{Code, DiagnosticBuilder, NoteKind};
