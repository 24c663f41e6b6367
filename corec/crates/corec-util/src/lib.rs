//! corec-util — foundation types shared across the whole semantic core.
//!
//! Every other `corec-*` crate depends on this one for: typed index vectors
//! ([`idx`]), string interning ([`symbol`]), source positions ([`span`]),
//! diagnostic reporting ([`diagnostic`]), arena allocation ([`arena`]), and
//! infrastructure error types ([`error`]). None of this is specific to any
//! one pipeline stage — it is the "zero-cost abstractions that improve
//! clarity and type safety" layer the retrieval pack's teacher crate
//! (`faxc-util`) establishes for the same reason.

pub mod arena;
pub mod diagnostic;
pub mod error;
pub mod idx;
pub mod span;
pub mod symbol;

pub use arena::{PermanentArena, ScratchArena};
pub use diagnostic::{Code, Diagnostic, DiagnosticBuilder, Handler, Level, Note, NoteKind};
pub use error::{CoreError, CoreResult};
pub use idx::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceIndex, SourceLoc, SourceMap, Span};
pub use symbol::Symbol;

pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
