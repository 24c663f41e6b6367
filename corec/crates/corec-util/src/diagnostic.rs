//! Diagnostic reporting (§7 "Error Handling Design").
//!
//! Passes never return a `Result` for a user-facing semantic error: they push
//! a [`Diagnostic`] into the shared [`Handler`] and return a sentinel
//! (`TypeId::INVALID`, `ValueId::INVALID`, ...) from the failing node, exactly
//! as spec §7's propagation policy describes. `Result`/`thiserror` stays
//! reserved for genuine infrastructure failures (see [`crate::error`]).

use crate::span::{SourceMap, Span};
use parking_lot::Mutex;
use std::fmt;

/// Severity of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// The flat, enumerable error taxonomy from spec §7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    // Structure (§4.1, §4.2)
    MultipleDefinition,
    MultipleExternDefinition,
    RecursiveDependency,
    UndefinedName,
    DerefOperandRole,
    AddressOfOperandRole,
    AccessOperandRole,
    CallOperandRole,
    IndexOperandRole,

    // Types (§4.3)
    ExpectedValueType,
    ExpectedType,
    EnumReprNotInteger,
    ArrayIndexTypeNotArrayLength,
    BinaryOperandMismatch,
    UnaryOperandMismatch,
    InvalidCast,
    SliceConstructorNeedsPointer,
    NotAFunctionOrStruct,
    ArgumentCount,
    FieldCount,
    IndexCount,
    TypeArgumentInference,
    UnknownField,
    ValueTypeMismatch,
    NotAPlace,
    NotAConstantInitializer,
    ConstIntOverflow,
    NegativeShift,
    CannotInferType,
    UnknownSizeOrAlign,
    EmptyArray,
    EmptyStruct,

    // Control flow (§4.3, §4.2)
    MisplacedBreakOrContinue,
    MissingReturn,
    ReturnWithValue,
    ReturnWithoutValue,
    MainSignature,
    SwitchNotExhaustive,
    ElseCaseUnreachable,
    DuplicateSwitchCase,
    SwitchIncompatibleCases,

    // Affine (§4.4)
    LinearAssignment,
    ConsumedValueUsed,
    ConsumedInLoop,
    MoveBorrowed,
    BorrowedMutableShared,
    MultipleMutableBorrows,
}

impl Code {
    /// The `ERROR_*` spelling used by spec §7, for golden-output tests.
    pub fn name(self) -> &'static str {
        use Code::*;
        match self {
            MultipleDefinition => "ERROR_MULTIPLE_DEFINITION",
            MultipleExternDefinition => "ERROR_MULTIPLE_EXTERN_DEFINITION",
            RecursiveDependency => "ERROR_RECURSIVE_DEPENDENCY",
            UndefinedName => "ERROR_UNDEFINED_NAME",
            DerefOperandRole => "ERROR_DEREF_OPERAND_ROLE",
            AddressOfOperandRole => "ERROR_ADDRESS_OF_OPERAND_ROLE",
            AccessOperandRole => "ERROR_ACCESS_OPERAND_ROLE",
            CallOperandRole => "ERROR_CALL_OPERAND_ROLE",
            IndexOperandRole => "ERROR_INDEX_OPERAND_ROLE",
            ExpectedValueType => "ERROR_EXPECTED_VALUE_TYPE",
            ExpectedType => "ERROR_EXPECTED_TYPE",
            EnumReprNotInteger => "ERROR_ENUM_REPR_NOT_INTEGER",
            ArrayIndexTypeNotArrayLength => "ERROR_ARRAY_INDEX_TYPE",
            BinaryOperandMismatch => "ERROR_BINARY_OPERAND_MISMATCH",
            UnaryOperandMismatch => "ERROR_UNARY_OPERAND_MISMATCH",
            InvalidCast => "ERROR_INVALID_CAST",
            SliceConstructorNeedsPointer => "ERROR_SLICE_CONSTRUCTOR_NEEDS_POINTER",
            NotAFunctionOrStruct => "ERROR_NOT_A_FUNCTION_OR_STRUCT",
            ArgumentCount => "ERROR_ARGUMENT_COUNT",
            FieldCount => "ERROR_FIELD_COUNT",
            IndexCount => "ERROR_INDEX_COUNT",
            TypeArgumentInference => "ERROR_TYPE_ARGUMENT_INFERENCE",
            UnknownField => "ERROR_UNKNOWN_FIELD",
            ValueTypeMismatch => "ERROR_VALUE_TYPE_MISMATCH",
            NotAPlace => "ERROR_NOT_A_PLACE",
            NotAConstantInitializer => "ERROR_NOT_A_CONSTANT_INITIALIZER",
            ConstIntOverflow => "ERROR_CONST_INT_OVERFLOW",
            NegativeShift => "ERROR_NEGATIVE_SHIFT",
            CannotInferType => "ERROR_CANNOT_INFER_TYPE",
            UnknownSizeOrAlign => "ERROR_UNKNOWN_SIZE_OR_ALIGN",
            EmptyArray => "ERROR_EMPTY_ARRAY",
            EmptyStruct => "ERROR_EMPTY_STRUCT",
            MisplacedBreakOrContinue => "ERROR_MISPLACED_BREAK_OR_CONTINUE",
            MissingReturn => "ERROR_MISSING_RETURN",
            ReturnWithValue => "ERROR_RETURN_WITH_VALUE",
            ReturnWithoutValue => "ERROR_RETURN_WITHOUT_VALUE",
            MainSignature => "ERROR_MAIN_SIGNATURE",
            SwitchNotExhaustive => "ERROR_SWITCH_NOT_EXHAUSTIVE",
            ElseCaseUnreachable => "ERROR_ELSE_CASE_UNREACHABLE",
            DuplicateSwitchCase => "ERROR_DUPLICATE_SWITCH_CASE",
            SwitchIncompatibleCases => "ERROR_SWITCH_INCOMPATIBLE_CASES",
            LinearAssignment => "ERROR_LINEAR_ASSIGNMENT",
            ConsumedValueUsed => "ERROR_CONSUMED_VALUE_USED",
            ConsumedInLoop => "ERROR_CONSUMED_IN_LOOP",
            MoveBorrowed => "ERROR_MOVE_BORROWED",
            BorrowedMutableShared => "ERROR_BORROWED_MUTABLE_SHARED",
            MultipleMutableBorrows => "ERROR_MULTIBLE_MUTABLE_BORROWS",
        }
    }
}

/// The `NOTE_*` family from spec §7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteKind {
    PreviousDefinition,
    PreviousBuiltinDefinition,
    PrivateDefinition,
    ForgotImport,
    ReplaceLetWithMut,
    Recursion,
}

impl NoteKind {
    pub fn name(self) -> &'static str {
        match self {
            NoteKind::PreviousDefinition => "NOTE_PREVIOUS_DEFINITION",
            NoteKind::PreviousBuiltinDefinition => "NOTE_PREVIOUS_BUILTIN_DEFINITION",
            NoteKind::PrivateDefinition => "NOTE_PRIVATE_DEFINITION",
            NoteKind::ForgotImport => "NOTE_FORGOT_IMPORT",
            NoteKind::ReplaceLetWithMut => "NOTE_REPLACE_LET_WITH_MUT",
            NoteKind::Recursion => "NOTE_RECURSION",
        }
    }
}

/// A single emitted note, attached to an error diagnostic.
#[derive(Clone, Debug)]
pub struct Note {
    pub kind: NoteKind,
    pub message: String,
    pub span: Option<Span>,
}

/// A diagnostic message with severity, code, location, and attached notes.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub code: Code,
    pub message: String,
    pub span: Option<Span>,
    pub notes: Vec<Note>,
}

/// Fluent builder for [`Diagnostic`], mirroring the teacher's
/// `DiagnosticBuilder` API.
pub struct DiagnosticBuilder {
    diag: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn error(code: Code, message: impl Into<String>) -> Self {
        Self {
            diag: Diagnostic {
                level: Level::Error,
                code,
                message: message.into(),
                span: None,
                notes: Vec::new(),
            },
        }
    }

    pub fn span(mut self, span: Span) -> Self {
        self.diag.span = Some(span);
        self
    }

    pub fn note(mut self, kind: NoteKind, message: impl Into<String>, span: Option<Span>) -> Self {
        self.diag.notes.push(Note {
            kind,
            message: message.into(),
            span,
        });
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diag
    }
}

/// The shared, mutually-excluded diagnostic sink (§5 "Diagnostic sink").
///
/// A single `Handler` is shared (behind a `parking_lot::Mutex`) across every
/// worker in the per-function parallel phase; it is the only resource those
/// workers write to concurrently.
#[derive(Default)]
pub struct Handler {
    inner: Mutex<Vec<Diagnostic>>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, diag: Diagnostic) {
        tracing::debug!(code = diag.code.name(), "diagnostic emitted");
        self.inner.lock().push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.inner
            .lock()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.inner
            .lock()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().clone()
    }

    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = String::new();
        for diag in self.inner.lock().iter() {
            render_one(&mut out, diag, sources);
        }
        out
    }
}

fn render_one(out: &mut String, diag: &Diagnostic, sources: &SourceMap) {
    use std::fmt::Write;

    if let Some(span) = diag.span {
        let loc = sources.loc(span);
        let _ = writeln!(
            out,
            "{}: {} [{}]\n  --> {}:{}:{}",
            diag.level,
            diag.message,
            diag.code.name(),
            loc.path,
            loc.line,
            loc.column
        );
    } else {
        let _ = writeln!(out, "{}: {} [{}]", diag.level, diag.message, diag.code.name());
    }

    for note in &diag.notes {
        if let Some(span) = note.span {
            let loc = sources.loc(span);
            let _ = writeln!(
                out,
                "  note: {} [{}]\n    --> {}:{}:{}",
                note.message,
                note.kind.name(),
                loc.path,
                loc.line,
                loc.column
            );
        } else {
            let _ = writeln!(out, "  note: {} [{}]", note.message, note.kind.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceMap;

    #[test]
    fn handler_tracks_error_count() {
        let handler = Handler::new();
        assert!(!handler.has_errors());
        handler.emit(DiagnosticBuilder::error(Code::UndefinedName, "undefined name `x`").build());
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn render_includes_code_and_location() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("a.corec", "let x = y;".to_string());
        let handler = Handler::new();
        handler.emit(
            DiagnosticBuilder::error(Code::UndefinedName, "undefined name `y`")
                .span(crate::span::Span::new(file, 8, 9))
                .note(NoteKind::ForgotImport, "did you forget an import?", None)
                .build(),
        );
        let rendered = handler.render(&sources);
        assert!(rendered.contains("ERROR_UNDEFINED_NAME"));
        assert!(rendered.contains("a.corec:1:9"));
        assert!(rendered.contains("NOTE_FORGOT_IMPORT"));
    }
}
