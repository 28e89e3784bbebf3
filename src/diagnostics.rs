//! Compiler diagnostics
//!
//! Every pipeline stage has its own error type. [`CompileError`] wraps them so
//! the driver and CLI deal with a single type, and renders each failure as one
//! line naming the stage, the source location and the reason.

use crate::codegen::CodeGenError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::sema::SemaError;
use crate::source::FileError;
use crate::symbols::SymbolError;
use crate::types::TypeError;
use miette::Diagnostic;
use std::fmt;

/// Any error the compiler can report
#[derive(Debug, Diagnostic)]
pub enum CompileError {
    #[diagnostic(transparent)]
    File(FileError),
    #[diagnostic(transparent)]
    Lex(LexError),
    #[diagnostic(transparent)]
    Parse(ParseError),
    #[diagnostic(transparent)]
    Type(TypeError),
    #[diagnostic(transparent)]
    Sema(SemaError),
    #[diagnostic(transparent)]
    CodeGen(CodeGenError),
}

impl CompileError {
    /// The error that caused this one, looking through failed imports
    pub fn root_cause(&self) -> &CompileError {
        match self {
            CompileError::Parse(ParseError::Import(inner)) => inner.root_cause(),
            other => other,
        }
    }

    /// Name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self.root_cause() {
            CompileError::File(_) => "File",
            CompileError::Lex(_) => "Lexical",
            CompileError::Parse(ParseError::Type(_)) | CompileError::Type(_) => "Type",
            CompileError::Parse(_) => "Parse",
            CompileError::Sema(_) => "Semantic",
            CompileError::CodeGen(_) => "Code generation",
        }
    }

    /// A defect in the compiler rather than in the program being compiled
    pub fn is_internal(&self) -> bool {
        match self.root_cause() {
            CompileError::Parse(ParseError::Symbol(SymbolError::LeaveRootScope))
            | CompileError::Sema(SemaError::Symbol(SymbolError::LeaveRootScope)) => true,
            CompileError::CodeGen(err) => err.is_internal(),
            _ => false,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason: &dyn fmt::Display = match self.root_cause() {
            CompileError::File(e) => e,
            CompileError::Lex(e) => e,
            CompileError::Parse(e) => e,
            CompileError::Type(e) => e,
            CompileError::Sema(e) => e,
            CompileError::CodeGen(e) => e,
        };
        let labelled = matches!(
            self.root_cause(),
            CompileError::CodeGen(CodeGenError::InternalCompilerError { .. })
        );
        if self.is_internal() && !labelled {
            write!(f, "{} error: internal compiler error: {}", self.stage(), reason)
        } else {
            write!(f, "{} error: {}", self.stage(), reason)
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::File(e) => Some(e),
            CompileError::Lex(e) => Some(e),
            CompileError::Parse(e) => Some(e),
            CompileError::Type(e) => Some(e),
            CompileError::Sema(e) => Some(e),
            CompileError::CodeGen(e) => Some(e),
        }
    }
}

macro_rules! impl_from_stage {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for CompileError {
                fn from(err: $ty) -> Self {
                    CompileError::$variant(err)
                }
            }
        )*
    };
}

impl_from_stage! {
    File(FileError),
    Lex(LexError),
    Parse(ParseError),
    Type(TypeError),
    Sema(SemaError),
    CodeGen(CodeGenError),
}

/// Collects per-module failures of a multi-module build.
/// A failed module never affects modules compiled before it.
#[derive(Debug, Default)]
pub struct Reporter {
    errors: Vec<(String, CompileError)>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, module: impl Into<String>, error: CompileError) {
        self.errors.push((module.into(), error));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_internal_errors(&self) -> bool {
        self.errors.iter().any(|(_, e)| e.is_internal())
    }

    pub fn errors(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter().map(|(_, e)| e)
    }

    /// Print one line per error
    pub fn emit_all(&self) {
        for (module, error) in &self.errors {
            eprintln!("[{}] {}", module, error);
        }
    }
}
