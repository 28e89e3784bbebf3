//! Bolt Programming Language Compiler
//!
//! An ahead-of-time compiler for Bolt, a small statically typed language with
//! functions, typed constants, module imports and linker directives.
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser → AST → Sema → Bound AST → CodeGen → IR → LLVM
//! ```
//!
//! Imports are resolved while parsing: the imported file runs through the
//! lexer and parser and its declarations are spliced into the importer's AST.
//!
//! # Example
//!
//! ```bolt
//! import io
//! @pragma(linker, "-lc")
//!
//! func<Int32> puts(s: String)
//!
//! func<Int> main() {
//!     puts("Hello, World")
//!     return 0
//! }
//! ```

pub mod ast;
pub mod codegen;
pub mod common;
pub mod diagnostics;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod source;
pub mod symbols;
pub mod types;

pub use ast::Ast;
pub use diagnostics::CompileError;
pub use driver::{BuildConfig, CompiledModule, Session, compile_source};
pub use source::SourceFile;
pub use types::Type;

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
