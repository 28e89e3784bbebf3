//! Compilation driver
//!
//! A [`Session`] owns the build configuration and resolves imports: it
//! searches the library paths in order, parses imported files recursively,
//! rejects import cycles and caches parsed modules by canonical path.

use crate::ast::Ast;
use crate::codegen;
use crate::codegen::ir::IrModule;
use crate::codegen::llvm::{LlvmBackend, OptLevel, OutputKind};
use crate::common::Mark;
use crate::diagnostics::CompileError;
use crate::lexer::{self, LanguageSpec};
use crate::parser::{self, ModuleImporter};
use crate::sema::{self, AnalysedAst};
use crate::source::{FileError, SourceFile};
use indexmap::IndexSet;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Build configuration error
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Could not read config {}: {reason}", path.display())]
    #[diagnostic(code(config::read))]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(#[from] toml::de::Error),
}

/// Artifact kinds a build can write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitKind {
    /// Textual IR, `<name>.ll`
    Ir,
    /// Assembly, `<name>.s`
    Asm,
    /// Object file, `<name>.o`
    Obj,
    /// AST as JSON, `<name>.ast.json`
    Ast,
}

impl EmitKind {
    pub fn file_name(&self, module: &str) -> String {
        match self {
            EmitKind::Ir => format!("{}.ll", module),
            EmitKind::Asm => format!("{}.{}", module, OutputKind::Assembly.extension()),
            EmitKind::Obj => format!("{}.{}", module, OutputKind::Object.extension()),
            EmitKind::Ast => format!("{}.ast.json", module),
        }
    }

    /// Artifacts written when none are requested
    pub fn defaults() -> Vec<EmitKind> {
        if LlvmBackend::is_available() {
            vec![EmitKind::Ir, EmitKind::Asm, EmitKind::Obj]
        } else {
            vec![EmitKind::Ir]
        }
    }
}

impl FromStr for EmitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ir" | "llvm" => Ok(EmitKind::Ir),
            "asm" => Ok(EmitKind::Asm),
            "obj" => Ok(EmitKind::Obj),
            "ast" => Ok(EmitKind::Ast),
            other => Err(format!(
                "unknown emit kind '{}' (expected ir, asm, obj or ast)",
                other
            )),
        }
    }
}

/// Build configuration, loadable from `bolt.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directories searched in order for `<name>.bolt` on import
    pub library_paths: Vec<PathBuf>,
    /// Where artifacts are written; created on demand
    pub output_dir: PathBuf,
    pub emit: Vec<EmitKind>,
    pub opt_level: OptLevel,
    /// Target triple; the host when unset
    pub target: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            library_paths: Vec::new(),
            output_dir: PathBuf::from("build"),
            emit: EmitKind::defaults(),
            opt_level: OptLevel::default(),
            target: None,
        }
    }
}

impl BuildConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_emit(mut self, emit: Vec<EmitKind>) -> Self {
        self.emit = emit;
        self
    }

    fn backend(&self) -> LlvmBackend {
        LlvmBackend::new()
            .with_opt_level(self.opt_level)
            .with_target(self.target.clone())
    }
}

/// Output of compiling one translation unit
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub name: String,
    pub ast: Ast,
    pub analysed: AnalysedAst,
    pub ir: IrModule,
    /// Flags from `@pragma(linker, ...)` in this module and its imports
    pub linker_flags: Vec<String>,
}

/// One compiler invocation
#[derive(Debug)]
pub struct Session {
    config: BuildConfig,
    spec: &'static LanguageSpec,
    /// Files being parsed, outermost first
    importing: IndexSet<PathBuf>,
    /// Parsed modules by canonical path
    cache: FxHashMap<PathBuf, Ast>,
}

impl Session {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            spec: LanguageSpec::current(),
            importing: IndexSet::new(),
            cache: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Lex, parse, analyse and lower the file at `path`
    pub fn compile_file(&mut self, path: &Path) -> Result<CompiledModule, CompileError> {
        SourceFile::validate(path)?;
        let ast = self.parse_file(path, &Mark::unknown())?;
        self.finish(ast)
    }

    /// Compile in-memory source, resolving its imports from the library paths
    pub fn compile_source(&mut self, source: &SourceFile) -> Result<CompiledModule, CompileError> {
        let ast = self.parse_source(source)?;
        self.finish(ast)
    }

    /// Lex, parse and analyse without generating code
    pub fn check_file(&mut self, path: &Path) -> Result<AnalysedAst, CompileError> {
        SourceFile::validate(path)?;
        let ast = self.parse_file(path, &Mark::unknown())?;
        Ok(sema::analyse(&ast)?)
    }

    fn finish(&self, ast: Ast) -> Result<CompiledModule, CompileError> {
        let analysed = sema::analyse(&ast)?;
        let ir = codegen::generate(&analysed)?;
        let linker_flags = analysed.linker_flags.clone();

        tracing::info!(module = %ast.main_module, "compiled module");
        Ok(CompiledModule {
            name: ast.main_module.clone(),
            ast,
            analysed,
            ir,
            linker_flags,
        })
    }

    fn parse_source(&mut self, source: &SourceFile) -> Result<Ast, CompileError> {
        let tokens = lexer::lex(source)?;
        tracing::debug!(file = %source.name, tokens = tokens.len(), "lexed source");
        let ast = parser::parse_with_importer(tokens, &source.module_name(), self)?;
        Ok(ast)
    }

    /// Parse a file, detecting cycles and reusing earlier parses
    fn parse_file(&mut self, path: &Path, mark: &Mark) -> Result<Ast, CompileError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if self.importing.contains(&canonical) {
            let chain = self
                .importing
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| module_name_of(p))
                .collect();
            return Err(FileError::CyclicImport {
                chain,
                mark: mark.clone(),
            }
            .into());
        }

        if let Some(ast) = self.cache.get(&canonical) {
            tracing::debug!(path = %canonical.display(), "reusing parsed module");
            return Ok(ast.clone());
        }

        let source = SourceFile::load(path)?;
        self.importing.insert(canonical.clone());
        let result = self.parse_source(&source);
        self.importing.shift_remove(&canonical);

        let ast = result?;
        self.cache.insert(canonical, ast.clone());
        Ok(ast)
    }

    /// First `<dir>/<name>.<ext>` that exists, searching library paths in order
    pub fn resolve_import(&self, name: &str, mark: &Mark) -> Result<PathBuf, FileError> {
        let extension = self.spec.source_extension;
        let file = if Path::new(name).extension().is_some_and(|e| e == extension) {
            PathBuf::from(name)
        } else {
            PathBuf::from(format!("{}.{}", name, extension))
        };

        for dir in &self.config.library_paths {
            let candidate = dir.join(&file);
            if candidate.is_file() {
                tracing::trace!(path = %candidate.display(), "resolved import");
                return Ok(candidate);
            }
        }

        Err(FileError::ImportNotFound {
            name: name.to_string(),
            mark: mark.clone(),
        })
    }

    /// Write the configured artifacts, returning their paths
    pub fn write_artifacts(&self, module: &CompiledModule) -> Result<Vec<PathBuf>, CompileError> {
        let out = &self.config.output_dir;
        std::fs::create_dir_all(out).map_err(|e| FileError::WriteFailed {
            path: out.clone(),
            reason: e.to_string(),
        })?;

        let backend = self.config.backend();
        let mut written = Vec::new();
        let mut seen = IndexSet::new();

        for kind in &self.config.emit {
            if !seen.insert(*kind) {
                continue;
            }
            let path = out.join(kind.file_name(&module.name));
            match kind {
                EmitKind::Ir => write_text(&path, &module.ir.to_string())?,
                EmitKind::Ast => {
                    let json = serde_json::to_string_pretty(&module.ast).map_err(|e| {
                        FileError::WriteFailed {
                            path: path.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    write_text(&path, &json)?;
                }
                EmitKind::Asm => backend.emit(&module.ir, OutputKind::Assembly, &path)?,
                EmitKind::Obj => backend.emit(&module.ir, OutputKind::Object, &path)?,
            }
            tracing::info!(path = %path.display(), "wrote artifact");
            written.push(path);
        }

        Ok(written)
    }
}

impl ModuleImporter for Session {
    fn import(&mut self, name: &str, mark: &Mark) -> Result<Ast, CompileError> {
        let path = self.resolve_import(name, mark)?;
        self.parse_file(&path, mark)
    }
}

fn write_text(path: &Path, text: &str) -> Result<(), CompileError> {
    std::fs::write(path, text).map_err(|e| {
        CompileError::from(FileError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })
}

fn module_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Compile in-memory source with a fresh session
pub fn compile_source(
    text: &str,
    name: &str,
    config: &BuildConfig,
) -> Result<CompiledModule, CompileError> {
    Session::new(config.clone()).compile_source(&SourceFile::new(name, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_defaults() {
        let config = BuildConfig::from_toml_str("").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("build"));
        assert!(config.emit.contains(&EmitKind::Ir));
        assert!(config.library_paths.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let config = BuildConfig::from_toml_str(
            r#"
            library_paths = ["lib", "vendor/bolt"]
            output_dir = "out"
            emit = ["ir", "ast"]
            opt_level = "aggressive"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.library_paths,
            vec![PathBuf::from("lib"), PathBuf::from("vendor/bolt")]
        );
        assert_eq!(config.emit, vec![EmitKind::Ir, EmitKind::Ast]);
        assert_eq!(config.opt_level, OptLevel::Aggressive);
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        assert!(matches!(
            BuildConfig::from_toml_str("colour = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_emit_kind_parsing_and_names() {
        assert_eq!("obj".parse::<EmitKind>(), Ok(EmitKind::Obj));
        assert!("exe".parse::<EmitKind>().is_err());
        assert_eq!(EmitKind::Ast.file_name("main"), "main.ast.json");
        assert_eq!(EmitKind::Ir.file_name("main"), "main.ll");
    }

    #[test]
    fn test_compile_source_without_imports() {
        let module = compile_source("func<Int> main() { return 0 }", "main", &BuildConfig::default())
            .unwrap();
        assert_eq!(module.name, "main");
        assert!(module.ir.find_function("main").is_some());
    }
}
