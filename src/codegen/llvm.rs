//! LLVM backend
//!
//! Turns the textual IR of an [`IrModule`] into object files and assembly.
//! When the `llvm` feature is enabled, it uses inkwell for LLVM bindings;
//! otherwise every emission reports that the backend is unavailable.

use super::CodeGenError;
use super::ir::IrModule;
use serde::Deserialize;
use std::path::Path;

/// LLVM optimization level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptLevel {
    None,
    Less,
    #[default]
    Default,
    Aggressive,
}

impl std::str::FromStr for OptLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" | "none" => Ok(OptLevel::None),
            "1" | "less" => Ok(OptLevel::Less),
            "2" | "default" => Ok(OptLevel::Default),
            "3" | "aggressive" => Ok(OptLevel::Aggressive),
            other => Err(format!("unknown optimization level '{}'", other)),
        }
    }
}

/// Machine code artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Object,
    Assembly,
}

impl OutputKind {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Object => "o",
            OutputKind::Assembly => "s",
        }
    }

    #[cfg(feature = "llvm")]
    fn describe(&self) -> &'static str {
        match self {
            OutputKind::Object => "object file",
            OutputKind::Assembly => "assembly",
        }
    }
}

/// LLVM code generator
#[derive(Debug, Clone, Default)]
pub struct LlvmBackend {
    opt_level: OptLevel,
    /// Target triple; the host when unset
    target: Option<String>,
}

impl LlvmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn is_available() -> bool {
        cfg!(feature = "llvm")
    }

    /// Compile `module` and write the artifact to `output`
    pub fn emit(
        &self,
        module: &IrModule,
        kind: OutputKind,
        output: &Path,
    ) -> Result<(), CodeGenError> {
        #[cfg(feature = "llvm")]
        {
            native::emit(self, module, kind, output)
        }

        #[cfg(not(feature = "llvm"))]
        {
            let _ = (module, kind, output);
            Err(CodeGenError::BackendUnavailable)
        }
    }
}

#[cfg(feature = "llvm")]
mod native {
    use super::{LlvmBackend, OptLevel, OutputKind};
    use crate::codegen::CodeGenError;
    use crate::codegen::ir::IrModule;
    use inkwell::OptimizationLevel;
    use inkwell::context::Context;
    use inkwell::memory_buffer::MemoryBuffer;
    use inkwell::targets::{
        CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
    };
    use std::path::Path;

    impl OptLevel {
        fn to_inkwell(self) -> OptimizationLevel {
            match self {
                OptLevel::None => OptimizationLevel::None,
                OptLevel::Less => OptimizationLevel::Less,
                OptLevel::Default => OptimizationLevel::Default,
                OptLevel::Aggressive => OptimizationLevel::Aggressive,
            }
        }
    }

    fn emit_error(kind: OutputKind, reason: impl ToString) -> CodeGenError {
        CodeGenError::Emit {
            what: kind.describe().to_string(),
            reason: reason.to_string(),
        }
    }

    fn target_machine(backend: &LlvmBackend, kind: OutputKind) -> Result<(TargetMachine, TargetTriple), CodeGenError> {
        let triple = match &backend.target {
            Some(triple) => {
                Target::initialize_all(&InitializationConfig::default());
                TargetTriple::create(triple)
            }
            None => {
                Target::initialize_native(&InitializationConfig::default())
                    .map_err(|e| emit_error(kind, e))?;
                TargetMachine::get_default_triple()
            }
        };

        let target = Target::from_triple(&triple)
            .map_err(|e| emit_error(kind, format!("invalid target triple: {}", e)))?;
        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                backend.opt_level.to_inkwell(),
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| emit_error(kind, "failed to create target machine"))?;
        Ok((machine, triple))
    }

    pub(super) fn emit(
        backend: &LlvmBackend,
        module: &IrModule,
        kind: OutputKind,
        output: &Path,
    ) -> Result<(), CodeGenError> {
        let context = Context::create();
        let text = module.to_string();
        let buffer = MemoryBuffer::create_from_memory_range_copy(text.as_bytes(), &module.name);
        let llvm_module = context
            .create_module_from_ir(buffer)
            .map_err(|e| emit_error(kind, e))?;
        llvm_module.verify().map_err(|e| emit_error(kind, e))?;

        let (machine, triple) = target_machine(backend, kind)?;
        llvm_module.set_triple(&triple);
        llvm_module.set_data_layout(&machine.get_target_data().get_data_layout());

        let file_type = match kind {
            OutputKind::Object => FileType::Object,
            OutputKind::Assembly => FileType::Assembly,
        };
        machine
            .write_to_file(&llvm_module, file_type, output)
            .map_err(|e| emit_error(kind, e))?;

        tracing::debug!(path = %output.display(), kind = kind.describe(), "LLVM emitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_level_parsing() {
        assert_eq!("0".parse::<OptLevel>(), Ok(OptLevel::None));
        assert_eq!("aggressive".parse::<OptLevel>(), Ok(OptLevel::Aggressive));
        assert!("fast".parse::<OptLevel>().is_err());
    }

    #[test]
    fn test_output_extensions() {
        assert_eq!(OutputKind::Object.extension(), "o");
        assert_eq!(OutputKind::Assembly.extension(), "s");
    }

    #[cfg(not(feature = "llvm"))]
    #[test]
    fn test_backend_unavailable_without_feature() {
        let module = IrModule::new("m");
        let err = LlvmBackend::new()
            .emit(&module, OutputKind::Object, Path::new("m.o"))
            .unwrap_err();
        assert_eq!(err, CodeGenError::BackendUnavailable);
        assert!(!LlvmBackend::is_available());
    }
}
