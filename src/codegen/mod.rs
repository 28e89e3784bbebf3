//! Code generation
//!
//! Lowers an analysed program to the in-tree [`ir`] model. Only the main
//! module's definitions produce bodies; functions and constants of imported
//! modules become declarations resolved at link time.
//!
//! Lowering decisions:
//! - function identity is the name: a function already present is reused
//!   when its signature matches
//! - module constants of the main module are emitted before its functions
//! - local constants are SSA values bound to their initializer's value
//! - module constants with string, integer or bool literal initializers are
//!   globals; string globals are byte arrays read through element zero
//! - declaration-only module constants are `external` globals

pub mod ir;
pub mod llvm;

use crate::ast::{BinaryOperator, ConstantDeclaration, Expression, FunctionDeclaration};
use crate::common::Mark;
use crate::sema::{AnalysedAst, DeclId, DeclKind, DeclTable};
use crate::types::Type;
use ir::{BinaryOp, GlobalInit, IrFunction, IrGlobal, IrModule, IrParam, IrType, Op, Terminator, Value};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Code generation error
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum CodeGenError {
    #[error("{mark} -- call to '{name}' has no emitted function declaration")]
    #[diagnostic(code(codegen::missing_function))]
    MissingFunctionDeclaration { name: String, mark: Mark },

    #[error("{mark} -- {kind} is not supported in {context}")]
    #[diagnostic(code(codegen::unsupported))]
    UnsupportedExpression {
        kind: &'static str,
        context: &'static str,
        mark: Mark,
    },

    #[error("{mark} -- module constant '{name}' must be initialized with a string, integer or bool literal")]
    #[diagnostic(code(codegen::unsupported_global_initializer))]
    UnsupportedGlobalInitializer { name: String, mark: Mark },

    #[error("{mark} -- constant '{name}' is used but never initialized")]
    #[diagnostic(code(codegen::uninitialized_constant))]
    UninitializedConstant { name: String, mark: Mark },

    #[error("{mark} -- function '{name}' is defined more than once")]
    #[diagnostic(code(codegen::duplicate_definition))]
    DuplicateDefinition { name: String, mark: Mark },

    #[error("{mark} -- function '{name}' does not match its earlier declaration")]
    #[diagnostic(code(codegen::conflicting_declaration))]
    ConflictingDeclaration { name: String, mark: Mark },

    #[error("{mark} -- internal compiler error: {reason}")]
    #[diagnostic(code(codegen::internal))]
    InternalCompilerError { reason: String, mark: Mark },

    #[error("LLVM backend not enabled. Compile with --features llvm")]
    #[diagnostic(code(codegen::backend_unavailable))]
    BackendUnavailable,

    #[error("could not emit {what}: {reason}")]
    #[diagnostic(code(codegen::emit))]
    Emit { what: String, reason: String },
}

impl CodeGenError {
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CodeGenError::InternalCompilerError { .. }
                | CodeGenError::MissingFunctionDeclaration { .. }
        )
    }

    fn internal(reason: impl Into<String>, mark: &Mark) -> Self {
        CodeGenError::InternalCompilerError {
            reason: reason.into(),
            mark: mark.clone(),
        }
    }
}

/// Lower an analysed program to IR
pub fn generate(analysed: &AnalysedAst) -> Result<IrModule, CodeGenError> {
    let mut codegen = CodeGen::new(&analysed.main_module, &analysed.declarations);
    for module in &analysed.modules {
        codegen.emit_module(module)?;
    }
    let module = codegen.finish();

    tracing::debug!(
        module = %module.name,
        functions = module.defined_functions().count(),
        declarations = module.functions.len(),
        globals = module.globals.len(),
        "generated IR"
    );
    Ok(module)
}

/// Code generator state
pub struct CodeGen<'a> {
    decls: &'a DeclTable,
    module: IrModule,
    main_module: String,
    /// Emitting bodies for the current module
    defining: bool,
    /// Module constants to the name of their global
    globals: FxHashMap<DeclId, String>,
    /// Parameters and local constants of the function being emitted
    locals: FxHashMap<DeclId, Value>,
    /// Index of the function being emitted
    current: Option<usize>,
}

impl<'a> CodeGen<'a> {
    pub fn new(main_module: &str, decls: &'a DeclTable) -> Self {
        Self {
            decls,
            module: IrModule::new(main_module),
            main_module: main_module.to_string(),
            defining: false,
            globals: FxHashMap::default(),
            locals: FxHashMap::default(),
            current: None,
        }
    }

    pub fn finish(self) -> IrModule {
        self.module
    }

    pub fn emit_module(&mut self, module: &Expression) -> Result<(), CodeGenError> {
        let Expression::Module { name, body, .. } = module else {
            return Err(CodeGenError::internal(
                format!("expected a module, found {}", module.kind_name()),
                module.mark(),
            ));
        };

        self.defining = *name == self.main_module;
        if self.defining {
            // Module constants precede the bodies that read them
            for expr in body {
                if let Expression::Definition { declaration, body: value } = expr {
                    if let Expression::ConstantDeclaration(constant) = declaration.as_ref() {
                        self.emit_global_constant(constant, value)?;
                    }
                }
            }
        }
        for expr in body {
            self.emit_top_level(expr)?;
        }
        tracing::trace!(module = %name, defining = self.defining, "emitted module");
        Ok(())
    }

    fn emit_top_level(&mut self, expr: &Expression) -> Result<(), CodeGenError> {
        match expr {
            Expression::Definition { declaration, body } => match declaration.as_ref() {
                Expression::FunctionDeclaration(func) if self.defining => {
                    self.emit_function(func, body)
                }
                Expression::FunctionDeclaration(func) => self.declare_function(func).map(|_| ()),
                // Emitted ahead of the module's functions
                Expression::ConstantDeclaration(_) if self.defining => Ok(()),
                Expression::ConstantDeclaration(constant) => self.declare_external(constant),
                other => Err(CodeGenError::internal(
                    format!("definition of {}", other.kind_name()),
                    other.mark(),
                )),
            },
            Expression::FunctionDeclaration(func) => self.declare_function(func).map(|_| ()),
            Expression::ConstantDeclaration(constant) => self.declare_external(constant),
            Expression::LinkerFlag { .. } | Expression::Import { .. } => Ok(()),
            other => Err(CodeGenError::UnsupportedExpression {
                kind: other.kind_name(),
                context: "module scope",
                mark: other.mark().clone(),
            }),
        }
    }

    // ==================== FUNCTIONS ====================

    /// Emit a function signature, or reuse a matching one already in the module
    fn declare_function(&mut self, func: &FunctionDeclaration) -> Result<usize, CodeGenError> {
        let id = binding(func.binding, &func.name, &func.mark)?;
        let return_type = IrType::from_type(&func.return_type.ty);
        let params: Vec<IrParam> = func
            .parameters
            .iter()
            .map(|p| IrParam {
                name: p.name.clone(),
                ty: IrType::from_type(&p.ty.ty),
            })
            .collect();

        if let Some(index) = self.module.functions.iter().position(|f| f.name == func.name) {
            let existing = &self.module.functions[index];
            let matches = existing.return_type == return_type
                && existing.params.iter().map(|p| &p.ty).eq(params.iter().map(|p| &p.ty));
            if !matches {
                return Err(CodeGenError::ConflictingDeclaration {
                    name: func.name.clone(),
                    mark: func.mark.clone(),
                });
            }
            return Ok(index);
        }

        self.module
            .add_function(IrFunction::new(func.name.clone(), return_type, params));
        tracing::trace!(function = %func.name, decl = id.0, "declared function");
        Ok(self.module.functions.len() - 1)
    }

    fn emit_function(
        &mut self,
        func: &FunctionDeclaration,
        body: &Expression,
    ) -> Result<(), CodeGenError> {
        let index = self.declare_function(func)?;
        let Expression::Block {
            body: statements, ..
        } = body
        else {
            return Err(CodeGenError::internal(
                format!("function body is a {}", body.kind_name()),
                body.mark(),
            ));
        };
        if statements.is_empty() {
            return Ok(());
        }
        if !self.module.functions[index].is_declaration() {
            return Err(CodeGenError::DuplicateDefinition {
                name: func.name.clone(),
                mark: func.mark.clone(),
            });
        }

        self.module.functions[index].append_entry_block();
        let enclosing_locals = std::mem::take(&mut self.locals);
        let enclosing = self.current.replace(index);

        let result = self.emit_body(index, func, statements);

        self.current = enclosing;
        self.locals = enclosing_locals;
        result?;

        self.module.functions[index].seal();
        Ok(())
    }

    fn emit_body(
        &mut self,
        index: usize,
        func: &FunctionDeclaration,
        statements: &[Expression],
    ) -> Result<(), CodeGenError> {
        for (i, param) in func.parameters.iter().enumerate() {
            let id = binding(param.binding, &param.name, &param.mark)?;
            let value = self.module.functions[index]
                .param_value(i)
                .ok_or_else(|| CodeGenError::internal("parameter count changed", &param.mark))?;
            self.locals.insert(id, value);
        }

        for stmt in statements {
            if self.module.functions[index].is_terminated() {
                tracing::trace!(function = %func.name, "skipping unreachable statements");
                break;
            }
            self.emit_expression(stmt)?;
        }
        Ok(())
    }

    fn function_mut(&mut self, mark: &Mark) -> Result<&mut IrFunction, CodeGenError> {
        let index = self
            .current
            .ok_or_else(|| CodeGenError::internal("instruction outside of a function", mark))?;
        Ok(&mut self.module.functions[index])
    }

    fn push(&mut self, op: Op, ty: IrType, mark: &Mark) -> Result<Option<Value>, CodeGenError> {
        Ok(self.function_mut(mark)?.push(op, ty))
    }

    // ==================== CONSTANTS ====================

    fn emit_global_constant(
        &mut self,
        constant: &ConstantDeclaration,
        value: &Expression,
    ) -> Result<(), CodeGenError> {
        let id = binding(constant.binding, &constant.name, &constant.mark)?;
        match value {
            Expression::String { value, .. } => {
                self.module.add_string(constant.name.clone(), value);
            }
            Expression::Integer { value, .. } => {
                self.module.add_global(IrGlobal {
                    name: constant.name.clone(),
                    ty: IrType::from_type(&constant.ty.ty),
                    init: GlobalInit::Int(*value),
                });
            }
            Expression::Bool { value, .. } => {
                self.module.add_global(IrGlobal {
                    name: constant.name.clone(),
                    ty: IrType::I1,
                    init: GlobalInit::Int(*value as i64),
                });
            }
            _ => {
                return Err(CodeGenError::UnsupportedGlobalInitializer {
                    name: constant.name.clone(),
                    mark: constant.mark.clone(),
                });
            }
        }
        self.globals.insert(id, constant.name.clone());
        Ok(())
    }

    /// Module constant defined in another translation unit
    fn declare_external(&mut self, constant: &ConstantDeclaration) -> Result<(), CodeGenError> {
        let id = binding(constant.binding, &constant.name, &constant.mark)?;
        if self.module.find_global(&constant.name).is_none() {
            // Strings are defined as byte arrays of unknown length
            let ty = if is_string_storage(&constant.ty.ty) {
                IrType::Array(Box::new(IrType::I8), 0)
            } else {
                IrType::from_type(&constant.ty.ty)
            };
            self.module.add_global(IrGlobal {
                name: constant.name.clone(),
                ty,
                init: GlobalInit::External,
            });
        }
        self.globals.insert(id, constant.name.clone());
        Ok(())
    }

    // ==================== EXPRESSIONS ====================

    /// Emit an expression inside a function body, returning its value if any
    pub fn emit_expression(&mut self, expr: &Expression) -> Result<Option<Value>, CodeGenError> {
        match expr {
            Expression::Integer { value, .. } => Ok(Some(Value::int(IrType::I64, *value))),
            Expression::Bool { value, .. } => Ok(Some(Value::bool(*value))),
            Expression::String { value, mark } => {
                let global = self.module.add_string_literal(value);
                let array_ty = global.ty().element().cloned().unwrap_or(IrType::I8);
                self.push(
                    Op::ElementAddress {
                        array_ty,
                        ptr: global,
                    },
                    IrType::ptr(IrType::I8),
                    mark,
                )
            }

            Expression::BoundIdentifier { name, decl, mark, .. } => {
                self.emit_reference(name, *decl, mark).map(Some)
            }

            Expression::Call {
                callee,
                arguments,
                mark,
            } => self.emit_call(callee, arguments, mark),

            Expression::BinaryOperation { lhs, op, rhs, mark } => {
                let signed = lhs.value_type().is_signed();
                let lhs = self.emit_value(lhs)?;
                let rhs = self.emit_value(rhs)?;
                let ty = lhs.ty().clone();
                self.push(
                    Op::Binary {
                        op: lower_operator(*op, signed),
                        lhs,
                        rhs,
                    },
                    ty,
                    mark,
                )
            }

            Expression::Return { value, mark } => {
                let value = self.emit_expression(value)?;
                self.function_mut(mark)?.terminate(Terminator::Return(value));
                Ok(None)
            }
            Expression::VoidReturn { mark } => {
                self.function_mut(mark)?.terminate(Terminator::Return(None));
                Ok(None)
            }

            Expression::Definition { declaration, body } => match declaration.as_ref() {
                Expression::ConstantDeclaration(constant) => {
                    let id = binding(constant.binding, &constant.name, &constant.mark)?;
                    let value = self.emit_value(body)?;
                    self.locals.insert(id, value);
                    Ok(None)
                }
                other => Err(CodeGenError::UnsupportedExpression {
                    kind: other.kind_name(),
                    context: "a function body",
                    mark: other.mark().clone(),
                }),
            },
            // Declaration-only local; a later use is an error
            Expression::ConstantDeclaration(constant) => {
                binding(constant.binding, &constant.name, &constant.mark)?;
                Ok(None)
            }

            Expression::Block { body, .. } | Expression::Group { body, .. } => {
                let mut last = None;
                for expr in body {
                    last = self.emit_expression(expr)?;
                }
                Ok(last)
            }

            Expression::LinkerFlag { .. } | Expression::Import { .. } => Ok(None),

            Expression::Identifier { name, mark } => Err(CodeGenError::internal(
                format!("unbound identifier '{}' reached code generation", name),
                mark,
            )),

            Expression::Module { .. }
            | Expression::FunctionDeclaration(_)
            | Expression::ParameterDeclaration(_)
            | Expression::Type(_) => Err(CodeGenError::UnsupportedExpression {
                kind: expr.kind_name(),
                context: "a function body",
                mark: expr.mark().clone(),
            }),
        }
    }

    /// Emit an expression that must produce a value
    fn emit_value(&mut self, expr: &Expression) -> Result<Value, CodeGenError> {
        self.emit_expression(expr)?.ok_or_else(|| {
            CodeGenError::internal(
                format!("{} produced no value", expr.kind_name()),
                expr.mark(),
            )
        })
    }

    fn emit_reference(&mut self, name: &str, id: DeclId, mark: &Mark) -> Result<Value, CodeGenError> {
        if let Some(value) = self.locals.get(&id) {
            return Ok(value.clone());
        }

        let decl = self
            .decls
            .get(id)
            .ok_or_else(|| CodeGenError::internal(format!("no declaration for '{}'", name), mark))?;

        match &decl.kind {
            DeclKind::Constant { global: true } => {
                let global = self
                    .globals
                    .get(&id)
                    .and_then(|name| self.module.find_global(name))
                    .ok_or_else(|| {
                        CodeGenError::internal(format!("global '{}' was never emitted", name), mark)
                    })?;
                let (address, ty, is_array) = (global.address(), global.ty.clone(), global.is_array());

                let value = if is_array {
                    let elem = ty.element().cloned().unwrap_or(IrType::I8);
                    self.push(
                        Op::ElementAddress {
                            array_ty: ty,
                            ptr: address,
                        },
                        IrType::ptr(elem),
                        mark,
                    )?
                } else {
                    self.push(Op::Load { ty: ty.clone(), ptr: address }, ty, mark)?
                };
                value.ok_or_else(|| CodeGenError::internal("load produced no value", mark))
            }
            DeclKind::Constant { global: false } => Err(CodeGenError::UninitializedConstant {
                name: name.to_string(),
                mark: mark.clone(),
            }),
            DeclKind::Parameter { .. } => Err(CodeGenError::internal(
                format!("parameter '{}' used outside its function", name),
                mark,
            )),
            DeclKind::Function { .. } => Err(CodeGenError::internal(
                format!("function '{}' reached code generation as a value", name),
                mark,
            )),
        }
    }

    fn emit_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
        mark: &Mark,
    ) -> Result<Option<Value>, CodeGenError> {
        let Expression::BoundIdentifier { name, .. } = callee else {
            return Err(CodeGenError::internal(
                format!("call target is a {}", callee.kind_name()),
                callee.mark(),
            ));
        };

        let return_type = self
            .module
            .find_function(name)
            .map(|f| f.return_type.clone())
            .ok_or_else(|| CodeGenError::MissingFunctionDeclaration {
                name: name.clone(),
                mark: mark.clone(),
            })?;

        let args = arguments
            .iter()
            .map(|arg| self.emit_value(arg))
            .collect::<Result<Vec<_>, _>>()?;

        self.push(
            Op::Call {
                callee: name.clone(),
                return_type: return_type.clone(),
                args,
            },
            return_type,
            mark,
        )
    }
}

fn binding(binding: Option<DeclId>, name: &str, mark: &Mark) -> Result<DeclId, CodeGenError> {
    binding.ok_or_else(|| {
        CodeGenError::internal(format!("declaration '{}' was never analysed", name), mark)
    })
}

fn is_string_storage(ty: &Type) -> bool {
    ty.resolved_type() == Type::pointer(Type::Int8)
}

fn lower_operator(op: BinaryOperator, signed: bool) -> BinaryOp {
    match (op, signed) {
        (BinaryOperator::Add, _) => BinaryOp::Add,
        (BinaryOperator::Subtract, _) => BinaryOp::Sub,
        (BinaryOperator::Multiply, _) => BinaryOp::Mul,
        (BinaryOperator::Divide, true) => BinaryOp::SDiv,
        (BinaryOperator::Divide, false) => BinaryOp::UDiv,
        (BinaryOperator::Modulo, true) => BinaryOp::SRem,
        (BinaryOperator::Modulo, false) => BinaryOp::URem,
    }
}
