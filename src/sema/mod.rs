//! Semantic analysis
//!
//! Binds every identifier to its declaration and type-checks the program.
//! Analysis consumes the parsed tree by reference and builds a new one; each
//! module is checked against a fresh symbol table seeded only with the root
//! symbols of the modules it imports.

mod decls;

pub use decls::{DeclId, DeclKind, DeclTable, Declaration};

use crate::ast::{
    Ast, BinaryOperator, ConstantDeclaration, Expression, FunctionDeclaration,
    ParameterDeclaration,
};
use crate::common::Mark;
use crate::symbols::{Symbol, SymbolError, SymbolTable};
use crate::types::Type;
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Semantic error
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SemaError {
    #[error("{mark} -- unknown identifier '{name}'")]
    #[diagnostic(code(sema::unknown_identifier))]
    UnknownIdentifier { name: String, mark: Mark },

    #[error("{mark} -- type mismatch: expected {expected}, got {got}")]
    #[diagnostic(code(sema::type_mismatch))]
    TypeMismatch { expected: Type, got: Type, mark: Mark },

    #[error("{mark} -- illegal storage type {got}")]
    #[diagnostic(code(sema::illegal_storage_type), help("`None` cannot hold a value"))]
    IllegalStorageType { got: Type, mark: Mark },

    #[error("{mark} -- argument {index} has type {got}, expected {expected}")]
    #[diagnostic(code(sema::argument_type_mismatch))]
    ArgumentTypeMismatch {
        expected: Type,
        got: Type,
        index: usize,
        mark: Mark,
    },

    #[error("{mark} -- incorrect argument count: expected {expected}, got {got}")]
    #[diagnostic(code(sema::incorrect_argument_count))]
    IncorrectArgumentCount {
        expected: usize,
        got: usize,
        mark: Mark,
    },

    #[error("{mark} -- expected a function identifier, got {got}")]
    #[diagnostic(code(sema::expected_function_identifier))]
    ExpectedFunctionIdentifier { got: String, mark: Mark },

    #[error("{mark} -- expected {expected}, got {got}")]
    #[diagnostic(code(sema::unexpected_expression))]
    UnexpectedExpression {
        expected: &'static str,
        got: String,
        mark: Mark,
    },

    #[error("{mark} -- redefinition of '{name}' (first defined at {first})")]
    #[diagnostic(code(sema::redefinition))]
    Redefinition { name: String, mark: Mark, first: Mark },

    #[error("{mark} -- '{name}' conflicts with the imported declaration at {first}")]
    #[diagnostic(
        code(sema::conflicting_import),
        help("a module-level name may only redeclare an import with the same kind and type")
    )]
    ConflictingImport { name: String, mark: Mark, first: Mark },

    #[error("{mark} -- return outside of a function")]
    #[diagnostic(code(sema::return_outside_function))]
    ReturnOutsideFunction { mark: Mark },

    #[error("{mark} -- module '{name}' was imported but never parsed")]
    #[diagnostic(code(sema::unknown_module))]
    UnknownModule { name: String, mark: Mark },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(SymbolError),
}

impl From<SymbolError> for SemaError {
    fn from(err: SymbolError) -> Self {
        match err {
            SymbolError::Redefinition { name, mark, first } => {
                SemaError::Redefinition { name, mark, first }
            }
            other => SemaError::Symbol(other),
        }
    }
}

/// Fully bound and type-checked program
#[derive(Debug, Clone, Serialize)]
pub struct AnalysedAst {
    pub main_module: String,
    /// One [`Expression::Module`] per module, imports first
    pub modules: Vec<Expression>,
    pub declarations: DeclTable,
    pub linker_flags: Vec<String>,
}

impl AnalysedAst {
    /// Body of the named module
    pub fn module(&self, name: &str) -> Option<&[Expression]> {
        self.modules.iter().find_map(|m| match m {
            Expression::Module { name: n, body, .. } if n == name => Some(body.as_slice()),
            _ => None,
        })
    }

    /// Visit every node of every module
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        for module in &self.modules {
            module.walk(visit);
        }
    }
}

/// Analyse a parsed AST
pub fn analyse(ast: &Ast) -> Result<AnalysedAst, SemaError> {
    let mut sema = Sema::new();
    let mut modules = Vec::with_capacity(ast.modules.len());
    for (name, body) in &ast.modules {
        modules.push(sema.analyse_module(name, body)?);
    }

    tracing::debug!(
        module = %ast.main_module,
        declarations = sema.decls.len(),
        "analysed program"
    );

    Ok(AnalysedAst {
        main_module: ast.main_module.clone(),
        modules,
        declarations: sema.decls,
        linker_flags: ast.linker_flags(),
    })
}

/// Analyser state
pub struct Sema {
    symbols: SymbolTable<DeclId>,
    decls: DeclTable,
    /// Root symbols each analysed module exposes to importers
    exports: IndexMap<String, Vec<Symbol<DeclId>>>,
    current_module: String,
    current_function: Option<DeclId>,
}

impl Sema {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            decls: DeclTable::new(),
            exports: IndexMap::new(),
            current_module: String::new(),
            current_function: None,
        }
    }

    pub fn declarations(&self) -> &DeclTable {
        &self.decls
    }

    /// Analyse one module's top-level expressions
    pub fn analyse_module(
        &mut self,
        name: &str,
        body: &[Expression],
    ) -> Result<Expression, SemaError> {
        self.symbols = SymbolTable::new();
        self.current_module = name.to_string();
        self.current_function = None;

        for expr in body {
            if let Expression::Import { module, mark } = expr {
                let exported = self
                    .exports
                    .get(module)
                    .ok_or_else(|| SemaError::UnknownModule {
                        name: module.clone(),
                        mark: mark.clone(),
                    })?
                    .clone();
                self.symbols.import_symbols(exported);
            }
        }

        let body = body
            .iter()
            .map(|expr| self.analyse_expression(expr))
            .collect::<Result<Vec<_>, _>>()?;

        if !self.symbols.at_root() {
            return Err(SymbolError::LeaveRootScope.into());
        }

        let exported = self
            .symbols
            .root_symbols()
            .chain(self.symbols.imported_symbols())
            .cloned()
            .collect();
        self.exports.insert(name.to_string(), exported);

        tracing::trace!(module = %name, expressions = body.len(), "analysed module");
        Ok(Expression::Module {
            name: name.to_string(),
            body,
            mark: Mark::unknown(),
        })
    }

    pub fn analyse_expression(&mut self, expr: &Expression) -> Result<Expression, SemaError> {
        match expr {
            Expression::Identifier { name, mark } => self.bind_identifier(name, mark),

            Expression::Definition { declaration, body } => match declaration.as_ref() {
                Expression::FunctionDeclaration(func) => self.analyse_function(func, Some(body)),
                Expression::ConstantDeclaration(constant) => {
                    self.analyse_constant(constant, Some(body))
                }
                other => Err(SemaError::UnexpectedExpression {
                    expected: "function or constant declaration",
                    got: other.to_string(),
                    mark: other.mark().clone(),
                }),
            },
            Expression::FunctionDeclaration(func) => self.analyse_function(func, None),
            Expression::ConstantDeclaration(constant) => self.analyse_constant(constant, None),
            Expression::ParameterDeclaration(param) => Err(SemaError::UnexpectedExpression {
                expected: "function or constant declaration",
                got: expr.to_string(),
                mark: param.mark.clone(),
            }),

            Expression::Block { body, mark } => {
                self.symbols.enter_scope();
                let body = self.analyse_all(body)?;
                self.symbols.leave_scope()?;
                Ok(Expression::Block {
                    body,
                    mark: mark.clone(),
                })
            }
            Expression::Group { body, mark } => Ok(Expression::Group {
                body: self.analyse_all(body)?,
                mark: mark.clone(),
            }),
            Expression::Module { name, body, .. } => self.analyse_module(name, body),

            Expression::Call {
                callee,
                arguments,
                mark,
            } => self.analyse_call(callee, arguments, mark),
            Expression::BinaryOperation { lhs, op, rhs, mark } => {
                self.analyse_binary(lhs, *op, rhs, mark)
            }
            Expression::Return { value, mark } => self.analyse_return(value, mark),
            Expression::VoidReturn { mark } => self.analyse_void_return(mark),

            // Inert: literals, already bound references, directives
            Expression::String { .. }
            | Expression::Integer { .. }
            | Expression::Bool { .. }
            | Expression::Type(_)
            | Expression::BoundIdentifier { .. }
            | Expression::LinkerFlag { .. }
            | Expression::Import { .. } => Ok(expr.clone()),
        }
    }

    fn analyse_all(&mut self, exprs: &[Expression]) -> Result<Vec<Expression>, SemaError> {
        exprs.iter().map(|e| self.analyse_expression(e)).collect()
    }

    // ==================== REFERENCES ====================

    fn bind_identifier(&self, name: &str, mark: &Mark) -> Result<Expression, SemaError> {
        let symbol = self
            .symbols
            .lookup(name)
            .ok_or_else(|| SemaError::UnknownIdentifier {
                name: name.to_string(),
                mark: mark.clone(),
            })?;
        let decl = &self.decls[symbol.value];
        if let DeclKind::Function { .. } = decl.kind {
            // Functions are only ever called
            return Err(SemaError::UnexpectedExpression {
                expected: "a value",
                got: format!("function '{}'", name),
                mark: mark.clone(),
            });
        }

        Ok(Expression::BoundIdentifier {
            name: name.to_string(),
            decl: decl.id,
            ty: decl.ty.clone(),
            mark: mark.clone(),
        })
    }

    // ==================== DECLARATIONS ====================

    fn analyse_function(
        &mut self,
        func: &FunctionDeclaration,
        body: Option<&Expression>,
    ) -> Result<Expression, SemaError> {
        for param in &func.parameters {
            check_storage(&param.ty.ty, &param.mark)?;
        }

        let id = self.declare_function(func, body.is_some())?;

        let Some(body) = body else {
            return Ok(Expression::FunctionDeclaration(FunctionDeclaration {
                binding: Some(id),
                ..func.clone()
            }));
        };

        let statements = match body {
            Expression::Block { body, .. } => body.as_slice(),
            other => {
                return Err(SemaError::UnexpectedExpression {
                    expected: "function body",
                    got: other.to_string(),
                    mark: other.mark().clone(),
                });
            }
        };

        self.symbols.enter_scope();
        let mut parameters = Vec::with_capacity(func.parameters.len());
        for (index, param) in func.parameters.iter().enumerate() {
            let param_id = self.decls.push(
                &param.name,
                param.ty.ty.clone(),
                DeclKind::Parameter {
                    function: id,
                    index,
                },
                false,
                &self.current_module,
                param.mark.clone(),
            );
            self.symbols
                .define(&param.name, param_id, false, param.mark.clone())?;
            parameters.push(ParameterDeclaration {
                binding: Some(param_id),
                ..param.clone()
            });
        }

        let enclosing = self.current_function.replace(id);
        let analysed = self.analyse_all(statements);
        self.current_function = enclosing;
        let analysed = analysed?;
        self.symbols.leave_scope()?;

        tracing::trace!(function = %func.name, id = id.0, "analysed function");

        Ok(Expression::Definition {
            declaration: Box::new(Expression::FunctionDeclaration(FunctionDeclaration {
                name: func.name.clone(),
                return_type: func.return_type.clone(),
                parameters,
                mark: func.mark.clone(),
                binding: Some(id),
            })),
            body: Box::new(Expression::Block {
                body: analysed,
                mark: body.mark().clone(),
            }),
        })
    }

    /// Define the function's name before its body is analysed, completing an
    /// earlier body-less declaration with the same signature.
    fn declare_function(
        &mut self,
        func: &FunctionDeclaration,
        has_body: bool,
    ) -> Result<DeclId, SemaError> {
        let kind = DeclKind::Function {
            parameters: func.parameter_types().cloned().collect(),
            return_type: func.return_type.ty.clone(),
        };
        self.check_imported(&func.name, &kind, &func.return_type.ty, &func.mark)?;

        if let Some(existing) = self.symbols.lookup_local(&func.name) {
            let same_signature = self.decls[existing.value].kind == kind;
            if existing.declaration_only && has_body && same_signature {
                let id = existing.value;
                self.symbols.define(&func.name, id, false, func.mark.clone())?;
                if let Some(decl) = self.decls.get_mut(id) {
                    decl.declaration_only = false;
                }
                return Ok(id);
            }
            return Err(SemaError::Redefinition {
                name: func.name.clone(),
                mark: func.mark.clone(),
                first: existing.mark.clone(),
            });
        }

        let id = self.decls.push(
            &func.name,
            func.return_type.ty.clone(),
            kind,
            !has_body,
            &self.current_module,
            func.mark.clone(),
        );
        self.symbols
            .define(&func.name, id, !has_body, func.mark.clone())?;
        Ok(id)
    }

    fn analyse_constant(
        &mut self,
        constant: &ConstantDeclaration,
        value: Option<&Expression>,
    ) -> Result<Expression, SemaError> {
        check_storage(&constant.ty.ty, &constant.mark)?;

        let value = value.map(|v| self.analyse_expression(v)).transpose()?;
        if let Some(value) = &value {
            let got = value.value_type();
            if got.resolved_type() != constant.ty.ty.resolved_type() {
                return Err(SemaError::TypeMismatch {
                    expected: constant.ty.ty.clone(),
                    got,
                    mark: value.mark().clone(),
                });
            }
        }

        let global = self.current_function.is_none() && self.symbols.at_root();
        if global {
            let kind = DeclKind::Constant { global };
            self.check_imported(&constant.name, &kind, &constant.ty.ty, &constant.mark)?;
        }
        let id = match self.completed_constant(constant, global, value.is_some())? {
            Some(id) => id,
            None => self.decls.push(
                &constant.name,
                constant.ty.ty.clone(),
                DeclKind::Constant { global },
                value.is_none(),
                &self.current_module,
                constant.mark.clone(),
            ),
        };
        self.symbols
            .define(&constant.name, id, value.is_none(), constant.mark.clone())?;

        let declaration = Expression::ConstantDeclaration(ConstantDeclaration {
            binding: Some(id),
            ..constant.clone()
        });
        Ok(match value {
            Some(value) => Expression::Definition {
                declaration: Box::new(declaration),
                body: Box::new(value),
            },
            None => declaration,
        })
    }

    /// A module-level name an import already provides must keep its kind and type
    fn check_imported(
        &self,
        name: &str,
        kind: &DeclKind,
        ty: &Type,
        mark: &Mark,
    ) -> Result<(), SemaError> {
        let Some(imported) = self.symbols.lookup_imported(name) else {
            return Ok(());
        };
        let prior = &self.decls[imported.value];
        if prior.kind == *kind && prior.ty == *ty {
            return Ok(());
        }
        Err(SemaError::ConflictingImport {
            name: name.to_string(),
            mark: mark.clone(),
            first: imported.mark.clone(),
        })
    }

    /// An earlier `let<T> name` in this scope that this definition completes.
    ///
    /// Only an initialized constant of the same type may complete it; any
    /// other reuse of the name is a redefinition.
    fn completed_constant(
        &mut self,
        constant: &ConstantDeclaration,
        global: bool,
        has_value: bool,
    ) -> Result<Option<DeclId>, SemaError> {
        let Some(existing) = self.symbols.lookup_local(&constant.name) else {
            return Ok(None);
        };
        let prior = &self.decls[existing.value];
        let completes = existing.declaration_only
            && has_value
            && prior.kind == (DeclKind::Constant { global })
            && prior.ty == constant.ty.ty;
        if !completes {
            return Err(SemaError::Redefinition {
                name: constant.name.clone(),
                mark: constant.mark.clone(),
                first: existing.mark.clone(),
            });
        }

        let id = existing.value;
        if let Some(decl) = self.decls.get_mut(id) {
            decl.declaration_only = false;
        }
        Ok(Some(id))
    }

    // ==================== OPERATIONS ====================

    fn analyse_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
        mark: &Mark,
    ) -> Result<Expression, SemaError> {
        let Expression::Identifier { name, mark: callee_mark } = callee else {
            return Err(SemaError::ExpectedFunctionIdentifier {
                got: callee.to_string(),
                mark: callee.mark().clone(),
            });
        };

        let symbol = self
            .symbols
            .lookup(name)
            .ok_or_else(|| SemaError::UnknownIdentifier {
                name: name.clone(),
                mark: callee_mark.clone(),
            })?;
        let decl = &self.decls[symbol.value];
        let DeclKind::Function {
            parameters,
            return_type,
        } = &decl.kind
        else {
            return Err(SemaError::ExpectedFunctionIdentifier {
                got: format!("identifier '{}'", name),
                mark: callee_mark.clone(),
            });
        };
        let (decl_id, parameters, return_type) = (decl.id, parameters.clone(), return_type.clone());

        if parameters.len() != arguments.len() {
            return Err(SemaError::IncorrectArgumentCount {
                expected: parameters.len(),
                got: arguments.len(),
                mark: mark.clone(),
            });
        }

        let arguments = self.analyse_all(arguments)?;
        for (index, (expected, argument)) in parameters.iter().zip(&arguments).enumerate() {
            let got = argument.value_type();
            if got.resolved_type() != expected.resolved_type() {
                return Err(SemaError::ArgumentTypeMismatch {
                    expected: expected.clone(),
                    got,
                    index,
                    mark: argument.mark().clone(),
                });
            }
        }

        Ok(Expression::Call {
            callee: Box::new(Expression::BoundIdentifier {
                name: name.clone(),
                decl: decl_id,
                ty: return_type,
                mark: callee_mark.clone(),
            }),
            arguments,
            mark: mark.clone(),
        })
    }

    fn analyse_binary(
        &mut self,
        lhs: &Expression,
        op: BinaryOperator,
        rhs: &Expression,
        mark: &Mark,
    ) -> Result<Expression, SemaError> {
        let lhs = self.analyse_expression(lhs)?;
        let rhs = self.analyse_expression(rhs)?;

        if let (
            BinaryOperator::Add,
            Expression::Integer { value: a, .. },
            Expression::Integer { value: b, .. },
        ) = (op, &lhs, &rhs)
        {
            if let Some(value) = a.checked_add(*b) {
                return Ok(Expression::Integer {
                    value,
                    mark: mark.clone(),
                });
            }
        }

        let (lt, rt) = (lhs.value_type(), rhs.value_type());
        check_storage(&lt, lhs.mark())?;
        check_storage(&rt, rhs.mark())?;
        if !lt.is_compatible_with(&rt) {
            return Err(SemaError::TypeMismatch {
                expected: lt,
                got: rt,
                mark: rhs.mark().clone(),
            });
        }
        if !lt.is_integer() {
            return Err(SemaError::TypeMismatch {
                expected: Type::Int,
                got: lt,
                mark: mark.clone(),
            });
        }

        Ok(Expression::BinaryOperation {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            mark: mark.clone(),
        })
    }

    fn function_return_type(&self, mark: &Mark) -> Result<Type, SemaError> {
        let id = self
            .current_function
            .ok_or_else(|| SemaError::ReturnOutsideFunction { mark: mark.clone() })?;
        Ok(self.decls[id].ty.clone())
    }

    fn analyse_return(&mut self, value: &Expression, mark: &Mark) -> Result<Expression, SemaError> {
        let expected = self.function_return_type(mark)?;
        let value = self.analyse_expression(value)?;
        let got = value.value_type();
        if !got.is_compatible_with(&expected) {
            return Err(SemaError::TypeMismatch {
                expected,
                got,
                mark: value.mark().clone(),
            });
        }
        Ok(Expression::Return {
            value: Box::new(value),
            mark: mark.clone(),
        })
    }

    fn analyse_void_return(&self, mark: &Mark) -> Result<Expression, SemaError> {
        let expected = self.function_return_type(mark)?;
        if expected != Type::None {
            return Err(SemaError::TypeMismatch {
                expected,
                got: Type::None,
                mark: mark.clone(),
            });
        }
        Ok(Expression::VoidReturn { mark: mark.clone() })
    }
}

impl Default for Sema {
    fn default() -> Self {
        Self::new()
    }
}

fn check_storage(ty: &Type, mark: &Mark) -> Result<(), SemaError> {
    if ty.is_valid_storage_type() {
        Ok(())
    } else {
        Err(SemaError::IllegalStorageType {
            got: ty.clone(),
            mark: mark.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex_str;
    use crate::parser::parse;

    fn analyse_src(src: &str) -> Result<AnalysedAst, SemaError> {
        let ast = parse(lex_str(src).unwrap(), "test").unwrap();
        analyse(&ast)
    }

    #[test]
    fn test_parameter_declarations_are_bound() {
        let analysed = analyse_src("func<Int> id(x: Int) { return x }").unwrap();
        let params = analysed
            .declarations
            .iter()
            .filter(|d| matches!(d.kind, DeclKind::Parameter { .. }))
            .count();
        assert_eq!(params, 1);
    }

    #[test]
    fn test_none_parameter_is_illegal() {
        assert!(matches!(
            analyse_src("func<Int> f(x: None) { return 0 }"),
            Err(SemaError::IllegalStorageType { .. })
        ));
    }

    #[test]
    fn test_global_constant_flag() {
        let analysed = analyse_src("let<Int> g = 1\nfunc<Int> f() { let<Int> l = 2\nreturn l }").unwrap();
        let kinds: Vec<_> = analysed
            .declarations
            .iter()
            .filter_map(|d| match d.kind {
                DeclKind::Constant { global } => Some((d.name.as_str(), global)),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![("g", true), ("l", false)]);
    }

    #[test]
    fn test_sibling_module_without_import_cannot_see_symbols() {
        let mut sema = Sema::new();
        let provider = parse(lex_str("let<Int> x").unwrap(), "provider").unwrap();
        sema.analyse_module("provider", provider.expressions()).unwrap();

        let user = parse(lex_str("func<Int> f() { return x }").unwrap(), "user").unwrap();
        assert!(matches!(
            sema.analyse_module("user", user.expressions()),
            Err(SemaError::UnknownIdentifier { .. })
        ));
    }
}
