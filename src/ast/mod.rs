//! Abstract Syntax Tree for the Bolt language
//!
//! One recursive [`Expression`] type serves as both the parsed syntax tree and,
//! after semantic analysis, the bound tree. Analysis never mutates a parsed
//! node: it builds new nodes in which identifiers are replaced by
//! [`Expression::BoundIdentifier`] and declarations carry a [`DeclId`] into the
//! analyser's declaration table.

use crate::common::Mark;
use crate::symbols::SymbolTable;
use crate::types::Type;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Handle into the declaration table built by semantic analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

/// Type literal with its location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeNode {
    pub ty: Type,
    pub mark: Mark,
}

impl TypeNode {
    pub fn new(ty: Type, mark: Mark) -> Self {
        Self { ty, mark }
    }
}

/// `func<ReturnType> name(parameters)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub return_type: TypeNode,
    pub parameters: Vec<ParameterDeclaration>,
    pub mark: Mark,
    /// Filled in by semantic analysis
    pub binding: Option<DeclId>,
}

impl FunctionDeclaration {
    pub fn parameter_types(&self) -> impl Iterator<Item = &Type> {
        self.parameters.iter().map(|p| &p.ty.ty)
    }

    /// Same name, return type and parameter types
    pub fn same_signature(&self, other: &FunctionDeclaration) -> bool {
        self.name == other.name
            && self.return_type.ty == other.return_type.ty
            && self.parameter_types().eq(other.parameter_types())
    }
}

/// `name: Type`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDeclaration {
    pub name: String,
    pub ty: TypeNode,
    pub mark: Mark,
    pub binding: Option<DeclId>,
}

/// `let<Type> name`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantDeclaration {
    pub name: String,
    pub ty: TypeNode,
    pub mark: Mark,
    pub binding: Option<DeclId>,
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// AST node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    // Literals
    String { value: String, mark: Mark },
    Integer { value: i64, mark: Mark },
    Bool { value: bool, mark: Mark },

    // Sequences
    Module { name: String, body: Vec<Expression>, mark: Mark },
    Block { body: Vec<Expression>, mark: Mark },
    Group { body: Vec<Expression>, mark: Mark },

    /// A declaration paired with its body or initializer
    Definition {
        declaration: Box<Expression>,
        body: Box<Expression>,
    },

    // Declarations
    FunctionDeclaration(FunctionDeclaration),
    ParameterDeclaration(ParameterDeclaration),
    ConstantDeclaration(ConstantDeclaration),

    Type(TypeNode),

    // References
    Identifier { name: String, mark: Mark },
    BoundIdentifier {
        name: String,
        decl: DeclId,
        ty: Type,
        mark: Mark,
    },

    // Operations
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        mark: Mark,
    },
    BinaryOperation {
        lhs: Box<Expression>,
        op: BinaryOperator,
        rhs: Box<Expression>,
        mark: Mark,
    },
    Return { value: Box<Expression>, mark: Mark },
    VoidReturn { mark: Mark },

    // Directives, never part of the executable program
    LinkerFlag { flag: String, mark: Mark },
    Import { module: String, mark: Mark },
}

impl Expression {
    pub fn mark(&self) -> &Mark {
        match self {
            Expression::String { mark, .. }
            | Expression::Integer { mark, .. }
            | Expression::Bool { mark, .. }
            | Expression::Module { mark, .. }
            | Expression::Block { mark, .. }
            | Expression::Group { mark, .. }
            | Expression::Identifier { mark, .. }
            | Expression::BoundIdentifier { mark, .. }
            | Expression::Call { mark, .. }
            | Expression::BinaryOperation { mark, .. }
            | Expression::Return { mark, .. }
            | Expression::VoidReturn { mark }
            | Expression::LinkerFlag { mark, .. }
            | Expression::Import { mark, .. } => mark,
            Expression::Definition { declaration, .. } => declaration.mark(),
            Expression::FunctionDeclaration(f) => &f.mark,
            Expression::ParameterDeclaration(p) => &p.mark,
            Expression::ConstantDeclaration(c) => &c.mark,
            Expression::Type(t) => &t.mark,
        }
    }

    /// Type of the value this expression produces
    pub fn value_type(&self) -> Type {
        match self {
            Expression::String { .. } => Type::String,
            Expression::Integer { .. } => Type::Int,
            Expression::Bool { .. } => Type::Bool,
            Expression::Block { body, .. } | Expression::Group { body, .. } => body
                .last()
                .map(Expression::value_type)
                .unwrap_or(Type::None),
            Expression::Definition { declaration, .. } => declaration.value_type(),
            Expression::FunctionDeclaration(f) => f.return_type.ty.clone(),
            Expression::ParameterDeclaration(p) => p.ty.ty.clone(),
            Expression::ConstantDeclaration(c) => c.ty.ty.clone(),
            Expression::Type(t) => t.ty.clone(),
            Expression::BoundIdentifier { ty, .. } => ty.clone(),
            Expression::Call { callee, .. } => callee.value_type(),
            Expression::BinaryOperation { lhs, .. } => lhs.value_type(),
            Expression::Return { value, .. } => value.value_type(),
            Expression::Module { .. }
            | Expression::Identifier { .. }
            | Expression::VoidReturn { .. }
            | Expression::LinkerFlag { .. }
            | Expression::Import { .. } => Type::None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::String { .. } => "string literal",
            Expression::Integer { .. } => "integer literal",
            Expression::Bool { .. } => "bool literal",
            Expression::Module { .. } => "module",
            Expression::Block { .. } => "block",
            Expression::Group { .. } => "group",
            Expression::Definition { .. } => "definition",
            Expression::FunctionDeclaration(_) => "function declaration",
            Expression::ParameterDeclaration(_) => "parameter declaration",
            Expression::ConstantDeclaration(_) => "constant declaration",
            Expression::Type(_) => "type",
            Expression::Identifier { .. } => "identifier",
            Expression::BoundIdentifier { .. } => "bound identifier",
            Expression::Call { .. } => "call",
            Expression::BinaryOperation { .. } => "binary operation",
            Expression::Return { .. } => "return",
            Expression::VoidReturn { .. } => "return",
            Expression::LinkerFlag { .. } => "linker directive",
            Expression::Import { .. } => "import",
        }
    }

    /// Visit this expression and every nested expression, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Module { body, .. }
            | Expression::Block { body, .. }
            | Expression::Group { body, .. } => {
                for expr in body {
                    expr.walk(visit);
                }
            }
            Expression::Definition { declaration, body } => {
                declaration.walk(visit);
                body.walk(visit);
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                callee.walk(visit);
                for arg in arguments {
                    arg.walk(visit);
                }
            }
            Expression::BinaryOperation { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expression::Return { value, .. } => value.walk(visit),
            _ => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::String { value, .. } => write!(f, "\"{}\"", value),
            Expression::Integer { value, .. } => write!(f, "{}", value),
            Expression::Bool { value, .. } => write!(f, "{}", value),
            Expression::Identifier { name, .. } | Expression::BoundIdentifier { name, .. } => {
                write!(f, "{}", name)
            }
            Expression::FunctionDeclaration(func) => {
                write!(f, "func<{}> {}(", func.return_type.ty, func.name)?;
                for (i, p) in func.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.name, p.ty.ty)?;
                }
                write!(f, ")")
            }
            Expression::ParameterDeclaration(p) => write!(f, "{}: {}", p.name, p.ty.ty),
            Expression::ConstantDeclaration(c) => write!(f, "let<{}> {}", c.ty.ty, c.name),
            Expression::Type(t) => write!(f, "{}", t.ty),
            Expression::Call { callee, .. } => write!(f, "call to {}", callee),
            Expression::BinaryOperation { op, .. } => write!(f, "'{}' operation", op),
            other => write!(f, "{}", other.kind_name()),
        }
    }
}

/// What the parser knows about a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    Function,
    Parameter,
    Constant,
}

/// Parsed translation unit: the main module plus every module spliced in by
/// imports, and the symbol table populated while parsing.
#[derive(Debug, Clone, Serialize)]
pub struct Ast {
    pub main_module: String,
    /// Module name to its top-level expressions; imports precede importers
    pub modules: IndexMap<String, Vec<Expression>>,
    #[serde(skip)]
    pub symbols: SymbolTable<SymbolKind>,
}

impl Ast {
    pub fn new(main_module: impl Into<String>) -> Self {
        let main_module = main_module.into();
        let mut modules = IndexMap::new();
        modules.insert(main_module.clone(), Vec::new());
        Self {
            main_module,
            modules,
            symbols: SymbolTable::new(),
        }
    }

    /// Top-level expressions of the main module
    pub fn expressions(&self) -> &[Expression] {
        self.modules
            .get(&self.main_module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn push(&mut self, expr: Expression) {
        self.modules
            .entry(self.main_module.clone())
            .or_default()
            .push(expr);
    }

    /// Splice an imported AST into this one.
    ///
    /// Imported modules are placed ahead of the main module, keeping their own
    /// order; modules already present by name are skipped. The imported root
    /// symbols join this table's import layer.
    pub fn add_imported(&mut self, imported: Ast) {
        let main_body = self.modules.shift_remove(&self.main_module).unwrap_or_default();

        for (name, body) in imported.modules {
            if self.modules.contains_key(&name) || name == self.main_module {
                tracing::warn!(module = %name, "module already included, skipping");
                continue;
            }
            self.modules.insert(name, body);
        }
        self.modules.insert(self.main_module.clone(), main_body);

        let symbols = imported
            .symbols
            .imported_symbols()
            .chain(imported.symbols.root_symbols())
            .cloned()
            .collect::<Vec<_>>();
        self.symbols.import_symbols(symbols);
    }

    /// Linker flags collected from directives in every module
    pub fn linker_flags(&self) -> Vec<String> {
        self.modules
            .values()
            .flatten()
            .filter_map(|expr| match expr {
                Expression::LinkerFlag { flag, .. } => Some(flag.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every module wrapped as an [`Expression::Module`], imports first
    pub fn module_expressions(&self) -> Vec<Expression> {
        self.modules
            .iter()
            .map(|(name, body)| Expression::Module {
                name: name.clone(),
                body: body.clone(),
                mark: Mark::unknown(),
            })
            .collect()
    }
}
