//! Parser for the Bolt language
//!
//! A table-driven recursive descent parser. Each grammar rule is a
//! [`SubParser`] with a side-effect free `test` and a consuming `parse`. The
//! driver tries the rules of the active table in order and takes the first
//! whose `test` succeeds, so earlier rules win single-token ambiguities.
//!
//! Declarations are entered into the [`Ast`]'s symbol table while parsing so
//! that redefinitions surface early and imported modules can contribute their
//! root symbols.

mod binary;
mod block;
mod call;
mod constant;
mod directive;
mod function;
mod group;
mod identifier;
mod import;
mod literal;
mod ret;
mod types;

use crate::ast::{Ast, Expression};
use crate::common::{Mark, Scanner};
use crate::diagnostics::CompileError;
use crate::lexer::{Keyword, Symbol, Token, TokenStream};
use crate::source::FileError;
use crate::symbols::SymbolError;
use crate::types::TypeError;
use miette::Diagnostic;
use thiserror::Error;

/// Syntax error
#[derive(Error, Debug, Diagnostic)]
pub enum ParseError {
    #[error("{mark} -- unexpected {token}")]
    #[diagnostic(code(parse::unexpected_token))]
    UnexpectedToken { token: String, mark: Mark },

    #[error("{mark} -- expected {expected} but found {found}")]
    #[diagnostic(code(parse::expected))]
    Expected {
        expected: String,
        found: String,
        mark: Mark,
    },

    #[error("{mark} -- unexpected end of token stream")]
    #[diagnostic(code(parse::unexpected_eof))]
    UnexpectedEndOfTokenStream { mark: Mark },

    #[error("{mark} -- unknown compiler namespace '{namespace}'")]
    #[diagnostic(code(parse::unknown_namespace), help("the only namespace is `linker`"))]
    UnknownCompilerNamespace { namespace: String, mark: Mark },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(#[from] SymbolError),

    /// Compiling an imported module failed
    #[error(transparent)]
    #[diagnostic(code(parse::import))]
    Import(Box<CompileError>),
}

/// Resolves `import` statements to parsed modules
pub trait ModuleImporter {
    fn import(&mut self, name: &str, mark: &Mark) -> Result<Ast, CompileError>;
}

/// Importer for contexts without library paths; every import fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImports;

impl ModuleImporter for NoImports {
    fn import(&mut self, name: &str, mark: &Mark) -> Result<Ast, CompileError> {
        Err(FileError::ImportNotFound {
            name: name.to_string(),
            mark: mark.clone(),
        }
        .into())
    }
}

/// Parse a token stream into the AST of module `module_name`
pub fn parse(tokens: TokenStream, module_name: &str) -> Result<Ast, ParseError> {
    parse_with_importer(tokens, module_name, &mut NoImports)
}

/// Parse a token stream, resolving imports through `importer`
pub fn parse_with_importer(
    tokens: TokenStream,
    module_name: &str,
    importer: &mut dyn ModuleImporter,
) -> Result<Ast, ParseError> {
    Parser::new(tokens, module_name, importer).parse_module()
}

/// A grammar rule
pub(crate) trait SubParser: Sync {
    /// Fixed-lookahead check; never consumes
    fn test(&self, parser: &Parser<'_>) -> bool;

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError>;
}

/// Rules valid at module level
const ROOT_PARSERS: &[&dyn SubParser] = &[
    &function::FunctionParser,
    &import::ImportParser,
    &directive::DirectiveParser,
    &constant::ConstantParser,
];

/// Statements valid inside a body
const STATEMENT_PARSERS: &[&dyn SubParser] = &[&ret::ReturnParser, &constant::ConstantParser];

/// Operands of an expression; calls must precede identifiers
const PRIMARY_PARSERS: &[&dyn SubParser] = &[
    &literal::LiteralParser,
    &call::CallParser,
    &identifier::IdentifierParser,
    &block::BlockParser,
    &group::GroupParser,
];

/// Parser state
pub struct Parser<'a> {
    scanner: Scanner<Token>,
    ast: Ast,
    importer: &'a mut dyn ModuleImporter,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: TokenStream, module_name: &str, importer: &'a mut dyn ModuleImporter) -> Self {
        Self {
            scanner: Scanner::new(tokens.into_tokens()),
            ast: Ast::new(module_name),
            importer,
        }
    }

    /// Parse every root-level construct until the tokens run out
    pub fn parse_module(mut self) -> Result<Ast, ParseError> {
        while self.scanner.is_available() {
            let expr = self.parse_with(ROOT_PARSERS)?;
            self.ast.push(expr);
        }

        if !self.ast.symbols.at_root() {
            return Err(SymbolError::LeaveRootScope.into());
        }

        tracing::debug!(
            module = %self.ast.main_module,
            expressions = self.ast.expressions().len(),
            modules = self.ast.modules.len(),
            "parsed module"
        );
        Ok(self.ast)
    }

    /// Apply the first rule of `table` whose test passes
    fn parse_with(&mut self, table: &[&dyn SubParser]) -> Result<Expression, ParseError> {
        match table.iter().find(|rule| rule.test(self)) {
            Some(rule) => rule.parse(self),
            None => Err(self.unexpected()),
        }
    }

    fn any_matches(&self, table: &[&dyn SubParser]) -> bool {
        table.iter().any(|rule| rule.test(self))
    }

    /// A statement inside a function body or block
    pub(crate) fn parse_statement(&mut self) -> Result<Expression, ParseError> {
        if self.any_matches(STATEMENT_PARSERS) {
            self.parse_with(STATEMENT_PARSERS)
        } else {
            self.parse_expression()
        }
    }

    /// An operand optionally followed by binary operators
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_primary()?;
        binary::parse_binary_rhs(self, lhs, 0)
    }

    pub(crate) fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        self.parse_with(PRIMARY_PARSERS)
    }

    /// Whether the next token can begin an expression
    pub(crate) fn at_expression_start(&self) -> bool {
        self.any_matches(PRIMARY_PARSERS)
    }

    /// Statements up to and including the closing `}`
    pub(crate) fn parse_statements_until_close(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(token) if token.is_symbol(Symbol::RightBrace) => {
                    self.advance()?;
                    return Ok(body);
                }
                Some(_) => body.push(self.parse_statement()?),
                None => return Err(self.end_of_stream()),
            }
        }
    }

    // ==================== TOKENS ====================

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.scanner.peek()
    }

    /// Whether the upcoming tokens match `templates` in order
    pub(crate) fn test_sequence(&self, templates: &[Token], weak_identifier: bool) -> bool {
        match self.scanner.peek_slice(templates.len()) {
            Some(window) => window
                .iter()
                .zip(templates)
                .all(|(token, template)| token.matches(template, weak_identifier)),
            None => false,
        }
    }

    pub(crate) fn next_is_symbol(&self, symbol: Symbol) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    pub(crate) fn next_is_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub(crate) fn advance(&mut self) -> Result<Token, ParseError> {
        match self.scanner.advance() {
            Some(token) => Ok(token.clone()),
            None => Err(self.end_of_stream()),
        }
    }

    /// Consume a token matching `template` exactly
    pub(crate) fn expect(&mut self, template: &Token) -> Result<Token, ParseError> {
        match self.peek() {
            Some(token) if token.matches(template, false) => self.advance(),
            Some(token) => Err(ParseError::Expected {
                expected: expected_name(template),
                found: token.to_string(),
                mark: token.mark().clone(),
            }),
            None => Err(self.end_of_stream()),
        }
    }

    pub(crate) fn expect_symbol(&mut self, symbol: Symbol) -> Result<Mark, ParseError> {
        self.expect(&Token::symbol(symbol)).map(|t| t.mark().clone())
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<Mark, ParseError> {
        self.expect(&Token::keyword(keyword)).map(|t| t.mark().clone())
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Mark), ParseError> {
        match self.peek() {
            Some(Token::Identifier { text, mark }) => {
                let result = (text.clone(), mark.clone());
                self.advance()?;
                Ok(result)
            }
            Some(token) => Err(ParseError::Expected {
                expected: "identifier".to_string(),
                found: token.to_string(),
                mark: token.mark().clone(),
            }),
            None => Err(self.end_of_stream()),
        }
    }

    // ==================== ERRORS ====================

    /// Mark of the last token, for errors at the end of input
    fn last_mark(&self) -> Mark {
        self.scanner
            .last()
            .map(|t| t.mark().clone())
            .unwrap_or_default()
    }

    pub(crate) fn end_of_stream(&self) -> ParseError {
        ParseError::UnexpectedEndOfTokenStream {
            mark: self.last_mark(),
        }
    }

    pub(crate) fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                token: token.to_string(),
                mark: token.mark().clone(),
            },
            None => self.end_of_stream(),
        }
    }

    // ==================== STATE ====================

    pub(crate) fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    pub(crate) fn import_module(&mut self, name: &str, mark: &Mark) -> Result<Ast, ParseError> {
        self.importer
            .import(name, mark)
            .map_err(|err| ParseError::Import(Box::new(err)))
    }
}

fn expected_name(template: &Token) -> String {
    match template {
        Token::String { .. } => "string literal".to_string(),
        Token::Integer { .. } => "integer literal".to_string(),
        Token::Float { .. } => "float literal".to_string(),
        other => other.to_string(),
    }
}
