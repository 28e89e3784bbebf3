//! Function declarations and definitions
//!
//! The name is defined in the enclosing scope before the body is parsed so a
//! body may call its own function. Parameters live in a scope opened only for
//! the body.

use super::group::parse_list;
use super::types::{parse_angle_type, parse_type};
use super::{ParseError, Parser, SubParser};
use crate::ast::{Expression, FunctionDeclaration, ParameterDeclaration, SymbolKind};
use crate::lexer::{Keyword, Symbol};

pub(crate) struct FunctionParser;

impl SubParser for FunctionParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.next_is_keyword(Keyword::Func)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        parser.expect_keyword(Keyword::Func)?;
        let return_type = parse_angle_type(parser)?;
        let (name, mark) = parser.expect_identifier()?;
        let (parameters, _) = parse_list(parser, parse_parameter)?;
        let has_body = parser.next_is_symbol(Symbol::LeftBrace);

        parser.ast_mut().symbols.define(
            name.clone(),
            SymbolKind::Function,
            !has_body,
            mark.clone(),
        )?;

        if !has_body {
            return Ok(Expression::FunctionDeclaration(FunctionDeclaration {
                name,
                return_type,
                parameters,
                mark,
                binding: None,
            }));
        }

        let body_mark = parser.expect_symbol(Symbol::LeftBrace)?;
        parser.ast_mut().symbols.enter_scope();
        for param in &parameters {
            parser.ast_mut().symbols.define(
                param.name.clone(),
                SymbolKind::Parameter,
                false,
                param.mark.clone(),
            )?;
        }
        let body = parser.parse_statements_until_close()?;
        parser.ast_mut().symbols.leave_scope()?;

        tracing::trace!(function = %name, statements = body.len(), "parsed function");

        Ok(Expression::Definition {
            declaration: Box::new(Expression::FunctionDeclaration(FunctionDeclaration {
                name,
                return_type,
                parameters,
                mark,
                binding: None,
            })),
            body: Box::new(Expression::Block {
                body,
                mark: body_mark,
            }),
        })
    }
}

/// `name: Type`
fn parse_parameter(parser: &mut Parser<'_>) -> Result<ParameterDeclaration, ParseError> {
    let (name, mark) = parser.expect_identifier()?;
    parser.expect_symbol(Symbol::Colon)?;
    let ty = parse_type(parser)?;
    Ok(ParameterDeclaration {
        name,
        ty,
        mark,
        binding: None,
    })
}
