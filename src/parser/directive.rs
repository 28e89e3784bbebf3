use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::{Symbol, Token};

/// `@pragma(namespace, "value")`
pub(crate) struct DirectiveParser;

const LINKER_NAMESPACE: &str = "linker";

impl SubParser for DirectiveParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.test_sequence(
            &[Token::symbol(Symbol::At), Token::identifier("pragma")],
            false,
        )
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        let mark = parser.expect_symbol(Symbol::At)?;
        parser.expect(&Token::identifier("pragma"))?;
        parser.expect_symbol(Symbol::LeftParen)?;
        let (namespace, namespace_mark) = parser.expect_identifier()?;
        parser.expect_symbol(Symbol::Comma)?;
        let value = match parser.expect(&Token::any_string())? {
            Token::String { text, .. } => text,
            other => {
                return Err(ParseError::UnexpectedToken {
                    token: other.to_string(),
                    mark: other.mark().clone(),
                });
            }
        };
        parser.expect_symbol(Symbol::RightParen)?;

        if namespace != LINKER_NAMESPACE {
            return Err(ParseError::UnknownCompilerNamespace {
                namespace,
                mark: namespace_mark,
            });
        }

        tracing::trace!(flag = %value, "linker directive");
        Ok(Expression::LinkerFlag { flag: value, mark })
    }
}
