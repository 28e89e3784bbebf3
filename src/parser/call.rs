use super::group::parse_list;
use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::{Symbol, Token};

/// `name(arg, arg, ...)`
pub(crate) struct CallParser;

impl SubParser for CallParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.test_sequence(
            &[Token::identifier(""), Token::symbol(Symbol::LeftParen)],
            true,
        )
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        let (name, mark) = parser.expect_identifier()?;
        let (arguments, _) = parse_list(parser, |p| p.parse_expression())?;
        Ok(Expression::Call {
            callee: Box::new(Expression::Identifier {
                name,
                mark: mark.clone(),
            }),
            arguments,
            mark,
        })
    }
}
