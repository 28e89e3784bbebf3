use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::Token;

/// A bare name; binding happens during analysis
pub(crate) struct IdentifierParser;

impl SubParser for IdentifierParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.peek().is_some_and(Token::is_identifier)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        let (name, mark) = parser.expect_identifier()?;
        Ok(Expression::Identifier { name, mark })
    }
}
