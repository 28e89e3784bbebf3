use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::Keyword;

/// `return expr` or a bare `return`
pub(crate) struct ReturnParser;

impl SubParser for ReturnParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.next_is_keyword(Keyword::Return)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        let mark = parser.expect_keyword(Keyword::Return)?;
        if !parser.at_expression_start() {
            return Ok(Expression::VoidReturn { mark });
        }
        let value = parser.parse_expression()?;
        Ok(Expression::Return {
            value: Box::new(value),
            mark,
        })
    }
}
