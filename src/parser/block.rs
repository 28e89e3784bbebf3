use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::Symbol;

/// `{ statements }` with its own scope
pub(crate) struct BlockParser;

impl SubParser for BlockParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.next_is_symbol(Symbol::LeftBrace)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        let mark = parser.expect_symbol(Symbol::LeftBrace)?;
        parser.ast_mut().symbols.enter_scope();
        let body = parser.parse_statements_until_close()?;
        parser.ast_mut().symbols.leave_scope()?;
        Ok(Expression::Block { body, mark })
    }
}
