//! Comma-delimited lists in parentheses

use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::common::Mark;
use crate::lexer::Symbol;

/// Parse `( item, item, ... )` with `item` parsing one element.
///
/// A trailing comma or a missing `)` is an error.
pub(crate) fn parse_list<T>(
    parser: &mut Parser<'_>,
    mut item: impl FnMut(&mut Parser<'_>) -> Result<T, ParseError>,
) -> Result<(Vec<T>, Mark), ParseError> {
    let mark = parser.expect_symbol(Symbol::LeftParen)?;
    let mut items = Vec::new();

    if parser.next_is_symbol(Symbol::RightParen) {
        parser.advance()?;
        return Ok((items, mark));
    }

    loop {
        items.push(item(parser)?);
        if parser.next_is_symbol(Symbol::Comma) {
            parser.advance()?;
            continue;
        }
        parser.expect_symbol(Symbol::RightParen)?;
        return Ok((items, mark));
    }
}

/// Parenthesised expressions, e.g. `(a + b)`
pub(crate) struct GroupParser;

impl SubParser for GroupParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.next_is_symbol(Symbol::LeftParen)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        let (body, mark) = parse_list(parser, |p| p.parse_expression())?;
        Ok(Expression::Group { body, mark })
    }
}
