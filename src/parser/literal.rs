//! String, integer and bool literals

use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::{Keyword, Token};

pub(crate) struct LiteralParser;

impl SubParser for LiteralParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        matches!(
            parser.peek(),
            Some(Token::String { .. } | Token::Integer { .. })
        ) || parser.next_is_keyword(Keyword::True)
            || parser.next_is_keyword(Keyword::False)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        match parser.advance()? {
            Token::String { text, mark } => Ok(Expression::String { value: text, mark }),
            Token::Integer { value, mark, .. } => Ok(Expression::Integer { value, mark }),
            Token::Keyword {
                keyword: Keyword::True,
                mark,
            } => Ok(Expression::Bool { value: true, mark }),
            Token::Keyword {
                keyword: Keyword::False,
                mark,
            } => Ok(Expression::Bool { value: false, mark }),
            other => Err(ParseError::UnexpectedToken {
                token: other.to_string(),
                mark: other.mark().clone(),
            }),
        }
    }
}
