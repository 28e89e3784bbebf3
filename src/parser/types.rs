//! Type expressions: a base type name followed by any number of `*`

use super::{ParseError, Parser};
use crate::ast::TypeNode;
use crate::lexer::{Symbol, Token};
use crate::types::{Type, TypeError};

/// Consume a type greedily and resolve it
pub(crate) fn parse_type(parser: &mut Parser<'_>) -> Result<TypeNode, ParseError> {
    let base = match parser.peek() {
        Some(token @ Token::Identifier { .. }) => token.clone(),
        Some(token) => {
            return Err(TypeError::BadType {
                name: token.to_string(),
                mark: token.mark().clone(),
            }
            .into());
        }
        None => return Err(parser.end_of_stream()),
    };
    parser.advance()?;

    let mark = base.mark().clone();
    let mut tokens = vec![base];
    while parser.next_is_symbol(Symbol::Star) {
        tokens.push(parser.advance()?);
    }

    let ty = Type::resolve(&tokens)?;
    Ok(TypeNode::new(ty, mark))
}

/// `< Type >`, as used after `func` and `let`
pub(crate) fn parse_angle_type(parser: &mut Parser<'_>) -> Result<TypeNode, ParseError> {
    parser.expect_symbol(Symbol::LeftAngle)?;
    let ty = parse_type(parser)?;
    parser.expect_symbol(Symbol::RightAngle)?;
    Ok(ty)
}
