//! Infix arithmetic by precedence climbing

use super::{ParseError, Parser};
use crate::ast::{BinaryOperator, Expression};
use crate::lexer::{Symbol, Token};

fn peek_operator(parser: &Parser<'_>) -> Option<BinaryOperator> {
    match parser.peek()? {
        Token::Symbol { symbol, .. } => match symbol {
            Symbol::Plus => Some(BinaryOperator::Add),
            Symbol::Minus => Some(BinaryOperator::Subtract),
            Symbol::Star => Some(BinaryOperator::Multiply),
            Symbol::Slash => Some(BinaryOperator::Divide),
            Symbol::Percent => Some(BinaryOperator::Modulo),
            _ => None,
        },
        _ => None,
    }
}

/// Fold operators binding at least as tightly as `min_precedence` onto `lhs`.
/// Operators of equal precedence associate to the left.
pub(crate) fn parse_binary_rhs(
    parser: &mut Parser<'_>,
    mut lhs: Expression,
    min_precedence: u8,
) -> Result<Expression, ParseError> {
    while let Some(op) = peek_operator(parser) {
        if op.precedence() < min_precedence {
            break;
        }
        let mark = parser.advance()?.mark().clone();
        let mut rhs = parser.parse_primary()?;

        while let Some(next) = peek_operator(parser) {
            if next.precedence() <= op.precedence() {
                break;
            }
            rhs = parse_binary_rhs(parser, rhs, next.precedence())?;
        }

        lhs = Expression::BinaryOperation {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            mark,
        };
    }
    Ok(lhs)
}
