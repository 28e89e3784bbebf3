use super::types::parse_angle_type;
use super::{ParseError, Parser, SubParser};
use crate::ast::{ConstantDeclaration, Expression, SymbolKind};
use crate::lexer::{Keyword, Symbol};

/// `let<Type> name` with an optional `= value`
pub(crate) struct ConstantParser;

impl SubParser for ConstantParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.next_is_keyword(Keyword::Let)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        parser.expect_keyword(Keyword::Let)?;
        let ty = parse_angle_type(parser)?;
        let (name, mark) = parser.expect_identifier()?;

        let value = if parser.next_is_symbol(Symbol::Equals) {
            parser.advance()?;
            Some(parser.parse_expression()?)
        } else {
            None
        };

        parser.ast_mut().symbols.define(
            name.clone(),
            SymbolKind::Constant,
            value.is_none(),
            mark.clone(),
        )?;

        let declaration = Expression::ConstantDeclaration(ConstantDeclaration {
            name,
            ty,
            mark,
            binding: None,
        });

        Ok(match value {
            Some(value) => Expression::Definition {
                declaration: Box::new(declaration),
                body: Box::new(value),
            },
            None => declaration,
        })
    }
}
