use super::{ParseError, Parser, SubParser};
use crate::ast::Expression;
use crate::lexer::{Keyword, Token};

/// `import name` or `import "path"`.
///
/// The imported module is compiled up to parsing through the parser's
/// [`ModuleImporter`](super::ModuleImporter) and spliced into this AST.
pub(crate) struct ImportParser;

impl SubParser for ImportParser {
    fn test(&self, parser: &Parser<'_>) -> bool {
        parser.next_is_keyword(Keyword::Import)
    }

    fn parse(&self, parser: &mut Parser<'_>) -> Result<Expression, ParseError> {
        parser.expect_keyword(Keyword::Import)?;
        let (path, mark) = match parser.advance()? {
            Token::Identifier { text, mark } | Token::String { text, mark } => (text, mark),
            other => {
                return Err(ParseError::Expected {
                    expected: "module name".to_string(),
                    found: other.to_string(),
                    mark: other.mark().clone(),
                });
            }
        };

        // `import "io.bolt"` names the module `io`
        let imported = parser.import_module(&path, &mark)?;
        let module = imported.main_module.clone();
        tracing::debug!(%path, %module, modules = imported.modules.len(), "imported module");
        parser.ast_mut().add_imported(imported);

        Ok(Expression::Import { module, mark })
    }
}
