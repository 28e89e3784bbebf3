//! Lexical analysis
//!
//! A single left-to-right scan with one character of lookahead, plus a
//! counted lookahead for the multi-character delimiters described by the
//! active [`LanguageSpec`]. Tokens are produced eagerly into a [`TokenStream`].

mod language;
mod tokens;

pub use language::LanguageSpec;
pub use tokens::{Keyword, Symbol, Token, TokenStream};

use crate::common::{Mark, Scanner};
use crate::source::SourceFile;
use miette::Diagnostic;
use thiserror::Error;

/// Lexical analysis error
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum LexError {
    #[error("{mark} -- unexpected end of source")]
    #[diagnostic(code(lex::unexpected_eof))]
    UnexpectedEndOfSource { mark: Mark },

    #[error("{mark} -- invalid numeric token '{text}'")]
    #[diagnostic(code(lex::invalid_number))]
    InvalidNumericToken { text: String, mark: Mark },

    #[error("{mark} -- unexpected character '{character}'")]
    #[diagnostic(code(lex::unexpected_character))]
    UnexpectedCharacter { character: char, mark: Mark },
}

/// Lex a source file using the current language specification
pub fn lex(source: &SourceFile) -> Result<TokenStream, LexError> {
    Lexer::new(source, LanguageSpec::current()).analyse()
}

/// Lex an anonymous in-memory string
pub fn lex_str(text: &str) -> Result<TokenStream, LexError> {
    lex(&SourceFile::new("<input>", text))
}

/// Lexer state
pub struct Lexer<'a> {
    scanner: Scanner<char>,
    source: &'a SourceFile,
    spec: &'a LanguageSpec,
    line: u32,
    column: u32,
    current_mark: Mark,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile, spec: &'a LanguageSpec) -> Self {
        Self {
            scanner: Scanner::new(source.content.chars().collect()),
            source,
            spec,
            line: 1,
            column: 0,
            current_mark: Mark::unknown(),
        }
    }

    /// Run the scan to completion
    pub fn analyse(mut self) -> Result<TokenStream, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.consume_whitespace();
            if !self.scanner.is_available() {
                break;
            }

            self.update_mark();
            if self.test_str(self.spec.comment_prefix) {
                self.consume_comment();
            } else if self.test_str(self.spec.string_prefix) {
                self.advance_by(self.spec.string_prefix.chars().count());
                tokens.push(self.consume_string()?);
            } else if self.test(|c| c.is_ascii_digit()) {
                tokens.push(self.consume_number()?);
            } else if self.test(is_identifier_start) {
                tokens.push(self.consume_identifier());
            } else if let Some(symbol) = self.scanner.peek().copied().and_then(Symbol::from_char) {
                self.advance();
                tokens.push(Token::Symbol {
                    symbol,
                    mark: self.current_mark.clone(),
                });
            } else {
                let character = self.peek().unwrap_or('\0');
                return Err(LexError::UnexpectedCharacter {
                    character,
                    mark: self.current_mark.clone(),
                });
            }
        }

        tracing::trace!(file = %self.source.name, count = tokens.len(), "lexed tokens");
        Ok(TokenStream::new(tokens))
    }

    // ==================== POSITION ====================

    fn update_mark(&mut self) {
        self.current_mark = self.source.mark(self.line, self.column);
    }

    fn track(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    // ==================== CONSUMPTION ====================

    fn peek(&self) -> Option<char> {
        self.scanner.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.scanner.advance().copied()?;
        self.track(c);
        Some(c)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Whether the upcoming characters spell `expected`, without consuming
    fn test_str(&self, expected: &str) -> bool {
        let n = expected.chars().count();
        match self.scanner.peek_slice(n) {
            Some(window) => window.iter().copied().eq(expected.chars()),
            None => false,
        }
    }

    fn test(&self, predicate: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(predicate)
    }

    // ==================== CONSUMERS ====================

    fn consume_whitespace(&mut self) {
        while self.test(char::is_whitespace) {
            self.advance();
        }
    }

    fn consume_comment(&mut self) {
        while self.test(|c| c != '\n') {
            self.advance();
        }
    }

    fn consume_string(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        loop {
            if !self.scanner.is_available() {
                return Err(LexError::UnexpectedEndOfSource {
                    mark: self.current_mark.clone(),
                });
            }
            if self.test_str(self.spec.string_suffix) {
                self.advance_by(self.spec.string_suffix.chars().count());
                break;
            }
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }

        Ok(Token::String {
            text,
            mark: self.current_mark.clone(),
        })
    }

    fn consume_number(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        while self.test(|c| c.is_ascii_digit() || c == '.') {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }

        let mark = self.current_mark.clone();
        if let Ok(value) = text.parse::<i64>() {
            Ok(Token::Integer { value, text, mark })
        } else if let Ok(value) = text.parse::<f64>() {
            Ok(Token::Float { value, text, mark })
        } else {
            Err(LexError::InvalidNumericToken { text, mark })
        }
    }

    fn consume_identifier(&mut self) -> Token {
        let mut text = String::new();
        while self.test(is_identifier_continue) {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }

        let mark = self.current_mark.clone();
        match Keyword::from_text(&text) {
            Some(keyword) => Token::Keyword { keyword, mark },
            None => Token::Identifier { text, mark },
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_first_character() {
        let tokens = lex_str("  foo\n bar").unwrap();
        assert_eq!(tokens[0].mark().line, 1);
        assert_eq!(tokens[0].mark().column, 2);
        assert_eq!(tokens[1].mark().line, 2);
        assert_eq!(tokens[1].mark().column, 1);
    }

    #[test]
    fn test_comment_at_end_of_input() {
        let tokens = lex_str("let // trailing").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_keyword(Keyword::Let));
    }

    #[test]
    fn test_lone_slash_is_a_symbol() {
        let tokens = lex_str("a / b").unwrap();
        assert!(tokens[1].is_symbol(Symbol::Slash));
    }

    #[test]
    fn test_custom_comment_prefix() {
        let spec = LanguageSpec {
            comment_prefix: "#",
            ..LanguageSpec::default()
        };
        let source = SourceFile::new("t", "# hidden\nfunc");
        let tokens = Lexer::new(&source, &spec).analyse().unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_keyword(Keyword::Func));
    }
}
