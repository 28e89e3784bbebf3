//! Token definitions for the Bolt lexer

use super::LanguageSpec;
use crate::common::Mark;
use serde::Serialize;
use std::fmt;

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    Func,
    Return,
    Import,
    Let,
    True,
    False,
}

impl Keyword {
    pub const ALL: [Keyword; 6] = [
        Keyword::Func,
        Keyword::Return,
        Keyword::Import,
        Keyword::Let,
        Keyword::True,
        Keyword::False,
    ];

    pub fn from_text(text: &str) -> Option<Keyword> {
        Self::ALL.into_iter().find(|k| k.as_str() == text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Func => "func",
            Keyword::Return => "return",
            Keyword::Import => "import",
            Keyword::Let => "let",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single-character punctuation and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Symbol {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftAngle,
    RightAngle,
    Comma,
    Colon,
    Equals,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    At,
}

impl Symbol {
    pub fn from_char(c: char) -> Option<Symbol> {
        Some(match c {
            '(' => Symbol::LeftParen,
            ')' => Symbol::RightParen,
            '{' => Symbol::LeftBrace,
            '}' => Symbol::RightBrace,
            '<' => Symbol::LeftAngle,
            '>' => Symbol::RightAngle,
            ',' => Symbol::Comma,
            ':' => Symbol::Colon,
            '=' => Symbol::Equals,
            '*' => Symbol::Star,
            '+' => Symbol::Plus,
            '-' => Symbol::Minus,
            '/' => Symbol::Slash,
            '%' => Symbol::Percent,
            '@' => Symbol::At,
            _ => return None,
        })
    }

    pub fn as_char(&self) -> char {
        match self {
            Symbol::LeftParen => '(',
            Symbol::RightParen => ')',
            Symbol::LeftBrace => '{',
            Symbol::RightBrace => '}',
            Symbol::LeftAngle => '<',
            Symbol::RightAngle => '>',
            Symbol::Comma => ',',
            Symbol::Colon => ':',
            Symbol::Equals => '=',
            Symbol::Star => '*',
            Symbol::Plus => '+',
            Symbol::Minus => '-',
            Symbol::Slash => '/',
            Symbol::Percent => '%',
            Symbol::At => '@',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A lexical token. Every variant carries the mark of its first character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Token {
    String { text: String, mark: Mark },
    Integer { value: i64, text: String, mark: Mark },
    Float { value: f64, text: String, mark: Mark },
    Identifier { text: String, mark: Mark },
    Keyword { keyword: Keyword, mark: Mark },
    Symbol { symbol: Symbol, mark: Mark },
}

impl Token {
    /// Template token for a keyword, used by grammar rules
    pub fn keyword(keyword: Keyword) -> Token {
        Token::Keyword {
            keyword,
            mark: Mark::unknown(),
        }
    }

    /// Template token for a symbol, used by grammar rules
    pub fn symbol(symbol: Symbol) -> Token {
        Token::Symbol {
            symbol,
            mark: Mark::unknown(),
        }
    }

    /// Template token for an identifier, used by grammar rules
    pub fn identifier(text: impl Into<String>) -> Token {
        Token::Identifier {
            text: text.into(),
            mark: Mark::unknown(),
        }
    }

    /// Template token standing for "any string literal"
    pub fn any_string() -> Token {
        Token::String {
            text: String::new(),
            mark: Mark::unknown(),
        }
    }

    pub fn mark(&self) -> &Mark {
        match self {
            Token::String { mark, .. }
            | Token::Integer { mark, .. }
            | Token::Float { mark, .. }
            | Token::Identifier { mark, .. }
            | Token::Keyword { mark, .. }
            | Token::Symbol { mark, .. } => mark,
        }
    }

    /// Structural match against a template token.
    ///
    /// Literal variants match any payload of the same kind. Identifiers,
    /// keywords and symbols must carry the same payload, except that with
    /// `weak_identifier` any identifier matches an identifier template.
    pub fn matches(&self, template: &Token, weak_identifier: bool) -> bool {
        match (self, template) {
            (Token::String { .. }, Token::String { .. })
            | (Token::Integer { .. }, Token::Integer { .. })
            | (Token::Float { .. }, Token::Float { .. }) => true,
            (Token::Identifier { text: a, .. }, Token::Identifier { text: b, .. }) => {
                weak_identifier || a == b
            }
            (Token::Keyword { keyword: a, .. }, Token::Keyword { keyword: b, .. }) => a == b,
            (Token::Symbol { symbol: a, .. }, Token::Symbol { symbol: b, .. }) => a == b,
            _ => false,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword { keyword: k, .. } if *k == keyword)
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        matches!(self, Token::Symbol { symbol: s, .. } if *s == symbol)
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Token::Identifier { .. })
    }

    /// Number of source characters this token spans
    pub fn length(&self, spec: &LanguageSpec) -> usize {
        match self {
            Token::String { text, .. } => {
                text.chars().count()
                    + spec.string_prefix.chars().count()
                    + spec.string_suffix.chars().count()
            }
            Token::Integer { text, .. } | Token::Float { text, .. } => text.chars().count(),
            Token::Identifier { text, .. } => text.chars().count(),
            Token::Keyword { keyword, .. } => keyword.as_str().len(),
            Token::Symbol { .. } => 1,
        }
    }

    /// Source text this token was produced from
    pub fn source_text(&self, spec: &LanguageSpec) -> String {
        match self {
            Token::String { text, .. } => {
                format!("{}{}{}", spec.string_prefix, text, spec.string_suffix)
            }
            Token::Integer { text, .. } | Token::Float { text, .. } => text.clone(),
            Token::Identifier { text, .. } => text.clone(),
            Token::Keyword { keyword, .. } => keyword.as_str().to_string(),
            Token::Symbol { symbol, .. } => symbol.as_char().to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::String { text, .. } => write!(f, "string \"{}\"", text),
            Token::Integer { text, .. } => write!(f, "integer '{}'", text),
            Token::Float { text, .. } => write!(f, "float '{}'", text),
            Token::Identifier { text, .. } => write!(f, "identifier '{}'", text),
            Token::Keyword { keyword, .. } => write!(f, "keyword '{}'", keyword),
            Token::Symbol { symbol, .. } => write!(f, "symbol '{}'", symbol),
        }
    }
}

/// Ordered output of the lexer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}

impl std::ops::Index<usize> for TokenStream {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
