//! Lexer tests

use boltc::SourceFile;
use boltc::lexer::{Keyword, LanguageSpec, LexError, Symbol, Token, lex, lex_str};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn assert_tokens(src: &str, expected: &[Token]) {
    let tokens = lex_str(src).expect("lexing failed");
    assert_eq!(tokens.len(), expected.len(), "token count for {:?}", src);
    for (i, (token, template)) in tokens.iter().zip(expected).enumerate() {
        assert!(
            token.matches(template, false),
            "token {}: expected {}, got {}",
            i,
            template,
            token
        );
    }
}

#[test]
fn test_lex_empty() {
    assert!(lex_str("").unwrap().is_empty());
    assert!(lex_str("   \t\n  ").unwrap().is_empty());
}

#[test]
fn test_lex_function_definition() {
    assert_tokens(
        "func<Int> add(a: Int, b: Int) { return a }",
        &[
            Token::keyword(Keyword::Func),
            Token::symbol(Symbol::LeftAngle),
            Token::identifier("Int"),
            Token::symbol(Symbol::RightAngle),
            Token::identifier("add"),
            Token::symbol(Symbol::LeftParen),
            Token::identifier("a"),
            Token::symbol(Symbol::Colon),
            Token::identifier("Int"),
            Token::symbol(Symbol::Comma),
            Token::identifier("b"),
            Token::symbol(Symbol::Colon),
            Token::identifier("Int"),
            Token::symbol(Symbol::RightParen),
            Token::symbol(Symbol::LeftBrace),
            Token::keyword(Keyword::Return),
            Token::identifier("a"),
            Token::symbol(Symbol::RightBrace),
        ],
    );
}

#[test]
fn test_lex_keywords() {
    assert_tokens(
        "func return import let true false",
        &[
            Token::keyword(Keyword::Func),
            Token::keyword(Keyword::Return),
            Token::keyword(Keyword::Import),
            Token::keyword(Keyword::Let),
            Token::keyword(Keyword::True),
            Token::keyword(Keyword::False),
        ],
    );
}

#[test]
fn test_keyword_prefix_is_an_identifier() {
    let tokens = lex_str("letter functional").unwrap();
    assert!(tokens.iter().all(Token::is_identifier));
}

#[test]
fn test_lex_pragma() {
    let tokens = lex_str("@pragma(linker, \"-lc\")").unwrap();
    assert!(tokens[0].is_symbol(Symbol::At));
    assert_eq!(
        tokens[5],
        Token::String {
            text: "-lc".into(),
            mark: tokens[5].mark().clone()
        }
    );
}

#[test]
fn test_lex_numbers() {
    let tokens = lex_str("42 3.5").unwrap();
    assert!(matches!(&tokens[0], Token::Integer { value: 42, .. }));
    assert!(matches!(&tokens[1], Token::Float { value, .. } if *value == 3.5));
}

#[test]
fn test_invalid_number() {
    let err = lex_str("1.2.3").unwrap_err();
    assert!(matches!(err, LexError::InvalidNumericToken { ref text, .. } if text == "1.2.3"));
}

#[test]
fn test_unterminated_string() {
    assert!(matches!(
        lex_str("\"never closed"),
        Err(LexError::UnexpectedEndOfSource { .. })
    ));
}

#[test]
fn test_unexpected_character() {
    let err = lex_str("let<Int> x = 1 # 2").unwrap_err();
    match err {
        LexError::UnexpectedCharacter { character, mark } => {
            assert_eq!(character, '#');
            assert_eq!((mark.line, mark.column), (1, 15));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_comments_are_skipped() {
    assert_tokens(
        "// leading comment\nlet // trailing\n",
        &[Token::keyword(Keyword::Let)],
    );
}

#[test]
fn test_marks_carry_file_name() {
    let source = SourceFile::new("main.bolt", "\n  return");
    let tokens = lex(&source).unwrap();
    assert_eq!(tokens[0].mark().to_string(), "main.bolt:2:2");
}

#[test]
fn test_string_keeps_whitespace_and_newlines() {
    let tokens = lex_str("\"a b\nc\" x").unwrap();
    assert!(matches!(&tokens[0], Token::String { text, .. } if text == "a b\nc"));
    assert_eq!(tokens[1].mark().line, 2);
}

fn token_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z_][a-zA-Z0-9_]{0,8}",
        "[0-9]{1,9}",
        "\"[a-z ,]{0,8}\"",
        "[(){}<>,:=*+/%@-]",
    ]
}

proptest! {
    #[test]
    fn prop_tokens_reproduce_source(words in prop::collection::vec(token_text(), 1..24)) {
        let spec = LanguageSpec::current();
        let src = words.join(" ");
        let tokens = lex_str(&src).unwrap();

        prop_assert_eq!(tokens.len(), words.len());
        let mut column = 0usize;
        for (token, word) in tokens.iter().zip(&words) {
            prop_assert_eq!(&token.source_text(spec), word);
            prop_assert_eq!(token.length(spec), word.chars().count());
            prop_assert_eq!(token.mark().column as usize, column);
            column += word.chars().count() + 1;
        }
    }
}
