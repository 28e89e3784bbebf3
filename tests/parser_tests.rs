//! Parser tests

use boltc::ast::{Ast, BinaryOperator, Expression};
use boltc::lexer::lex_str;
use boltc::parser::{ParseError, parse};
use boltc::symbols::SymbolError;
use boltc::types::{Type, TypeError};
use boltc::{CompileError, source::FileError};
use pretty_assertions::assert_eq;

fn parse_src(src: &str) -> Result<Ast, ParseError> {
    parse(lex_str(src).expect("lexing failed"), "main")
}

/// Statements of the single function defined in `src`
fn function_body(src: &str) -> Vec<Expression> {
    let ast = parse_src(src).expect("parse failed");
    match &ast.expressions()[0] {
        Expression::Definition { body, .. } => match body.as_ref() {
            Expression::Block { body, .. } => body.clone(),
            other => panic!("function body is {:?}", other),
        },
        other => panic!("expected a definition, got {:?}", other),
    }
}

#[test]
fn test_parse_function_definition() {
    let ast = parse_src("func<Int> add(a: Int, b: Int) { return a }").unwrap();
    assert_eq!(ast.expressions().len(), 1);

    let Expression::Definition { declaration, body } = &ast.expressions()[0] else {
        panic!("expected a definition");
    };
    let Expression::FunctionDeclaration(func) = declaration.as_ref() else {
        panic!("expected a function declaration");
    };
    assert_eq!(func.name, "add");
    assert_eq!(func.return_type.ty, Type::Int);
    let params: Vec<_> = func.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["a", "b"]);
    assert!(func.binding.is_none());

    let Expression::Block { body, .. } = body.as_ref() else {
        panic!("expected a block body");
    };
    assert!(matches!(&body[0], Expression::Return { value, .. }
        if matches!(value.as_ref(), Expression::Identifier { name, .. } if name == "a")));
}

#[test]
fn test_parse_declaration_without_body() {
    let ast = parse_src("func<Int32> puts(s: String)").unwrap();
    match &ast.expressions()[0] {
        Expression::FunctionDeclaration(func) => {
            assert_eq!(func.return_type.ty, Type::Int32);
            assert_eq!(func.parameters[0].ty.ty, Type::String);
        }
        other => panic!("expected a declaration, got {:?}", other),
    }
}

#[test]
fn test_forward_declaration_then_definition() {
    let ast = parse_src("func<Int> f()\nfunc<Int> f() { return 1 }").unwrap();
    assert_eq!(ast.expressions().len(), 2);
}

#[test]
fn test_empty_body() {
    let body = function_body("func<None> noop() {}");
    assert!(body.is_empty());
}

#[test]
fn test_call_versus_identifier() {
    let body = function_body("func<Int> f(x: Int) { g(x, 1)\nreturn x }");
    match &body[0] {
        Expression::Call {
            callee, arguments, ..
        } => {
            assert!(matches!(callee.as_ref(), Expression::Identifier { name, .. } if name == "g"));
            assert_eq!(arguments.len(), 2);
            assert!(matches!(&arguments[0], Expression::Identifier { .. }));
            assert!(matches!(&arguments[1], Expression::Integer { value: 1, .. }));
        }
        other => panic!("expected a call, got {:?}", other),
    }
    assert!(matches!(&body[1], Expression::Return { .. }));
}

#[test]
fn test_void_return() {
    let body = function_body("func<None> f() { return }");
    assert!(matches!(&body[0], Expression::VoidReturn { .. }));
}

#[test]
fn test_binary_precedence() {
    let body = function_body("func<Int> f() { return 1 + 2 * 3 - 4 }");
    let Expression::Return { value, .. } = &body[0] else {
        panic!("expected a return");
    };
    // ((1 + (2 * 3)) - 4)
    let Expression::BinaryOperation { lhs, op, rhs, .. } = value.as_ref() else {
        panic!("expected a binary operation");
    };
    assert_eq!(*op, BinaryOperator::Subtract);
    assert!(matches!(rhs.as_ref(), Expression::Integer { value: 4, .. }));
    let Expression::BinaryOperation { lhs, op, rhs, .. } = lhs.as_ref() else {
        panic!("expected an addition");
    };
    assert_eq!(*op, BinaryOperator::Add);
    assert!(matches!(lhs.as_ref(), Expression::Integer { value: 1, .. }));
    assert!(matches!(
        rhs.as_ref(),
        Expression::BinaryOperation {
            op: BinaryOperator::Multiply,
            ..
        }
    ));
}

#[test]
fn test_group_overrides_precedence() {
    let body = function_body("func<Int> f() { return (1 + 2) * 3 }");
    let Expression::Return { value, .. } = &body[0] else {
        panic!("expected a return");
    };
    let Expression::BinaryOperation { lhs, op, .. } = value.as_ref() else {
        panic!("expected a binary operation");
    };
    assert_eq!(*op, BinaryOperator::Multiply);
    assert!(matches!(lhs.as_ref(), Expression::Group { body, .. } if body.len() == 1));
}

#[test]
fn test_constants() {
    let ast = parse_src("let<Int> x\nlet<String> greeting = \"hi\"").unwrap();
    assert!(matches!(&ast.expressions()[0], Expression::ConstantDeclaration(c) if c.name == "x"));
    match &ast.expressions()[1] {
        Expression::Definition { declaration, body } => {
            assert!(matches!(declaration.as_ref(), Expression::ConstantDeclaration(c)
                if c.ty.ty == Type::String));
            assert!(matches!(body.as_ref(), Expression::String { value, .. } if value == "hi"));
        }
        other => panic!("expected a definition, got {:?}", other),
    }
    let x = ast.symbols.lookup("x").unwrap();
    assert!(x.declaration_only);
}

#[test]
fn test_pointer_types() {
    let ast = parse_src("func<Int8**> argv()").unwrap();
    let Expression::FunctionDeclaration(func) = &ast.expressions()[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(
        func.return_type.ty,
        Type::pointer(Type::pointer(Type::Int8))
    );
}

#[test]
fn test_linker_flags() {
    let ast = parse_src("@pragma(linker, \"-lc\")\n@pragma(linker, \"-lm\")").unwrap();
    assert_eq!(ast.linker_flags(), vec!["-lc".to_string(), "-lm".to_string()]);
}

#[test]
fn test_unknown_compiler_namespace() {
    let err = parse_src("@pragma(optimizer, \"fast\")").unwrap_err();
    assert!(matches!(err, ParseError::UnknownCompilerNamespace { ref namespace, .. }
        if namespace == "optimizer"));
}

#[test]
fn test_trailing_comma_is_rejected() {
    assert!(matches!(
        parse_src("func<Int> f(a: Int,) { return a }"),
        Err(ParseError::Expected { .. })
    ));
}

#[test]
fn test_bad_type() {
    let err = parse_src("func<Float> f()").unwrap_err();
    assert!(matches!(err, ParseError::Type(TypeError::BadType { ref name, .. }) if name == "Float"));
}

#[test]
fn test_missing_closing_brace() {
    assert!(matches!(
        parse_src("func<Int> f() { return 1"),
        Err(ParseError::UnexpectedEndOfTokenStream { .. })
    ));
}

#[test]
fn test_statement_at_module_level_is_rejected() {
    assert!(matches!(
        parse_src("return 1"),
        Err(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_redefinition_in_same_scope() {
    let err = parse_src("let<Int> x = 1\nlet<Int> x = 2").unwrap_err();
    assert!(matches!(err, ParseError::Symbol(SymbolError::Redefinition { ref name, .. })
        if name == "x"));
}

#[test]
fn test_declaration_completed_by_other_kind() {
    let err = parse_src("func<Int> f()\nlet<Int> f = 1").unwrap_err();
    assert!(matches!(err, ParseError::Symbol(SymbolError::Redefinition { ref name, .. })
        if name == "f"));
}

#[test]
fn test_parameter_and_body_share_a_scope() {
    let err = parse_src("func<Int> f(a: Int) { let<Int> a = 3\nreturn a }").unwrap_err();
    assert!(matches!(err, ParseError::Symbol(SymbolError::Redefinition { ref name, .. })
        if name == "a"));
}

#[test]
fn test_shadowing_in_body_is_allowed() {
    assert!(parse_src("let<Int> x = 1\nfunc<Int> f(x: Int) { let<Int> y = x\nreturn y }").is_ok());
}

#[test]
fn test_import_without_library_paths() {
    let err = parse_src("import io").unwrap_err();
    let ParseError::Import(inner) = err else {
        panic!("expected an import failure");
    };
    assert!(matches!(*inner, CompileError::File(FileError::ImportNotFound { ref name, .. })
        if name == "io"));
}

#[test]
fn test_ast_serializes_to_json() {
    let ast = parse_src("func<Int> main() { return 0 }").unwrap();
    let json = serde_json::to_value(&ast).unwrap();
    assert_eq!(json["main_module"], "main");
    assert!(json["modules"]["main"].is_array());
}
