//! Code generation tests

use boltc::codegen::ir::{IrModule, IrType, Terminator, Value};
use boltc::codegen::{CodeGenError, generate};
use boltc::lexer::lex_str;
use boltc::parser::parse;
use boltc::sema::analyse;
use pretty_assertions::assert_eq;

fn generate_src(src: &str) -> Result<IrModule, CodeGenError> {
    let ast = parse(lex_str(src).expect("lexing failed"), "main").expect("parse failed");
    let analysed = analyse(&ast).expect("analysis failed");
    generate(&analysed)
}

fn ir(src: &str) -> String {
    generate_src(src).expect("code generation failed").to_string()
}

#[test]
fn test_main_returns_zero() {
    let module = generate_src("func<Int> main() { return 0 }").unwrap();

    let defined: Vec<_> = module.defined_functions().collect();
    assert_eq!(defined.len(), 1);
    let main = defined[0];
    assert_eq!(main.name, "main");
    assert_eq!(main.return_type, IrType::I64);
    assert_eq!(
        main.blocks[0].terminator,
        Some(Terminator::Return(Some(Value::int(IrType::I64, 0))))
    );

    assert_eq!(
        module.to_string(),
        "; ModuleID = 'main'\n\
         source_filename = \"main\"\n\
         \n\
         define i64 @main() {\n\
         entry:\n  \
         ret i64 0\n\
         }\n"
    );
}

#[test]
fn test_string_literal_argument() {
    let text = ir("func<Int32> puts(s: String)\n\
                   func<Int> main() { puts(\"hi\")\nreturn 0 }");
    assert!(text.contains("@.L0 = private unnamed_addr constant [3 x i8] c\"hi\\00\", align 1"));
    assert!(text.contains("declare i32 @puts(i8*)"));
    assert!(text.contains(
        "  %t.0 = getelementptr inbounds [3 x i8], [3 x i8]* @.L0, i64 0, i64 0\n  \
         %t.1 = call i32 @puts(i8* %t.0)\n  \
         ret i64 0\n"
    ));
}

#[test]
fn test_parameters_and_arithmetic() {
    let text = ir("func<Int> scale(a: Int, b: Int) { return a * b + 1 }");
    assert!(text.contains("define i64 @scale(i64 %a, i64 %b) {"));
    assert!(text.contains("  %t.0 = mul i64 %a, %b\n  %t.1 = add i64 %t.0, 1\n  ret i64 %t.1\n"));
}

#[test]
fn test_unsigned_division() {
    let signed = ir("func<Int> f(a: Int, b: Int) { return a / b }");
    assert!(signed.contains("sdiv i64 %a, %b"));
    let unsigned = ir("func<UInt32> f(a: UInt32, b: UInt32) { return a % b }");
    assert!(unsigned.contains("urem i32 %a, %b"));
}

#[test]
fn test_local_constant_is_an_ssa_value() {
    let text = ir("func<Int> f(a: Int) { let<Int> doubled = a * 2\nreturn doubled }");
    assert!(text.contains("  %t.0 = mul i64 %a, 2\n  ret i64 %t.0\n"));
    assert!(!text.contains("alloca"));
}

#[test]
fn test_global_integer_constant() {
    let text = ir("let<Int> answer = 42\nfunc<Int> main() { return answer }");
    assert!(text.contains("@answer = constant i64 42"));
    assert!(text.contains("  %t.0 = load i64, i64* @answer\n  ret i64 %t.0\n"));
}

#[test]
fn test_global_string_constant() {
    let text = ir("let<String> greeting = \"hey\"\n\
                   func<Int32> puts(s: String)\n\
                   func<Int> main() { puts(greeting)\nreturn 0 }");
    assert!(text.contains("@greeting = constant [4 x i8] c\"hey\\00\", align 1"));
    assert!(text.contains("getelementptr inbounds [4 x i8], [4 x i8]* @greeting, i64 0, i64 0"));
}

#[test]
fn test_global_bool_constant() {
    let text = ir("let<Bool> enabled = true\nfunc<Bool> f() { return enabled }");
    assert!(text.contains("@enabled = constant i1 true"));
    assert!(text.contains("load i1, i1* @enabled"));
}

#[test]
fn test_declaration_only_global_is_external() {
    let text = ir("let<Int> errno\nlet<String> banner\nfunc<Int> main() { return errno }");
    assert!(text.contains("@errno = external global i64"));
    assert!(text.contains("@banner = external global [0 x i8]"));
}

#[test]
fn test_uninitialized_local_constant() {
    let err = generate_src("func<Int> main() { let<Int> x\nreturn x }").unwrap_err();
    assert!(matches!(err, CodeGenError::UninitializedConstant { ref name, .. } if name == "x"));
    assert!(!err.is_internal());
}

#[test]
fn test_unsupported_global_initializer() {
    let err = generate_src("let<Int> x = 1\nlet<Int> y = x").unwrap_err();
    assert!(matches!(err, CodeGenError::UnsupportedGlobalInitializer { ref name, .. } if name == "y"));
}

#[test]
fn test_statements_after_return_are_skipped() {
    let module = generate_src("func<Int> f() { return 1\nreturn 2 }").unwrap();
    let f = module.find_function("f").unwrap();
    assert_eq!(f.blocks.len(), 1);
    assert!(f.blocks[0].instructions.is_empty());
    assert!(!module.to_string().contains("ret i64 2"));
}

#[test]
fn test_void_function_falls_off_the_end() {
    let text = ir("func<None> tick()\nfunc<None> twice() { tick()\ntick() }");
    assert!(text.contains("declare void @tick()"));
    assert!(text.contains("  call void @tick()\n  call void @tick()\n  ret void\n"));
}

#[test]
fn test_empty_body_stays_a_declaration() {
    let module = generate_src("func<None> hook() {}").unwrap();
    assert!(module.find_function("hook").unwrap().is_declaration());
    assert!(module.to_string().contains("declare void @hook()"));
}

#[test]
fn test_forward_declared_function_is_defined_once() {
    let module = generate_src(
        "func<Int> later()\n\
         func<Int> main() { return later() }\n\
         func<Int> later() { return 7 }",
    )
    .unwrap();
    let later: Vec<_> = module.functions.iter().filter(|f| f.name == "later").collect();
    assert_eq!(later.len(), 1);
    assert!(!later[0].is_declaration());
}

#[test]
fn test_completed_constant_is_one_global() {
    let text = ir("let<Int> x\nfunc<Int> f() { return x }\nlet<Int> x = 1");
    assert_eq!(text.matches("@x = ").count(), 1);
    assert!(text.contains("@x = constant i64 1"));
    assert!(!text.contains("external"));
    assert!(text.contains("load i64, i64* @x"));
}

#[test]
fn test_string_labels_do_not_collide_with_constants() {
    let text = ir("let<String> L0 = \"g\"\n\
                   func<Int32> puts(s: String)\n\
                   func<Int> main() { puts(\"x\")\nputs(L0)\nreturn 0 }");
    assert_eq!(text.matches("@L0 = ").count(), 1);
    assert!(text.contains("@L0 = constant [2 x i8] c\"g\\00\", align 1"));
    assert!(text.contains("@.L0 = private unnamed_addr constant [2 x i8] c\"x\\00\", align 1"));
}
