//! Import resolution tests
//!
//! Each test writes its modules into its own directory under the system temp
//! directory.

use boltc::ast::Expression;
use boltc::source::FileError;
use boltc::{BuildConfig, CompileError, Session, SourceFile};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

struct Fixture {
    root: PathBuf,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("boltc-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    fn dir(&self, name: &str) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(&self, dir: &Path, file: &str, text: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, text).unwrap();
        path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn session(paths: &[&PathBuf]) -> Session {
    let config = paths
        .iter()
        .fold(BuildConfig::default(), |config, path| config.with_library_path(*path));
    Session::new(config)
}

fn compile_main(session: &mut Session, text: &str) -> Result<boltc::CompiledModule, CompileError> {
    session.compile_source(&SourceFile::new("main", text))
}

#[test]
fn test_first_library_path_wins() {
    let fx = Fixture::new("precedence");
    let a = fx.dir("A");
    let b = fx.dir("B");
    fx.write(&a, "foo.bolt", "func<Int> from_a()");
    fx.write(&b, "foo.bolt", "func<Int> from_b()");

    let mut session = session(&[&a, &b]);
    let module = compile_main(&mut session, "import foo\nfunc<Int> main() { return from_a() }").unwrap();
    let ir = module.ir.to_string();
    assert!(ir.contains("declare i64 @from_a()"));
    assert!(!ir.contains("from_b"));

    let resolved = session
        .resolve_import("foo", &boltc::common::Mark::unknown())
        .unwrap();
    assert_eq!(resolved, a.join("foo.bolt"));
}

#[test]
fn test_second_library_path_is_searched() {
    let fx = Fixture::new("fallback");
    let a = fx.dir("A");
    let b = fx.dir("B");
    fx.write(&b, "foo.bolt", "func<Int> from_b()");

    let mut session = session(&[&a, &b]);
    assert!(compile_main(&mut session, "import foo\nfunc<Int> main() { return from_b() }").is_ok());
}

#[test]
fn test_missing_import_names_module() {
    let fx = Fixture::new("missing");
    let a = fx.dir("A");

    let mut session = session(&[&a]);
    let err = compile_main(&mut session, "import foo\nfunc<Int> main() { return 0 }").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        CompileError::File(FileError::ImportNotFound { name, .. }) if name == "foo"
    ));
    assert_eq!(err.stage(), "File");
    assert!(err.to_string().contains("'foo'"));
}

#[test]
fn test_import_by_file_name() {
    let fx = Fixture::new("by-name");
    let lib = fx.dir("lib");
    fx.write(&lib, "io.bolt", "func<Int32> puts(s: String)");

    let mut session = session(&[&lib]);
    let module = compile_main(
        &mut session,
        "import \"io.bolt\"\nfunc<Int> main() { puts(\"hi\")\nreturn 0 }",
    )
    .unwrap();
    assert!(module.ast.modules.contains_key("io"));
    assert!(matches!(
        &module.ast.expressions()[0],
        Expression::Import { module, .. } if module == "io"
    ));
}

#[test]
fn test_import_from_subdirectory() {
    let fx = Fixture::new("subdir");
    let lib = fx.dir("lib");
    let sub = fx.dir("lib/sub");
    fx.write(&sub, "io.bolt", "func<Int32> puts(s: String)");

    let mut session = session(&[&lib]);
    let module = compile_main(
        &mut session,
        "import \"sub/io\"\nfunc<Int> main() { puts(\"hi\")\nreturn 0 }",
    )
    .unwrap();
    assert!(module.ir.to_string().contains("declare i32 @puts(i8*)"));
}

#[test]
fn test_local_definition_must_match_imported_signature() {
    let fx = Fixture::new("signature");
    let lib = fx.dir("lib");
    fx.write(&lib, "foo.bolt", "func<Int> helper(a: Int)");

    let mut session = session(&[&lib]);
    let err = compile_main(
        &mut session,
        "import foo\nfunc<None> helper() { return }\nfunc<Int> main() { helper()\nreturn 0 }",
    )
    .unwrap_err();
    assert_eq!(err.stage(), "Semantic");
    assert!(err.to_string().contains("'helper' conflicts with the imported declaration"));
}

#[test]
fn test_local_definition_completes_imported_declaration() {
    let fx = Fixture::new("completes");
    let lib = fx.dir("lib");
    fx.write(&lib, "foo.bolt", "func<Int> helper(a: Int)");

    let mut session = session(&[&lib]);
    let module = compile_main(
        &mut session,
        "import foo\nfunc<Int> helper(a: Int) { return a }\nfunc<Int> main() { return helper(1) }",
    )
    .unwrap();
    let ir = module.ir.to_string();
    assert!(ir.contains("define i64 @helper(i64 %a) {"));
    assert!(!ir.contains("declare i64 @helper"));
}

#[test]
fn test_cyclic_import_is_rejected() {
    let fx = Fixture::new("cycle");
    let dir = fx.dir("src");
    let a = fx.write(&dir, "a.bolt", "import b\nfunc<Int> fa()");
    fx.write(&dir, "b.bolt", "import a\nfunc<Int> fb()");

    let mut session = session(&[&dir]);
    let err = session.compile_file(&a).unwrap_err();
    match err.root_cause() {
        CompileError::File(FileError::CyclicImport { chain, .. }) => {
            assert_eq!(chain, &vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        }
        other => panic!("expected a cyclic import, got {}", other),
    }
}

#[test]
fn test_diamond_import_includes_shared_module_once() {
    let fx = Fixture::new("diamond");
    let lib = fx.dir("lib");
    fx.write(&lib, "base.bolt", "func<Int> base_value()");
    fx.write(&lib, "left.bolt", "import base\nfunc<Int> left() { return base_value() }");
    fx.write(&lib, "right.bolt", "import base\nfunc<Int> right() { return base_value() }");

    let mut session = session(&[&lib]);
    let module = compile_main(
        &mut session,
        "import left\nimport right\nfunc<Int> main() { return left() + right() }",
    )
    .unwrap();

    let order: Vec<_> = module.ast.modules.keys().map(String::as_str).collect();
    assert_eq!(order, vec!["base", "left", "right", "main"]);

    let ir = module.ir.to_string();
    assert_eq!(ir.matches("declare i64 @base_value()").count(), 1);
    assert!(ir.contains("declare i64 @left()"));
    assert!(ir.contains("declare i64 @right()"));
    assert!(ir.contains("define i64 @main()"));
}

#[test]
fn test_transitive_symbols_are_visible() {
    let fx = Fixture::new("transitive");
    let lib = fx.dir("lib");
    fx.write(&lib, "base.bolt", "func<Int> base_value()");
    fx.write(&lib, "mid.bolt", "import base\nfunc<Int> mid() { return 1 }");

    let mut session = session(&[&lib]);
    assert!(compile_main(&mut session, "import mid\nfunc<Int> main() { return base_value() }").is_ok());
}

#[test]
fn test_imported_definitions_become_declarations() {
    let fx = Fixture::new("declarations");
    let lib = fx.dir("lib");
    fx.write(
        &lib,
        "util.bolt",
        "@pragma(linker, \"-lm\")\n\
         let<String> motto = \"go\"\n\
         let<Int> limit = 3\n\
         func<Int> helper() { return limit }",
    );

    let mut session = session(&[&lib]);
    let module = compile_main(
        &mut session,
        "import util\n\
         func<Int32> puts(s: String)\n\
         func<Int> main() { puts(motto)\nreturn helper() + limit }",
    )
    .unwrap();

    let ir = module.ir.to_string();
    assert!(ir.contains("@motto = external global [0 x i8]"));
    assert!(ir.contains("@limit = external global i64"));
    assert!(ir.contains("getelementptr inbounds [0 x i8], [0 x i8]* @motto, i64 0, i64 0"));
    assert!(ir.contains("declare i64 @helper()"));
    assert!(!ir.contains("define i64 @helper()"));
    assert_eq!(module.linker_flags, vec!["-lm".to_string()]);
}

#[test]
fn test_error_in_imported_file_keeps_its_stage() {
    let fx = Fixture::new("broken");
    let lib = fx.dir("lib");
    fx.write(&lib, "broken.bolt", "func<Int> f() { return 1 # }");

    let mut session = session(&[&lib]);
    let err = compile_main(&mut session, "import broken\nfunc<Int> main() { return 0 }").unwrap_err();
    assert_eq!(err.stage(), "Lexical");
    let message = err.to_string();
    assert!(message.starts_with("Lexical error: "));
    assert!(message.contains("broken.bolt:1:25"));
}

#[test]
fn test_imported_module_must_be_imported_to_be_seen() {
    let fx = Fixture::new("visibility");
    let lib = fx.dir("lib");
    fx.write(&lib, "first.bolt", "let<Int> x");
    fx.write(&lib, "second.bolt", "import first\nfunc<Int> g() { return 1 }");
    fx.write(&lib, "third.bolt", "func<Int> h() { return x }");

    let mut session = session(&[&lib]);
    let err = compile_main(&mut session, "import second\nimport third\nfunc<Int> main() { return 0 }")
        .unwrap_err();
    assert_eq!(err.stage(), "Semantic");
    assert!(err.to_string().contains("unknown identifier 'x'"));
}
