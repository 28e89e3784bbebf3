//! Type system for the Bolt language
//!
//! Bolt has a small closed set of types: integer families, `Bool`, pointers
//! and the complex `String` type which resolves to `Int8*` for storage.

pub mod core;

pub use self::core::*;

use crate::common::Mark;
use miette::Diagnostic;
use thiserror::Error;

/// Malformed type expression
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum TypeError {
    #[error("{mark} -- unknown type '{name}'")]
    #[diagnostic(
        code(types::bad_type),
        help("valid base types are None, Bool, Int, Int8..Int64, UInt, UInt8..UInt64 and String")
    )]
    BadType { name: String, mark: Mark },

    #[error("{mark} -- unexpected {token} in type")]
    #[diagnostic(code(types::unexpected_token))]
    UnexpectedToken { token: String, mark: Mark },

    #[error("{mark} -- missing type information")]
    #[diagnostic(code(types::missing))]
    MissingType { mark: Mark },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex_str;

    fn resolve(src: &str) -> Result<Type, TypeError> {
        let tokens = lex_str(src).unwrap();
        Type::resolve(tokens.tokens())
    }

    #[test]
    fn test_resolve_nested_pointer() {
        assert_eq!(
            resolve("Int * *").unwrap(),
            Type::pointer(Type::pointer(Type::Int))
        );
    }

    #[test]
    fn test_string_resolves_to_int8_pointer() {
        let ty = resolve("String").unwrap();
        assert_eq!(ty, Type::String);
        assert_eq!(ty.resolved_type(), Type::pointer(Type::Int8));
        assert!(ty.is_compatible_with(&Type::pointer(Type::Int8)));
        assert_ne!(ty, Type::pointer(Type::Int8));
    }

    #[test]
    fn test_unknown_base_type_names_text() {
        match resolve("Float") {
            Err(TypeError::BadType { name, .. }) => assert_eq!(name, "Float"),
            other => panic!("expected BadType, got {:?}", other),
        }
    }

    #[test]
    fn test_stray_symbol_rejected() {
        assert!(matches!(
            resolve("Int *,"),
            Err(TypeError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_none_is_not_storable() {
        assert!(!Type::None.is_valid_storage_type());
        assert!(Type::String.is_valid_storage_type());
        assert!(Type::pointer(Type::None).is_valid_storage_type());
    }

    #[test]
    fn test_display_surface_names() {
        assert_eq!(Type::pointer(Type::UInt16).to_string(), "UInt16*");
        assert_eq!(Type::String.to_string(), "String");
    }
}
