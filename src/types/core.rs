//! Core type definitions

use super::TypeError;
use crate::common::Mark;
use crate::lexer::{Symbol, Token};
use serde::Serialize;
use std::fmt;

/// Core type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    /// Void/bottom, never storable
    None,

    // Fundamental types
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // Nested
    Pointer(Box<Type>),

    // Complex, resolves to `Int8*`
    String,
}

impl Type {
    /// Surface names of every base type
    pub const BASE_NAMES: [&'static str; 13] = [
        "None", "Bool", "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16",
        "UInt32", "UInt64", "String",
    ];

    pub fn pointer(inner: Type) -> Type {
        Type::Pointer(Box::new(inner))
    }

    /// Base type for a surface name
    pub fn from_name(name: &str) -> Option<Type> {
        Some(match name {
            "None" => Type::None,
            "Bool" => Type::Bool,
            "Int" => Type::Int,
            "Int8" => Type::Int8,
            "Int16" => Type::Int16,
            "Int32" => Type::Int32,
            "Int64" => Type::Int64,
            "UInt" => Type::UInt,
            "UInt8" => Type::UInt8,
            "UInt16" => Type::UInt16,
            "UInt32" => Type::UInt32,
            "UInt64" => Type::UInt64,
            "String" => Type::String,
            _ => return None,
        })
    }

    /// Interpret a sequence of tokens as a type: a base name followed by any
    /// number of `*`, each adding one level of pointer nesting.
    pub fn resolve(tokens: &[Token]) -> Result<Type, TypeError> {
        let Some((base, rest)) = tokens.split_first() else {
            return Err(TypeError::MissingType {
                mark: Mark::unknown(),
            });
        };

        let mut ty = match base {
            Token::Identifier { text, mark } => {
                Type::from_name(text).ok_or_else(|| TypeError::BadType {
                    name: text.clone(),
                    mark: mark.clone(),
                })?
            }
            other => {
                return Err(TypeError::BadType {
                    name: other.to_string(),
                    mark: other.mark().clone(),
                });
            }
        };

        for token in rest {
            if token.is_symbol(Symbol::Star) {
                ty = Type::pointer(ty);
            } else {
                return Err(TypeError::UnexpectedToken {
                    token: token.to_string(),
                    mark: token.mark().clone(),
                });
            }
        }

        Ok(ty)
    }

    /// Underlying storage representation of complex types
    pub fn resolved_type(&self) -> Type {
        match self {
            Type::String => Type::pointer(Type::Int8),
            Type::Pointer(inner) => Type::pointer(inner.resolved_type()),
            other => other.clone(),
        }
    }

    /// Whether values of this type can be held by constants and parameters
    pub fn is_valid_storage_type(&self) -> bool {
        !matches!(self, Type::None)
    }

    /// Compare two types by their resolved representation
    pub fn is_compatible_with(&self, other: &Type) -> bool {
        self.resolved_type() == other.resolved_type()
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::Int
                | Type::Int8
                | Type::Int16
                | Type::Int32
                | Type::Int64
                | Type::UInt
                | Type::UInt8
                | Type::UInt16
                | Type::UInt32
                | Type::UInt64
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Int8 | Type::Int16 | Type::Int32 | Type::Int64
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::None => write!(f, "None"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Int8 => write!(f, "Int8"),
            Type::Int16 => write!(f, "Int16"),
            Type::Int32 => write!(f, "Int32"),
            Type::Int64 => write!(f, "Int64"),
            Type::UInt => write!(f, "UInt"),
            Type::UInt8 => write!(f, "UInt8"),
            Type::UInt16 => write!(f, "UInt16"),
            Type::UInt32 => write!(f, "UInt32"),
            Type::UInt64 => write!(f, "UInt64"),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::String => write!(f, "String"),
        }
    }
}
