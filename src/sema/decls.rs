//! Flat declaration table
//!
//! Bound identifiers refer to declarations by [`DeclId`] rather than embedding
//! a copy of the declaring node, so "the same function" is a cheap id
//! comparison and call sites never duplicate a function subtree.

pub use crate::ast::DeclId;

use crate::common::Mark;
use crate::types::Type;
use serde::Serialize;
use std::ops::Index;

/// Kind of declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeclKind {
    Function {
        parameters: Vec<Type>,
        return_type: Type,
    },
    Parameter {
        function: DeclId,
        index: usize,
    },
    Constant {
        /// Declared at module scope
        global: bool,
    },
}

/// A declared name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    /// Value type; the return type for functions
    pub ty: Type,
    pub kind: DeclKind,
    /// No body or initializer has been seen
    pub declaration_only: bool,
    pub module: String,
    pub mark: Mark,
}

impl Declaration {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, DeclKind::Function { .. })
    }

    pub fn parameter_types(&self) -> &[Type] {
        match &self.kind {
            DeclKind::Function { parameters, .. } => parameters,
            _ => &[],
        }
    }
}

/// Every declaration seen during analysis, indexed by id
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeclTable {
    decls: Vec<Declaration>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declaration and return its fresh id
    pub fn push(
        &mut self,
        name: impl Into<String>,
        ty: Type,
        kind: DeclKind,
        declaration_only: bool,
        module: impl Into<String>,
        mark: Mark,
    ) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            id,
            name: name.into(),
            ty,
            kind,
            declaration_only,
            module: module.into(),
            mark,
        });
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.decls.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter().filter(|d| d.is_function())
    }
}

impl Index<DeclId> for DeclTable {
    type Output = Declaration;

    fn index(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }
}
