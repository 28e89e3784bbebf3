//! Symbol table implementation
//!
//! Scopes form a parent-linked chain: each scope holds only the names it
//! introduces, and lookups walk outwards from the innermost scope. Symbols
//! merged in from imported modules live in a separate import layer that is
//! consulted after the root scope, so local declarations always win.

use crate::common::Mark;
use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;

/// Symbol table misuse
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SymbolError {
    #[error("{mark} -- redefinition of '{name}' (first defined at {first})")]
    #[diagnostic(code(symbols::redefinition))]
    Redefinition { name: String, mark: Mark, first: Mark },

    #[error("attempted to leave the root scope; enter/leave calls are unbalanced")]
    #[diagnostic(code(symbols::unbalanced_scopes))]
    LeaveRootScope,
}

/// Index of a scope in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

/// A named binding
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol<T> {
    pub name: String,
    pub value: T,
    /// Declared without a body or initializer
    pub declaration_only: bool,
    pub mark: Mark,
}

#[derive(Debug, Clone)]
struct Scope<T> {
    parent: Option<ScopeId>,
    symbols: IndexMap<String, Symbol<T>>,
}

impl<T> Scope<T> {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            symbols: IndexMap::new(),
        }
    }
}

/// Symbol table with scoped lookups
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    scopes: Vec<Scope<T>>,
    imported: IndexMap<String, Symbol<T>>,
}

impl<T: Clone> SymbolTable<T> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None)],
            imported: IndexMap::new(),
        }
    }

    fn current_id(&self) -> ScopeId {
        ScopeId((self.scopes.len() - 1) as u32)
    }

    fn current(&self) -> &Scope<T> {
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Scope<T> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Open a nested scope whose parent is the current one
    pub fn enter_scope(&mut self) {
        let parent = self.current_id();
        self.scopes.push(Scope::new(Some(parent)));
        tracing::trace!(depth = self.depth(), "entered scope");
    }

    /// Close the current scope, discarding its bindings
    pub fn leave_scope(&mut self) -> Result<(), SymbolError> {
        if self.current().parent.is_none() {
            return Err(SymbolError::LeaveRootScope);
        }
        self.scopes.pop();
        tracing::trace!(depth = self.depth(), "left scope");
        Ok(())
    }

    /// Number of active scopes, 1 at the root
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self.current();
        while let Some(parent) = scope.parent {
            depth += 1;
            scope = &self.scopes[parent.0 as usize];
        }
        depth
    }

    pub fn at_root(&self) -> bool {
        self.current().parent.is_none()
    }

    /// Define a name in the current scope.
    ///
    /// A name may shadow one from an enclosing scope. Within one scope, a
    /// declaration-only symbol may be completed once by a later definition
    /// binding the same value; any other repeat is a redefinition.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        value: T,
        declaration_only: bool,
        mark: Mark,
    ) -> Result<(), SymbolError>
    where
        T: PartialEq,
    {
        let name = name.into();
        if let Some(existing) = self.current().symbols.get(&name) {
            if !existing.declaration_only || declaration_only || existing.value != value {
                return Err(SymbolError::Redefinition {
                    name,
                    mark,
                    first: existing.mark.clone(),
                });
            }
        }

        tracing::trace!(%name, declaration_only, "defined symbol");
        self.current_mut().symbols.insert(
            name.clone(),
            Symbol {
                name,
                value,
                declaration_only,
                mark,
            },
        );
        Ok(())
    }

    /// Look a name up through the scope chain, then the import layer
    pub fn lookup(&self, name: &str) -> Option<&Symbol<T>> {
        let mut scope = self.current();
        loop {
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            match scope.parent {
                Some(parent) => scope = &self.scopes[parent.0 as usize],
                None => break,
            }
        }
        self.imported.get(name)
    }

    /// Look a name up in the import layer only
    pub fn lookup_imported(&self, name: &str) -> Option<&Symbol<T>> {
        self.imported.get(name)
    }

    /// Look a name up in the current scope only
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol<T>> {
        self.current().symbols.get(name)
    }

    /// Symbols defined at module level, in definition order
    pub fn root_symbols(&self) -> impl Iterator<Item = &Symbol<T>> {
        self.scopes[ScopeId::ROOT.0 as usize].symbols.values()
    }

    /// Symbols in the import layer, in merge order
    pub fn imported_symbols(&self) -> impl Iterator<Item = &Symbol<T>> {
        self.imported.values()
    }

    /// Merge the root symbols of an imported module into the import layer.
    ///
    /// Names already imported keep their first binding.
    pub fn import_symbols(&mut self, symbols: impl IntoIterator<Item = Symbol<T>>) {
        for symbol in symbols {
            if self.imported.contains_key(&symbol.name) {
                tracing::trace!(name = %symbol.name, "import already provides symbol");
                continue;
            }
            self.imported.insert(symbol.name.clone(), symbol);
        }
    }

    /// Define a name directly in the import layer
    pub fn define_imported(&mut self, name: impl Into<String>, value: T, declaration_only: bool, mark: Mark) {
        let name = name.into();
        self.import_symbols([Symbol {
            name,
            value,
            declaration_only,
            mark,
        }]);
    }
}

impl<T: Clone> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
