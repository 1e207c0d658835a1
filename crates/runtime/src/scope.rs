//! Lexical scopes
//!
//! A scope maps symbols to function entries for one lexical region.
//! Scopes chain through parent pointers up to the lib scope holding the
//! builtins; name lookup walks the chain. Entries are written during
//! compilation only; the evaluator sees function ids, never scopes.
//!
//! Two kinds of entry matter for imports: *owned* entries (defined in
//! this scope) and *imported* entries (re-exported from elsewhere).
//! Imported entries resolve in lookups like any other, but a wildcard
//! re-export of the scope skips them, so importing a module never drags
//! in that module's own imports.

use crate::registry::{Func, FuncId, FuncKind, FuncRegistry, UserKind};
use crate::words::WordSeq;
use alma_core::symbol::Symbol;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type ScopeRef = Rc<RefCell<Scope>>;

/// One name binding. `func == None` marks a placeholder: the name is
/// promised (forward declaration) but not yet defined.
#[derive(Debug, Clone)]
pub struct ScopeEntry {
    pub sym: Symbol,
    pub func: Option<FuncId>,
    /// Imported entries are skipped by wildcard re-export.
    pub imported: bool,
    /// Line of the declaration, for diagnostics.
    pub line: usize,
}

pub struct Scope {
    entries: HashMap<Symbol, ScopeEntry>,
    parent: Option<ScopeRef>,
    /// Nearest ancestor holding the builtins; `None` when this scope is
    /// itself the lib scope.
    lib: Option<ScopeRef>,
}

impl Scope {
    /// A fresh scope below `parent` (or a new root lib scope).
    pub fn new(parent: Option<&ScopeRef>) -> ScopeRef {
        let lib = parent.map(lib_scope);
        Rc::new(RefCell::new(Scope {
            entries: HashMap::new(),
            parent: parent.cloned(),
            lib,
        }))
    }

    /// Reserve `sym` with a promise to define it later.
    pub fn placehold(&mut self, sym: &Symbol, line: usize) -> Result<(), String> {
        self.insert(sym, None, false, line)
    }

    /// Bind `sym` to an already-registered function, owned by this scope.
    pub fn register(&mut self, sym: &Symbol, func: FuncId, line: usize) -> Result<(), String> {
        self.insert(sym, Some(func), false, line)
    }

    /// Bind `sym` to a function re-exported from another scope.
    pub fn import(&mut self, sym: &Symbol, func: FuncId, line: usize) -> Result<(), String> {
        self.insert(sym, Some(func), true, line)
    }

    /// Fill a placeholder with a new user function built from `body`,
    /// returning its id. Fails if `sym` was never placeheld or is
    /// already defined.
    pub fn user_register(
        &mut self,
        reg: &mut FuncRegistry,
        sym: &Symbol,
        kind: UserKind,
        body: WordSeq,
        line: usize,
    ) -> Result<FuncId, String> {
        let Some(entry) = self.entries.get_mut(sym) else {
            return Err(format!(
                "line {}: internal error: '{}' was never declared in this scope",
                line, sym
            ));
        };
        if entry.func.is_some() {
            return Err(format!(
                "line {}: duplicate definition of '{}' (first defined at line {})",
                line, sym, entry.line
            ));
        }
        let id = reg.register(Func {
            sym: sym.clone(),
            kind: FuncKind::User {
                kind,
                body: Rc::new(body),
            },
        });
        entry.func = Some(id);
        Ok(id)
    }

    /// The first entry for `sym`, walking the parent chain.
    pub fn lookup(&self, sym: &Symbol) -> Option<ScopeEntry> {
        if let Some(entry) = self.entries.get(sym) {
            return Some(entry.clone());
        }
        let mut current = self.parent.clone();
        while let Some(scope) = current {
            let next = {
                let scope = scope.borrow();
                if let Some(entry) = scope.entries.get(sym) {
                    return Some(entry.clone());
                }
                scope.parent.clone()
            };
            current = next;
        }
        None
    }

    /// Iterate this scope's own entries (placeholders included).
    pub fn entries(&self) -> impl Iterator<Item = &ScopeEntry> {
        self.entries.values()
    }

    /// Placeholders that were promised but never filled in.
    pub fn unfilled_placeholders(&self) -> Vec<ScopeEntry> {
        self.entries
            .values()
            .filter(|e| e.func.is_none())
            .cloned()
            .collect()
    }

    fn insert(
        &mut self,
        sym: &Symbol,
        func: Option<FuncId>,
        imported: bool,
        line: usize,
    ) -> Result<(), String> {
        if let Some(existing) = self.entries.get(sym) {
            return Err(format!(
                "line {}: duplicate definition of '{}' (first defined at line {})",
                line, sym, existing.line
            ));
        }
        self.entries.insert(
            sym.clone(),
            ScopeEntry {
                sym: sym.clone(),
                func,
                imported,
                line,
            },
        );
        Ok(())
    }
}

/// The lib scope reachable from `scope` (itself, when it is the root).
pub fn lib_scope(scope: &ScopeRef) -> ScopeRef {
    let lib = scope.borrow().lib.clone();
    lib.unwrap_or_else(|| scope.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alma_core::symbol::SymbolTable;

    #[test]
    fn test_register_and_lookup() {
        let mut table = SymbolTable::new();
        let scope = Scope::new(None);
        let sym = table.intern("foo");
        scope.borrow_mut().register(&sym, 3, 1).unwrap();
        let entry = scope.borrow().lookup(&sym).unwrap();
        assert_eq!(entry.func, Some(3));
        assert!(!entry.imported);
    }

    #[test]
    fn test_duplicate_register_fails() {
        let mut table = SymbolTable::new();
        let scope = Scope::new(None);
        let sym = table.intern("foo");
        scope.borrow_mut().register(&sym, 0, 1).unwrap();
        let err = scope.borrow_mut().register(&sym, 1, 4).unwrap_err();
        assert!(err.contains("line 4"));
        assert!(err.contains("duplicate definition of 'foo'"));
    }

    #[test]
    fn test_lookup_walks_parent_chain() {
        let mut table = SymbolTable::new();
        let lib = Scope::new(None);
        let top = Scope::new(Some(&lib));
        let sym = table.intern("swap");
        lib.borrow_mut().register(&sym, 9, 0).unwrap();
        let entry = top.borrow().lookup(&sym).unwrap();
        assert_eq!(entry.func, Some(9));
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut table = SymbolTable::new();
        let lib = Scope::new(None);
        let top = Scope::new(Some(&lib));
        let sym = table.intern("f");
        lib.borrow_mut().register(&sym, 1, 0).unwrap();
        top.borrow_mut().register(&sym, 2, 5).unwrap();
        assert_eq!(top.borrow().lookup(&sym).unwrap().func, Some(2));
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let mut table = SymbolTable::new();
        let scope = Scope::new(None);
        let sym = table.intern("f");
        scope.borrow_mut().register(&sym, 4, 1).unwrap();
        for _ in 0..10 {
            assert_eq!(scope.borrow().lookup(&sym).unwrap().func, Some(4));
        }
    }

    #[test]
    fn test_placehold_then_user_register() {
        let mut table = SymbolTable::new();
        let mut reg = FuncRegistry::new();
        let scope = Scope::new(None);
        let sym = table.intern("f");
        scope.borrow_mut().placehold(&sym, 2).unwrap();
        assert!(scope.borrow().lookup(&sym).unwrap().func.is_none());
        let id = scope
            .borrow_mut()
            .user_register(&mut reg, &sym, UserKind::Word, Vec::new(), 2)
            .unwrap();
        assert_eq!(scope.borrow().lookup(&sym).unwrap().func, Some(id));
        assert!(scope.borrow().unfilled_placeholders().is_empty());
    }

    #[test]
    fn test_user_register_without_placehold_fails() {
        let mut table = SymbolTable::new();
        let mut reg = FuncRegistry::new();
        let scope = Scope::new(None);
        let sym = table.intern("f");
        let err = scope
            .borrow_mut()
            .user_register(&mut reg, &sym, UserKind::Word, Vec::new(), 1)
            .unwrap_err();
        assert!(err.contains("never declared"));
    }

    #[test]
    fn test_user_register_twice_fails() {
        let mut table = SymbolTable::new();
        let mut reg = FuncRegistry::new();
        let scope = Scope::new(None);
        let sym = table.intern("f");
        scope.borrow_mut().placehold(&sym, 1).unwrap();
        scope
            .borrow_mut()
            .user_register(&mut reg, &sym, UserKind::LetBody, Vec::new(), 1)
            .unwrap();
        assert!(
            scope
                .borrow_mut()
                .user_register(&mut reg, &sym, UserKind::Word, Vec::new(), 8)
                .is_err()
        );
    }

    #[test]
    fn test_unfilled_placeholders_reported() {
        let mut table = SymbolTable::new();
        let scope = Scope::new(None);
        scope.borrow_mut().placehold(&table.intern("ghost"), 7).unwrap();
        let unfilled = scope.borrow().unfilled_placeholders();
        assert_eq!(unfilled.len(), 1);
        assert_eq!(unfilled[0].sym.name(), "ghost");
        assert_eq!(unfilled[0].line, 7);
    }

    #[test]
    fn test_lib_scope_resolution() {
        let lib = Scope::new(None);
        let top = Scope::new(Some(&lib));
        let deeper = Scope::new(Some(&top));
        assert!(Rc::ptr_eq(&lib_scope(&lib), &lib));
        assert!(Rc::ptr_eq(&lib_scope(&top), &lib));
        assert!(Rc::ptr_eq(&lib_scope(&deeper), &lib));
    }

    #[test]
    fn test_imported_flag_round_trip() {
        let mut table = SymbolTable::new();
        let scope = Scope::new(None);
        let sym = table.intern("m.foo");
        scope.borrow_mut().import(&sym, 5, 3).unwrap();
        assert!(scope.borrow().lookup(&sym).unwrap().imported);
    }
}
