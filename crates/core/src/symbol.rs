//! Symbol interning
//!
//! Every name an Alma program mentions is interned once per interpreter
//! instance. Asking the table twice for the same text returns the same
//! allocation, so symbols clone cheaply and can be compared by pointer.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An interned name.
///
/// Cloning bumps a reference count. Two symbols handed out by the same
/// table are pointer-identical exactly when their text is equal; equality
/// and hashing go through the text so symbols from different tables still
/// behave sensibly in maps.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// The interned text.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Identity comparison: same table entry, not merely the same text.
    pub fn is(&self, other: &Symbol) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Interning table. One lives inside each interpreter context; the symbols
/// it hands out stay valid for as long as anyone holds them.
#[derive(Default)]
pub struct SymbolTable {
    names: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// The symbol for `text`, creating it on first use.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(sym) = self.names.get(text) {
            return sym.clone();
        }
        let sym = Symbol(Rc::from(text));
        self.names.insert(text.to_string(), sym.clone());
        sym
    }

    /// Number of distinct names interned so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
