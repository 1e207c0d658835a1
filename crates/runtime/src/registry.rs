//! The function registry
//!
//! Every callable word (builtin, user-defined, or partially bound)
//! lives in exactly one place: the registry. Scopes and word nodes refer
//! to functions by dense integer id and never own them, which keeps the
//! ownership graph a tree. The registry is only written during
//! compilation; at run time it is read-only.

use crate::stack::Stack;
use crate::vars::{VarBuf, VarFrame};
use crate::words::WordSeq;
use alma_core::symbol::Symbol;
use std::fmt;
use std::rc::Rc;

/// Dense id of a registered function.
pub type FuncId = usize;

/// Signature of a builtin word: the registry (so combinators like
/// `apply` can re-enter the evaluator), the stack, and the variable
/// buffer in effect at the call.
pub type PrimitiveFn = fn(&FuncRegistry, &mut Stack, &VarBuf);

/// What flavor of user-defined body a function carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKind {
    /// Plain word definition.
    Word,
    /// Re-export wrapper minted by the import resolver.
    Import,
    /// Body of a let binding.
    LetBody,
}

/// A callable word.
#[derive(Clone)]
pub struct Func {
    /// Source name, for diagnostics.
    pub sym: Symbol,
    pub kind: FuncKind,
}

#[derive(Clone)]
pub enum FuncKind {
    /// Builtin.
    Primitive(PrimitiveFn),

    /// User-defined word sequence, evaluated with the caller's buffer.
    User { kind: UserKind, body: Rc<WordSeq> },

    /// Partially-bound function: call `func` with `frame` swapped in as
    /// the variable buffer. `arity` records how many values the frame
    /// bound.
    Bound {
        func: FuncId,
        frame: Rc<VarFrame>,
        arity: usize,
    },
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FuncKind::Primitive(_) => write!(f, "Func({}, primitive)", self.sym),
            FuncKind::User { kind, body } => {
                write!(f, "Func({}, {:?}, {} words)", self.sym, kind, body.len())
            }
            FuncKind::Bound { func, arity, .. } => {
                write!(f, "Func({}, bound -> #{}, arity {})", self.sym, func, arity)
            }
        }
    }
}

/// Owns every function; everything else holds ids into it.
#[derive(Default)]
pub struct FuncRegistry {
    funcs: Vec<Func>,
}

impl FuncRegistry {
    pub fn new() -> Self {
        FuncRegistry::default()
    }

    /// Take ownership of `func`, returning its id.
    pub fn register(&mut self, func: Func) -> FuncId {
        self.funcs.push(func);
        self.funcs.len() - 1
    }

    pub fn get(&self, id: FuncId) -> Option<&Func> {
        self.funcs.get(id)
    }

    /// Replace the body of a user function after its id was handed out.
    /// This is how forward references compile: ids exist before bodies.
    pub fn set_user_body(&mut self, id: FuncId, body: WordSeq) -> Result<(), String> {
        match self.funcs.get_mut(id) {
            Some(Func {
                kind: FuncKind::User { body: slot, .. },
                ..
            }) => {
                *slot = Rc::new(body);
                Ok(())
            }
            Some(func) => Err(format!(
                "internal error: '{}' is not a user function",
                func.sym
            )),
            None => Err(format!("internal error: no function with id #{}", id)),
        }
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alma_core::symbol::SymbolTable;

    fn noop(_: &FuncRegistry, _: &mut Stack, _: &VarBuf) {}

    #[test]
    fn test_register_and_get() {
        let mut table = SymbolTable::new();
        let mut reg = FuncRegistry::new();
        let id = reg.register(Func {
            sym: table.intern("nop"),
            kind: FuncKind::Primitive(noop),
        });
        assert_eq!(id, 0);
        assert_eq!(reg.get(id).map(|f| f.sym.name()), Some("nop"));
        assert!(reg.get(7).is_none());
    }

    #[test]
    fn test_set_user_body() {
        let mut table = SymbolTable::new();
        let mut reg = FuncRegistry::new();
        let id = reg.register(Func {
            sym: table.intern("later"),
            kind: FuncKind::User {
                kind: UserKind::Word,
                body: Rc::new(Vec::new()),
            },
        });
        assert!(reg.set_user_body(id, Vec::new()).is_ok());

        let prim = reg.register(Func {
            sym: table.intern("nop"),
            kind: FuncKind::Primitive(noop),
        });
        assert!(reg.set_user_body(prim, Vec::new()).is_err());
        assert!(reg.set_user_body(99, Vec::new()).is_err());
    }
}
