//! Alma runtime
//!
//! The data model (values, the stack, variable buffers), the function
//! registry and lexical scopes, the tree-walking evaluator, and the
//! builtin word library. The compiler crate lowers source text into
//! [`words`] trees; everything here executes them.

pub mod builtins;
pub mod eval;
pub mod registry;
pub mod scope;
pub mod stack;
pub mod value;
pub mod vars;
pub mod words;

pub use registry::{Func, FuncId, FuncKind, FuncRegistry, UserKind};
pub use scope::{Scope, ScopeEntry, ScopeRef};
pub use stack::Stack;
pub use value::{Block, Value};
pub use vars::{VarBuf, VarFrame};
pub use words::{NodeKind, WordNode, WordSeq};
