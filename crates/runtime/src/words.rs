//! The resolved program tree
//!
//! The compiler lowers parsed declarations into this tree and the
//! evaluator walks it directly: word references are already resolved to
//! registry ids, and bareword variable references to `(depth, offset)`
//! coordinates. Every node remembers its source line for diagnostics.

use crate::registry::FuncId;
use crate::value::Value;
use std::rc::Rc;

/// A sequence of words, evaluated left to right.
pub type WordSeq = Vec<WordNode>;

#[derive(Debug, Clone)]
pub struct WordNode {
    pub kind: NodeKind,
    /// Source line (1-indexed).
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Push a literal value.
    Push(Value),

    /// Push a quotation over `body`.
    Quotation {
        body: Rc<WordSeq>,
        /// Whether the body (transitively) reads any variable. When
        /// false the quotation is built with the empty sentinel buffer
        /// instead of retaining the creation-site frame chain.
        captures: bool,
    },

    /// Push the value bound at `(depth, offset)` in the variable buffer.
    VarRef { depth: usize, offset: usize },

    /// Call a function by registry id.
    Word(FuncId),

    /// Pop `count` values into a fresh frame (the old top becomes slot
    /// 0) and evaluate `body` under the extended buffer.
    Bind { count: usize, body: WordSeq },

    /// Evaluate `defs` against the current stack, then bind `count`
    /// values as `Bind` does and evaluate `body`.
    Let {
        count: usize,
        defs: WordSeq,
        body: WordSeq,
    },
}

impl WordNode {
    pub fn new(kind: NodeKind, line: usize) -> WordNode {
        WordNode { kind, line }
    }
}

/// True if any node in `seq` (transitively, through quotations and
/// binding bodies) reads a variable.
pub fn seq_captures(seq: &WordSeq) -> bool {
    seq.iter().any(|node| match &node.kind {
        NodeKind::VarRef { .. } => true,
        NodeKind::Quotation { captures, .. } => *captures,
        NodeKind::Bind { body, .. } => seq_captures(body),
        NodeKind::Let { defs, body, .. } => seq_captures(defs) || seq_captures(body),
        NodeKind::Push(_) | NodeKind::Word(_) => false,
    })
}
