//! The tree-walking evaluator
//!
//! Three mutually recursive operations: a sequence walks its nodes left
//! to right, a node dispatches on its kind, a word dispatches on the
//! function kind. The variable buffer threads through by reference;
//! bind and let extend it for the duration of their body, and the frame
//! they pushed survives the body only if a quotation captured it.
//!
//! Runtime errors are soft: a diagnostic on stderr, then execution
//! continues best-effort so an interactive session stays alive. The
//! embedder decides whether a dirty run is worth keeping.

use crate::registry::{Func, FuncKind, FuncRegistry};
use crate::stack::Stack;
use crate::value::{Block, Value};
use crate::vars::{self, VarBuf, VarFrame};
use crate::words::{NodeKind, WordNode, WordSeq};
use std::rc::Rc;

/// Evaluate a word sequence on `stack`, mutating it.
pub fn eval_sequence(reg: &FuncRegistry, stack: &mut Stack, buf: &VarBuf, seq: &WordSeq) {
    for node in seq {
        eval_node(reg, stack, buf, node);
    }
}

/// Evaluate a single node on `stack`.
pub fn eval_node(reg: &FuncRegistry, stack: &mut Stack, buf: &VarBuf, node: &WordNode) {
    match &node.kind {
        NodeKind::Push(value) => stack.push(value.clone()),

        NodeKind::Quotation { body, captures } => {
            let frame = if *captures { buf.clone() } else { None };
            stack.push(Value::Block(Block {
                words: body.clone(),
                frame,
            }));
        }

        NodeKind::VarRef { depth, offset } => match vars::get(buf, *depth, *offset) {
            Some(value) => {
                let value = value.clone();
                stack.push(value);
            }
            None => eprintln!("line {}: unresolvable variable reference", node.line),
        },

        NodeKind::Word(id) => match reg.get(*id) {
            Some(func) => eval_word(reg, stack, buf, func),
            None => eprintln!(
                "line {}: internal error: call to unregistered function #{}",
                node.line, id
            ),
        },

        NodeKind::Bind { count, body } => {
            if let Some(frame) = bind_frame(stack, buf, *count, node.line) {
                eval_sequence(reg, stack, &Some(frame), body);
            }
        }

        NodeKind::Let { count, defs, body } => {
            eval_sequence(reg, stack, buf, defs);
            if let Some(frame) = bind_frame(stack, buf, *count, node.line) {
                eval_sequence(reg, stack, &Some(frame), body);
            }
        }
    }
}

/// Evaluate a word (builtin or declared) on `stack`.
pub fn eval_word(reg: &FuncRegistry, stack: &mut Stack, buf: &VarBuf, func: &Func) {
    match &func.kind {
        FuncKind::Primitive(f) => f(reg, stack, buf),

        FuncKind::User { body, .. } => eval_sequence(reg, stack, buf, body),

        FuncKind::Bound { func: target, frame, .. } => match reg.get(*target) {
            // The captured frame replaces the caller's buffer for the
            // duration of the call; the caller's buffer is untouched.
            Some(inner) => eval_word(reg, stack, &Some(frame.clone()), inner),
            None => eprintln!(
                "internal error: bound function '{}' targets unregistered id #{}",
                func.sym, target
            ),
        },
    }
}

/// Evaluate a block value: its body runs under its captured buffer, not
/// the caller's.
pub fn apply_block(reg: &FuncRegistry, stack: &mut Stack, block: &Block) {
    eval_sequence(reg, stack, &block.frame, &block.words);
}

/// Pop `count` values into a fresh frame extending `buf`. The value on
/// top of the stack becomes slot 0 (the first bound name).
fn bind_frame(stack: &mut Stack, buf: &VarBuf, count: usize, line: usize) -> Option<Rc<VarFrame>> {
    if stack.size() < count {
        eprintln!(
            "line {}: stack underflow: binding {} name(s) with only {} value(s) on the stack",
            line,
            count,
            stack.size()
        );
        return None;
    }
    let mut vars = Vec::with_capacity(count);
    for _ in 0..count {
        vars.push(stack.take()?);
    }
    Some(VarFrame::extend(buf.clone(), vars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UserKind;
    use alma_core::symbol::SymbolTable;

    fn push(value: Value) -> WordNode {
        WordNode::new(NodeKind::Push(value), 1)
    }

    fn var(depth: usize, offset: usize) -> WordNode {
        WordNode::new(NodeKind::VarRef { depth, offset }, 1)
    }

    fn prim_add(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
        if let (Some(Value::Int(b)), Some(Value::Int(a))) = (st.take(), st.take()) {
            st.push(Value::Int(a + b));
        }
    }

    fn setup() -> (SymbolTable, FuncRegistry) {
        (SymbolTable::new(), FuncRegistry::new())
    }

    #[test]
    fn test_push_and_word() {
        let (mut table, mut reg) = setup();
        let add = reg.register(Func {
            sym: table.intern("+"),
            kind: FuncKind::Primitive(prim_add),
        });
        let seq = vec![
            push(Value::Int(4)),
            push(Value::Int(5)),
            WordNode::new(NodeKind::Word(add), 1),
        ];
        let mut st = Stack::new();
        eval_sequence(&reg, &mut st, &None, &seq);
        assert_eq!(st.size(), 1);
        assert_eq!(st.peek(0), Some(&Value::Int(9)));
    }

    #[test]
    fn test_bind_order_top_becomes_first_slot() {
        let (_, reg) = setup();
        // 1 2 3  bind(a b c) -> push a, push b, push c
        let seq = vec![
            push(Value::Int(1)),
            push(Value::Int(2)),
            push(Value::Int(3)),
            WordNode::new(
                NodeKind::Bind {
                    count: 3,
                    body: vec![var(0, 0), var(0, 1), var(0, 2)],
                },
                1,
            ),
        ];
        let mut st = Stack::new();
        eval_sequence(&reg, &mut st, &None, &seq);
        // a = 3 (old top), b = 2, c = 1; pushed in that order.
        assert_eq!(st.size(), 3);
        assert_eq!(st.peek(0), Some(&Value::Int(1)));
        assert_eq!(st.peek(1), Some(&Value::Int(2)));
        assert_eq!(st.peek(2), Some(&Value::Int(3)));
    }

    #[test]
    fn test_bind_removes_values_before_body() {
        let (_, reg) = setup();
        let seq = vec![
            push(Value::Int(7)),
            WordNode::new(NodeKind::Bind { count: 1, body: vec![] }, 1),
        ];
        let mut st = Stack::new();
        eval_sequence(&reg, &mut st, &None, &seq);
        assert!(st.is_empty());
    }

    #[test]
    fn test_bind_underflow_is_soft() {
        let (_, reg) = setup();
        let seq = vec![WordNode::new(
            NodeKind::Bind {
                count: 2,
                body: vec![push(Value::Int(1))],
            },
            3,
        )];
        let mut st = Stack::new();
        eval_sequence(&reg, &mut st, &None, &seq);
        // Body skipped, nothing pushed, no panic.
        assert!(st.is_empty());
    }

    #[test]
    fn test_let_runs_defs_first() {
        let (_, reg) = setup();
        // let x = 5 in x x end  -> two 5s
        let seq = vec![WordNode::new(
            NodeKind::Let {
                count: 1,
                defs: vec![push(Value::Int(5))],
                body: vec![var(0, 0), var(0, 0)],
            },
            1,
        )];
        let mut st = Stack::new();
        eval_sequence(&reg, &mut st, &None, &seq);
        assert_eq!(st.size(), 2);
        assert_eq!(st.peek(0), Some(&Value::Int(5)));
        assert_eq!(st.peek(1), Some(&Value::Int(5)));
    }

    #[test]
    fn test_quotation_captures_only_when_marked() {
        let (_, reg) = setup();
        let body = Rc::new(vec![var(0, 0)]);
        let capturing = vec![WordNode::new(
            NodeKind::Bind {
                count: 1,
                body: vec![WordNode::new(
                    NodeKind::Quotation {
                        body: body.clone(),
                        captures: true,
                    },
                    1,
                )],
            },
            1,
        )];
        let mut st = Stack::new();
        st.push(Value::Int(42));
        eval_sequence(&reg, &mut st, &None, &capturing);
        let Some(Value::Block(block)) = st.take() else {
            panic!("expected a block on the stack");
        };
        assert!(block.frame.is_some());

        // A non-capturing quotation gets the empty sentinel even when a
        // buffer is live.
        let plain = vec![WordNode::new(
            NodeKind::Bind {
                count: 1,
                body: vec![WordNode::new(
                    NodeKind::Quotation {
                        body: Rc::new(vec![push(Value::Int(1))]),
                        captures: false,
                    },
                    1,
                )],
            },
            1,
        )];
        st.push(Value::Int(0));
        eval_sequence(&reg, &mut st, &None, &plain);
        let Some(Value::Block(block)) = st.take() else {
            panic!("expected a block on the stack");
        };
        assert!(block.frame.is_none());
    }

    #[test]
    fn test_closure_survives_its_bind_frame() {
        let (mut table, mut reg) = setup();
        let add = reg.register(Func {
            sym: table.intern("+"),
            kind: FuncKind::Primitive(prim_add),
        });
        // 10 bind(a) { push quotation [ a 1 + ] }, then apply it after
        // the bind body has long finished.
        let quot_body = Rc::new(vec![
            var(0, 0),
            push(Value::Int(1)),
            WordNode::new(NodeKind::Word(add), 1),
        ]);
        let seq = vec![
            push(Value::Int(10)),
            WordNode::new(
                NodeKind::Bind {
                    count: 1,
                    body: vec![WordNode::new(
                        NodeKind::Quotation {
                            body: quot_body,
                            captures: true,
                        },
                        1,
                    )],
                },
                1,
            ),
        ];
        let mut st = Stack::new();
        eval_sequence(&reg, &mut st, &None, &seq);
        let Some(Value::Block(block)) = st.take() else {
            panic!("expected a block on the stack");
        };
        // Rebind the name to something else; the block must still see 10.
        let shadow = VarFrame::extend(None, vec![Value::Int(999)]);
        let _shadow_buf: VarBuf = Some(shadow);
        apply_block(&reg, &mut st, &block);
        assert_eq!(st.peek(0), Some(&Value::Int(11)));
    }

    #[test]
    fn test_bound_function_swaps_buffer() {
        let (mut table, mut reg) = setup();
        // target: pushes the variable at (0, 0)
        let target = reg.register(Func {
            sym: table.intern("peek-a"),
            kind: FuncKind::User {
                kind: UserKind::Word,
                body: Rc::new(vec![var(0, 0)]),
            },
        });
        let frame = VarFrame::extend(None, vec![Value::Int(77)]);
        let bound = reg.register(Func {
            sym: table.intern("peek-a/bound"),
            kind: FuncKind::Bound {
                func: target,
                frame,
                arity: 1,
            },
        });
        // Call with a caller buffer holding a different value: the bound
        // function must see its own snapshot.
        let caller_buf: VarBuf = Some(VarFrame::extend(None, vec![Value::Int(-1)]));
        let mut st = Stack::new();
        let func = reg.get(bound).unwrap();
        eval_word(&reg, &mut st, &caller_buf, func);
        assert_eq!(st.peek(0), Some(&Value::Int(77)));
        // And the caller's buffer is untouched afterwards.
        assert_eq!(vars::get(&caller_buf, 0, 0), Some(&Value::Int(-1)));
    }

    #[test]
    fn test_user_word_runs_with_caller_buffer() {
        let (mut table, mut reg) = setup();
        let id = reg.register(Func {
            sym: table.intern("through"),
            kind: FuncKind::User {
                kind: UserKind::LetBody,
                body: Rc::new(vec![var(0, 0)]),
            },
        });
        let buf: VarBuf = Some(VarFrame::extend(None, vec![Value::Int(5)]));
        let mut st = Stack::new();
        let func = reg.get(id).unwrap();
        eval_word(&reg, &mut st, &buf, func);
        assert_eq!(st.peek(0), Some(&Value::Int(5)));
    }
}
