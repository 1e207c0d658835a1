//! The builtin word library
//!
//! Primitives installed into the lib scope: arithmetic, comparison,
//! stack shuffling, quotation combinators, and output. Numeric words
//! promote int to float when the operands mix; comparisons push 1 or 0
//! (there is no boolean value type). Type and underflow errors are
//! soft: a diagnostic on stderr, and the word gives up on whatever it
//! already consumed.

use crate::eval;
use crate::registry::{Func, FuncKind, FuncRegistry, PrimitiveFn};
use crate::scope::ScopeRef;
use crate::stack::Stack;
use crate::value::Value;
use crate::vars::VarBuf;
use alma_core::symbol::SymbolTable;
use std::io::Write;

/// Name → implementation table for the lib scope.
const BUILTINS: &[(&str, PrimitiveFn)] = &[
    // Arithmetic
    ("+", prim_add),
    ("-", prim_sub),
    ("*", prim_mul),
    ("/", prim_div),
    ("%", prim_mod),
    ("neg", prim_neg),
    // Comparison (1 or 0)
    ("=", prim_eq),
    ("<>", prim_ne),
    ("<", prim_lt),
    (">", prim_gt),
    ("<=", prim_le),
    (">=", prim_ge),
    // Stack shuffling
    ("dup", prim_dup),
    ("drop", prim_drop),
    ("swap", prim_swap),
    ("over", prim_over),
    ("rot", prim_rot),
    ("clear", prim_clear),
    // Quotation combinators
    ("apply", prim_apply),
    ("dip", prim_dip),
    ("if", prim_if),
    ("times", prim_times),
    // Output
    ("print", prim_print),
    ("println", prim_println),
];

/// Register every builtin into `scope` (normally the freshly created lib
/// scope) and the registry.
pub fn install(
    symtab: &mut SymbolTable,
    reg: &mut FuncRegistry,
    scope: &ScopeRef,
) -> Result<(), String> {
    let mut scope = scope.borrow_mut();
    for (name, f) in BUILTINS {
        let sym = symtab.intern(name);
        let id = reg.register(Func {
            sym: sym.clone(),
            kind: FuncKind::Primitive(*f),
        });
        scope.register(&sym, id, 0)?;
    }
    Ok(())
}

enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_float(&self) -> f64 {
        match *self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn take_num(st: &mut Stack, word: &str) -> Option<Num> {
    match st.take()? {
        Value::Int(i) => Some(Num::Int(i)),
        Value::Float(f) => Some(Num::Float(f)),
        other => {
            eprintln!("{}: expected a number, got {}", word, other.type_name());
            None
        }
    }
}

/// Pop two numbers (rhs is on top) and push the combined result,
/// promoting to float when the operands mix.
fn binary_numeric(
    st: &mut Stack,
    word: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) {
    let Some(b) = take_num(st, word) else { return };
    let Some(a) = take_num(st, word) else { return };
    match (&a, &b) {
        (Num::Int(x), Num::Int(y)) => match int_op(*x, *y) {
            Some(result) => st.push(Value::Int(result)),
            None => eprintln!("{}: undefined for {} and {}", word, x, y),
        },
        _ => st.push(Value::Float(float_op(a.as_float(), b.as_float()))),
    }
}

fn prim_add(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_numeric(st, "+", |a, b| Some(a.wrapping_add(b)), |a, b| a + b);
}

fn prim_sub(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_numeric(st, "-", |a, b| Some(a.wrapping_sub(b)), |a, b| a - b);
}

fn prim_mul(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_numeric(st, "*", |a, b| Some(a.wrapping_mul(b)), |a, b| a * b);
}

fn prim_div(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_numeric(st, "/", |a, b| a.checked_div(b), |a, b| a / b);
}

fn prim_mod(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_numeric(st, "%", |a, b| a.checked_rem(b), |a, b| a % b);
}

fn prim_neg(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    match take_num(st, "neg") {
        Some(Num::Int(i)) => st.push(Value::Int(-i)),
        Some(Num::Float(f)) => st.push(Value::Float(-f)),
        None => {}
    }
}

fn prim_eq(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let (Some(b), Some(a)) = (st.take(), st.take()) else {
        return;
    };
    st.push(Value::Int(i64::from(a == b)));
}

fn prim_ne(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let (Some(b), Some(a)) = (st.take(), st.take()) else {
        return;
    };
    st.push(Value::Int(i64::from(a != b)));
}

/// Pop two numbers and push the comparison result as 1 or 0.
fn binary_compare(st: &mut Stack, word: &str, op: fn(f64, f64) -> bool) {
    let Some(b) = take_num(st, word) else { return };
    let Some(a) = take_num(st, word) else { return };
    st.push(Value::Int(i64::from(op(a.as_float(), b.as_float()))));
}

fn prim_lt(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_compare(st, "<", |a, b| a < b);
}

fn prim_gt(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_compare(st, ">", |a, b| a > b);
}

fn prim_le(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_compare(st, "<=", |a, b| a <= b);
}

fn prim_ge(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    binary_compare(st, ">=", |a, b| a >= b);
}

fn prim_dup(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    if let Some(top) = st.peek(0) {
        let top = top.clone();
        st.push(top);
    }
}

fn prim_drop(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    st.take();
}

fn prim_swap(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let (Some(b), Some(a)) = (st.take(), st.take()) else {
        return;
    };
    st.push(b);
    st.push(a);
}

fn prim_over(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    if let Some(second) = st.peek(1) {
        let second = second.clone();
        st.push(second);
    }
}

fn prim_rot(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let (Some(c), Some(b), Some(a)) = (st.take(), st.take(), st.take()) else {
        return;
    };
    st.push(b);
    st.push(c);
    st.push(a);
}

fn prim_clear(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    st.clear();
}

fn take_block(st: &mut Stack, word: &str) -> Option<crate::value::Block> {
    match st.take()? {
        Value::Block(block) => Some(block),
        other => {
            eprintln!("{}: expected a quotation, got {}", word, other.type_name());
            None
        }
    }
}

fn prim_apply(reg: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    if let Some(block) = take_block(st, "apply") {
        eval::apply_block(reg, st, &block);
    }
}

/// ( x [q] dip -- q... x ): run the quotation underneath the top value.
fn prim_dip(reg: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let Some(block) = take_block(st, "dip") else { return };
    let Some(saved) = st.take() else { return };
    eval::apply_block(reg, st, &block);
    st.push(saved);
}

/// ( c [then] [else] if -- ... ): apply `then` when c is non-zero.
fn prim_if(reg: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let Some(else_block) = take_block(st, "if") else { return };
    let Some(then_block) = take_block(st, "if") else { return };
    let cond = match st.take() {
        Some(Value::Int(i)) => i != 0,
        Some(other) => {
            eprintln!("if: expected an int condition, got {}", other.type_name());
            return;
        }
        None => return,
    };
    if cond {
        eval::apply_block(reg, st, &then_block);
    } else {
        eval::apply_block(reg, st, &else_block);
    }
}

/// ( n [q] times -- ... ): apply the quotation n times.
fn prim_times(reg: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    let Some(block) = take_block(st, "times") else { return };
    let count = match st.take() {
        Some(Value::Int(i)) => i.max(0),
        Some(other) => {
            eprintln!("times: expected an int count, got {}", other.type_name());
            return;
        }
        None => return,
    };
    for _ in 0..count {
        eval::apply_block(reg, st, &block);
    }
}

fn prim_print(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    if let Some(value) = st.take() {
        print!("{}", value);
        std::io::stdout().flush().ok();
    }
}

fn prim_println(_: &FuncRegistry, st: &mut Stack, _: &VarBuf) {
    if let Some(value) = st.take() {
        println!("{}", value);
    }
}
