//! Binding and scope compilation
//!
//! Lowers parsed declarations into the runtime's resolved word tree in
//! three passes over a declaration sequence:
//!
//! 1. every definition name is placeheld (so forward references are
//!    legal) and imports are pulled in, in declaration order;
//! 2. every placeholder is filled with its function id, bodies still
//!    empty, since ids must exist before any body compiles;
//! 3. bodies compile and are patched into the registry; bare top-level
//!    code compiles to runnable sequences.
//!
//! Within a body, a bareword resolves against the active bind/let name
//! frames innermost-out (shadowing permitted) and becomes a var-ref on a
//! hit; otherwise it resolves against the scope chain as a word call.
//! Diagnostics are collected across the whole unit and joined, so one
//! compile reports every unknown name rather than the first.

use crate::ast::{Decl, Expr, ExprKind};
use crate::import;
use alma_core::symbol::{Symbol, SymbolTable};
use alma_runtime::registry::{FuncId, FuncRegistry, UserKind};
use alma_runtime::scope::ScopeRef;
use alma_runtime::value::Value;
use alma_runtime::words::{self, NodeKind, WordNode, WordSeq};
use std::rc::Rc;

/// What a compile leaves behind besides scope and registry updates.
#[derive(Debug)]
pub struct CompiledProgram {
    /// Bare top-level sequences, in declaration order.
    pub code: Vec<WordSeq>,
}

/// Compile a declaration sequence into `scope`, registering functions
/// and resolving imports along the way.
pub fn compile_decls(
    decls: &[Decl],
    symtab: &mut SymbolTable,
    reg: &mut FuncRegistry,
    scope: &ScopeRef,
    search_path: &str,
    interactive: bool,
) -> Result<CompiledProgram, String> {
    let mut errors: Vec<String> = Vec::new();

    // Pass 1: promise definition names, resolve imports.
    let mut placeheld = vec![false; decls.len()];
    for (i, decl) in decls.iter().enumerate() {
        match decl {
            Decl::Def { name, line, .. } => match scope.borrow_mut().placehold(name, *line) {
                Ok(()) => placeheld[i] = true,
                Err(e) => errors.push(e),
            },
            Decl::Import(stmt) => {
                if let Err(e) =
                    import::handle_import(stmt, symtab, reg, scope, search_path, interactive)
                {
                    errors.push(e);
                }
            }
            Decl::Code { .. } => {}
        }
    }

    // Pass 2: fill every placeholder so ids exist before bodies compile.
    let mut ids: Vec<Option<FuncId>> = vec![None; decls.len()];
    for (i, decl) in decls.iter().enumerate() {
        if let Decl::Def { name, line, .. } = decl {
            if !placeheld[i] {
                continue;
            }
            match scope
                .borrow_mut()
                .user_register(reg, name, UserKind::Word, Vec::new(), *line)
            {
                Ok(id) => ids[i] = Some(id),
                Err(e) => errors.push(e),
            }
        }
    }

    // Pass 3: compile bodies.
    let mut code = Vec::new();
    for (i, decl) in decls.iter().enumerate() {
        let mut frames: Vec<Vec<Symbol>> = Vec::new();
        match decl {
            Decl::Def { body, .. } => {
                let Some(id) = ids[i] else { continue };
                let seq = compile_seq(body, scope, &mut frames, &mut errors);
                if let Err(e) = reg.set_user_body(id, seq) {
                    errors.push(e);
                }
            }
            Decl::Code { body, .. } => {
                code.push(compile_seq(body, scope, &mut frames, &mut errors));
            }
            Decl::Import(_) => {}
        }
    }

    // Finalization: a promise never kept is a compile failure.
    if errors.is_empty() {
        for entry in scope.borrow().unfilled_placeholders() {
            errors.push(format!(
                "line {}: '{}' was declared but never defined",
                entry.line, entry.sym
            ));
        }
    }

    if errors.is_empty() {
        Ok(CompiledProgram { code })
    } else {
        Err(errors.join("\n"))
    }
}

/// Compile one expression sequence. `frames` is the stack of active
/// bind/let name lists, innermost last.
fn compile_seq(
    exprs: &[Expr],
    scope: &ScopeRef,
    frames: &mut Vec<Vec<Symbol>>,
    errors: &mut Vec<String>,
) -> WordSeq {
    let mut seq = Vec::with_capacity(exprs.len());
    for expr in exprs {
        match &expr.kind {
            ExprKind::Int(i) => seq.push(WordNode::new(NodeKind::Push(Value::Int(*i)), expr.line)),
            ExprKind::Float(f) => {
                seq.push(WordNode::new(NodeKind::Push(Value::Float(*f)), expr.line));
            }
            ExprKind::Char(c) => {
                seq.push(WordNode::new(NodeKind::Push(Value::Char(*c)), expr.line));
            }
            ExprKind::Sym(sym) => {
                seq.push(WordNode::new(
                    NodeKind::Push(Value::Sym(sym.clone())),
                    expr.line,
                ));
            }
            ExprKind::Str(text) => {
                seq.push(WordNode::new(
                    NodeKind::Push(Value::Str(Rc::new(text.clone()))),
                    expr.line,
                ));
            }

            ExprKind::Name(sym) => {
                if let Some((depth, offset)) = resolve_local(frames, sym) {
                    seq.push(WordNode::new(NodeKind::VarRef { depth, offset }, expr.line));
                } else {
                    let entry = scope.borrow().lookup(sym);
                    match entry.and_then(|e| e.func) {
                        Some(id) => seq.push(WordNode::new(NodeKind::Word(id), expr.line)),
                        None => errors.push(format!(
                            "line {}: unknown word '{}'",
                            expr.line, sym
                        )),
                    }
                }
            }

            ExprKind::Block(body) => {
                let inner = compile_seq(body, scope, frames, errors);
                let captures = words::seq_captures(&inner);
                seq.push(WordNode::new(
                    NodeKind::Quotation {
                        body: Rc::new(inner),
                        captures,
                    },
                    expr.line,
                ));
            }

            ExprKind::Bind { names, body } => {
                frames.push(names.clone());
                let inner = compile_seq(body, scope, frames, errors);
                frames.pop();
                seq.push(WordNode::new(
                    NodeKind::Bind {
                        count: names.len(),
                        body: inner,
                    },
                    expr.line,
                ));
            }

            ExprKind::Let { names, defs, body } => {
                let defs_seq = compile_seq(defs, scope, frames, errors);
                frames.push(names.clone());
                let body_seq = compile_seq(body, scope, frames, errors);
                frames.pop();
                seq.push(WordNode::new(
                    NodeKind::Let {
                        count: names.len(),
                        defs: defs_seq,
                        body: body_seq,
                    },
                    expr.line,
                ));
            }
        }
    }
    seq
}

/// Innermost frame binding `sym`, as (depth, offset).
fn resolve_local(frames: &[Vec<Symbol>], sym: &Symbol) -> Option<(usize, usize)> {
    for (depth, frame) in frames.iter().rev().enumerate() {
        if let Some(offset) = frame.iter().position(|name| name == sym) {
            return Some((depth, offset));
        }
    }
    None
}
