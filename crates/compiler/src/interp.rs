//! Interpreter context
//!
//! One `Interp` owns everything a run needs: the symbol table, the
//! function registry, the lib scope with the builtins installed, the
//! top scope user code compiles into, and the module search path.
//! Nothing is process-global; embedders construct as many contexts as
//! they like and each is fully independent.

use crate::compile::{self, CompiledProgram};
use crate::parser::Parser;
use alma_core::symbol::SymbolTable;
use alma_runtime::eval;
use alma_runtime::registry::{FuncId, FuncRegistry};
use alma_runtime::scope::{Scope, ScopeRef};
use alma_runtime::stack::Stack;
use alma_runtime::words::WordSeq;
use std::path::Path;

/// Environment variable holding the colon-separated module search path.
pub const SEARCH_PATH_VAR: &str = "ALMA_PATH";

pub struct Interp {
    pub symtab: SymbolTable,
    pub registry: FuncRegistry,
    pub lib_scope: ScopeRef,
    pub scope: ScopeRef,
    pub search_path: String,
}

impl Interp {
    /// A fresh context with the builtin library installed and an
    /// explicit module search path.
    pub fn new(search_path: impl Into<String>) -> Result<Interp, String> {
        let mut symtab = SymbolTable::new();
        let mut registry = FuncRegistry::new();
        let lib_scope = Scope::new(None);
        alma_runtime::builtins::install(&mut symtab, &mut registry, &lib_scope)?;
        let scope = Scope::new(Some(&lib_scope));
        Ok(Interp {
            symtab,
            registry,
            lib_scope,
            scope,
            search_path: search_path.into(),
        })
    }

    /// A context whose search path comes from `ALMA_PATH`. The current
    /// directory is searched only when the variable says so (it is the
    /// default when the variable is unset).
    pub fn from_env() -> Result<Interp, String> {
        let path = std::env::var(SEARCH_PATH_VAR).unwrap_or_else(|_| ".".to_string());
        Interp::new(path)
    }

    /// Parse and compile `source` into the top scope. Returns the bare
    /// top-level sequences ready for evaluation.
    pub fn compile_source(
        &mut self,
        source: &str,
        interactive: bool,
    ) -> Result<CompiledProgram, String> {
        let decls = Parser::new(source, &mut self.symtab)?.parse()?;
        compile::compile_decls(
            &decls,
            &mut self.symtab,
            &mut self.registry,
            &self.scope,
            &self.search_path,
            interactive,
        )
    }

    /// The function id bound to `name` in the top scope, if any.
    pub fn find_func(&mut self, name: &str) -> Option<FuncId> {
        let sym = self.symtab.intern(name);
        self.scope.borrow().lookup(&sym).and_then(|e| e.func)
    }

    /// Evaluate a registered function on `stack` with an empty buffer.
    pub fn eval_func(&self, id: FuncId, stack: &mut Stack) {
        if let Some(func) = self.registry.get(id) {
            eval::eval_word(&self.registry, stack, &None, func);
        }
    }

    /// Evaluate a compiled sequence on `stack` with an empty buffer.
    pub fn eval_seq(&self, seq: &WordSeq, stack: &mut Stack) {
        eval::eval_sequence(&self.registry, stack, &None, seq);
    }

    /// Compile and run a whole program: bare top-level code in order,
    /// then `main` if one is defined.
    pub fn run_source(&mut self, source: &str, stack: &mut Stack) -> Result<(), String> {
        let program = self.compile_source(source, false)?;
        for seq in &program.code {
            self.eval_seq(seq, stack);
        }
        if let Some(id) = self.find_func("main") {
            self.eval_func(id, stack);
        }
        Ok(())
    }

    pub fn run_file(&mut self, path: &Path, stack: &mut Stack) -> Result<(), String> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("couldn't read {}: {}", path.display(), e))?;
        self.run_source(&source, stack)
    }
}
