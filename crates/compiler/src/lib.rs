//! Alma compiler library
//!
//! Parses Alma source, compiles declarations into the runtime's word
//! tree (resolving names against bind/let frames and lexical scopes),
//! resolves module imports, and wires it all together behind the
//! [`Interp`] context the CLI and REPL drive.

pub mod ast;
pub mod compile;
pub mod import;
pub mod interp;
pub mod parser;
pub mod repl;

pub use ast::{Decl, Expr, ExprKind, ImportStmt};
pub use compile::{CompiledProgram, compile_decls};
pub use import::{handle_import, put_file_into_scope, resolve_import};
pub use interp::Interp;
pub use parser::Parser;
