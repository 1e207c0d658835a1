//! Surface syntax tree
//!
//! What the parser produces: declarations containing expression
//! sequences whose barewords are still unresolved. The compiler decides
//! whether each bareword is a bound variable or a word in scope and
//! lowers everything into the runtime's resolved tree.

use alma_core::symbol::Symbol;
use alma_core::ustring::Ustring;

/// One top-level declaration.
#[derive(Debug)]
pub enum Decl {
    /// `name = [ words... ]`
    Def {
        name: Symbol,
        body: Vec<Expr>,
        line: usize,
    },

    /// `import module [as alias] [( names... )]`
    Import(ImportStmt),

    /// Bare top-level words, evaluated in declaration order.
    Code { body: Vec<Expr>, line: usize },
}

/// An import declaration.
#[derive(Debug)]
pub struct ImportStmt {
    /// Module path as written (without quotes, for string imports).
    pub module: String,
    /// `as` alias for prefixing re-exported names.
    pub alias: Option<Symbol>,
    /// Explicit names to re-export; `None` means wildcard.
    pub names: Option<Vec<Symbol>>,
    /// Quoted-string import: no extension handling, no basename prefix.
    pub just_string: bool,
    pub line: usize,
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Debug)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(Ustring),
    Char(u32),
    Sym(Symbol),

    /// Bareword: bound variable or word reference, decided at compile
    /// time.
    Name(Symbol),

    /// `[ words... ]`
    Block(Vec<Expr>),

    /// `a b -> words...`: pops one value per name (the old top becomes
    /// the first name) and runs the rest of the enclosing sequence with
    /// them bound.
    Bind { names: Vec<Symbol>, body: Vec<Expr> },

    /// `let a b = defs... in words... end`
    Let {
        names: Vec<Symbol>,
        defs: Vec<Expr>,
        body: Vec<Expr>,
    },
}
