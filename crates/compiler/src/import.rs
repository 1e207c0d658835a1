//! Module imports
//!
//! An import locates a module file on the search path, compiles it into
//! a fresh scope parented at the importer's *lib* scope (module code
//! resolves builtins but never the importer's locals), and re-exports
//! the module's words into the importing scope.
//!
//! Re-export comes in two shapes: an explicit name list imports exactly
//! those words, and a wildcard imports every word the module defined
//! itself; entries the module in turn imported are skipped, so imports
//! don't cascade. Names are prefixed with the `as` alias when one was
//! given, otherwise with the module basename (wildcards only; a
//! quoted-string import without `as` stays unprefixed).

use crate::ast::ImportStmt;
use crate::compile;
use crate::parser::Parser;
use alma_core::symbol::{Symbol, SymbolTable};
use alma_runtime::registry::{Func, FuncId, FuncKind, FuncRegistry, UserKind};
use alma_runtime::scope::{self, Scope, ScopeRef};
use alma_runtime::words::{NodeKind, WordNode};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Canonical module file extension.
pub const MODULE_EXTENSION: &str = ".alma";

/// Find `filename` in the colon-separated `search_path`, first hit wins.
pub fn resolve_import(filename: &str, search_path: &str) -> Option<PathBuf> {
    search_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(filename))
        .find(|candidate| candidate.is_file())
}

/// Parse a module file and compile it into `scope`, storing its
/// functions in the registry. The file handle is closed before
/// compilation begins.
pub fn put_file_into_scope(
    path: &Path,
    symtab: &mut SymbolTable,
    reg: &mut FuncRegistry,
    scope: &ScopeRef,
    search_path: &str,
) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("couldn't open {}: {}", path.display(), e))?;
    let decls = Parser::new(&source, symtab)
        .and_then(|mut p| p.parse())
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    compile::compile_decls(&decls, symtab, reg, scope, search_path, false)
        .map(|_| ())
        .map_err(|e| format!("{}: {}", path.display(), e))
}

/// Resolve one import declaration into `scope`.
pub fn handle_import(
    stmt: &ImportStmt,
    symtab: &mut SymbolTable,
    reg: &mut FuncRegistry,
    scope: &ScopeRef,
    search_path: &str,
    interactive: bool,
) -> Result<(), String> {
    let has_suffix = stmt.just_string || stmt.module.ends_with(MODULE_EXTENSION);
    let filename = if has_suffix {
        stmt.module.clone()
    } else {
        format!("{}{}", stmt.module, MODULE_EXTENSION)
    };

    let Some(path) = resolve_import(&filename, search_path) else {
        return Err(format!(
            "line {}: couldn't find '{}' anywhere in ALMA_PATH (searched: {})",
            stmt.line, filename, search_path
        ));
    };

    // Modules see the builtins and nothing of the importer.
    let module_scope = Scope::new(Some(&scope::lib_scope(scope)));
    put_file_into_scope(&path, symtab, reg, &module_scope, search_path)?;

    if let Some(names) = &stmt.names {
        for name in names {
            let entry = module_scope.borrow().lookup(name);
            match entry.and_then(|e| e.func) {
                // Missing names are diagnostics, not failures.
                None => eprintln!(
                    "couldn't import '{}' from {}: no such word defined",
                    name,
                    path.display()
                ),
                Some(target) => {
                    let local = match &stmt.alias {
                        Some(alias) => prefix_symbol(symtab, alias.name(), name),
                        None => name.clone(),
                    };
                    import_entry(reg, scope, &local, target, stmt.line, interactive)?;
                }
            }
        }
    } else {
        let prefix = match &stmt.alias {
            Some(alias) => Some(alias.name().to_string()),
            None if stmt.just_string => None,
            None => Some(module_basename(&stmt.module, has_suffix)),
        };
        let exported: Vec<(Symbol, FuncId)> = module_scope
            .borrow()
            .entries()
            .filter(|e| !e.imported)
            .filter_map(|e| e.func.map(|id| (e.sym.clone(), id)))
            .collect();
        for (sym, target) in exported {
            let local = match &prefix {
                Some(p) => prefix_symbol(symtab, p, &sym),
                None => sym,
            };
            import_entry(reg, scope, &local, target, stmt.line, interactive)?;
        }
    }

    Ok(())
}

/// Mint a re-export wrapper (a one-word body calling through to the
/// module's function) and bind it as an imported entry.
fn import_entry(
    reg: &mut FuncRegistry,
    scope: &ScopeRef,
    local: &Symbol,
    target: FuncId,
    line: usize,
    interactive: bool,
) -> Result<(), String> {
    let body = vec![WordNode::new(NodeKind::Word(target), line)];
    let id = reg.register(Func {
        sym: local.clone(),
        kind: FuncKind::User {
            kind: UserKind::Import,
            body: Rc::new(body),
        },
    });
    scope.borrow_mut().import(local, id, line)?;
    if interactive {
        println!("    => {}", local);
    }
    Ok(())
}

/// `prefix` + `.` + the symbol's name, interned.
fn prefix_symbol(symtab: &mut SymbolTable, prefix: &str, sym: &Symbol) -> Symbol {
    symtab.intern(&format!("{}.{}", prefix, sym.name()))
}

/// The last path segment of `module`, with the extension stripped when
/// the module was written with one.
fn module_basename(module: &str, strip_ext: bool) -> String {
    let base = module.rsplit('/').next().unwrap_or(module);
    if strip_ext && let Some(dot) = base.rfind('.') {
        return base[..dot].to_string();
    }
    base.to_string()
}
