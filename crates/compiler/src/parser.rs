//! Parser for Alma syntax
//!
//! Syntax:
//! ```text
//! # a definition
//! double = [ a -> a a + ]
//!
//! # bare code runs top to bottom
//! 4 double println
//!
//! # imports
//! import utils as u
//! import "vendor/geometry.alma" as geo ( area )
//! ```
//!
//! Literals: integers, floats, `"strings"` (backslash escapes processed
//! by the ustring parser), `'c'` chars, `:symbols`. Quotations are
//! `[ ... ]`; `a b -> ...` binds stack values for the rest of the
//! sequence; `let a = ... in ... end` binds the results of a
//! sub-sequence. `#` starts a comment.

use crate::ast::{Decl, Expr, ExprKind, ImportStmt};
use alma_core::symbol::{Symbol, SymbolTable};
use alma_core::ustring::{self, Ustring};

/// A token with the 1-indexed source line it started on.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub line: usize,
}

impl Token {
    fn new(text: String, line: usize) -> Self {
        Token { text, line }
    }
}

/// Tokens with structural meaning; everything else that isn't a literal
/// is a bareword.
const KEYWORDS: &[&str] = &["[", "]", "(", ")", "->", "let", "in", "end", "import", "as"];

enum TokKind {
    Int(i64),
    Float(f64),
    Str,
    Char,
    Sym,
    Keyword,
    Name,
}

fn classify(text: &str) -> TokKind {
    if text.starts_with('"') {
        return TokKind::Str;
    }
    if text.starts_with('\'') {
        return TokKind::Char;
    }
    if text.len() > 1 && text.starts_with(':') {
        return TokKind::Sym;
    }
    if KEYWORDS.contains(&text) {
        return TokKind::Keyword;
    }
    if let Ok(i) = text.parse::<i64>() {
        return TokKind::Int(i);
    }
    // Only digit-leading tokens may be floats; f64's parser would also
    // accept words like "inf" and "NaN".
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && let Ok(f) = text.parse::<f64>()
    {
        return TokKind::Float(f);
    }
    TokKind::Name
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    symtab: &'a mut SymbolTable,
}

impl<'a> Parser<'a> {
    pub fn new(source: &str, symtab: &'a mut SymbolTable) -> Result<Parser<'a>, String> {
        Ok(Parser {
            tokens: tokenize(source)?,
            pos: 0,
            symtab,
        })
    }

    /// Parse the whole input into a declaration sequence.
    pub fn parse(&mut self) -> Result<Vec<Decl>, String> {
        let mut decls = Vec::new();
        while !self.is_at_end() {
            if self.check("import") {
                decls.push(Decl::Import(self.parse_import()?));
            } else if self.at_definition() {
                decls.push(self.parse_def()?);
            } else {
                decls.push(self.parse_code()?);
            }
        }
        Ok(decls)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn check(&self, text: &str) -> bool {
        self.current().is_some_and(|t| t.text == text)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<(), String> {
        match self.current() {
            Some(t) if t.text == text => {}
            Some(t) => {
                return Err(format!(
                    "line {}: expected '{}' {}, got '{}'",
                    t.line, text, context, t.text
                ));
            }
            None => {
                return Err(format!(
                    "line {}: expected '{}' {}, got end of input",
                    self.last_line(),
                    text,
                    context
                ));
            }
        }
        self.pos += 1;
        Ok(())
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    /// `name = [` starts a definition.
    fn at_definition(&self) -> bool {
        let name = self
            .tokens
            .get(self.pos)
            .is_some_and(|t| matches!(classify(&t.text), TokKind::Name) && t.text != "=");
        name && self.tokens.get(self.pos + 1).is_some_and(|t| t.text == "=")
            && self.tokens.get(self.pos + 2).is_some_and(|t| t.text == "[")
    }

    fn parse_def(&mut self) -> Result<Decl, String> {
        let name_token = self.advance().ok_or("expected a definition name")?;
        let name = self.symtab.intern(&name_token.text);
        self.expect("=", "in definition")?;
        self.expect("[", "after '='")?;
        let body = self.parse_seq(&["]"], false)?;
        self.expect("]", "to close the definition body")?;
        Ok(Decl::Def {
            name,
            body,
            line: name_token.line,
        })
    }

    fn parse_code(&mut self) -> Result<Decl, String> {
        let line = self.current().map_or(1, |t| t.line);
        let body = self.parse_seq(&[], true)?;
        Ok(Decl::Code { body, line })
    }

    fn parse_import(&mut self) -> Result<ImportStmt, String> {
        let import_token = self.advance().ok_or("expected 'import'")?;
        let line = import_token.line;

        let module_token = self
            .advance()
            .ok_or_else(|| format!("line {}: expected a module name after 'import'", line))?;
        let (module, just_string) = match classify(&module_token.text) {
            TokKind::Str => (string_contents(&module_token.text).to_string(), true),
            TokKind::Name => (module_token.text.clone(), false),
            _ => {
                return Err(format!(
                    "line {}: expected a module name after 'import', got '{}'",
                    line, module_token.text
                ));
            }
        };

        let mut alias = None;
        let mut names = None;
        loop {
            if self.check("as") && alias.is_none() {
                self.pos += 1;
                let alias_token = self
                    .advance()
                    .ok_or_else(|| format!("line {}: expected a name after 'as'", line))?;
                if !matches!(classify(&alias_token.text), TokKind::Name) {
                    return Err(format!(
                        "line {}: expected a name after 'as', got '{}'",
                        alias_token.line, alias_token.text
                    ));
                }
                alias = Some(self.symtab.intern(&alias_token.text));
            } else if self.check("(") && names.is_none() {
                self.pos += 1;
                let mut list = Vec::new();
                loop {
                    if self.check(")") {
                        self.pos += 1;
                        break;
                    }
                    let token = self.advance().ok_or_else(|| {
                        format!("line {}: unclosed import name list", line)
                    })?;
                    if !matches!(classify(&token.text), TokKind::Name) {
                        return Err(format!(
                            "line {}: expected a name in import list, got '{}'",
                            token.line, token.text
                        ));
                    }
                    list.push(self.symtab.intern(&token.text));
                }
                names = Some(list);
            } else {
                break;
            }
        }

        Ok(ImportStmt {
            module,
            alias,
            names,
            just_string,
            line,
        })
    }

    /// Parse a word sequence until one of `terminators` (left for the
    /// caller to consume) or, at the top level, until the next
    /// declaration starts.
    fn parse_seq(&mut self, terminators: &[&str], top_level: bool) -> Result<Vec<Expr>, String> {
        let mut exprs = Vec::new();
        // Barewords are held back until we know whether a `->` follows.
        let mut pending: Vec<(Symbol, usize)> = Vec::new();

        loop {
            let Some(token) = self.current().cloned() else {
                if terminators.is_empty() {
                    flush_names(&mut pending, &mut exprs);
                    return Ok(exprs);
                }
                return Err(format!(
                    "line {}: unexpected end of input (expected '{}')",
                    self.last_line(),
                    terminators[0]
                ));
            };

            if terminators.contains(&token.text.as_str())
                || (top_level && (self.check("import") || self.at_definition()))
            {
                flush_names(&mut pending, &mut exprs);
                return Ok(exprs);
            }

            if token.text == "->" {
                self.pos += 1;
                if pending.is_empty() {
                    return Err(format!("line {}: '->' with no names to bind", token.line));
                }
                let names = pending.drain(..).map(|(sym, _)| sym).collect();
                let body = self.parse_seq(terminators, top_level)?;
                exprs.push(Expr {
                    kind: ExprKind::Bind { names, body },
                    line: token.line,
                });
                return Ok(exprs);
            }

            if matches!(classify(&token.text), TokKind::Name) {
                self.pos += 1;
                pending.push((self.symtab.intern(&token.text), token.line));
                continue;
            }

            flush_names(&mut pending, &mut exprs);

            match classify(&token.text) {
                TokKind::Int(i) => {
                    self.pos += 1;
                    exprs.push(Expr {
                        kind: ExprKind::Int(i),
                        line: token.line,
                    });
                }
                TokKind::Float(f) => {
                    self.pos += 1;
                    exprs.push(Expr {
                        kind: ExprKind::Float(f),
                        line: token.line,
                    });
                }
                TokKind::Str => {
                    self.pos += 1;
                    let parsed = Ustring::parse(string_contents(&token.text).as_bytes());
                    exprs.push(Expr {
                        kind: ExprKind::Str(parsed),
                        line: token.line,
                    });
                }
                TokKind::Char => {
                    self.pos += 1;
                    let inner = string_contents(&token.text);
                    if inner.is_empty() {
                        return Err(format!("line {}: empty character literal", token.line));
                    }
                    let ch = ustring::char_parse(inner.as_bytes());
                    if ch == 0 {
                        return Err(format!("line {}: empty character literal", token.line));
                    }
                    exprs.push(Expr {
                        kind: ExprKind::Char(ch),
                        line: token.line,
                    });
                }
                TokKind::Sym => {
                    self.pos += 1;
                    let sym = self.symtab.intern(&token.text[1..]);
                    exprs.push(Expr {
                        kind: ExprKind::Sym(sym),
                        line: token.line,
                    });
                }
                TokKind::Keyword if token.text == "[" => {
                    self.pos += 1;
                    let body = self.parse_seq(&["]"], false)?;
                    self.expect("]", "to close the quotation")?;
                    exprs.push(Expr {
                        kind: ExprKind::Block(body),
                        line: token.line,
                    });
                }
                TokKind::Keyword if token.text == "let" => {
                    exprs.push(self.parse_let()?);
                }
                _ => {
                    return Err(format!(
                        "line {}: unexpected '{}'",
                        token.line, token.text
                    ));
                }
            }
        }
    }

    fn parse_let(&mut self) -> Result<Expr, String> {
        let let_token = self.advance().ok_or("expected 'let'")?;
        let line = let_token.line;

        let mut names = Vec::new();
        loop {
            let Some(token) = self.current().cloned() else {
                return Err(format!("line {}: unexpected end of input in let", line));
            };
            if token.text == "=" {
                self.pos += 1;
                break;
            }
            if !matches!(classify(&token.text), TokKind::Name) {
                return Err(format!(
                    "line {}: expected a name or '=' in let, got '{}'",
                    token.line, token.text
                ));
            }
            self.pos += 1;
            names.push(self.symtab.intern(&token.text));
        }
        if names.is_empty() {
            return Err(format!("line {}: let binds no names", line));
        }

        let defs = self.parse_seq(&["in"], false)?;
        self.expect("in", "after the let definition")?;
        let body = self.parse_seq(&["end"], false)?;
        self.expect("end", "to close the let")?;

        Ok(Expr {
            kind: ExprKind::Let { names, defs, body },
            line,
        })
    }
}

fn flush_names(pending: &mut Vec<(Symbol, usize)>, exprs: &mut Vec<Expr>) {
    for (sym, line) in pending.drain(..) {
        exprs.push(Expr {
            kind: ExprKind::Name(sym),
            line,
        });
    }
}

/// Strip the surrounding quotes from a string or char token.
fn string_contents(text: &str) -> &str {
    let inner = &text[1..];
    inner.strip_suffix(|c| c == '"' || c == '\'').unwrap_or(inner)
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_line = 1;

    let mut line = 1;
    let mut in_string = false;
    let mut in_char = false;
    let mut in_comment = false;
    let mut prev_was_backslash = false;

    for ch in source.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
                line += 1;
            }
            continue;
        }

        if in_string || in_char {
            current.push(ch);
            let closer = if in_string { '"' } else { '\'' };
            if ch == closer && !prev_was_backslash {
                in_string = false;
                in_char = false;
                tokens.push(Token::new(current.clone(), current_line));
                current.clear();
                prev_was_backslash = false;
            } else {
                prev_was_backslash = ch == '\\' && !prev_was_backslash;
            }
            if ch == '\n' {
                line += 1;
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                if !current.is_empty() {
                    tokens.push(Token::new(current.clone(), current_line));
                    current.clear();
                }
                if ch == '"' {
                    in_string = true;
                } else {
                    in_char = true;
                }
                current_line = line;
                current.push(ch);
                prev_was_backslash = false;
            }
            '#' => {
                if !current.is_empty() {
                    tokens.push(Token::new(current.clone(), current_line));
                    current.clear();
                }
                in_comment = true;
            }
            '[' | ']' | '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(Token::new(current.clone(), current_line));
                    current.clear();
                }
                tokens.push(Token::new(ch.to_string(), line));
            }
            _ if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(Token::new(current.clone(), current_line));
                    current.clear();
                }
                if ch == '\n' {
                    line += 1;
                }
            }
            _ => {
                if current.is_empty() {
                    current_line = line;
                }
                current.push(ch);
            }
        }
    }

    if in_string || in_char {
        return Err(format!(
            "line {}: unclosed {} literal",
            current_line,
            if in_string { "string" } else { "character" }
        ));
    }
    if !current.is_empty() {
        tokens.push(Token::new(current, current_line));
    }

    Ok(tokens)
}
