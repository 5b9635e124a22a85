//! Remove this library's markers from source being rewritten.
//!
//! A rewritten file must stand alone, so its `use catspaw::…` imports and
//! every statement that reaches into the library are deleted. Deletion is
//! line-based on the parsed item spans, which keeps the surrounding text
//! (comments, formatting, unrelated code) byte-for-byte intact.

use anyhow::Result;
use std::collections::HashMap;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{Item, ItemFn, ItemUse, UseTree};

use crate::codegen::LIBRARY_CRATE;

/// Maps locally-visible names to the full paths their `use` items bind,
/// so `as_command(...)` is recognized as a library call after
/// `use catspaw::as_command;`.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: HashMap<String, String>,
}

impl SymbolTable {
    pub fn build(file: &syn::File) -> Self {
        let mut table = SymbolTable::default();
        for item in &file.items {
            if let Item::Use(u) = item {
                let mut prefix = Vec::new();
                table.add_tree(&mut prefix, &u.tree);
            }
        }
        table
    }

    fn add_tree(&mut self, prefix: &mut Vec<String>, tree: &UseTree) {
        match tree {
            UseTree::Path(p) => {
                prefix.push(p.ident.to_string());
                self.add_tree(prefix, &p.tree);
                prefix.pop();
            }
            UseTree::Name(n) => {
                let full = join_path(prefix, &n.ident.to_string());
                self.map.insert(n.ident.to_string(), full);
            }
            UseTree::Rename(r) => {
                let full = join_path(prefix, &r.ident.to_string());
                self.map.insert(r.rename.to_string(), full);
            }
            UseTree::Group(g) => {
                for t in &g.items {
                    self.add_tree(prefix, t);
                }
            }
            UseTree::Glob(_) => {}
        }
    }

    /// Expand a path through the imports of this file.
    pub fn resolve(&self, path: &syn::Path) -> Option<String> {
        let segs: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let first = segs.first()?;
        if first == LIBRARY_CRATE {
            return Some(segs.join("::"));
        }
        let full = self.map.get(first)?;
        let mut out = full.clone();
        for seg in &segs[1..] {
            out.push_str("::");
            out.push_str(seg);
        }
        Some(out)
    }

    pub fn is_library(&self, path: &syn::Path) -> bool {
        match self.resolve(path) {
            Some(full) => {
                full == LIBRARY_CRATE || full.starts_with(&format!("{LIBRARY_CRATE}::"))
            }
            None => false,
        }
    }
}

fn join_path(prefix: &[String], last: &str) -> String {
    let mut out = prefix.join("::");
    if !out.is_empty() {
        out.push_str("::");
    }
    out.push_str(last);
    out
}

struct LibraryRefFinder<'a> {
    table: &'a SymbolTable,
    found: bool,
}

impl<'a, 'ast> Visit<'ast> for LibraryRefFinder<'a> {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        if self.table.is_library(node) {
            self.found = true;
        }
        visit::visit_path(self, node);
    }
}

fn references_library(table: &SymbolTable, node: &dyn Fn(&mut LibraryRefFinder)) -> bool {
    let mut finder = LibraryRefFinder {
        table,
        found: false,
    };
    node(&mut finder);
    finder.found
}

/// Inclusive 1-based line range covered by a parsed node.
fn line_range<T: Spanned>(node: &T) -> (usize, usize) {
    let span = node.span();
    (span.start().line, span.end().line)
}

fn is_library_use(item: &ItemUse) -> bool {
    fn root_ident(tree: &UseTree) -> Option<String> {
        match tree {
            UseTree::Path(p) => Some(p.ident.to_string()),
            UseTree::Name(n) => Some(n.ident.to_string()),
            UseTree::Rename(r) => Some(r.ident.to_string()),
            _ => None,
        }
    }
    root_ident(&item.tree).as_deref() == Some(LIBRARY_CRATE)
}

/// Rewrite `source` with every marker of this library removed: its `use`
/// items, a `main` that drives it, and in other functions the individual
/// statements that touch it. A function whose body empties out keeps a
/// `();` placeholder so it still parses.
pub fn strip_markers(source: &str) -> Result<String> {
    let file = syn::parse_file(source)?;
    let table = SymbolTable::build(&file);

    // (start, end) inclusive, 1-based
    let mut removals: Vec<(usize, usize)> = Vec::new();
    // line number -> indentation for a `();` placeholder
    let mut placeholders: Vec<(usize, String)> = Vec::new();
    let lines: Vec<&str> = source.lines().collect();

    for item in &file.items {
        match item {
            Item::Use(u) => {
                if is_library_use(u) {
                    removals.push(line_range(u));
                }
            }
            Item::Fn(f) => {
                if !fn_references_library(&table, f) {
                    continue;
                }
                // A helper typed against the library cannot survive the
                // import's removal; it goes wholesale, like a driving main.
                if f.sig.ident == "main"
                    || references_library(&table, &|finder| finder.visit_signature(&f.sig))
                {
                    removals.push(line_range(f));
                    continue;
                }
                let mut removed = Vec::new();
                for stmt in &f.block.stmts {
                    if references_library(&table, &|finder| finder.visit_stmt(stmt)) {
                        removed.push(line_range(stmt));
                    }
                }
                if removed.len() == f.block.stmts.len() && !removed.is_empty() {
                    let first = removed[0].0;
                    let indent = lines
                        .get(first - 1)
                        .map(|l| l[..l.len() - l.trim_start().len()].to_string())
                        .unwrap_or_default();
                    placeholders.push((first, indent));
                }
                removals.extend(removed);
            }
            _ => {}
        }
    }

    let mut kept: Vec<String> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let lineno = idx + 1;
        if let Some((_, indent)) = placeholders.iter().find(|(at, _)| *at == lineno) {
            kept.push(format!("{indent}();"));
        }
        if removals.iter().any(|(s, e)| (*s..=*e).contains(&lineno)) {
            continue;
        }
        kept.push(line.to_string());
    }

    let mut out = kept.join("\n");
    out.push('\n');
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    Ok(out)
}

fn fn_references_library(table: &SymbolTable, f: &ItemFn) -> bool {
    references_library(table, &|finder| finder.visit_item_fn(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVEN: &str = r#"use catspaw::{Context, Signature, as_command};

/// greet someone
pub fn greet(name: String) {
    println!("hello {name}");
}

fn main() {
    let _ = as_command(
        Signature::new("greet").arg("name").source(file!()),
        |params| {
            let name = params.str("name")?;
            greet(name.to_string());
            Ok(())
        },
        &Context::entry_point(),
    );
}
"#;

    #[test]
    fn removes_use_and_driving_main() {
        let out = strip_markers(DRIVEN).unwrap();
        assert!(!out.contains("catspaw"));
        assert!(!out.contains("fn main"));
        assert!(out.contains("pub fn greet(name: String)"));
        assert!(out.contains("/// greet someone"));
        syn::parse_file(&out).unwrap();
    }

    #[test]
    fn unrelated_code_survives_untouched() {
        let src = "fn helper() -> i32 {\n    41 + 1\n}\n";
        assert_eq!(strip_markers(src).unwrap(), src);
    }

    #[test]
    fn fully_qualified_references_are_found() {
        let src = r#"
fn main() {
    let sig = catspaw::Signature::new("x");
    let _ = sig;
}

pub fn keep() {}
"#;
        let out = strip_markers(src).unwrap();
        assert!(!out.contains("fn main"));
        assert!(out.contains("pub fn keep()"));
    }

    #[test]
    fn renamed_imports_are_tracked() {
        let src = r#"use catspaw::Signature as Sig;

fn main() {
    let _ = Sig::new("x");
}
"#;
        let out = strip_markers(src).unwrap();
        assert_eq!(out.trim(), "");
    }

    #[test]
    fn emptied_helper_keeps_a_placeholder_body() {
        let src = r#"use catspaw::Signature;

fn wire() {
    let _ = Signature::new("x");
}

pub fn real_work() {}
"#;
        let out = strip_markers(src).unwrap();
        assert!(out.contains("();"));
        assert!(out.contains("pub fn real_work()"));
        syn::parse_file(&out).unwrap();
    }

    #[test]
    fn helpers_typed_against_the_library_are_removed_wholesale() {
        let src = r#"use catspaw::Registry;

fn wire(reg: &mut Registry) {
    reg.register(catspaw::Signature::new("x"), |_| Ok(()));
}

pub fn real_work() {}
"#;
        let out = strip_markers(src).unwrap();
        assert!(!out.contains("Registry"));
        assert!(!out.contains("fn wire"));
        assert!(out.contains("pub fn real_work()"));
        syn::parse_file(&out).unwrap();
    }

    #[test]
    fn partially_driven_fn_loses_only_library_statements() {
        let src = r#"use catspaw::Signature;

fn setup() {
    println!("starting");
    let _ = Signature::new("x");
    println!("done");
}
"#;
        let out = strip_markers(src).unwrap();
        assert!(out.contains("println!(\"starting\");"));
        assert!(out.contains("println!(\"done\");"));
        assert!(!out.contains("Signature"));
        syn::parse_file(&out).unwrap();
    }

    #[test]
    fn blank_runs_collapse() {
        let out = strip_markers(DRIVEN).unwrap();
        assert!(!out.contains("\n\n\n"));
    }
}
