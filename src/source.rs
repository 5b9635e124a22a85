//! Signature resolution from parsed Rust source.
//!
//! The runtime driver takes explicit [`Signature`] values; this module is
//! the other frontend, recovering signatures from a `.rs` file so the
//! `catspaw` binary can generate code for plain functions. Classification
//! rules: `bool` parameters are flags defaulting to false, `Option<T>`
//! parameters are optional flags, everything else is a required positional.

use anyhow::{Context as _, Result, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use syn::visit::{self, Visit};
use syn::{Expr, ExprCall, ExprLit, ExprMethodCall, FnArg, ItemFn, Lit, Meta, Pat, Type};

use crate::signature::{Signature, Ty, Value};

/// A parsed source file and the functions it defines.
pub struct SourceFile {
    path: Option<PathBuf>,
    text: String,
    file: syn::File,
}

impl SourceFile {
    pub fn parse(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file = syn::parse_file(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(SourceFile {
            path: Some(path.to_path_buf()),
            text,
            file,
        })
    }

    pub fn from_source(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let file = syn::parse_file(&text).context("failed to parse source")?;
        Ok(SourceFile {
            path: None,
            text,
            file,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn functions(&self) -> impl Iterator<Item = &ItemFn> {
        self.file.items.iter().filter_map(|item| match item {
            syn::Item::Fn(f) => Some(f),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&ItemFn> {
        self.functions().find(|f| f.sig.ident == name)
    }

    /// Names of top-level public functions, the default expose targets when
    /// nothing is registered. `main` is never a target.
    pub fn public_fn_names(&self) -> Vec<String> {
        self.functions()
            .filter(|f| matches!(f.vis, syn::Visibility::Public(_)))
            .map(|f| f.sig.ident.to_string())
            .filter(|name| name != "main")
            .collect()
    }

    /// Command names registered in this file via `Signature::new("…")`.
    pub fn registered_names(&self) -> Vec<String> {
        let mut finder = RegistrationFinder::default();
        finder.visit_file(&self.file);
        finder.names
    }

    /// Doc text attached to a registration via `.doc("…")`. Listings fall
    /// back to this when the registered name matches no function in the file.
    pub fn registration_doc(&self, name: &str) -> Option<String> {
        let mut finder = RegistrationFinder::default();
        finder.visit_file(&self.file);
        finder.docs.remove(name)
    }

    /// Resolve the signature of a named function in this file.
    pub fn resolve(&self, name: &str) -> Result<Signature> {
        let item = self.function(name).with_context(|| {
            let loc = self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<source>".to_string());
            format!("no function `{name}` in {loc}")
        })?;
        let mut sig = resolve_item(item)?;
        if let Some(path) = &self.path {
            sig = sig.source(path.clone());
        }
        Ok(sig)
    }
}

/// Build a [`Signature`] from a parsed `fn` item.
pub fn resolve_item(item: &ItemFn) -> Result<Signature> {
    let name = item.sig.ident.to_string();
    let mut sig = Signature::new(&name).doc(doc_text(&item.attrs));

    for input in &item.sig.inputs {
        let pat_ty = match input {
            FnArg::Typed(pat_ty) => pat_ty,
            FnArg::Receiver(_) => bail!("function `{name}` takes self; methods are not supported"),
        };
        let pname = match &*pat_ty.pat {
            Pat::Ident(pi) => pi.ident.to_string(),
            other => bail!(
                "parameter patterns must be plain identifiers in `{name}` (got {other:?})"
            ),
        };
        let info = classify(&pat_ty.ty);
        if info.by_ref {
            sig = sig.by_ref(&pname);
        }
        if info.optional {
            sig = sig.kwarg_optional(&pname).annotate(&pname, info.ty);
        } else if info.ty == Ty::Bool {
            sig = sig.kwarg_default(&pname, Value::Bool(false));
        } else {
            sig = sig.arg(&pname).annotate(&pname, info.ty);
        }
    }
    Ok(sig)
}

struct TypeInfo {
    ty: Ty,
    by_ref: bool,
    optional: bool,
}

fn classify(ty: &Type) -> TypeInfo {
    match ty {
        Type::Reference(r) => {
            let mut info = classify(&r.elem);
            info.by_ref = true;
            info
        }
        Type::Path(tp) => {
            let Some(seg) = tp.path.segments.last() else {
                return plain(Ty::Str);
            };
            let ident = seg.ident.to_string();
            match ident.as_str() {
                "Option" => {
                    let inner = option_inner(seg).map(|t| classify(t)).unwrap_or(plain(Ty::Str));
                    TypeInfo {
                        ty: inner.ty,
                        by_ref: inner.by_ref,
                        optional: true,
                    }
                }
                "String" | "str" => plain(Ty::Str),
                "bool" => plain(Ty::Bool),
                "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "usize" => plain(Ty::Int),
                "f32" | "f64" => plain(Ty::Float),
                "PathBuf" | "Path" => plain(Ty::Path),
                _ => plain(Ty::Str),
            }
        }
        _ => plain(Ty::Str),
    }
}

fn plain(ty: Ty) -> TypeInfo {
    TypeInfo {
        ty,
        by_ref: false,
        optional: false,
    }
}

fn option_inner(seg: &syn::PathSegment) -> Option<&Type> {
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(t) => Some(t),
        _ => None,
    })
}

/// Join `///` doc comments into one text, trimming the conventional single
/// leading space.
fn doc_text(attrs: &[syn::Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(nv) = &attr.meta {
            if let Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) = &nv.value
            {
                let raw = s.value();
                lines.push(raw.strip_prefix(' ').unwrap_or(&raw).to_string());
            }
        }
    }
    lines.join("\n")
}

#[derive(Default)]
struct RegistrationFinder {
    names: Vec<String>,
    docs: HashMap<String, String>,
}

/// The name literal of a `Signature::new("…")` call.
fn signature_new_name(call: &ExprCall) -> Option<String> {
    let Expr::Path(p) = &*call.func else {
        return None;
    };
    let segs: Vec<String> = p
        .path
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect();
    if segs.len() < 2
        || segs[segs.len() - 2] != "Signature"
        || segs[segs.len() - 1] != "new"
    {
        return None;
    }
    match call.args.first() {
        Some(Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        })) => Some(s.value()),
        _ => None,
    }
}

/// Walk a builder chain down to the `Signature::new` call at its base.
fn registration_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::MethodCall(mc) => registration_name(&mc.receiver),
        Expr::Call(call) => signature_new_name(call),
        _ => None,
    }
}

impl<'ast> Visit<'ast> for RegistrationFinder {
    fn visit_expr_call(&mut self, node: &'ast ExprCall) {
        if let Some(name) = signature_new_name(node) {
            if !self.names.contains(&name) {
                self.names.push(name);
            }
        }
        visit::visit_expr_call(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        if node.method == "doc" {
            if let (Some(name), Some(Expr::Lit(ExprLit {
                lit: Lit::Str(text), ..
            }))) = (registration_name(&node.receiver), node.args.first())
            {
                self.docs.entry(name).or_insert_with(|| text.value());
            }
        }
        visit::visit_expr_method_call(self, node);
    }
}
