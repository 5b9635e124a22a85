//! Explicit function signatures.
//!
//! A [`Signature`] is the spelled-out description of a function's parameter
//! list: ordered positional names, default values aligned to the tail of
//! that list, keyword-only names with their defaults, and per-parameter type
//! annotations. Dynamic languages recover this by reflection; here the
//! caller states it (or it is resolved from parsed source, see
//! [`crate::source`]).

use anyhow::{Result, ensure};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The coercion types a command-line option can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ty {
    Str,
    Int,
    Float,
    Bool,
    Path,
}

impl Ty {
    /// The Rust type the generated code binds this option to.
    pub fn rust_type(self) -> &'static str {
        match self {
            Ty::Str => "String",
            Ty::Int => "i64",
            Ty::Float => "f64",
            Ty::Bool => "bool",
            Ty::Path => "std::path::PathBuf",
        }
    }
}

/// A default (or parsed) parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Path(PathBuf),
}

impl Value {
    pub fn ty(&self) -> Ty {
        match self {
            Value::Str(_) => Ty::Str,
            Value::Int(_) => Ty::Int,
            Value::Float(_) => Ty::Float,
            Value::Bool(_) => Ty::Bool,
            Value::Path(_) => Ty::Path,
        }
    }

    /// The spelling handed to the argument parser as a default value.
    pub fn to_cli_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Path(p) => p.display().to_string(),
        }
    }
}

/// Ordered parameter spec for one function.
///
/// Invariants mirror a conventional argument list: positional parameters
/// come first, defaults belong to the tail of the positional list, and
/// keyword-only parameters always surface as flags.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    name: String,
    doc: String,
    order: Vec<String>,
    args: Vec<String>,
    defaults: Vec<Value>,
    kwonly: Vec<String>,
    kwonly_defaults: HashMap<String, Value>,
    optional: HashSet<String>,
    annotations: HashMap<String, Ty>,
    by_ref: HashSet<String>,
    source: Option<PathBuf>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach doc text. `:param name: text` lines become per-option help,
    /// everything else becomes the command description (see [`crate::doctext`]).
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// A required positional parameter.
    pub fn arg(mut self, name: impl Into<String>) -> Self {
        assert!(
            self.defaults.is_empty(),
            "positional parameter after defaulted parameter"
        );
        let name = name.into();
        self.args.push(name.clone());
        self.order.push(name);
        self
    }

    /// A positional parameter with a default. Surfaces as a flag.
    pub fn arg_default(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.args.push(name.clone());
        self.defaults.push(value);
        self.order.push(name);
        self
    }

    /// A keyword-only parameter without a default: a required flag.
    pub fn kwarg(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.kwonly.push(name.clone());
        self.order.push(name);
        self
    }

    /// A keyword-only parameter with a default.
    pub fn kwarg_default(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.kwonly.push(name.clone());
        self.kwonly_defaults.insert(name.clone(), value);
        self.order.push(name);
        self
    }

    /// A keyword-only parameter whose absence is allowed without a default
    /// (an `Option`-typed parameter resolved from source).
    pub fn kwarg_optional(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.kwonly.push(name.clone());
        self.optional.insert(name.clone());
        self.order.push(name);
        self
    }

    pub fn annotate(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.annotations.insert(name.into(), ty);
        self
    }

    /// Mark a parameter as taken by reference in the original function.
    /// Only consulted when generating the call in emitted code.
    pub fn by_ref(mut self, name: impl Into<String>) -> Self {
        self.by_ref.insert(name.into());
        self
    }

    /// Record the source file defining the function, enabling codegen.
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kwonly(&self) -> &[String] {
        &self.kwonly
    }

    /// Every parameter in declaration order, positional and keyword-only alike.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_by_ref(&self, name: &str) -> bool {
        self.by_ref.contains(name)
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(name)
    }

    /// Keyword-only defaults win, then tail-aligned positional defaults.
    pub fn resolve_default(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.kwonly_defaults.get(name) {
            return Some(v);
        }
        let idx = self.args.iter().position(|a| a == name)?;
        let offset = self.args.len() - self.defaults.len();
        if idx >= offset {
            self.defaults.get(idx - offset)
        } else {
            None
        }
    }

    /// The annotated type, falling back to the type of the default value.
    pub fn resolve_type(&self, name: &str) -> Option<Ty> {
        self.annotations
            .get(name)
            .copied()
            .or_else(|| self.resolve_default(name).map(Value::ty))
    }

    /// Sanity check used before codegen: every default-bearing name must be
    /// a known parameter.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.name.is_empty(), "signature has no name");
        for name in self.kwonly_defaults.keys() {
            ensure!(
                self.kwonly.contains(name),
                "keyword default for unknown parameter `{name}`"
            );
        }
        ensure!(
            self.defaults.len() <= self.args.len(),
            "more positional defaults than positional parameters"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greet() -> Signature {
        Signature::new("greet")
            .arg("name")
            .kwarg_default("loud", Value::Bool(false))
    }

    #[test]
    fn defaults_align_to_tail() {
        let sig = Signature::new("f")
            .arg("a")
            .arg_default("b", Value::Int(1))
            .arg_default("c", Value::Str("x".into()));
        assert_eq!(sig.resolve_default("a"), None);
        assert_eq!(sig.resolve_default("b"), Some(&Value::Int(1)));
        assert_eq!(sig.resolve_default("c"), Some(&Value::Str("x".into())));
    }

    #[test]
    fn kwonly_defaults_win_over_positional() {
        let sig = Signature::new("f")
            .arg_default("x", Value::Int(1))
            .kwarg_default("x2", Value::Int(2));
        assert_eq!(sig.resolve_default("x2"), Some(&Value::Int(2)));
        assert_eq!(sig.resolve_default("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn type_falls_back_to_default() {
        let sig = greet();
        assert_eq!(sig.resolve_type("loud"), Some(Ty::Bool));
        assert_eq!(sig.resolve_type("name"), None);
        let sig = sig.annotate("name", Ty::Str);
        assert_eq!(sig.resolve_type("name"), Some(Ty::Str));
    }

    #[test]
    fn falsy_defaults_still_resolve() {
        let sig = Signature::new("f")
            .arg_default("n", Value::Int(0))
            .kwarg_default("s", Value::Str(String::new()));
        assert_eq!(sig.resolve_default("n"), Some(&Value::Int(0)));
        assert_eq!(sig.resolve_default("s"), Some(&Value::Str(String::new())));
    }

    #[test]
    fn order_tracks_declaration() {
        let sig = greet();
        assert_eq!(sig.order(), &["name".to_string(), "loud".to_string()]);
    }

    #[test]
    #[should_panic(expected = "positional parameter after defaulted")]
    fn positional_after_default_panics() {
        let _ = Signature::new("f").arg_default("a", Value::Int(1)).arg("b");
    }
}
