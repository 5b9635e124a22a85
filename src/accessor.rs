//! Classification of signature parameters into CLI options.
//!
//! A parameter is positional when it has no resolvable default; everything
//! else (defaulted or keyword-only) is a flag. Keyword-only parameters
//! without a default stay flags but are marked required.

use crate::signature::{Signature, Ty, Value};

/// Derive the external option name: leading/trailing underscores stripped,
/// inner underscores replaced by hyphens.
pub fn option_name(name: &str) -> String {
    name.trim_matches('_').replace('_', "-")
}

/// The external spelling for a flag: `--long-name`, or `-n` for a
/// single-character name.
pub fn flag_spelling(name: &str) -> String {
    let stripped = option_name(name);
    if stripped.chars().count() <= 1 {
        format!("-{stripped}")
    } else {
        format!("--{stripped}")
    }
}

/// One command-line option derived from a parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Opt {
    pub name: String,
    /// External spelling: hyphenated bare name for positionals, dashed
    /// spelling for flags.
    pub flag: String,
    pub required: bool,
    pub ty: Option<Ty>,
    pub default: Option<Value>,
}

impl Opt {
    pub fn is_positional(&self) -> bool {
        !self.flag.starts_with('-')
    }

    /// Coercion type, defaulting to string.
    pub fn effective_ty(&self) -> Ty {
        self.ty.unwrap_or(Ty::Str)
    }
}

/// Read-only view over a [`Signature`] producing its option list.
pub struct Accessor<'a> {
    sig: &'a Signature,
}

impl<'a> Accessor<'a> {
    pub fn new(sig: &'a Signature) -> Self {
        Accessor { sig }
    }

    /// Ordered positional parameters lacking a default.
    pub fn positionals(&self) -> Vec<Opt> {
        self.sig
            .args()
            .iter()
            .filter(|name| self.sig.resolve_default(name).is_none())
            .map(|name| self.positional(name))
            .collect()
    }

    /// Defaulted positional parameters first, then keyword-only parameters.
    pub fn flags(&self) -> Vec<Opt> {
        let mut r = Vec::new();
        for name in self.sig.args() {
            if self.sig.resolve_default(name).is_some() {
                r.push(self.flag(name, false));
            }
        }
        for name in self.sig.kwonly() {
            let required =
                self.sig.resolve_default(name).is_none() && !self.sig.is_optional(name);
            r.push(self.flag(name, required));
        }
        r
    }

    /// Positionals followed by flags.
    pub fn options(&self) -> Vec<Opt> {
        let mut r = self.positionals();
        r.extend(self.flags());
        r
    }

    fn positional(&self, name: &str) -> Opt {
        Opt {
            name: name.to_string(),
            flag: option_name(name),
            required: true,
            ty: self.sig.resolve_type(name),
            default: self.sig.resolve_default(name).cloned(),
        }
    }

    fn flag(&self, name: &str, required: bool) -> Opt {
        Opt {
            name: name.to_string(),
            flag: flag_spelling(name),
            required,
            ty: self.sig.resolve_type(name),
            default: self.sig.resolve_default(name).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_name_strips_and_hyphenates() {
        assert_eq!(option_name("dry_run"), "dry-run");
        assert_eq!(option_name("_private"), "private");
        assert_eq!(option_name("trailing_"), "trailing");
        assert_eq!(option_name("n"), "n");
    }

    #[test]
    fn single_char_gets_single_dash() {
        assert_eq!(flag_spelling("n"), "-n");
        assert_eq!(flag_spelling("_v"), "-v");
        assert_eq!(flag_spelling("dry_run"), "--dry-run");
    }

    #[test]
    fn classification_follows_defaults() {
        let sig = Signature::new("f")
            .arg("url")
            .arg_default("retries", Value::Int(3))
            .kwarg_default("force", Value::Bool(false))
            .kwarg("token");
        let acc = Accessor::new(&sig);

        let pos = acc.positionals();
        assert_eq!(pos.len(), 1);
        assert_eq!(pos[0].name, "url");
        assert!(pos[0].required);

        let flags = acc.flags();
        let names: Vec<_> = flags.iter().map(|o| o.flag.as_str()).collect();
        assert_eq!(names, vec!["--retries", "--force", "--token"]);
        assert!(!flags[0].required);
        assert!(!flags[1].required);
        assert!(flags[2].required, "kwonly without default is required");
    }

    #[test]
    fn required_iff_no_default() {
        let sig = Signature::new("f")
            .arg("a")
            .kwarg_default("b", Value::Str("x".into()));
        for opt in Accessor::new(&sig).options() {
            assert_eq!(opt.required, opt.default.is_none());
        }
    }

    #[test]
    fn optional_params_are_non_required_flags() {
        let sig = Signature::new("f").kwarg_optional("tag");
        let flags = Accessor::new(&sig).flags();
        assert_eq!(flags.len(), 1);
        assert!(!flags[0].required);
        assert!(flags[0].default.is_none());
    }
}
