//! Build a clap command from a [`Signature`] and collect parsed parameters.
//!
//! The generated-code emitter in [`crate::codegen`] mirrors this mapping in
//! source text, so runtime parsing and generated `main()` parsing stay in
//! lockstep.

use anyhow::{Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::accessor::{Accessor, Opt, option_name};
use crate::doctext;
use crate::signature::{Signature, Ty, Value};

/// Parsed parameter values, keyed by the original parameter name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    map: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.map.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(Value::Str(s)) => Ok(s),
            Some(other) => bail!("parameter `{name}` is not a string: {other:?}"),
            None => bail!("missing parameter `{name}`"),
        }
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            Some(Value::Int(n)) => Ok(*n),
            Some(other) => bail!("parameter `{name}` is not an integer: {other:?}"),
            None => bail!("missing parameter `{name}`"),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.get(name) {
            Some(Value::Float(f)) => Ok(*f),
            Some(other) => bail!("parameter `{name}` is not a float: {other:?}"),
            None => bail!("missing parameter `{name}`"),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => bail!("parameter `{name}` is not a flag: {other:?}"),
            None => bail!("missing parameter `{name}`"),
        }
    }

    pub fn path(&self, name: &str) -> Result<&Path> {
        match self.get(name) {
            Some(Value::Path(p)) => Ok(p),
            Some(other) => bail!("parameter `{name}` is not a path: {other:?}"),
            None => bail!("missing parameter `{name}`"),
        }
    }
}

/// Build the parser whose positionals and flags mirror the option list.
pub fn build_command(sig: &Signature) -> Command {
    let doc = doctext::parse(sig.doc_text());
    let mut cmd = Command::new(sig.name().to_string());
    if !doc.description.is_empty() {
        cmd = cmd.about(doc.description.clone());
    }
    for opt in Accessor::new(sig).options() {
        cmd = cmd.arg(build_arg(&opt, doc.help(&opt.name)));
    }
    cmd
}

fn build_arg(opt: &Opt, help: Option<&str>) -> Arg {
    let ty = opt.effective_ty();
    let mut arg = Arg::new(opt.name.clone());

    if opt.is_positional() {
        arg = arg
            .value_name(opt.name.to_uppercase())
            .required(true);
        arg = apply_value_parser(arg, ty);
    } else {
        let stripped = option_name(&opt.name);
        arg = if stripped.chars().count() <= 1 {
            match stripped.chars().next() {
                Some(c) => arg.short(c),
                None => arg,
            }
        } else {
            arg.long(stripped)
        };
        if ty == Ty::Bool {
            arg = arg.action(ArgAction::SetTrue);
        } else {
            arg = apply_value_parser(arg, ty).required(opt.required);
            if let Some(default) = &opt.default {
                arg = arg.default_value(default.to_cli_string());
            }
        }
    }

    if let Some(text) = help {
        arg = arg.help(text.to_string());
    }
    arg
}

fn apply_value_parser(arg: Arg, ty: Ty) -> Arg {
    match ty {
        Ty::Str => arg.value_parser(clap::builder::ValueParser::string()),
        Ty::Int => arg.value_parser(clap::value_parser!(i64)),
        Ty::Float => arg.value_parser(clap::value_parser!(f64)),
        Ty::Bool => arg.value_parser(clap::value_parser!(bool)),
        Ty::Path => arg.value_parser(clap::value_parser!(PathBuf)),
    }
}

/// Extract the parameter map for a signature from parsed matches.
///
/// Options absent from the command line without a default simply do not
/// appear; reserved driver flags are never part of the option list, so they
/// are stripped by construction.
pub fn collect_params(sig: &Signature, matches: &ArgMatches) -> Params {
    let mut params = Params::new();
    for opt in Accessor::new(sig).options() {
        let name = opt.name.as_str();
        match opt.effective_ty() {
            Ty::Bool => {
                let value = if opt.is_positional() {
                    matches.get_one::<bool>(name).copied().unwrap_or(false)
                } else {
                    matches.get_flag(name)
                };
                params.insert(name, Value::Bool(value));
            }
            Ty::Str => {
                if let Some(v) = matches.get_one::<String>(name) {
                    params.insert(name, Value::Str(v.clone()));
                }
            }
            Ty::Int => {
                if let Some(v) = matches.get_one::<i64>(name) {
                    params.insert(name, Value::Int(*v));
                }
            }
            Ty::Float => {
                if let Some(v) = matches.get_one::<f64>(name) {
                    params.insert(name, Value::Float(*v));
                }
            }
            Ty::Path => {
                if let Some(v) = matches.get_one::<PathBuf>(name) {
                    params.insert(name, Value::Path(v.clone()));
                }
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greet() -> Signature {
        Signature::new("greet")
            .doc("greet someone\n\n:param name: who to greet\n:param loud: shout it")
            .arg("name")
            .kwarg_default("loud", Value::Bool(false))
    }

    #[test]
    fn greet_parses_positional_and_flag() {
        let sig = greet();
        let matches = build_command(&sig)
            .try_get_matches_from(["greet", "Ada", "--loud"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert_eq!(params.str("name").unwrap(), "Ada");
        assert!(params.flag("loud").unwrap());
    }

    #[test]
    fn flag_defaults_apply_when_absent() {
        let sig = greet();
        let matches = build_command(&sig)
            .try_get_matches_from(["greet", "Ada"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert!(!params.flag("loud").unwrap());
    }

    #[test]
    fn missing_positional_is_an_error() {
        let sig = greet();
        let err = build_command(&sig)
            .try_get_matches_from(["greet"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn typed_flags_coerce_and_default() {
        let sig = Signature::new("retry")
            .arg("url")
            .kwarg_default("count", Value::Int(3));
        let matches = build_command(&sig)
            .try_get_matches_from(["retry", "http://x", "--count", "5"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert_eq!(params.int("count").unwrap(), 5);

        let matches = build_command(&sig)
            .try_get_matches_from(["retry", "http://x"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert_eq!(params.int("count").unwrap(), 3);
    }

    #[test]
    fn bad_coercion_is_an_error() {
        let sig = Signature::new("retry")
            .arg("url")
            .kwarg_default("count", Value::Int(3));
        let err = build_command(&sig)
            .try_get_matches_from(["retry", "http://x", "--count", "many"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn underscored_names_become_hyphenated_flags() {
        let sig = Signature::new("f").kwarg_default("dry_run", Value::Bool(false));
        let matches = build_command(&sig)
            .try_get_matches_from(["f", "--dry-run"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert!(params.flag("dry_run").unwrap());
    }

    #[test]
    fn single_char_name_uses_short_flag() {
        let sig = Signature::new("f").kwarg_default("n", Value::Int(1));
        let matches = build_command(&sig)
            .try_get_matches_from(["f", "-n", "7"])
            .unwrap();
        assert_eq!(collect_params(&sig, &matches).int("n").unwrap(), 7);
    }

    #[test]
    fn optional_flag_absent_means_absent() {
        let sig = Signature::new("f").arg("a").kwarg_optional("tag");
        let matches = build_command(&sig)
            .try_get_matches_from(["f", "x"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert!(!params.contains("tag"));

        let matches = build_command(&sig)
            .try_get_matches_from(["f", "x", "--tag", "v1"])
            .unwrap();
        let params = collect_params(&sig, &matches);
        assert_eq!(params.str("tag").unwrap(), "v1");
    }

    #[test]
    fn help_text_lands_on_options() {
        let sig = greet();
        let help = build_command(&sig).render_long_help().to_string();
        assert!(help.contains("who to greet"));
        assert!(help.contains("shout it"));
        assert!(help.contains("--loud"));
    }

    #[test]
    fn usage_orders_positionals_by_declaration() {
        let sig = Signature::new("cp").arg("src").arg("dst");
        let usage = build_command(&sig).render_usage().to_string();
        let src = usage.find("SRC").unwrap();
        let dst = usage.find("DST").unwrap();
        assert!(src < dst);
    }
}
