//! Emit standalone `main()` source and rewrite files transactionally.

use anyhow::{Context as _, Result, ensure};
use std::io::Write;
use std::path::Path;

use crate::accessor::{Accessor, Opt, option_name};
use crate::codegen::module::Module;
use crate::codegen::strip;
use crate::doctext;
use crate::signature::{Signature, Ty};

#[derive(Debug, Default, Clone)]
pub struct EmitOptions {
    /// Rewrite the source file instead of printing to stdout.
    pub inplace: bool,
    /// Annotate generated bindings with explicit types.
    pub typed: bool,
}

/// Generate a `main()` for one function and emit it over its source file.
pub fn run_as_single_command(sig: &Signature, opts: &EmitOptions) -> Result<()> {
    let target = sig
        .source_path()
        .context("no source file recorded for this signature; use Signature::source(file!())")?;
    let code = main_code(sig, opts.typed)?;
    emit(target, &code, opts.inplace)
}

/// Generate a subcommand-dispatching `main()` for several functions.
pub fn run_as_multi_command(
    prog: &str,
    about: Option<&str>,
    sigs: &[Signature],
    opts: &EmitOptions,
) -> Result<()> {
    let target = sigs
        .iter()
        .find_map(|s| s.source_path())
        .context("no source file recorded for any registered signature")?;
    let code = subcommands_code(prog, about, sigs, opts.typed)?;
    emit(target, &code, opts.inplace)
}

/// The generated wrapper for a single command:
///
/// ```text
/// fn main() {
///     let matches = clap::Command::new("greet")
///         .about("greet someone")
///         .arg(
///             clap::Arg::new("name")
///                 .value_name("NAME")
///                 .required(true)
///                 .help("who to greet"),
///         )
///         .get_matches();
///     let name = matches.get_one::<String>("name").cloned().expect("required argument");
///     greet(name);
/// }
/// ```
pub fn main_code(sig: &Signature, typed: bool) -> Result<String> {
    sig.validate()?;
    ensure!(
        sig.name() != "main",
        "cannot expose a function named `main`: the generated wrapper would collide with it"
    );
    let mut m = Module::new();
    m.open("fn main() {");
    emit_command_chain(&mut m, sig);
    for opt in Accessor::new(sig).options() {
        emit_binding(&mut m, &opt, "matches", typed);
    }
    m.stmt(call_line(sig));
    m.close("}");
    Ok(m.render())
}

/// The generated wrapper for several commands behind a required subcommand
/// selector; dispatch destructures the selected name before invoking, so
/// the selector itself never reaches the function.
pub fn subcommands_code(
    prog: &str,
    about: Option<&str>,
    sigs: &[Signature],
    typed: bool,
) -> Result<String> {
    ensure!(!sigs.is_empty(), "no signatures to expose");
    for sig in sigs {
        sig.validate()?;
        ensure!(
            sig.name() != "main",
            "cannot expose a function named `main`: the generated wrapper would collide with it"
        );
    }

    let mut m = Module::new();
    m.open("fn main() {");
    m.stmt(format!("let matches = clap::Command::new({prog:?})"));
    m.indent();
    if let Some(text) = about {
        m.stmt(format!(".about({text:?})"));
    }
    m.stmt(".subcommand_required(true)");
    for sig in sigs {
        let doc = doctext::parse(sig.doc_text());
        m.open(".subcommand(");
        m.stmt(format!("clap::Command::new({:?})", sig.name()));
        m.indent();
        if !doc.description.is_empty() {
            m.stmt(format!(".about({:?})", doc.description));
        }
        for opt in Accessor::new(sig).options() {
            emit_arg(&mut m, &opt, doc.help(&opt.name));
        }
        m.append(",");
        m.dedent();
        m.close(")");
    }
    m.stmt(".get_matches();");
    m.dedent();
    m.open("match matches.subcommand() {");
    for sig in sigs {
        m.open(format!("Some(({:?}, m)) => {{", sig.name()));
        for opt in Accessor::new(sig).options() {
            emit_binding(&mut m, &opt, "m", typed);
        }
        m.stmt(call_line(sig));
        m.close("}");
    }
    m.stmt("_ => unreachable!(),");
    m.close("}");
    m.close("}");
    Ok(m.render())
}

fn emit_command_chain(m: &mut Module, sig: &Signature) {
    let doc = doctext::parse(sig.doc_text());
    m.stmt(format!("let matches = clap::Command::new({:?})", sig.name()));
    m.indent();
    if !doc.description.is_empty() {
        m.stmt(format!(".about({:?})", doc.description));
    }
    for opt in Accessor::new(sig).options() {
        emit_arg(m, &opt, doc.help(&opt.name));
    }
    m.stmt(".get_matches();");
    m.dedent();
}

/// One `.arg(...)` block, mirroring [`crate::parser::build_command`].
fn emit_arg(m: &mut Module, opt: &Opt, help: Option<&str>) {
    let ty = opt.effective_ty();
    let mut chain: Vec<String> = Vec::new();
    if opt.is_positional() {
        chain.push(format!(".value_name({:?})", opt.name.to_uppercase()));
        chain.push(".required(true)".to_string());
        if let Some(vp) = value_parser_expr(ty) {
            chain.push(format!(".value_parser({vp})"));
        }
    } else {
        let stripped = option_name(&opt.name);
        if stripped.chars().count() <= 1 {
            if let Some(c) = stripped.chars().next() {
                chain.push(format!(".short({c:?})"));
            }
        } else {
            chain.push(format!(".long({stripped:?})"));
        }
        if ty == Ty::Bool {
            chain.push(".action(clap::ArgAction::SetTrue)".to_string());
        } else {
            if let Some(vp) = value_parser_expr(ty) {
                chain.push(format!(".value_parser({vp})"));
            }
            if opt.required {
                chain.push(".required(true)".to_string());
            }
            if let Some(default) = &opt.default {
                chain.push(format!(".default_value({:?})", default.to_cli_string()));
            }
        }
    }
    if let Some(text) = help {
        chain.push(format!(".help({text:?})"));
    }

    m.open(".arg(");
    if chain.is_empty() {
        m.stmt(format!("clap::Arg::new({:?}),", opt.name));
    } else {
        m.stmt(format!("clap::Arg::new({:?})", opt.name));
        m.indent();
        for (i, link) in chain.iter().enumerate() {
            if i + 1 == chain.len() {
                m.stmt(format!("{link},"));
            } else {
                m.stmt(link.clone());
            }
        }
        m.dedent();
    }
    m.close(")");
}

fn value_parser_expr(ty: Ty) -> Option<&'static str> {
    match ty {
        Ty::Str => None,
        Ty::Int => Some("clap::value_parser!(i64)"),
        Ty::Float => Some("clap::value_parser!(f64)"),
        Ty::Bool => Some("clap::value_parser!(bool)"),
        Ty::Path => Some("clap::value_parser!(std::path::PathBuf)"),
    }
}

fn emit_binding(m: &mut Module, opt: &Opt, matches_var: &str, typed: bool) {
    let ty = opt.effective_ty();
    let name = opt.name.as_str();
    let optional = !opt.required && opt.default.is_none() && ty != Ty::Bool;
    let (expr, rust_ty) = match ty {
        Ty::Bool => {
            if opt.is_positional() {
                (
                    format!(
                        "{matches_var}.get_one::<bool>({name:?}).copied().expect(\"required argument\")"
                    ),
                    "bool".to_string(),
                )
            } else {
                (format!("{matches_var}.get_flag({name:?})"), "bool".to_string())
            }
        }
        Ty::Str => fetch_expr(matches_var, name, "String", ".cloned()", optional),
        Ty::Int => fetch_expr(matches_var, name, "i64", ".copied()", optional),
        Ty::Float => fetch_expr(matches_var, name, "f64", ".copied()", optional),
        Ty::Path => fetch_expr(
            matches_var,
            name,
            "std::path::PathBuf",
            ".cloned()",
            optional,
        ),
    };
    if typed {
        m.stmt(format!("let {name}: {rust_ty} = {expr};"));
    } else {
        m.stmt(format!("let {name} = {expr};"));
    }
}

fn fetch_expr(
    matches_var: &str,
    name: &str,
    rust_ty: &str,
    method: &str,
    optional: bool,
) -> (String, String) {
    let base = format!("{matches_var}.get_one::<{rust_ty}>({name:?}){method}");
    if optional {
        (base, format!("Option<{rust_ty}>"))
    } else {
        (
            format!("{base}.expect(\"required argument\")"),
            rust_ty.to_string(),
        )
    }
}

fn call_line(sig: &Signature) -> String {
    let args: Vec<String> = sig
        .order()
        .iter()
        .map(|name| call_arg(sig, name))
        .collect();
    format!("{}({});", sig.name(), args.join(", "))
}

/// How a bound local is handed to the target function. An optional by-ref
/// parameter needs the inner reference (`Option<&str>` out of
/// `Option<String>`), not a reference to the `Option` itself.
fn call_arg(sig: &Signature, name: &str) -> String {
    if !sig.is_by_ref(name) {
        return name.to_string();
    }
    if sig.is_optional(name) {
        match sig.resolve_type(name).unwrap_or(Ty::Str) {
            Ty::Str | Ty::Path => format!("{name}.as_deref()"),
            _ => format!("{name}.as_ref()"),
        }
    } else {
        format!("&{name}")
    }
}

/// Strip this library's markers from the target file and append the
/// generated code; print to stdout, or rewrite the file in place.
pub fn emit(target: &Path, generated: &str, inplace: bool) -> Result<()> {
    let original = std::fs::read_to_string(target)
        .with_context(|| format!("failed to read {}", target.display()))?;
    let cleaned = strip::strip_markers(&original)?;
    let output = if cleaned.trim().is_empty() {
        generated.to_string()
    } else {
        format!("{}\n\n{}", cleaned.trim_end(), generated)
    };
    if !inplace {
        print!("{output}");
        return Ok(());
    }
    replace_file(target, &original, |w| {
        w.write_all(output.as_bytes())?;
        Ok(())
    })
}

/// Transactional replacement: write to a temporary file in the target's
/// directory, then rename it over the original. On any failure the original
/// content is written back and the error is reported; the temporary file is
/// removed in every outcome.
pub fn replace_file(
    target: &Path,
    original: &str,
    dump: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let attempt = (|| -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
        dump(&mut tmp)?;
        tmp.flush()?;
        tmp.persist(target).map_err(|e| {
            anyhow::Error::new(e.error)
                .context(format!("failed to replace {}", target.display()))
        })?;
        Ok(())
    })();
    if let Err(err) = attempt {
        log::warn!(
            "in-place rewrite of {} failed, rolling back (error={err:#})",
            target.display()
        );
        if let Err(rollback) = std::fs::write(target, original) {
            log::warn!("rollback of {} failed: {rollback}", target.display());
        }
        return Err(err);
    }
    Ok(())
}
