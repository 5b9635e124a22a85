//! The single-command driver.
//!
//! `as_command` is the runtime half of the library: given a [`Signature`]
//! and a handler, it builds the parser, parses argv, and invokes the handler
//! with the parsed parameters — or does nothing at all when the [`Context`]
//! says the enclosing code is being used as a library.
//!
//! The entry-point decision is deliberately a single-shot check made when
//! the driver runs; there is no frame inspection to repeat later. Callers
//! state it once, typically `Context::entry_point()` from `fn main`.

use anyhow::{Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::codegen::{self, EmitOptions};
use crate::parser::{self, Params};
use crate::signature::Signature;

/// Flags consumed by the codegen driver itself. They are attached hidden to
/// every driven parser and stripped before the handler runs.
pub const RESERVED_FLAGS: &[&str] = &["expose", "inplace", "typed"];

/// Explicit replacement for the "am I the program entry point" check.
#[derive(Debug, Clone, Default)]
pub struct Context {
    entry_point: bool,
    argv: Option<Vec<String>>,
    prog: Option<String>,
}

impl Context {
    /// The enclosing module is the program entry point: parse and run.
    pub fn entry_point() -> Self {
        Context {
            entry_point: true,
            ..Context::default()
        }
    }

    /// The enclosing module is being used as a library: do nothing.
    pub fn library() -> Self {
        Context::default()
    }

    /// Override argv (without the program name). Defaults to the process
    /// arguments.
    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = Some(argv);
        self
    }

    /// Override the program name shown in help and usage text. Defaults to
    /// the driven signature's (or registry's) name.
    pub fn with_prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    pub fn is_entry_point(&self) -> bool {
        self.entry_point
    }

    pub(crate) fn argv_with_prog(&self, prog: &str) -> Vec<String> {
        let prog = self.prog.as_deref().unwrap_or(prog);
        let mut full = vec![prog.to_string()];
        match &self.argv {
            Some(argv) => full.extend(argv.iter().cloned()),
            None => full.extend(std::env::args().skip(1)),
        }
        full
    }
}

/// What the driver did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not the entry point; nothing ran.
    Library,
    /// Parsed argv and invoked the handler.
    Ran,
    /// `--expose` was given; code was generated instead of running.
    Exposed,
}

/// Ordered customization hooks applied around a driven command.
pub trait Middleware {
    /// Extend or adjust the parser before argv is parsed.
    fn setup(&self, cmd: Command) -> Command {
        cmd
    }

    /// Inspect or rewrite the parsed parameters before the handler runs.
    fn before(&self, _params: &mut Params) -> Result<()> {
        Ok(())
    }
}

/// Run a function as a command. Exits the process on argv errors, the way
/// an argument parser is expected to.
pub fn as_command<F>(sig: Signature, handler: F, ctx: &Context) -> Result<Outcome>
where
    F: FnOnce(&Params) -> Result<()>,
{
    as_command_with(sig, &[], handler, ctx)
}

/// [`as_command`] with middleware hooks applied in order.
pub fn as_command_with<F>(
    sig: Signature,
    middlewares: &[Box<dyn Middleware>],
    handler: F,
    ctx: &Context,
) -> Result<Outcome>
where
    F: FnOnce(&Params) -> Result<()>,
{
    if !ctx.is_entry_point() {
        return Ok(Outcome::Library);
    }
    let mut cmd = build(&sig, middlewares);
    match cmd.clone().try_get_matches_from(ctx.argv_with_prog(sig.name())) {
        Ok(matches) => finish(&sig, middlewares, handler, &matches),
        Err(err) => fail_with_full_help(&mut cmd, err),
    }
}

/// Non-exiting variant: argv errors come back as ordinary errors. This is
/// the surface tests drive.
pub fn try_as_command<F>(
    sig: &Signature,
    middlewares: &[Box<dyn Middleware>],
    handler: F,
    ctx: &Context,
) -> Result<Outcome>
where
    F: FnOnce(&Params) -> Result<()>,
{
    if !ctx.is_entry_point() {
        return Ok(Outcome::Library);
    }
    let cmd = build(sig, middlewares);
    match cmd.try_get_matches_from(ctx.argv_with_prog(sig.name())) {
        Ok(matches) => finish(sig, middlewares, handler, &matches),
        Err(err) => bail!("{}", err.render()),
    }
}

fn build(sig: &Signature, middlewares: &[Box<dyn Middleware>]) -> Command {
    let mut cmd = attach_reserved(parser::build_command(sig));
    for mw in middlewares {
        cmd = mw.setup(cmd);
    }
    cmd
}

fn finish<F>(
    sig: &Signature,
    middlewares: &[Box<dyn Middleware>],
    handler: F,
    matches: &ArgMatches,
) -> Result<Outcome>
where
    F: FnOnce(&Params) -> Result<()>,
{
    if matches.get_flag("expose") {
        let opts = EmitOptions {
            inplace: matches.get_flag("inplace"),
            typed: matches.get_flag("typed"),
        };
        codegen::run_as_single_command(sig, &opts)?;
        return Ok(Outcome::Exposed);
    }
    let mut params = parser::collect_params(sig, matches);
    for mw in middlewares {
        mw.before(&mut params)?;
    }
    handler(&params)?;
    Ok(Outcome::Ran)
}

pub(crate) fn attach_reserved(mut cmd: Command) -> Command {
    for name in RESERVED_FLAGS {
        cmd = cmd.arg(
            Arg::new(*name)
                .long(*name)
                .action(ArgAction::SetTrue)
                .hide(true),
        );
    }
    cmd
}

/// Usage printing is aliased to full-help printing: real argv errors show
/// the complete help before the parser's own message.
pub(crate) fn fail_with_full_help(cmd: &mut Command, err: clap::Error) -> ! {
    if err.use_stderr() {
        eprintln!("{}", cmd.render_long_help());
    }
    err.exit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Value;
    use std::cell::RefCell;

    fn greet() -> Signature {
        Signature::new("greet")
            .doc("greet someone\n\n:param name: who to greet")
            .arg("name")
            .kwarg_default("loud", Value::Bool(false))
    }

    #[test]
    fn library_context_never_runs() {
        let ran = RefCell::new(false);
        let outcome = try_as_command(
            &greet(),
            &[],
            |_| {
                *ran.borrow_mut() = true;
                Ok(())
            },
            &Context::library(),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Library);
        assert!(!*ran.borrow());
    }

    #[test]
    fn entry_point_invokes_handler_with_params() {
        let seen = RefCell::new(None);
        let ctx = Context::entry_point().with_argv(vec!["Ada".into(), "--loud".into()]);
        let outcome = try_as_command(
            &greet(),
            &[],
            |params| {
                *seen.borrow_mut() =
                    Some((params.str("name")?.to_string(), params.flag("loud")?));
                Ok(())
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Ran);
        assert_eq!(*seen.borrow(), Some(("Ada".to_string(), true)));
    }

    #[test]
    fn reserved_flags_never_reach_the_handler() {
        let ctx = Context::entry_point().with_argv(vec!["Ada".into()]);
        try_as_command(
            &greet(),
            &[],
            |params| {
                for name in RESERVED_FLAGS {
                    assert!(!params.contains(name));
                }
                Ok(())
            },
            &ctx,
        )
        .unwrap();
    }

    #[test]
    fn missing_required_argument_is_an_error() {
        let ctx = Context::entry_point().with_argv(vec![]);
        let err = try_as_command(&greet(), &[], |_| Ok(()), &ctx).unwrap_err();
        assert!(err.to_string().contains("NAME"), "got: {err}");
    }

    #[test]
    fn handler_errors_propagate() {
        let ctx = Context::entry_point().with_argv(vec!["Ada".into()]);
        let err = try_as_command(&greet(), &[], |_| bail!("boom"), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    struct Verbosity;

    impl Middleware for Verbosity {
        fn setup(&self, cmd: Command) -> Command {
            cmd.arg(
                Arg::new("verbose")
                    .long("verbose")
                    .action(ArgAction::SetTrue),
            )
        }

        fn before(&self, params: &mut Params) -> Result<()> {
            params.insert("saw_middleware", Value::Bool(true));
            Ok(())
        }
    }

    #[test]
    fn middleware_extends_parser_and_params() {
        let ctx = Context::entry_point().with_argv(vec!["Ada".into(), "--verbose".into()]);
        let middlewares: Vec<Box<dyn Middleware>> = vec![Box::new(Verbosity)];
        try_as_command(
            &greet(),
            &middlewares,
            |params| {
                assert!(params.flag("saw_middleware")?);
                Ok(())
            },
            &ctx,
        )
        .unwrap();
    }
}
