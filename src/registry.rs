//! The multi-command driver: several functions exposed as named subcommands
//! sharing one parser, plus the discovery listing.

use anyhow::{Context as _, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Write;

use crate::codegen::{self, EmitOptions};
use crate::driver::{self, Context, Outcome};
use crate::parser::{self, Params};
use crate::signature::Signature;

type Handler = Box<dyn Fn(&Params) -> Result<()>>;

struct Registered {
    sig: Signature,
    handler: Handler,
}

/// Registry of functions exposed as subcommands of one program.
pub struct Registry {
    prog: String,
    about: Option<String>,
    commands: Vec<Registered>,
}

impl Registry {
    pub fn new(prog: impl Into<String>) -> Self {
        Registry {
            prog: prog.into(),
            about: None,
            commands: Vec::new(),
        }
    }

    pub fn about(mut self, text: impl Into<String>) -> Self {
        self.about = Some(text.into());
        self
    }

    /// Register a function as a subcommand named after its signature.
    pub fn register<F>(&mut self, sig: Signature, handler: F)
    where
        F: Fn(&Params) -> Result<()> + 'static,
    {
        self.commands.push(Registered {
            sig,
            handler: Box::new(handler),
        });
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|r| r.sig.name()).collect()
    }

    pub fn signatures(&self) -> Vec<&Signature> {
        self.commands.iter().map(|r| &r.sig).collect()
    }

    /// Dispatch to the selected subcommand. Exits the process on argv
    /// errors, including a missing subcommand.
    pub fn run(&self, ctx: &Context) -> Result<Outcome> {
        if !ctx.is_entry_point() {
            return Ok(Outcome::Library);
        }
        let mut cmd = self.build();
        match cmd.clone().try_get_matches_from(ctx.argv_with_prog(&self.prog)) {
            Ok(matches) => match self.finish(&mut cmd, &matches) {
                FinishResult::Done(outcome) => outcome,
                FinishResult::ArgvError(err) => driver::fail_with_full_help(&mut cmd, err),
            },
            Err(err) => driver::fail_with_full_help(&mut cmd, err),
        }
    }

    /// Non-exiting variant of [`Registry::run`].
    pub fn try_run(&self, ctx: &Context) -> Result<Outcome> {
        if !ctx.is_entry_point() {
            return Ok(Outcome::Library);
        }
        let mut cmd = self.build();
        match cmd.clone().try_get_matches_from(ctx.argv_with_prog(&self.prog)) {
            Ok(matches) => match self.finish(&mut cmd, &matches) {
                FinishResult::Done(outcome) => outcome,
                FinishResult::ArgvError(err) => bail!("{}", err.render()),
            },
            Err(err) => bail!("{}", err.render()),
        }
    }

    /// Port of the listing entry point: print the registered commands, one
    /// line each, with `-f/--full` appending every command's full help.
    pub fn describe(&self, out: &mut dyn Write, ctx: &Context) -> Result<Outcome> {
        if !ctx.is_entry_point() {
            return Ok(Outcome::Library);
        }
        let cmd = Command::new(self.prog.clone()).arg(
            Arg::new("full")
                .short('f')
                .long("full")
                .action(ArgAction::SetTrue)
                .help("show full help text for every command"),
        );
        let matches = cmd
            .try_get_matches_from(ctx.argv_with_prog(&self.prog))
            .map_err(|err| anyhow::anyhow!("{}", err.render()))?;
        write!(out, "{}", self.render_listing(matches.get_flag("full")))?;
        Ok(Outcome::Ran)
    }

    /// The listing text: sorted names with one-line summaries; with `full`,
    /// each command's complete help follows.
    pub fn render_listing(&self, full: bool) -> String {
        let mut sorted: Vec<&Registered> = self.commands.iter().collect();
        sorted.sort_by(|a, b| a.sig.name().cmp(b.sig.name()));

        let mut out =
            String::from("available commands are here. (with --full option, showing full text)\n\n");
        for r in &sorted {
            let doc = crate::doctext::parse(r.sig.doc_text());
            match doc.summary() {
                Some(summary) => out.push_str(&format!("- {} -- {}\n", r.sig.name(), summary)),
                None => out.push_str(&format!("- {}\n", r.sig.name())),
            }
        }
        if full && !sorted.is_empty() {
            out.push('\n');
            for r in &sorted {
                out.push_str(&format!(
                    "\n---{}-------------------------------------\n",
                    r.sig.name()
                ));
                out.push_str(&parser::build_command(&r.sig).render_long_help().to_string());
            }
        }
        out
    }

    fn build(&self) -> Command {
        // subcommand_required is enforced manually in finish() so that a
        // bare `--expose` can still reach the codegen driver.
        let mut cmd = driver::attach_reserved(Command::new(self.prog.clone()));
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        for r in &self.commands {
            cmd = cmd.subcommand(parser::build_command(&r.sig));
        }
        cmd
    }

    fn finish(&self, cmd: &mut Command, matches: &ArgMatches) -> FinishResult {
        if matches.get_flag("expose") {
            let opts = EmitOptions {
                inplace: matches.get_flag("inplace"),
                typed: matches.get_flag("typed"),
            };
            let sigs: Vec<Signature> = self.commands.iter().map(|r| r.sig.clone()).collect();
            let result =
                codegen::run_as_multi_command(&self.prog, self.about.as_deref(), &sigs, &opts)
                    .map(|()| Outcome::Exposed);
            return FinishResult::Done(result);
        }
        match matches.subcommand() {
            Some((name, sub)) => {
                let found = self.commands.iter().find(|r| r.sig.name() == name);
                let result = found
                    .with_context(|| format!("unknown subcommand `{name}`"))
                    .and_then(|r| {
                        let params = parser::collect_params(&r.sig, sub);
                        (r.handler)(&params)?;
                        Ok(Outcome::Ran)
                    });
                FinishResult::Done(result)
            }
            None => FinishResult::ArgvError(cmd.error(
                clap::error::ErrorKind::MissingSubcommand,
                "a subcommand is required",
            )),
        }
    }
}

enum FinishResult {
    Done(Result<Outcome>),
    ArgvError(clap::Error),
}
