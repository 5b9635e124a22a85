//! The `catspaw` command-line tool.
//!
//! Works on plain source files that never imported the library: `expose`
//! generates a standalone `main()` for the functions in a file, `list`
//! surveys a tree for exposable functions, and `completion` emits shell
//! completions for this tool itself.

use anyhow::{Context as _, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use walkdir::WalkDir;

use catspaw::Signature;
use catspaw::codegen;
use catspaw::doctext;
use catspaw::parser;
use catspaw::source::SourceFile;

#[derive(Parser)]
#[command(name = "catspaw", version, about = "turn plain functions into CLI commands")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a standalone main() for functions in a source file
    Expose {
        /// Source file to read functions from
        file: PathBuf,

        /// Function to expose (repeatable; defaults to registered, then
        /// public, functions)
        #[arg(long = "name")]
        names: Vec<String>,

        /// Program name for the generated parser (defaults to the file stem)
        #[arg(long)]
        prog: Option<String>,

        /// Generate a subcommand dispatcher even for a single function
        #[arg(long)]
        multi: bool,

        /// Annotate generated bindings with explicit types
        #[arg(long)]
        typed: bool,

        /// Rewrite the file instead of printing to stdout
        #[arg(long)]
        inplace: bool,
    },

    /// List exposable functions under the given paths
    List {
        /// Files or directories to scan (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Show every parameter, not just the summary line
        #[arg(short, long)]
        full: bool,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        shell: Shell,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Expose {
            file,
            names,
            prog,
            multi,
            typed,
            inplace,
        } => expose(&file, &names, prog.as_deref(), multi, typed, inplace),
        Commands::List { paths, full } => list(&paths, full),
        Commands::Completion { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "catspaw",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn expose(
    file: &PathBuf,
    names: &[String],
    prog: Option<&str>,
    multi: bool,
    typed: bool,
    inplace: bool,
) -> Result<()> {
    let src = SourceFile::parse(file)?;
    let names = if names.is_empty() {
        let registered = src.registered_names();
        if registered.is_empty() {
            src.public_fn_names()
        } else {
            registered
        }
    } else {
        names.to_vec()
    };
    if names.is_empty() {
        bail!(
            "no exposable functions in {} (pass --name, or make a function pub)",
            file.display()
        );
    }

    let sigs: Vec<Signature> = names
        .iter()
        .map(|name| src.resolve(name))
        .collect::<Result<_>>()?;

    let code = if sigs.len() == 1 && !multi {
        codegen::main_code(&sigs[0], typed)?
    } else {
        let prog = match prog {
            Some(p) => p.to_string(),
            None => file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .context("cannot derive a program name from the file path")?,
        };
        codegen::subcommands_code(&prog, None, &sigs, typed)?
    };
    codegen::emit(file, &code, inplace)?;
    if inplace {
        log::info!("rewrote {}", file.display());
    }
    Ok(())
}

fn list(paths: &[PathBuf], full: bool) -> Result<()> {
    let paths = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };
    for root in paths {
        for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }
            let src = match SourceFile::parse(path) {
                Ok(src) => src,
                Err(err) => {
                    log::warn!("skipping {}: {err:#}", path.display());
                    continue;
                }
            };
            let text = render_file_listing(&src, full);
            if text.is_empty() {
                continue;
            }
            println!("{}", path.display().to_string().bold());
            print!("{text}");
        }
    }
    Ok(())
}

/// One file's listing: every registered (or public) name with its summary.
/// Names without a matching function still appear, carrying the doc text of
/// their registration; `full` appends each command's complete help.
fn render_file_listing(src: &SourceFile, full: bool) -> String {
    let mut names = {
        let registered = src.registered_names();
        if registered.is_empty() {
            src.public_fn_names()
        } else {
            registered
        }
    };
    names.sort();

    let mut out = String::new();
    for name in names {
        match src.resolve(&name) {
            Ok(sig) => {
                let doc = doctext::parse(sig.doc_text());
                push_entry(&mut out, &name, doc.summary());
                if full {
                    out.push_str(&format!(
                        "\n---{name}-------------------------------------\n"
                    ));
                    out.push_str(&parser::build_command(&sig).render_long_help().to_string());
                }
            }
            Err(_) => {
                let raw = src.registration_doc(&name).unwrap_or_default();
                let doc = doctext::parse(&raw);
                push_entry(&mut out, &name, doc.summary());
                if full && !raw.trim().is_empty() {
                    out.push_str(&format!(
                        "\n---{name}-------------------------------------\n{raw}\n"
                    ));
                }
            }
        }
    }
    out
}

fn push_entry(out: &mut String, name: &str, summary: Option<&str>) {
    match summary {
        Some(summary) => out.push_str(&format!("  - {name} -- {summary}\n")),
        None => out.push_str(&format!("  - {name}\n")),
    }
}
