//! Source generation: standalone `main()` emission and marker stripping.
//!
//! The emitter produces text that builds the same clap command as
//! [`crate::parser`] does at runtime, so a generated program parses argv
//! exactly like its driven original did. The strip pass removes this
//! library's own imports and registration code from the rewritten file.

mod emit;
mod module;
mod strip;

pub use emit::{
    EmitOptions, emit, main_code, replace_file, run_as_multi_command, run_as_single_command,
    subcommands_code,
};
pub use module::Module;
pub use strip::{SymbolTable, strip_markers};

/// The crate whose imports and registrations are stripped from rewritten
/// source files.
pub const LIBRARY_CRATE: &str = "catspaw";
