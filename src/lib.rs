//! Turn plain functions into command-line commands.
//!
//! Describe a function with a [`Signature`], hand it to [`as_command`]
//! together with a handler, and argv parsing, help text, and error exits
//! are taken care of:
//!
//! ```no_run
//! use catspaw::{Context, Signature, as_command};
//!
//! fn greet(name: &str, loud: bool) {
//!     let message = format!("hello {name}");
//!     if loud {
//!         println!("{}", message.to_uppercase());
//!     } else {
//!         println!("{message}");
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     as_command(
//!         Signature::new("greet")
//!             .doc("greet someone\n\n:param name: who to greet\n:param loud: shout it")
//!             .arg("name")
//!             .kwarg_default("loud", catspaw::Value::Bool(false))
//!             .source(file!()),
//!         |params| {
//!             greet(params.str("name")?, params.flag("loud")?);
//!             Ok(())
//!         },
//!         &Context::entry_point(),
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! Several functions become subcommands of one program through
//! [`Registry`]. Passing `--expose` to a driven program prints (or, with
//! `--inplace`, writes back) a standalone source file whose generated
//! `main()` parses argv the same way, with every trace of this library
//! removed. The `catspaw` binary does the same for undecorated files.

pub mod accessor;
pub mod codegen;
pub mod doctext;
pub mod driver;
pub mod parser;
pub mod registry;
pub mod signature;
pub mod source;

pub use accessor::{Accessor, Opt};
pub use driver::{Context, Middleware, Outcome, as_command, as_command_with, try_as_command};
pub use parser::Params;
pub use registry::Registry;
pub use signature::{Signature, Ty, Value};
