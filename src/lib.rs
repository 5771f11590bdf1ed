//! A small interactive command interpreter.
//!
//! Lines are split into words (single and double quotes group words, `|` separates
//! commands), an optional `>` / `1>` redirection picks the output file, and every
//! command is either one of the builtins (`exit`, `echo`, `type`, `pwd`, `cd`) or an
//! executable found on `PATH`. Commands joined by `|` run concurrently, each one's
//! output feeding the next one's input.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and [`env`]
//! expose the process-starting capability and the interpreter's environment, so
//! external programs can be replaced by a fake runner when embedding or testing.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod interpreter;
mod lexer;
mod parser;
mod pipeline;
mod redirect;

#[cfg(test)]
mod test_support;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

/// Starts external commands as real operating system processes.
pub use external::OsProcessRunner;
