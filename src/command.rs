use crate::builtin::Builtin;
use crate::env::Environment;
use crate::external::find_command_path;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Abstraction over a writable output destination that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// Every execution path receives its destination explicitly: the terminal, a file
/// opened by a redirection, or the write end of a pipe. A blanket implementation
/// exists for any type that implements `Write`, `Send` and `Into<Stdio>`
/// (e.g. `std::io::Stdout`, `File` or `std::io::PipeWriter`).
pub trait Stdout: Write + Send {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Send + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// What a command name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Builtin(Builtin),
    /// Full path of an executable found on the search path.
    External(PathBuf),
}

impl Resolved {
    /// Builtins take precedence over executables on `PATH`.
    pub fn resolve(name: &str, env: &Environment) -> Option<Self> {
        if let Some(builtin) = Builtin::from_name(name) {
            return Some(Resolved::Builtin(builtin));
        }
        // Relative names and relative `PATH` entries are taken from the interpreter's
        // directory, not the process one.
        let search_paths = env.search_path();
        let found =
            find_command_path(OsStr::new(&search_paths), Path::new(name), &env.current_dir)?;
        log::debug!("resolved {} to {}", name, found.display());
        Some(Resolved::External(found.into_owned()))
    }
}

/// Everything needed to start one external process.
pub struct Invocation<'a> {
    /// Executable to run.
    pub program: &'a Path,
    /// Argument vector; `argv[0]` is the command name as the user typed it.
    pub argv: &'a [String],
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
    /// Variables and working directory the process starts with.
    pub env: &'a Environment,
}

/// Capability to start processes.
///
/// The interpreter and the pipeline executor never spawn directly; they go through this
/// trait so a fake runner can stand in for the operating system in tests.
pub trait ProcessRunner {
    /// Start the process without waiting for it.
    fn start(&self, invocation: Invocation<'_>) -> io::Result<Box<dyn RunningProcess>>;
}

/// A started process that can be waited on exactly once.
pub trait RunningProcess {
    /// Block until the process exits and return its exit code.
    fn wait(self: Box<Self>) -> io::Result<ExitCode>;
}
