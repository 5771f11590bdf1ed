use crate::command::{ExitCode, Resolved};
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Commands implemented by the interpreter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Type,
    Pwd,
    Cd,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Exit,
        Builtin::Echo,
        Builtin::Type,
        Builtin::Pwd,
        Builtin::Cd,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Canonical name of the command, e.g. "echo" or "cd".
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Echo => "echo",
            Builtin::Type => "type",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
        }
    }

    /// The line `type` prints for this builtin.
    pub fn describe(self) -> String {
        format!("{} is a shell builtin", self.name())
    }

    /// Executes the builtin in-process, writing everything it prints to `stdout`.
    ///
    /// `args` excludes the command name. Failures are reported on `stdout` and turned
    /// into a non-zero exit code, so only errors writing the output itself escape.
    pub fn run(
        self,
        args: &[String],
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        log::debug!("builtin {} {:?}", self.name(), args);
        let res = match self {
            Builtin::Echo => Echo::run(args, stdout),
            Builtin::Exit => parse_and_execute::<Exit>(self, args, stdout, env),
            Builtin::Type => parse_and_execute::<Type>(self, args, stdout, env),
            Builtin::Pwd => parse_and_execute::<Pwd>(self, args, stdout, env),
            Builtin::Cd => parse_and_execute::<Cd>(self, args, stdout, env),
        };
        match res {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{}: {:#}", self.name(), e)?;
                Ok(1)
            }
        }
    }
}

/// Builtins whose arguments are parsed with [`argh`].
trait BuiltinCommand: Sized + FromArgs {
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

fn parse_and_execute<T: BuiltinCommand>(
    builtin: Builtin,
    args: &[String],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[builtin.name()], &args) {
        Ok(cmd) => cmd.execute(stdout, env),
        // `--help` or malformed arguments
        Err(EarlyExit { output, status }) => {
            stdout.write_all(output.as_bytes())?;
            if !output.ends_with('\n') {
                writeln!(stdout)?;
            }
            Ok(if status.is_err() { 1 } else { 0 })
        }
    }
}

/// Write the arguments to standard output, separated by single spaces and
/// followed by a newline. Arguments are printed as-is; there are no options.
struct Echo;

impl Echo {
    fn run(args: &[String], stdout: &mut dyn Write) -> Result<ExitCode> {
        writeln!(stdout, "{}", args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
struct Pwd {}

impl BuiltinCommand for Pwd {
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. A leading
    /// `~` stands for $HOME. Defaults to $HOME when omitted.
    target: Option<String>,
}

impl Cd {
    fn resolve_target(&self, env: &Environment) -> Result<(String, PathBuf)> {
        let shown = match &self.target {
            Some(t) => t.clone(),
            None => env.get_var("HOME").context("HOME not set")?,
        };
        let expanded = env.expand_home(&shown).context("HOME not set")?;
        Ok((shown, env.resolve(expanded)))
    }
}

impl BuiltinCommand for Cd {
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let (shown, new_dir) = self.resolve_target(env)?;

        // Joining "." requires search permission on the directory itself.
        let checked = fs::canonicalize(&new_dir).and_then(|dir| {
            fs::metadata(dir.join("."))?;
            Ok(dir)
        });

        match checked {
            Ok(dir) => {
                log::debug!("cd: {} -> {}", shown, dir.display());
                env.current_dir = dir;
                Ok(0)
            }
            Err(e) => {
                log::debug!("cd: {}: {}", new_dir.display(), e);
                writeln!(stdout, "cd: {}: No such file or directory", shown)?;
                Ok(1)
            }
        }
    }
}

#[derive(FromArgs)]
/// Exit the shell with the given status (0 when omitted).
struct Exit {
    #[argh(positional)]
    /// exit status to terminate the interpreter with, from 0 to 255. Anything else is
    /// rejected and the interpreter keeps running.
    code: Option<u8>,
}

impl BuiltinCommand for Exit {
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let code = ExitCode::from(self.code.unwrap_or(0));
        env.request_exit(code);
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Describe how each name would be interpreted if used as a command.
struct Type {
    #[argh(positional)]
    /// command names to look up.
    names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut status = 0;
        for name in &self.names {
            match Resolved::resolve(name, env) {
                Some(Resolved::Builtin(builtin)) => writeln!(stdout, "{}", builtin.describe())?,
                Some(Resolved::External(path)) => {
                    writeln!(stdout, "{} is {}", name, path.display())?
                }
                None => {
                    writeln!(stdout, "{}: not found", name)?;
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}
