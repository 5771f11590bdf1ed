use crate::command::{ExitCode, ProcessRunner, Resolved, Stdout};
use crate::env::Environment;
use crate::external::{self, OsProcessRunner};
use crate::parser::{self, CommandLine, ParseError};
use crate::pipeline::{PipelineExecutor, Stage};
use crate::redirect;
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// Status of a line that could not be parsed.
const PARSE_FAILURE: ExitCode = 2;
/// Status of a command that is neither a builtin nor found on `PATH`.
const NOT_FOUND: ExitCode = 127;

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// Each line goes through the same steps: tokenize, split on `|`, apply an output
/// redirection, resolve every command (builtins first, then `PATH`) and execute.
/// Output is never routed through a global handle: each line receives its destination
/// explicitly and drops it when done, so a redirection cannot outlive its line.
///
/// Example
/// ```
/// use pipe_shell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run_line("echo 'hello  world'");
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    runner: Box<dyn ProcessRunner>,
}

impl Interpreter {
    /// Create a new interpreter that starts external commands through `runner`.
    pub fn new(env: Environment, runner: Box<dyn ProcessRunner>) -> Self {
        Self { env, runner }
    }

    /// Set once `exit` has run; the interpreter should stop with this status.
    pub fn exit_status(&self) -> Option<ExitCode> {
        self.env.exit_status
    }

    /// Run one input line with the terminal as its default output.
    pub fn run_line(&mut self, line: &str) -> ExitCode {
        self.run_line_with_output(line, Box::new(std::io::stdout()))
    }

    /// Run one input line, writing to `output` unless the line redirects elsewhere.
    ///
    /// Every failure is reported as a single line and turned into a status: parse
    /// errors and `command not found` go to the output, redirection and pipeline
    /// failures to standard error.
    pub fn run_line_with_output(&mut self, line: &str, mut output: Box<dyn Stdout>) -> ExitCode {
        let command_line = match parser::parse_line(line) {
            Ok(x) => x,
            Err(e) => {
                log::debug!("discarding line {:?}: {}", line, e);
                if let Err(write_err) = writeln!(output, "{}", e) {
                    log::warn!("cannot report parse error ({}): {}", e, write_err);
                }
                return PARSE_FAILURE;
            }
        };

        let res = match command_line {
            CommandLine::Empty => Ok(0),
            CommandLine::Simple(argv) => self.run_simple(argv, output),
            CommandLine::Pipeline(stages) => self.run_pipeline(stages, output),
        };
        match res {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{:#}", e);
                1
            }
        }
    }

    /// Read-Eval-Print Loop: runs until `exit` or the end of input (status 1).
    /// Fails only when input can no longer be read.
    pub fn repl(&mut self, prompt: &str) -> Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;

        while self.env.exit_status.is_none() {
            match rl.readline(prompt) {
                Ok(line) => {
                    let code = self.run_line(&line);
                    log::trace!("{:?} -> {}", line, code);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    log::debug!("end of input");
                    return Ok(1);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(self.env.exit_status.unwrap_or(0))
    }

    fn run_simple(&mut self, mut argv: Vec<String>, output: Box<dyn Stdout>) -> Result<ExitCode> {
        let mut output = self.redirect(&mut argv, output);
        // `> file` on its own only creates the file.
        let Some(name) = argv.first() else {
            return Ok(0);
        };

        match Resolved::resolve(name, &self.env) {
            None => {
                writeln!(output, "{}: command not found", name)?;
                Ok(NOT_FOUND)
            }
            Some(Resolved::Builtin(builtin)) => {
                let code = builtin.run(&argv[1..], &mut output, &mut self.env)?;
                output.flush()?;
                Ok(code)
            }
            Some(Resolved::External(path)) => {
                external::run_external(self.runner.as_ref(), &path, &argv, output, &self.env)
                    .with_context(|| name.clone())
            }
        }
    }

    /// Only the last stage may redirect; its file replaces the pipeline's output.
    fn run_pipeline(
        &mut self,
        mut stages: Vec<Vec<String>>,
        output: Box<dyn Stdout>,
    ) -> Result<ExitCode> {
        let mut output = match stages.last_mut() {
            Some(last) => self.redirect(last, output),
            None => output,
        };

        let mut resolved = Vec::with_capacity(stages.len());
        let mut missing = false;
        for argv in stages {
            let Some(name) = argv.first() else {
                writeln!(output, "{}", ParseError::EmptyPipelineStage)?;
                return Ok(PARSE_FAILURE);
            };
            match Resolved::resolve(name, &self.env) {
                Some(command) => resolved.push(Stage { argv, command }),
                None => {
                    writeln!(output, "{}: command not found", name)?;
                    missing = true;
                }
            }
        }
        if missing {
            return Ok(NOT_FOUND);
        }

        match PipelineExecutor::new(self.runner.as_ref()).run(resolved, output, &self.env) {
            Ok(code) => Ok(code),
            Err(e) => {
                eprintln!("{}", e);
                Ok(1)
            }
        }
    }

    /// The destination for one command: the redirect target if one can be created,
    /// `default` otherwise.
    fn redirect(&self, argv: &mut Vec<String>, default: Box<dyn Stdout>) -> Box<dyn Stdout> {
        match redirect::apply_redirection(argv, &self.env.current_dir) {
            Ok(Some(file)) => Box::new(file),
            Ok(None) => default,
            Err(e) => {
                log::warn!("redirection ignored: {}", e);
                eprintln!("{}", e);
                default
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter over the current process environment that starts
    /// external commands with `std::process::Command`.
    fn default() -> Self {
        Self::new(Environment::new(), Box::new(OsProcessRunner))
    }
}
