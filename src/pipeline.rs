//! Running several commands connected by anonymous pipes.

use crate::command::{ExitCode, Invocation, ProcessRunner, Resolved, RunningProcess, Stdout};
use crate::env::Environment;
use std::io::{self, PipeReader, Write};
use std::process::Stdio;
use std::thread::{self, Scope, ScopedJoinHandle};

/// One command of a pipeline, already resolved.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Command name followed by its arguments.
    pub argv: Vec<String>,
    pub command: Resolved,
}

impl Stage {
    fn name(&self) -> String {
        self.argv.first().cloned().unwrap_or_default()
    }
}

/// Why a single stage did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    #[error("cannot create pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("{name}: failed to start: {source}")]
    Start {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("{name}: failed to wait: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("{name}: exited with status {code}")]
    Status { name: String, code: ExitCode },
    #[error("{name}: {message}")]
    Builtin { name: String, message: String },
    #[error("{name}: builtin panicked")]
    Panicked { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("a pipeline needs at least two commands")]
    TooFewStages,
    /// Every stage that failed, in pipeline order. Reported as one line.
    #[error("error in pipeline execution: {}", describe(.0))]
    Failed(Vec<StageFailure>),
}

fn describe(failures: &[StageFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Status of a process killed by SIGPIPE: its reader exited first, which is how
/// `producer | head` normally ends.
const KILLED_BY_SIGPIPE: ExitCode = 128 + 13;

enum Running<'scope> {
    Process {
        name: String,
        child: Box<dyn RunningProcess>,
    },
    Builtin {
        name: String,
        handle: ScopedJoinHandle<'scope, anyhow::Result<ExitCode>>,
    },
}

impl Running<'_> {
    fn wait(self) -> Result<ExitCode, StageFailure> {
        let (name, code) = match self {
            Running::Process { name, child } => match child.wait() {
                Ok(code) => (name, code),
                Err(source) => return Err(StageFailure::Wait { name, source }),
            },
            Running::Builtin { name, handle } => match handle.join() {
                Ok(Ok(code)) => (name, code),
                // The reader went away early; like `yes | head`, that is not an error.
                Ok(Err(e)) if is_broken_pipe(&e) => (name, 0),
                Ok(Err(e)) => {
                    let message = format!("{:#}", e);
                    return Err(StageFailure::Builtin { name, message });
                }
                Err(_) => return Err(StageFailure::Panicked { name }),
            },
        };
        log::debug!("pipeline stage {} finished with {}", name, code);
        if code == 0 || code == KILLED_BY_SIGPIPE {
            Ok(code)
        } else {
            Err(StageFailure::Status { name, code })
        }
    }
}

fn is_broken_pipe(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
}

/// Starts every stage of a pipeline, then waits for all of them.
///
/// Stage *i* writes into pipe *i* and stage *i+1* reads from it. The first stage
/// inherits the interpreter's stdin and the last one writes to the given output.
/// External stages are processes started through the [`ProcessRunner`]; builtin
/// stages run on their own thread against a copy of the environment, so `cd` or
/// `exit` inside a pipeline leave the interpreter alone.
///
/// Nothing is cancelled: a stage that never exits keeps the whole pipeline waiting.
pub struct PipelineExecutor<'r> {
    runner: &'r dyn ProcessRunner,
}

impl<'r> PipelineExecutor<'r> {
    pub fn new(runner: &'r dyn ProcessRunner) -> Self {
        Self { runner }
    }

    /// Returns the exit code of the last stage when every stage succeeded.
    pub fn run(
        &self,
        stages: Vec<Stage>,
        output: Box<dyn Stdout>,
        env: &Environment,
    ) -> Result<ExitCode, PipelineError> {
        if stages.len() < 2 {
            return Err(PipelineError::TooFewStages);
        }

        thread::scope(|scope| {
            let mut failures = Vec::new();
            let mut running = Vec::new();
            let mut stages = stages.into_iter();
            let last = stages.next_back();
            let mut upstream: Option<PipeReader> = None;
            let mut pipes_ok = true;

            for stage in stages {
                let (reader, writer) = match io::pipe() {
                    Ok(pair) => pair,
                    Err(e) => {
                        failures.push(StageFailure::Pipe(e));
                        pipes_ok = false;
                        break;
                    }
                };
                // Whatever happens, the parent gives up its ends here: the writer goes
                // to this stage and the reader is only kept for the next one.
                match self.start(scope, stage, upstream.take(), Box::new(writer), env) {
                    Ok(r) => running.push(r),
                    Err(f) => failures.push(f),
                }
                upstream = Some(reader);
            }

            if let Some(stage) = last.filter(|_| pipes_ok) {
                match self.start(scope, stage, upstream.take(), output, env) {
                    Ok(r) => running.push(r),
                    Err(f) => failures.push(f),
                }
            }
            log::debug!("pipeline: {} stages running", running.len());

            let mut status = 0;
            for r in running {
                match r.wait() {
                    Ok(code) => status = code,
                    Err(f) => failures.push(f),
                }
            }

            if failures.is_empty() {
                Ok(status)
            } else {
                log::debug!("pipeline failed: {}", describe(&failures));
                Err(PipelineError::Failed(failures))
            }
        })
    }

    fn start<'scope>(
        &self,
        scope: &'scope Scope<'scope, '_>,
        stage: Stage,
        stdin: Option<PipeReader>,
        mut stdout: Box<dyn Stdout>,
        env: &Environment,
    ) -> Result<Running<'scope>, StageFailure> {
        let name = stage.name();
        match stage.command {
            Resolved::External(program) => {
                let started = stdout.flush().and_then(|()| {
                    self.runner.start(Invocation {
                        program: &program,
                        argv: &stage.argv,
                        stdin: stdin.map_or_else(Stdio::inherit, Stdio::from),
                        stdout: stdout.stdio(),
                        stderr: Stdio::inherit(),
                        env,
                    })
                });
                match started {
                    Ok(child) => Ok(Running::Process { name, child }),
                    Err(source) => Err(StageFailure::Start { name, source }),
                }
            }
            Resolved::Builtin(builtin) => {
                // Builtins never read their input; closing it lets the writer see EPIPE.
                drop(stdin);
                let mut env = env.clone();
                let handle = scope.spawn(move || {
                    let args = stage.argv.get(1..).unwrap_or(&[]);
                    let code = builtin.run(args, &mut stdout, &mut env)?;
                    stdout.flush()?;
                    Ok(code)
                });
                Ok(Running::Builtin { name, handle })
            }
        }
    }
}
