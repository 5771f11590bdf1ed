use crate::command::{ExitCode, Invocation, ProcessRunner, RunningProcess, Stdout};
use crate::env::Environment;
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProcessRunner;

struct OsProcess(Child);

impl ProcessRunner for OsProcessRunner {
    fn start(&self, invocation: Invocation<'_>) -> std::io::Result<Box<dyn RunningProcess>> {
        let mut cmd = std::process::Command::new(invocation.program);
        if let Some((name, args)) = invocation.argv.split_first() {
            set_arg0(&mut cmd, name);
            cmd.args(args);
        }
        let child = cmd
            .stdin(invocation.stdin)
            .stdout(invocation.stdout)
            .stderr(invocation.stderr)
            .envs(invocation.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&invocation.env.current_dir)
            .spawn()?;
        log::debug!("started {} as pid {}", invocation.program.display(), child.id());
        // `cmd` and its Stdio handles are dropped here, closing the parent's copies.
        Ok(Box::new(OsProcess(child)))
    }
}

impl RunningProcess for OsProcess {
    fn wait(mut self: Box<Self>) -> std::io::Result<ExitCode> {
        let exit_status = self.0.wait()?;
        log::debug!("pid {} exited: {}", self.0.id(), exit_status);
        Ok(match exit_status.code() {
            Some(x) => x,
            None => terminated_by_signal(exit_status),
        })
    }
}

#[cfg(unix)]
fn set_arg0(cmd: &mut std::process::Command, name: &str) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut std::process::Command, _name: &str) {}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Run one external command to completion with stdin and stderr inherited.
pub(crate) fn run_external(
    runner: &dyn ProcessRunner,
    program: &Path,
    argv: &[String],
    mut stdout: Box<dyn Stdout>,
    env: &Environment,
) -> Result<ExitCode> {
    // Anything we buffered must land before the child writes to the same destination.
    stdout.flush()?;
    let child = runner.start(Invocation {
        program,
        argv,
        stdin: Stdio::inherit(),
        stdout: stdout.stdio(),
        stderr: Stdio::inherit(),
        env,
    })?;
    Ok(child.wait()?)
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with multiple components (e.g., `bin/sh`) or `./foo`: taken from `base`
///   and returned if it is an executable file.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   in order and return the first executable match. Relative entries such as `.` or
///   `bin` are taken from `base` too.
/// - Empty path: returns `None`.
///
/// `base` is the interpreter's current directory, which is not the process one.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    path: &'a Path,
    base: &Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, _) => None,
        (Some(Component::Normal(x)), None) => find_in_path(search_paths, x, base).map(Cow::Owned),
        _ => {
            let full = base.join(path);
            find_by_path(&full)?;
            Some(Cow::Owned(full))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr, base: &Path) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        // An empty entry would otherwise search the current directory.
        if dir.as_os_str().is_empty() {
            continue;
        }
        // `.` components are dropped so `PATH=.` reports `<dir>/tool`, not `<dir>/./tool`.
        let path: PathBuf = base.join(dir).join(cmd).components().collect();
        if find_by_path(&path).is_some() {
            return Some(path);
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
