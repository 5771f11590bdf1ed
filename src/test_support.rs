//! Helpers shared by the unit tests of several modules.

use crate::command::{ExitCode, Invocation, ProcessRunner, RunningProcess};
use crate::env::Environment;
use std::cell::RefCell;
use std::collections::HashMap;
use std::env as stdenv;
use std::fs;
use std::io;
use std::rc::Rc;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn make_unique_temp_dir(tag: &str) -> io::Result<PathBuf> {
    let mut p = stdenv::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    p.push(format!("pipe_shell_{}_{}_{}", tag, std::process::id(), nanos));
    fs::create_dir_all(&p)?;
    Ok(fs::canonicalize(p)?)
}

/// A working directory no other test will remove.
pub(crate) fn test_env() -> Environment {
    Environment {
        vars: HashMap::new(),
        current_dir: fs::canonicalize(stdenv::temp_dir()).unwrap(),
        exit_status: None,
    }
}

/// Records every start and wait and answers with scripted exit codes.
///
/// Events look like `start <argv joined by spaces>` and `wait <name>`.
#[derive(Default)]
pub(crate) struct FakeRunner {
    pub events: Rc<RefCell<Vec<String>>>,
    pub exit_codes: HashMap<String, ExitCode>,
    pub unstartable: Vec<String>,
}

struct FakeProcess {
    name: String,
    code: ExitCode,
    events: Rc<RefCell<Vec<String>>>,
}

impl ProcessRunner for FakeRunner {
    fn start(&self, invocation: Invocation<'_>) -> io::Result<Box<dyn RunningProcess>> {
        let name = invocation.argv[0].clone();
        if self.unstartable.contains(&name) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        self.events
            .borrow_mut()
            .push(format!("start {}", invocation.argv.join(" ")));
        Ok(Box::new(FakeProcess {
            code: self.exit_codes.get(&name).copied().unwrap_or(0),
            name,
            events: self.events.clone(),
        }))
    }
}

impl RunningProcess for FakeProcess {
    fn wait(self: Box<Self>) -> io::Result<ExitCode> {
        self.events.borrow_mut().push(format!("wait {}", self.name));
        Ok(self.code)
    }
}
