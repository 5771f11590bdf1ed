use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// State shared by every command of one interpreter.
///
/// `cd` moves `current_dir` only; the process working directory is never changed.
/// External commands are started inside `current_dir`, and relative redirection
/// targets and command paths are taken from it too. A pipeline hands each builtin
/// stage its own clone, so nothing a stage does is visible afterwards.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables set for this interpreter. External commands inherit the process
    /// environment and get these on top of it.
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    /// Set by `exit`; the input loop stops once it is `Some`.
    pub exit_status: Option<ExitCode>,
}

impl Environment {
    /// Starts in the process working directory with no variables of its own.
    ///
    /// Process variables are read on demand, so values that are not valid UTF-8 are
    /// simply passed through to children and never looked at.
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            exit_status: None,
        }
    }

    /// Own variables first, then the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Directories searched for commands, in `PATH` syntax. Empty when unset.
    pub fn search_path(&self) -> String {
        self.get_var("PATH").unwrap_or_default()
    }

    /// `path` as seen from `current_dir`. Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(path)
    }

    /// Replace a leading `~` with `$HOME`. `None` when `~` is used without `HOME`.
    pub fn expand_home(&self, word: &str) -> Option<String> {
        match word.strip_prefix('~') {
            Some(rest) => self.get_var("HOME").map(|home| format!("{}{}", home, rest)),
            None => Some(word.to_string()),
        }
    }

    pub fn request_exit(&mut self, code: ExitCode) {
        log::debug!("exit requested with status {}", code);
        self.exit_status = Some(code);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
