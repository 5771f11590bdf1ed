//! Output redirection (`>` and `1>`) for a single command.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Recognized output redirection operators. Both truncate the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    /// `>`
    Stdout,
    /// `1>`
    Fd1,
}

impl RedirectOp {
    const ALL: [RedirectOp; 2] = [RedirectOp::Stdout, RedirectOp::Fd1];

    /// The operator as written on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectOp::Stdout => ">",
            RedirectOp::Fd1 => "1>",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }
}

/// The redirection found in an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionSpec {
    pub op: RedirectOp,
    /// Position of the operator; it and everything after it are not arguments.
    pub index: usize,
    pub target: PathBuf,
}

#[derive(Debug, thiserror::Error)]
#[error("cannot create {}: {source}", .path.display())]
pub struct RedirectionError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl RedirectionSpec {
    /// Create or truncate the target. Relative targets are taken from `base`.
    pub fn open(&self, base: &Path) -> Result<File, RedirectionError> {
        let path = base.join(&self.target);
        File::create(&path).map_err(|source| RedirectionError {
            path: self.target.clone(),
            source,
        })
    }
}

/// The first operator (scanning left to right) that is followed by a target wins.
pub fn find_redirection(args: &[String]) -> Option<RedirectionSpec> {
    args.windows(2).enumerate().find_map(|(index, pair)| {
        RedirectOp::parse(&pair[0]).map(|op| RedirectionSpec {
            op,
            index,
            target: PathBuf::from(&pair[1]),
        })
    })
}

/// Open the redirection target of `args`, if any.
///
/// On success `args` is cut at the operator: the operator, the target and any words
/// after the target are dropped. On failure `args` is left exactly as it was, so the
/// caller can still run the command against its default output.
pub fn apply_redirection(
    args: &mut Vec<String>,
    base: &Path,
) -> Result<Option<File>, RedirectionError> {
    let Some(spec) = find_redirection(args) else {
        return Ok(None);
    };
    let file = spec.open(base)?;
    log::debug!("redirecting stdout with `{}` to {}", spec.op.as_str(), spec.target.display());
    args.truncate(spec.index);
    Ok(Some(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::make_unique_temp_dir;
    use std::fs;
    use std::io::Write;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_plain_and_fd_operators() {
        let spec = find_redirection(&argv(&["echo", "hi", ">", "out.txt"])).unwrap();
        assert_eq!(spec.op, RedirectOp::Stdout);
        assert_eq!(spec.index, 2);
        assert_eq!(spec.target, PathBuf::from("out.txt"));

        let spec = find_redirection(&argv(&["ls", "1>", "a", ">", "b"])).unwrap();
        assert_eq!(spec.op, RedirectOp::Fd1);
        assert_eq!(spec.op.as_str(), "1>");
        assert_eq!(spec.index, 1);
        assert_eq!(spec.target, PathBuf::from("a"));
    }

    #[test]
    fn test_operator_without_target_is_ignored() {
        assert_eq!(find_redirection(&argv(&["echo", "hi", ">"])), None);
        assert_eq!(find_redirection(&argv(&["echo", "2>", "x", ">>", "y"])), None);
        assert_eq!(find_redirection(&argv(&["echo", "a>b"])), None);
    }

    #[test]
    fn test_apply_truncates_arguments_and_file() {
        let dir = make_unique_temp_dir("redirect_apply").unwrap();
        fs::write(dir.join("out.txt"), "old contents that are longer\n").unwrap();

        let mut args = argv(&["echo", "hello", ">", "out.txt", "dropped", "too"]);
        let mut file = apply_redirection(&mut args, &dir).unwrap().unwrap();
        writeln!(file, "hello").unwrap();
        drop(file);

        assert_eq!(args, argv(&["echo", "hello"]));
        assert_eq!(fs::read_to_string(dir.join("out.txt")).unwrap(), "hello\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_apply_without_operator_is_noop() {
        let mut args = argv(&["echo", "hello"]);
        let res = apply_redirection(&mut args, Path::new("/")).unwrap();
        assert!(res.is_none());
        assert_eq!(args, argv(&["echo", "hello"]));
    }

    #[test]
    fn test_apply_failure_leaves_arguments_untouched() {
        let dir = make_unique_temp_dir("redirect_fail").unwrap();
        let mut args = argv(&["echo", "hello", ">", "missing/out.txt"]);

        let err = apply_redirection(&mut args, &dir).unwrap_err();

        assert_eq!(err.path, PathBuf::from("missing/out.txt"));
        assert!(err.to_string().starts_with("cannot create missing/out.txt: "));
        assert_eq!(args, argv(&["echo", "hello", ">", "missing/out.txt"]));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_absolute_target_ignores_base() {
        let dir = make_unique_temp_dir("redirect_abs").unwrap();
        let target = dir.join("abs.txt");
        let mut args = argv(&["pwd", ">", &target.to_string_lossy()]);

        let file = apply_redirection(&mut args, Path::new("/does/not/exist")).unwrap();

        assert!(file.is_some());
        assert!(target.exists());
        let _ = fs::remove_dir_all(dir);
    }
}
