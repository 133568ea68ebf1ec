use std::{
    ffi::{CString, NulError, OsStr},
    io::Write,
    os::unix::ffi::{OsStrExt, OsStringExt},
    path::Path,
};

use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitStatus},
    unistd::{execv, fork, ForkResult},
};

use crate::{args::Tokens, path, terminal::Session};

/// Status a forked child leaves with.
pub type ExitCode = i32;

/// Exit status of a child that found no program to run.
pub const NOT_FOUND: ExitCode = 127;
/// Exit status of a child whose program exists but may not be executed.
pub const NOT_EXECUTABLE: ExitCode = 126;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no command given")]
    EmptyCommand,
    #[error("argument contains a NUL byte: {0}")]
    Nul(#[from] NulError),
    #[error(transparent)]
    PathTooLong(#[from] path::Error),
    #[error("unable to fork: {0}")]
    Fork(#[source] Errno),
    #[error("unable to wait for child: {0}")]
    Wait(#[source] Errno),
    #[error("Io Error <{0}>")]
    Io(#[from] std::io::Error),
}

/// Everything the child needs, prepared before forking.
#[derive(Debug)]
pub struct Program {
    name: String,
    argv: Vec<CString>,
    candidates: Vec<CString>,
}

impl Program {
    /// Builds the argument vector from `tokens` and the search path
    /// candidates from `path_env`.
    pub fn new(tokens: &Tokens, path_env: Option<&OsStr>) -> Result<Self, Error> {
        let name = tokens.first().ok_or(Error::EmptyCommand)?;
        path::check_len(Path::new(name))?;

        let argv = tokens
            .iter()
            .map(|t| CString::new(t.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let candidates = path::candidates(name, path_env)
            .into_iter()
            .map(|p| CString::new(p.into_os_string().into_vec()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string_lossy().into_owned(),
            argv,
            candidates,
        })
    }

    /// Replaces the current process image. Only returns when every attempt
    /// failed, with the status the child should exit with.
    fn exec(&self) -> ExitCode {
        let mut denied = false;

        let attempts = std::iter::once(&self.argv[0]).chain(&self.candidates);
        for path in attempts {
            let Err(errno) = execv(path, &self.argv);
            denied |= errno == Errno::EACCES;
        }

        if denied {
            eprintln!("{}: permission denied", self.name);
            NOT_EXECUTABLE
        } else {
            eprintln!("{}: command not found", self.name);
            NOT_FOUND
        }
    }
}

/// Forks, runs `child` in the new process and blocks until it is gone.
///
/// The parent never returns before the child has terminated, so at most one
/// child exists at any time. The child leaves with the code `child` returns.
pub fn run_in_child<F>(child: F) -> Result<WaitStatus, Error>
where
    F: FnOnce() -> ExitCode,
{
    // pending output would otherwise be written twice
    std::io::stdout().flush()?;
    std::io::stderr().flush()?;

    // SAFETY: the shell is single threaded, so the child cannot inherit a
    // lock held by another thread.
    match unsafe { fork() }.map_err(Error::Fork)? {
        ForkResult::Child => {
            let code = child();
            std::process::exit(code)
        }
        ForkResult::Parent { child } => loop {
            match waitpid(child, None) {
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(Error::Wait(errno)),
                Ok(status) => {
                    tracing::debug!(?status, "child finished");
                    return Ok(status);
                }
            }
        },
    }
}

/// Runs the external program named by `tokens[0]`, waiting for it to exit.
///
/// The program is tried as a path first and then in every `PATH` directory.
/// Its exit status is only logged.
pub fn launch(session: &Session, tokens: &Tokens) -> Result<WaitStatus, Error> {
    let program = Program::new(tokens, std::env::var_os("PATH").as_deref())?;
    tracing::debug!(
        program = %program.name,
        candidates = program.candidates.len(),
        "program start"
    );

    let status = run_in_child(|| program.exec())?;
    session.restore_terminal();

    Ok(status)
}

#[cfg(test)]
mod test {
    use super::*;

    use itertools::Itertools as _;
    use pretty_assertions::assert_eq;

    use crate::args::tokenize;

    #[test]
    fn argv_keeps_every_token() {
        let tokens = tokenize("echo hi 'two words'").unwrap();
        let program = Program::new(&tokens, None).unwrap();

        let argv = program
            .argv
            .iter()
            .map(|a| a.to_str().unwrap())
            .collect_vec();
        assert_eq!(argv, ["echo", "hi", "two words"]);
        assert!(program.candidates.is_empty());
    }

    #[test]
    fn candidates_follow_path_order() {
        let tokens = tokenize("lsx -l").unwrap();
        let program = Program::new(&tokens, Some(OsStr::new("/usr/bin:/bin"))).unwrap();

        let candidates = program
            .candidates
            .iter()
            .map(|a| a.to_str().unwrap())
            .collect_vec();
        assert_eq!(candidates, ["/usr/bin/lsx", "/bin/lsx"]);
    }

    #[test]
    fn path_like_command_skips_search() {
        let tokens = tokenize("./script.sh").unwrap();
        let program = Program::new(&tokens, Some(OsStr::new("/usr/bin:/bin"))).unwrap();
        assert!(program.candidates.is_empty());
    }

    #[test]
    fn empty_command_is_rejected() {
        let res = Program::new(&Tokens::default(), Some(OsStr::new("/bin")));
        assert!(matches!(res, Err(Error::EmptyCommand)));
    }

    #[test]
    fn nul_in_argument_is_rejected() {
        let tokens: Tokens = ["echo", "a\0b"].into_iter().collect();
        let res = Program::new(&tokens, None);
        assert!(matches!(res, Err(Error::Nul(_))));
    }

    #[test]
    fn argv_keeps_raw_bytes() {
        let tokens = tokenize(b"cat f\xffx").unwrap();
        let program = Program::new(&tokens, None).unwrap();
        assert_eq!(program.argv[1].as_bytes(), b"f\xffx");
    }

    #[test]
    fn overly_long_command_is_rejected() {
        let tokens: Tokens = ["x".repeat(path::PATH_MAX)].into_iter().collect();
        let res = Program::new(&tokens, Some(OsStr::new("/bin")));
        assert!(matches!(res, Err(Error::PathTooLong(_))));
    }
}
