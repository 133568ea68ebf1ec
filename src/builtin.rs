use std::ffi::OsStr;

use crate::{
    args::{self, Tokens},
    launch, redirect,
};

#[derive(thiserror::Error, Debug)]
pub enum Errors {
    #[error("shutdown requested")]
    Shutdown,
    #[error("{command}: expected {expected} argument(s), got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("cd: {dir}: {source}")]
    ChangeDir {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("pwd: unable to read the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("Io Error <{0}>")]
    IoError(#[from] std::io::Error),
    #[error("Parse Error: {0}")]
    ParseError(#[from] args::Error),
    #[error(transparent)]
    Redirect(#[from] redirect::Error),
    #[error(transparent)]
    Launch(#[from] launch::Error),
}

/// Commands that run inside the shell process itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtins {
    Help,
    Exit,
    Pwd,
    Cd,
}

impl Builtins {
    /// The fixed registry: name, command and the line `help` prints for it.
    pub fn supported() -> [(&'static str, Builtins, &'static str); 5] {
        [
            ("?", Builtins::Help, "show this help menu"),
            ("help", Builtins::Help, "show this help menu"),
            ("exit", Builtins::Exit, "exit the command shell"),
            ("pwd", Builtins::Pwd, "print the working directory"),
            ("cd", Builtins::Cd, "change directory to target"),
        ]
    }

    /// Exact, case sensitive lookup.
    pub fn lookup(name: &OsStr) -> Option<Builtins> {
        Self::supported()
            .into_iter()
            .find_map(|(n, com, _)| (OsStr::new(n) == name).then_some(com))
    }

    pub fn execute(self, tokens: &Tokens, stdout: &mut dyn std::io::Write) -> Result<(), Errors> {
        match self {
            Builtins::Help => help::run(stdout),
            Builtins::Exit => exit::run(),
            Builtins::Pwd => pwd::run(stdout),
            Builtins::Cd => cd::run(tokens),
        }
    }
}

mod help {
    use super::{Builtins, Errors};

    pub fn run(stdout: &mut dyn std::io::Write) -> Result<(), Errors> {
        for (name, _, doc) in Builtins::supported() {
            writeln!(stdout, "{} - {}", name, doc)?;
        }
        Ok(())
    }
}

mod exit {
    use super::Errors;

    pub fn run() -> Result<(), Errors> {
        Err(Errors::Shutdown)
    }
}

mod pwd {
    use super::Errors;

    pub fn run(stdout: &mut dyn std::io::Write) -> Result<(), Errors> {
        let cwd = std::env::current_dir().map_err(Errors::CurrentDir)?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(())
    }
}

mod cd {
    use crate::args::Tokens;

    use super::Errors;

    pub fn run(tokens: &Tokens) -> Result<(), Errors> {
        // command plus exactly one directory
        if tokens.len() != 2 {
            return Err(Errors::Arity {
                command: "cd",
                expected: 1,
                got: tokens.len().saturating_sub(1),
            });
        }

        let dir = &tokens[1];
        std::env::set_current_dir(dir).map_err(|source| Errors::ChangeDir {
            dir: dir.to_string_lossy().into_owned(),
            source,
        })
    }
}
