use std::{ffi::OsStr, fs::File, path::Path};

use itertools::Itertools as _;
use nix::{sys::wait::WaitStatus, unistd::dup2_stdout};

use crate::{
    args::Tokens,
    launch::{self, ExitCode},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Position of \"{0}\" is not correct: expected `command ... {0} file`")]
    Position(Operator),
    #[error(transparent)]
    Launch(#[from] launch::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Input,
    Output,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Input => "<",
            Operator::Output => ">",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A well placed redirection: the operator sits right before the last token.
#[derive(Debug, PartialEq, Eq)]
pub struct Redirect<'t> {
    pub operator: Operator,
    pub index: usize,
    pub file_path: &'t OsStr,
}

/// Index of the first token equal to the operator.
pub fn find_operator(tokens: &Tokens, op: Operator) -> Option<usize> {
    tokens
        .iter()
        .find_position(|t| *t == op.as_str())
        .map(|(idx, _)| idx)
}

/// Looks for `op` and checks it is neither the command itself nor followed
/// by anything but a single file name.
pub fn detect(tokens: &Tokens, op: Operator) -> Result<Option<Redirect<'_>>, Error> {
    let Some(index) = find_operator(tokens, op) else {
        return Ok(None);
    };
    tracing::debug!(operator = %op, index, len = tokens.len(), "redirection found");

    if index == 0 || index + 2 != tokens.len() {
        return Err(Error::Position(op));
    }
    let file_path = tokens.last().ok_or(Error::Position(op))?;

    Ok(Some(Redirect {
        operator: op,
        index,
        file_path,
    }))
}

impl Redirect<'_> {
    /// Wires standard output of a fresh child to the target file.
    ///
    /// The file has to exist already: it is opened write only and never
    /// created. The child exits once the descriptor is in place, no program is
    /// executed in it.
    pub fn run_output(&self) -> Result<WaitStatus, Error> {
        tracing::debug!(file = ?self.file_path, "output redirection start");
        let status = launch::run_in_child(|| redirect_stdout(self.file_path))?;
        tracing::debug!(file = ?self.file_path, "output redirection finished");
        Ok(status)
    }
}

fn redirect_stdout(file_path: &OsStr) -> ExitCode {
    let shown = Path::new(file_path).display();
    let file = match File::options().write(true).open(file_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("{}: {}", shown, err);
            return 1;
        }
    };

    if let Err(err) = dup2_stdout(&file) {
        eprintln!("{}: {}", shown, err);
        return 1;
    }
    drop(file);

    0
}
