use std::{
    ffi::OsStr,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use itertools::Itertools as _;

/// Longest path handed to `execv`; anything longer is rejected up front.
pub const PATH_MAX: usize = nix::libc::PATH_MAX as usize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("path is longer than {max} bytes: {}", .0.display(), max = PATH_MAX)]
    PathTooLong(PathBuf),
}

/// Whether `command` names a file directly instead of a program to look up.
pub fn has_separator(command: &OsStr) -> bool {
    command.as_bytes().contains(&b'/')
}

/// Rejects paths the kernel would refuse anyway.
pub fn check_len(path: &Path) -> Result<(), Error> {
    if path.as_os_str().len() >= PATH_MAX {
        return Err(Error::PathTooLong(path.into()));
    }
    Ok(())
}

/// Joins `command` onto every directory of `path_env`, in search order.
///
/// Nothing is produced when the variable is unset or empty, or when the
/// command already contains a separator. Empty entries are skipped and
/// candidates over [`PATH_MAX`] are dropped.
pub fn candidates(command: &OsStr, path_env: Option<&OsStr>) -> Vec<PathBuf> {
    let Some(paths) = path_env.filter(|p| !p.is_empty()) else {
        return vec![];
    };
    if command.is_empty() || has_separator(command) {
        return vec![];
    }

    std::env::split_paths(paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(command))
        .filter(|candidate| match check_len(candidate) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "skipping search path candidate");
                false
            }
        })
        .collect_vec()
}
