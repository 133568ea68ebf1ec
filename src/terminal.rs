use std::{
    io::Write,
    os::fd::{AsRawFd, BorrowedFd, RawFd},
};

use crossterm::tty::IsTty;
use nix::{
    sys::{
        signal::{killpg, Signal},
        termios::{tcgetattr, tcsetattr, SetArg, Termios},
    },
    unistd::{getpgrp, getpid, tcgetpgrp, tcsetpgrp, Pid},
};

/// Session wide settings, fixed once the shell has started.
///
/// Only `line_number` changes afterwards.
#[derive(Debug)]
pub struct Session {
    pub is_interactive: bool,
    pub terminal_fd: RawFd,
    pub saved_modes: Option<Termios>,
    pub foreground_pgid: Option<Pid>,
    pub line_number: usize,
}

impl Session {
    /// A session reading from a file or pipe: no prompt, no job control.
    pub fn non_interactive() -> Self {
        Self {
            is_interactive: false,
            terminal_fd: std::io::stdin().as_raw_fd(),
            saved_modes: None,
            foreground_pgid: None,
            line_number: 0,
        }
    }

    /// Inspects standard input and, for a terminal, takes control of it.
    pub fn init() -> Self {
        let stdin = std::io::stdin();
        if !stdin.is_tty() {
            tracing::debug!("standard input is not a terminal");
            return Self::non_interactive();
        }

        let mut session = Self {
            is_interactive: true,
            ..Self::non_interactive()
        };

        if let Err(err) = session.take_terminal() {
            tracing::warn!(%err, "unable to take control of the terminal");
        }

        session
    }

    fn terminal(&self) -> BorrowedFd<'_> {
        // SAFETY: the terminal is standard input, which stays open for the
        // lifetime of the process.
        unsafe { BorrowedFd::borrow_raw(self.terminal_fd) }
    }

    fn take_terminal(&mut self) -> nix::Result<()> {
        // stop ourselves until we are moved into the foreground
        loop {
            let pgid = getpgrp();
            if tcgetpgrp(self.terminal())? == pgid {
                break;
            }
            killpg(pgid, Signal::SIGTTIN)?;
        }

        let pgid = getpgrp();
        tracing::trace!(pid = getpid().as_raw(), "foreground reached");

        tcsetpgrp(self.terminal(), pgid)?;
        self.foreground_pgid = Some(pgid);
        self.saved_modes = Some(tcgetattr(self.terminal())?);

        tracing::debug!(pgid = pgid.as_raw(), "shell owns the terminal");
        Ok(())
    }

    /// Puts the shell back in the foreground with its saved modes after a
    /// child may have changed them.
    pub fn restore_terminal(&self) {
        let (Some(pgid), Some(modes)) = (self.foreground_pgid, &self.saved_modes) else {
            return;
        };

        if let Err(err) = tcsetpgrp(self.terminal(), pgid) {
            tracing::warn!(%err, "unable to reclaim the terminal");
        }
        if let Err(err) = tcsetattr(self.terminal(), SetArg::TCSADRAIN, modes) {
            tracing::warn!(%err, "unable to restore terminal modes");
        }
    }

    /// Writes the `"<line>: "` prompt when interactive.
    pub fn prompt(&self, stdout: &mut dyn Write) -> std::io::Result<()> {
        if self.is_interactive {
            write!(stdout, "{}: ", self.line_number)?;
            stdout.flush()?;
        }
        Ok(())
    }

    /// Moves on to the next line; only interactive sessions count lines.
    pub fn advance(&mut self) {
        if self.is_interactive {
            self.line_number += 1;
        }
    }
}
