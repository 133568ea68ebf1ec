use std::io::{BufRead, Write};

use crate::{
    args,
    builtin::{Builtins, Errors},
    launch,
    redirect::{self, Operator},
    terminal::Session,
};

/// Dispatches one line: builtins first, then `<`, then `>`, then an
/// external program.
///
/// The tokens live exactly as long as this call, whichever branch runs.
fn run_line(
    session: &Session,
    line: &[u8],
    stdout: &mut dyn std::io::Write,
) -> Result<(), Errors> {
    let tokens = args::tokenize(line)?;

    if tokens.is_empty() {
        return Ok(());
    }

    if let Some(com) = Builtins::lookup(&tokens[0]) {
        return com.execute(&tokens, stdout);
    }

    if let Some(redirect) = redirect::detect(&tokens, Operator::Input)? {
        tracing::warn!(
            operator = %redirect.operator,
            file = ?redirect.file_path,
            "input redirection is not supported, nothing was run"
        );
        return Ok(());
    }

    if let Some(redirect) = redirect::detect(&tokens, Operator::Output)? {
        tracing::debug!(index = redirect.index, "output redirection");
        redirect.run_output()?;
        return Ok(());
    }

    launch::launch(session, &tokens)?;
    Ok(())
}

/// Reads lines until end of input or `exit`.
///
/// Lines are handed on as raw bytes, without any UTF-8 decoding.
pub fn repl(session: &mut Session) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let mut input = Vec::with_capacity(4096);

    session.prompt(&mut stdout)?;

    loop {
        input.clear();

        let size = stdin.lock().read_until(b'\n', &mut input)?;
        if size == 0 {
            break;
        }
        match run_line(session, &input, &mut stdout) {
            Ok(()) => {}
            Err(Errors::Shutdown) => break,
            Err(e) => {
                tracing::debug!(error = ?e, "command failed");
                writeln!(&stdout, "{}", e)?;
            }
        }

        session.advance();
        session.prompt(&mut stdout)?;
    }

    stdout.flush()?;
    Ok(())
}
