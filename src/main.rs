mod args;
mod builtin;
mod launch;
mod path;
mod redirect;
mod repl;
mod terminal;

use tracing_subscriber::EnvFilter;

use crate::terminal::Session;

/// Log level used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "warn";

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // stdout belongs to the commands
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut session = Session::init();
    tracing::debug!(interactive = session.is_interactive, "session ready");

    repl::repl(&mut session)
}
