//! Hidden worker command used for isolated recognition.

use std::io;

use lios::dispatch::serve_job;

/// Read one job from stdin and write the reply to stdout.
pub fn cmd_worker() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_job(stdin.lock(), stdout.lock())?;
    Ok(())
}
