//! Entry point wiring: parses the CLI surface, initialises tracing, and
//! hands off to `run.rs`, which owns the window, the demo source, and the
//! event loop driving the enhancement pipeline.

mod cli;
mod run;
mod sources;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    run::run(cli)
}
