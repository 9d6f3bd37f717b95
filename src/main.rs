mod cli;
mod config;
mod logging;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
