//! Builds the detection tool, then runs it against every `.jpg` under
//! `images/` in the current working directory.

use anyhow::{Context, Result};

use deepspace_vision::runner::{self, ProcessDispatcher};

fn main() -> Result<()> {
    let working_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    runner::run(&mut ProcessDispatcher, &working_dir)?;
    Ok(())
}
