use anyhow::{bail, Context, Result};
use clap::Parser;

use deepspace_vision::{Config, PipelineParams, Processor};

fn main() -> Result<()> {
    let config = Config::parse();

    if !config.desktop {
        bail!(
            "only desktop mode is available in this build; pass --desktop \
             (the camera-capture mode lives in the robot deployment)"
        );
    }

    let params = match &config.params {
        Some(path) => PipelineParams::from_file(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
        None => PipelineParams::default(),
    };

    let processor = Processor::new(params, config);
    processor.run()?;

    Ok(())
}
