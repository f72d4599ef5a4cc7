use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Run in desktop mode against image files. The robot deployment is the
    /// only other mode and is not part of this build.
    #[arg(long)]
    pub desktop: bool,

    /// Image file, or directory of images, to process
    #[arg(short, long)]
    pub images: PathBuf,

    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    /// JSON file overriding the default pipeline parameters
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Also save the binary threshold mask next to each annotated frame
    #[arg(long)]
    pub save_mask: bool,

    /// Also write a JSON detection report next to each annotated frame
    #[arg(long)]
    pub report: bool,

    /// Robot heading in degrees; the target angle is reported relative to it
    #[arg(long, default_value_t = 0.0)]
    pub heading: f64,
}

fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
