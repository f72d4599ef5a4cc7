pub mod config;
pub mod errors;
pub mod geometry;
pub mod imageops_cv;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod runner;

pub mod mocks;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use rayon::prelude::*;
use walkdir::WalkDir;

pub use config::Config;
pub use errors::{Result, VisionError};
pub use params::PipelineParams;
pub use pipeline::{Detection, TargetPipeline};
pub use report::FrameReport;

/// Desktop processing flow: runs the target pipeline over a file or a
/// directory tree and writes annotated frames, masks, and reports under the
/// output directory.
pub struct Processor {
    pipeline: TargetPipeline,
    config: Config,
}

impl Processor {
    pub const fn new(params: PipelineParams, config: Config) -> Self {
        Self {
            pipeline: TargetPipeline::new(params),
            config,
        }
    }

    /// Processes whatever `--images` points at: a single file directly, a
    /// directory recursively.
    pub fn run(&self) -> Result<()> {
        let images = &self.config.images;
        if images.is_file() {
            let report = self.process_single_image(images)?;
            print_outcome(&report);
            Ok(())
        } else if images.is_dir() {
            self.process_directory()
        } else {
            Err(VisionError::FileSystem {
                path: images.clone(),
                operation: "resolving image path".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "image path does not exist",
                ),
            })
        }
    }

    pub fn process_directory(&self) -> Result<()> {
        let input_path = &self.config.images;
        let output_path = &self.config.output_dir;

        fs::create_dir_all(output_path).map_err(|e| VisionError::FileSystem {
            path: output_path.clone(),
            operation: "creating output directory".to_string(),
            source: e,
        })?;

        let image_files = self.collect_image_files(input_path);

        if image_files.is_empty() {
            println!("No image files found under {}", input_path.display());
            return Ok(());
        }

        let pb = ProgressBar::new(image_files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        let found = AtomicUsize::new(0);
        let failures: Mutex<Vec<(PathBuf, VisionError)>> = Mutex::new(Vec::new());

        image_files.par_iter().for_each(|input_file| {
            match self.process_single_image(input_file) {
                Ok(report) => {
                    if report.target_found {
                        found.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(e) => failures.lock().push((input_file.clone(), e)),
            }
            pb.inc(1);
        });

        pb.finish();

        let failures = failures.into_inner();
        let total = image_files.len();
        println!(
            "Targets found in {} of {} frames",
            found.load(Ordering::Relaxed),
            total
        );

        if failures.is_empty() {
            Ok(())
        } else {
            for (path, error) in &failures {
                eprintln!("{}: {}", path.display(), error);
            }
            Err(VisionError::Batch {
                failed: failures.len(),
                total,
            })
        }
    }

    fn collect_image_files(&self, input_path: &Path) -> Vec<PathBuf> {
        WalkDir::new(input_path)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_file() && ImageFormat::from_path(e.path()).is_ok())
            .map(walkdir::DirEntry::into_path)
            .collect()
    }

    /// Runs the pipeline over one image and writes its outputs: the
    /// annotated frame, plus the mask and JSON report when configured.
    pub fn process_single_image(&self, input_file: &Path) -> Result<FrameReport> {
        let img = image::open(input_file).map_err(|e| VisionError::ImageProcessing {
            path: input_file.display().to_string(),
            operation: "loading image".to_string(),
            source: Box::new(e),
        })?;
        let frame = img.into_rgb8();

        let detection = self.pipeline.process(&frame);

        let output_file = self.output_path(input_file)?;
        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent).map_err(|e| VisionError::FileSystem {
                path: parent.to_path_buf(),
                operation: "creating output directory".to_string(),
                source: e,
            })?;
        }

        let format =
            ImageFormat::from_extension(&self.config.format).unwrap_or(ImageFormat::Png);

        save_buffer(&detection.annotated, &output_file, format)?;

        if self.config.save_mask {
            let mask_file = sibling_with_suffix(&output_file, "_mask");
            save_buffer(&detection.mask, &mask_file, format)?;
        }

        let image_name = input_file
            .file_name()
            .map_or_else(|| input_file.display().to_string(), |n| n.to_string_lossy().into_owned());
        let report = FrameReport::new(
            &image_name,
            frame.dimensions(),
            &detection,
            self.config.heading,
        );

        if self.config.report {
            let report_file = output_file.with_extension("json");
            let json = serde_json::to_string_pretty(&report)?;
            fs::write(&report_file, json).map_err(|e| VisionError::FileSystem {
                path: report_file,
                operation: "writing report".to_string(),
                source: e,
            })?;
        }

        Ok(report)
    }

    /// Mirrors the input tree under the output directory. A file passed
    /// directly (not under the input path) maps to its bare file name.
    pub fn output_path(&self, input_file: &Path) -> Result<PathBuf> {
        let relative = match input_file.strip_prefix(&self.config.images) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => input_file.file_name().map(PathBuf::from).ok_or_else(|| {
                VisionError::FileSystem {
                    path: input_file.to_path_buf(),
                    operation: "resolving output path".to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "input path has no file name",
                    ),
                }
            })?,
        };

        Ok(self
            .config
            .output_dir
            .join(relative)
            .with_extension(&self.config.format))
    }
}

fn save_buffer<P, C>(
    buffer: &image::ImageBuffer<P, C>,
    path: &Path,
    format: ImageFormat,
) -> Result<()>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    buffer
        .save_with_format(path, format)
        .map_err(|e| VisionError::ImageProcessing {
            path: path.display().to_string(),
            operation: "saving image".to_string(),
            source: Box::new(e),
        })
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let extension = path.extension().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

fn print_outcome(report: &FrameReport) {
    match report.selected_offset_deg {
        Some(offset) => println!(
            "{}: target_found=true offset={:.2} target_angle={:.2}",
            report.image, offset, report.target_angle_deg
        ),
        None => println!(
            "{}: target_found=false target_angle={:.2}",
            report.image, report.target_angle_deg
        ),
    }
}
