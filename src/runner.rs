//! The desktop batch runner: build the detection tool, then invoke it once
//! per `.jpg` in the image directory.
//!
//! Dispatch is deliberately unchecked and strictly sequential. The build may
//! fail and the per-file invocations may fail; the runner carries on
//! regardless. The only failure that stops it is an unreadable image
//! directory.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::errors::{Result, VisionError};

pub const BUILD_PROGRAM: &str = "cargo";
pub const BUILD_ARGS: &[&str] = &["build", "--release"];
pub const ARTIFACT_PATH: &str = "target/release/deepspace-vision";
pub const IMAGE_DIR: &str = "images";
/// Matched against the end of the file name, case-sensitively. Not parsed
/// as an extension.
pub const IMAGE_SUFFIX: &str = ".jpg";
pub const MODE_FLAG: &str = "--desktop";
pub const IMAGES_FLAG: &str = "--images";

/// Seam for process dispatch so tests can observe invocation order and
/// arguments without spawning anything.
pub trait CommandDispatcher {
    /// Runs a command to completion, discarding its outcome.
    fn dispatch(&mut self, program: &str, args: &[OsString]);
}

/// Production dispatcher: blocks on the child via `status()` and discards
/// the result, spawn failures included. Children inherit stdio.
pub struct ProcessDispatcher;

impl CommandDispatcher for ProcessDispatcher {
    fn dispatch(&mut self, program: &str, args: &[OsString]) {
        let _ = Command::new(program).args(args).status();
    }
}

/// Runs the batch: build first, then one invocation per matching file, in
/// directory-listing order. The image directory is resolved by joining
/// [`IMAGE_DIR`] onto `working_dir`, no canonicalisation.
pub fn run<D: CommandDispatcher>(dispatcher: &mut D, working_dir: &Path) -> Result<()> {
    let build_args: Vec<OsString> = BUILD_ARGS.iter().copied().map(OsString::from).collect();
    dispatcher.dispatch(BUILD_PROGRAM, &build_args);

    let image_dir = working_dir.join(IMAGE_DIR);
    let entries = fs::read_dir(&image_dir).map_err(|e| VisionError::FileSystem {
        path: image_dir.clone(),
        operation: "listing image directory".to_string(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| VisionError::FileSystem {
            path: image_dir.clone(),
            operation: "reading directory entry".to_string(),
            source: e,
        })?;

        let name = entry.file_name();
        if !name.as_encoded_bytes().ends_with(IMAGE_SUFFIX.as_bytes()) {
            continue;
        }

        let args = [
            OsString::from(MODE_FLAG),
            OsString::from(IMAGES_FLAG),
            image_dir.join(&name).into_os_string(),
        ];
        dispatcher.dispatch(ARTIFACT_PATH, &args);
    }

    Ok(())
}
