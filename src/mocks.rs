use std::ffi::OsString;

use crate::runner::CommandDispatcher;

/// Test dispatcher that records every invocation instead of spawning
/// processes, preserving order.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub calls: Vec<(String, Vec<OsString>)>,
}

impl RecordingDispatcher {
    pub const fn new() -> Self {
        Self { calls: Vec::new() }
    }

    /// The recorded per-file invocations, everything after the build call.
    pub fn file_calls(&self) -> &[(String, Vec<OsString>)] {
        if self.calls.is_empty() {
            &[]
        } else {
            &self.calls[1..]
        }
    }
}

impl CommandDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, program: &str, args: &[OsString]) {
        self.calls.push((program.to_string(), args.to_vec()));
    }
}
