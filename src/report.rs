use serde::{Deserialize, Serialize};

use crate::pipeline::Detection;

/// Per-frame detection report, serialised as JSON next to the annotated
/// frame when `--report` is set. This is the desktop stand-in for what the
/// robot deployment publishes to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub heading_deg: f64,
    pub target_found: bool,
    pub target_count: usize,
    /// Offset of the selected target from the camera axis, degrees.
    pub selected_offset_deg: Option<f64>,
    /// Heading plus selected offset.
    pub target_angle_deg: f64,
    pub targets: Vec<TargetReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReport {
    pub center_x: f64,
    pub center_y: f64,
    pub offset_deg: f64,
    pub synthesised: bool,
}

impl FrameReport {
    pub fn new(image: &str, (width, height): (u32, u32), detection: &Detection, heading: f64) -> Self {
        Self {
            image: image.to_string(),
            width,
            height,
            heading_deg: heading,
            target_found: detection.target_found(),
            target_count: detection.pairs.len(),
            selected_offset_deg: detection.selected_offset(),
            target_angle_deg: detection.target_angle(heading),
            targets: detection
                .pairs
                .iter()
                .map(|pair| TargetReport {
                    center_x: pair.center.0,
                    center_y: pair.center.1,
                    offset_deg: pair.offset_deg,
                    synthesised: pair.synthesised,
                })
                .collect(),
        }
    }
}
