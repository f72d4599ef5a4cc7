use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VisionError};

/// Tuning parameters for the target pipeline. The defaults are the values
/// tuned on the 2019 field; a JSON file passed via `--params` overrides any
/// subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// HSV threshold band, OpenCV 8-bit scaling (hue in [0, 180)).
    pub h_min: u8,
    pub s_min: u8,
    pub v_min: u8,
    pub h_max: u8,
    pub s_max: u8,
    pub v_max: u8,

    /// Accepted tape tilt bands, degrees in the minAreaRect convention.
    /// A candidate passes when its angle falls in either inclusive band.
    pub tilt_neg_low: f64,
    pub tilt_neg_high: f64,
    pub tilt_pos_low: f64,
    pub tilt_pos_high: f64,

    /// Minimum contour polygon area, square pixels.
    pub min_contour_area: f64,

    /// Accepted long/short side ratio band for a single tape.
    pub ratio_min: f64,
    pub ratio_max: f64,

    /// Minimum difference between the |tilt| of the two tapes of a pair.
    pub pair_tilt_gap_min: f64,

    /// Maximum difference between the short-side widths of a pair, pixels.
    pub pair_width_diff_max: f64,

    /// Accepted band for horizontal centre distance over mean width.
    pub gap_ratio_min: f64,
    pub gap_ratio_max: f64,

    /// Horizontal offset of a synthesised partner, in short-side widths.
    pub lone_partner_spacing: f64,

    /// Camera horizontal field of view, degrees.
    pub fov_deg: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            h_min: 29,
            s_min: 90,
            v_min: 60,
            h_max: 100,
            s_max: 255,
            v_max: 255,
            tilt_neg_low: -81.0,
            tilt_neg_high: -8.0,
            tilt_pos_low: 43.0,
            tilt_pos_high: 64.0,
            min_contour_area: 90.0,
            ratio_min: 2.2,
            ratio_max: 4.0,
            pair_tilt_gap_min: 13.0,
            pair_width_diff_max: 50.0,
            gap_ratio_min: 4.0,
            gap_ratio_max: 6.0,
            lone_partner_spacing: 5.5,
            fov_deg: 60.0,
        }
    }
}

impl PipelineParams {
    /// Loads parameters from a JSON file and validates them. A file that
    /// fails to parse is a configuration error; values that parse but make
    /// no sense are validation errors naming the offending field.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| VisionError::FileSystem {
            path: path.to_path_buf(),
            operation: "reading parameter file".to_string(),
            source: e,
        })?;
        let params: Self = serde_json::from_str(&contents).map_err(|e| {
            VisionError::Configuration {
                message: format!("invalid parameter file {}: {}", path.display(), e),
            }
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.h_min > self.h_max {
            return Err(invalid("h_min", "must not exceed h_max"));
        }
        if self.s_min > self.s_max {
            return Err(invalid("s_min", "must not exceed s_max"));
        }
        if self.v_min > self.v_max {
            return Err(invalid("v_min", "must not exceed v_max"));
        }
        if self.tilt_neg_low > self.tilt_neg_high {
            return Err(invalid("tilt_neg_low", "must not exceed tilt_neg_high"));
        }
        if self.tilt_pos_low > self.tilt_pos_high {
            return Err(invalid("tilt_pos_low", "must not exceed tilt_pos_high"));
        }
        if self.min_contour_area < 0.0 {
            return Err(invalid("min_contour_area", "must be non-negative"));
        }
        if self.ratio_min > self.ratio_max {
            return Err(invalid("ratio_min", "must not exceed ratio_max"));
        }
        if self.pair_tilt_gap_min < 0.0 {
            return Err(invalid("pair_tilt_gap_min", "must be non-negative"));
        }
        if self.pair_width_diff_max < 0.0 {
            return Err(invalid("pair_width_diff_max", "must be non-negative"));
        }
        if self.gap_ratio_min > self.gap_ratio_max {
            return Err(invalid("gap_ratio_min", "must not exceed gap_ratio_max"));
        }
        if self.lone_partner_spacing <= 0.0 {
            return Err(invalid("lone_partner_spacing", "must be positive"));
        }
        if self.fov_deg <= 0.0 {
            return Err(invalid("fov_deg", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> VisionError {
    VisionError::Validation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
