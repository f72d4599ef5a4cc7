use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use imageproc::geometry::min_area_rect;
use imageproc::morphology::close;

use crate::geometry::{polygon_area, RotatedRect};
use crate::imageops_cv::{in_range, rgb_to_hsv};
use crate::params::PipelineParams;

const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MARKER_RADIUS: i32 = 3;
/// L-infinity radius of the closing element; 2 gives the 5x5 square kernel.
const CLOSE_RADIUS: u8 = 2;

/// A single tape candidate that survived the contour filters. `width` is the
/// short side and `height` the long side, the normalisation the pairing
/// heuristics are tuned against.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub rect: RotatedRect,
    pub width: f64,
    pub height: f64,
    pub tilt: f64,
}

impl Candidate {
    fn from_rect(rect: RotatedRect) -> Self {
        Self {
            width: rect.short_side(),
            height: rect.long_side(),
            tilt: rect.angle,
            rect,
        }
    }

    fn center_x(&self) -> f64 {
        self.rect.center.0
    }
}

/// A matched pair of tapes: one vision target. `synthesised` marks a pair
/// whose partner was inferred from a lone tape rather than observed.
#[derive(Debug, Clone, Copy)]
pub struct TargetPair {
    pub left: Candidate,
    pub right: Candidate,
    pub center: (f64, f64),
    /// Angular offset of the pair centre from the camera axis, degrees;
    /// negative is left of centre.
    pub offset_deg: f64,
    pub synthesised: bool,
}

/// Everything the pipeline produces for one frame.
pub struct Detection {
    /// Binary threshold mask after morphological closing.
    pub mask: GrayImage,
    /// Copy of the input frame with accepted pairs drawn on it.
    pub annotated: RgbImage,
    pub pairs: Vec<TargetPair>,
    /// Index into `pairs` of the pair nearest the camera axis.
    pub selected: Option<usize>,
}

impl Detection {
    pub fn target_found(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected_offset(&self) -> Option<f64> {
        self.selected.map(|i| self.pairs[i].offset_deg)
    }

    /// Heading-adjusted target angle: the supplied heading plus the selected
    /// pair's offset, or the heading unchanged when nothing was found.
    pub fn target_angle(&self, heading: f64) -> f64 {
        heading + self.selected_offset().unwrap_or(0.0)
    }
}

/// Retroreflective target detection: HSV threshold, morphological closing,
/// contour filtering, and tape pairing.
pub struct TargetPipeline {
    params: PipelineParams,
}

impl TargetPipeline {
    pub const fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    pub fn process(&self, frame: &RgbImage) -> Detection {
        let p = &self.params;

        let hsv = rgb_to_hsv(frame);
        let mask = in_range(&hsv, [p.h_min, p.s_min, p.v_min], [p.h_max, p.s_max, p.v_max]);
        let mask = close(&mask, Norm::LInf, CLOSE_RADIUS);

        let candidates = self.find_candidates(&mask);

        let raw_pairs = match candidates.len() {
            0 => Vec::new(),
            1 => vec![self.synthesise_pair(candidates[0])],
            _ => self
                .pair_candidates(&candidates)
                .into_iter()
                .map(|(l, r)| (l, r, false))
                .collect(),
        };

        let frame_width = f64::from(frame.width());
        let mut annotated = frame.clone();
        let mut pairs = Vec::with_capacity(raw_pairs.len());
        for (left, right, synthesised) in raw_pairs {
            let center = (
                (left.rect.center.0 + right.rect.center.0) / 2.0,
                (left.rect.center.1 + right.rect.center.1) / 2.0,
            );
            let offset_deg =
                (center.0 - frame_width / 2.0) / frame_width * p.fov_deg / 2.0;
            draw_pair(&mut annotated, &left, &right, center);
            pairs.push(TargetPair {
                left,
                right,
                center,
                offset_deg,
                synthesised,
            });
        }

        let selected = pairs
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.offset_deg.abs().total_cmp(&b.offset_deg.abs()))
            .map(|(i, _)| i);

        Detection {
            mask,
            annotated,
            pairs,
            selected,
        }
    }

    /// Filters contours down to tape candidates: large enough, tilted like a
    /// tape, and proportioned like a tape.
    fn find_candidates(&self, mask: &GrayImage) -> Vec<Candidate> {
        let p = &self.params;

        find_contours::<i32>(mask)
            .into_iter()
            .filter_map(|contour| {
                if contour.points.len() < 3 {
                    return None;
                }
                if polygon_area(&contour.points) < p.min_contour_area {
                    return None;
                }

                let rect = RotatedRect::from_corners(&min_area_rect(&contour.points));
                let candidate = Candidate::from_rect(rect);

                let in_neg = p.tilt_neg_low <= candidate.tilt && candidate.tilt <= p.tilt_neg_high;
                let in_pos = p.tilt_pos_low <= candidate.tilt && candidate.tilt <= p.tilt_pos_high;
                if !in_neg && !in_pos {
                    return None;
                }

                if candidate.width == 0.0 {
                    return None;
                }
                let ratio = candidate.height / candidate.width;
                if ratio > p.ratio_max || ratio < p.ratio_min {
                    return None;
                }

                Some(candidate)
            })
            .collect()
    }

    /// Greedy pairing: each candidate joins at most one pair, and both
    /// members are marked consumed only when a pair is accepted.
    fn pair_candidates(&self, candidates: &[Candidate]) -> Vec<(Candidate, Candidate)> {
        let p = &self.params;
        let mut taken = vec![false; candidates.len()];
        let mut pairs = Vec::new();

        for i in 0..candidates.len() {
            if taken[i] {
                continue;
            }
            for j in (i + 1)..candidates.len() {
                if taken[j] {
                    continue;
                }
                let a = candidates[i];
                let b = candidates[j];

                // the two tapes of one target lean opposite ways
                if (a.tilt.abs() - b.tilt.abs()).abs() < p.pair_tilt_gap_min {
                    continue;
                }

                // similar width
                if (a.width - b.width).abs() > p.pair_width_diff_max {
                    continue;
                }

                // spaced like a target
                let mean_width = (a.width + b.width) / 2.0;
                let distance = (a.center_x() - b.center_x()).abs();
                let gap_ratio = distance / mean_width;
                if gap_ratio > p.gap_ratio_max || gap_ratio < p.gap_ratio_min {
                    continue;
                }

                // the tapes must lean toward each other: the left member
                // carries the steeper (smaller) angle
                let (left, right) = if a.center_x() <= b.center_x() {
                    (a, b)
                } else {
                    (b, a)
                };
                if left.tilt >= right.tilt {
                    continue;
                }

                pairs.push((left, right));
                taken[i] = true;
                taken[j] = true;
                break;
            }
        }

        pairs
    }

    /// Infers the missing partner of a lone tape as its horizontal mirror,
    /// offset sideways by the expected tape spacing. A tilt steeper than
    /// -45 degrees means the partner sits to the right.
    fn synthesise_pair(&self, lone: Candidate) -> (Candidate, Candidate, bool) {
        let spacing = self.params.lone_partner_spacing * lone.width;
        let partner_x = if lone.tilt < -45.0 {
            lone.center_x() + spacing
        } else {
            lone.center_x() - spacing
        };

        // Mirroring across a vertical axis maps angle a to -90 - a and swaps
        // which side forms the angle. An axis-aligned rect mirrors to itself.
        let partner_rect = if lone.tilt == -90.0 {
            RotatedRect {
                center: (partner_x, lone.rect.center.1),
                ..lone.rect
            }
        } else {
            RotatedRect {
                center: (partner_x, lone.rect.center.1),
                width: lone.rect.height,
                height: lone.rect.width,
                angle: -90.0 - lone.tilt,
            }
        };
        let partner = Candidate::from_rect(partner_rect);

        if partner_x > lone.center_x() {
            (lone, partner, true)
        } else {
            (partner, lone, true)
        }
    }
}

fn draw_pair(canvas: &mut RgbImage, left: &Candidate, right: &Candidate, center: (f64, f64)) {
    for member in [left, right] {
        let corners = member.rect.corners();
        for i in 0..4 {
            let (x0, y0) = corners[i];
            let (x1, y1) = corners[(i + 1) % 4];
            draw_line_segment_mut(
                canvas,
                (x0 as f32, y0 as f32),
                (x1 as f32, y1 as f32),
                MARKER_COLOR,
            );
        }
    }
    draw_filled_circle_mut(
        canvas,
        (center.0.round() as i32, center.1.round() as i32),
        MARKER_RADIUS,
        MARKER_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    const TAPE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

    /// Draws a filled bar leaning `lean_deg` off vertical (positive leans the
    /// top to the right), with the given short and long side lengths.
    fn draw_bar(img: &mut RgbImage, cx: f64, cy: f64, short: f64, long: f64, lean_deg: f64) {
        let rad = lean_deg.to_radians();
        let (s, c) = rad.sin_cos();
        let along = (long / 2.0 * s, -long / 2.0 * c);
        let across = (short / 2.0 * c, short / 2.0 * s);
        let corners = [
            Point::new(
                (cx - along.0 - across.0).round() as i32,
                (cy - along.1 - across.1).round() as i32,
            ),
            Point::new(
                (cx - along.0 + across.0).round() as i32,
                (cy - along.1 + across.1).round() as i32,
            ),
            Point::new(
                (cx + along.0 + across.0).round() as i32,
                (cy + along.1 + across.1).round() as i32,
            ),
            Point::new(
                (cx + along.0 - across.0).round() as i32,
                (cy + along.1 - across.1).round() as i32,
            ),
        ];
        draw_polygon_mut(img, &corners, TAPE_COLOR);
    }

    fn candidate(cx: f64, short: f64, long: f64, tilt: f64) -> Candidate {
        Candidate::from_rect(RotatedRect {
            center: (cx, 60.0),
            width: short,
            height: long,
            angle: tilt,
        })
    }

    #[test]
    fn empty_frame_finds_nothing() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let frame = RgbImage::new(200, 120);

        let detection = pipeline.process(&frame);
        assert!(!detection.target_found());
        assert!(detection.pairs.is_empty());
        assert_eq!(detection.selected_offset(), None);
        assert_eq!(detection.target_angle(12.0), 12.0);
        assert_eq!(detection.annotated, frame);
    }

    #[test]
    fn small_blobs_filtered_by_area() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let mut frame = RgbImage::new(200, 120);
        // 5x5 blob: well under the 90 px^2 area floor
        for y in 50..55 {
            for x in 50..55 {
                frame.put_pixel(x, y, TAPE_COLOR);
            }
        }

        let detection = pipeline.process(&frame);
        assert!(!detection.target_found());
    }

    #[test]
    fn tape_pair_detected_and_measured() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let mut frame = RgbImage::new(200, 120);
        // Two tapes leaning toward each other, centres 50 px apart: with
        // 10 px widths the gap ratio lands at 5, inside (4, 6).
        draw_bar(&mut frame, 60.0, 60.0, 10.0, 30.0, 15.0);
        draw_bar(&mut frame, 110.0, 60.0, 10.0, 30.0, -15.0);

        let detection = pipeline.process(&frame);
        assert!(detection.target_found());
        assert_eq!(detection.pairs.len(), 1);

        let pair = &detection.pairs[0];
        assert!(!pair.synthesised);
        assert!(pair.left.rect.center.0 < pair.right.rect.center.0);
        // left tape leans right: steep angle near -75; right tape shallow
        assert!(pair.left.tilt < pair.right.tilt);
        assert!((pair.center.0 - 85.0).abs() < 3.0);

        // frame centre is x=100, fov 60: offset = (85 - 100) / 200 * 30
        let offset = detection.selected_offset().unwrap();
        assert!((offset - (-2.25)).abs() < 0.5);
        assert!((detection.target_angle(10.0) - (10.0 + offset)).abs() < 1e-9);
    }

    #[test]
    fn annotation_marks_the_pair() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let mut frame = RgbImage::new(200, 120);
        draw_bar(&mut frame, 60.0, 60.0, 10.0, 30.0, 15.0);
        draw_bar(&mut frame, 110.0, 60.0, 10.0, 30.0, -15.0);

        let detection = pipeline.process(&frame);
        assert!(detection.target_found());
        assert_ne!(detection.annotated, frame);

        let center = detection.pairs[0].center;
        let marker = detection
            .annotated
            .get_pixel(center.0.round() as u32, center.1.round() as u32);
        assert_eq!(marker, &MARKER_COLOR);
    }

    #[test]
    fn lone_tape_synthesises_partner() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let mut frame = RgbImage::new(200, 120);
        // One steeply leaning tape (angle near -75): partner goes right.
        draw_bar(&mut frame, 60.0, 60.0, 10.0, 30.0, 15.0);

        let detection = pipeline.process(&frame);
        assert!(detection.target_found());
        assert_eq!(detection.pairs.len(), 1);

        let pair = &detection.pairs[0];
        assert!(pair.synthesised);
        assert!(pair.right.rect.center.0 > pair.left.rect.center.0);
        // partner offset: 5.5 short-side widths to the right of the tape
        let expected = pair.left.rect.center.0 + 5.5 * pair.left.width;
        assert!((pair.right.rect.center.0 - expected).abs() < 1e-9);
        // mirrored tilt
        assert!((pair.right.tilt - (-90.0 - pair.left.tilt)).abs() < 1e-9);
    }

    #[test]
    fn shallow_lone_tape_puts_partner_left() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let mut frame = RgbImage::new(300, 120);
        // Shallow angle near -15: tilt > -45, partner goes left.
        draw_bar(&mut frame, 200.0, 60.0, 10.0, 30.0, -15.0);

        let detection = pipeline.process(&frame);
        assert_eq!(detection.pairs.len(), 1);
        let pair = &detection.pairs[0];
        assert!(pair.synthesised);
        assert!(pair.left.rect.center.0 < 200.0 - 3.0 * pair.right.width);
    }

    #[test]
    fn nearest_pair_to_axis_selected() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let mut frame = RgbImage::new(400, 120);
        // Two full pairs; the right-hand pair straddles the frame centre.
        draw_bar(&mut frame, 40.0, 60.0, 10.0, 30.0, 15.0);
        draw_bar(&mut frame, 90.0, 60.0, 10.0, 30.0, -15.0);
        draw_bar(&mut frame, 175.0, 60.0, 10.0, 30.0, 15.0);
        draw_bar(&mut frame, 225.0, 60.0, 10.0, 30.0, -15.0);

        let detection = pipeline.process(&frame);
        assert_eq!(detection.pairs.len(), 2);

        let selected = &detection.pairs[detection.selected.unwrap()];
        assert!((selected.center.0 - 200.0).abs() < 5.0);
        // the selected offset is the smallest in magnitude
        for pair in &detection.pairs {
            assert!(selected.offset_deg.abs() <= pair.offset_deg.abs());
        }
    }

    #[test]
    fn pairing_rejects_same_lean() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let a = candidate(60.0, 10.0, 30.0, -75.0);
        let b = candidate(110.0, 10.0, 30.0, -70.0);
        assert!(pipeline.pair_candidates(&[a, b]).is_empty());
    }

    #[test]
    fn pairing_rejects_wrong_spacing() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let a = candidate(60.0, 10.0, 30.0, -75.0);
        // gap ratio 2: too close together
        let near = candidate(80.0, 10.0, 30.0, -15.0);
        // gap ratio 8: too far apart
        let far = candidate(140.0, 10.0, 30.0, -15.0);
        assert!(pipeline.pair_candidates(&[a, near]).is_empty());
        assert!(pipeline.pair_candidates(&[a, far]).is_empty());
    }

    #[test]
    fn pairing_rejects_tapes_leaning_apart() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        // shallow on the left, steep on the right: leaning away from
        // each other, not a target
        let a = candidate(60.0, 10.0, 30.0, -15.0);
        let b = candidate(110.0, 10.0, 30.0, -75.0);
        assert!(pipeline.pair_candidates(&[a, b]).is_empty());
    }

    #[test]
    fn candidate_joins_at_most_one_pair() {
        let pipeline = TargetPipeline::new(PipelineParams::default());
        let a = candidate(60.0, 10.0, 30.0, -75.0);
        let b = candidate(110.0, 10.0, 30.0, -15.0);
        // c would also pair with b, but b is consumed by a
        let c = candidate(160.0, 10.0, 30.0, -75.0);
        let pairs = pipeline.pair_candidates(&[a, b, c]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.center_x(), 60.0);
        assert_eq!(pairs[0].1.center_x(), 110.0);
    }
}
