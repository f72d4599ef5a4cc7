use imageproc::point::Point;
use num_traits::AsPrimitive;

/// Minimal-area rotated rectangle in the classic OpenCV `minAreaRect`
/// convention: image coordinates (y down), `angle` in degrees in `[-90, 0)`,
/// `width` is the length of the side forming that angle. An axis-aligned
/// rectangle reports -90.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl RotatedRect {
    /// Derives the rectangle from the four corner points returned by
    /// `imageproc::geometry::min_area_rect`. The corners are expected in
    /// traversal order, adjacent corners sharing an edge.
    pub fn from_corners<T>(corners: &[Point<T>; 4]) -> Self
    where
        T: AsPrimitive<f64>,
    {
        let p: Vec<(f64, f64)> = corners.iter().map(|c| (c.x.as_(), c.y.as_())).collect();

        let center = (
            (p[0].0 + p[1].0 + p[2].0 + p[3].0) / 4.0,
            (p[0].1 + p[1].1 + p[2].1 + p[3].1) / 4.0,
        );

        let e1 = (p[1].0 - p[0].0, p[1].1 - p[0].1);
        let e2 = (p[2].0 - p[1].0, p[2].1 - p[1].1);
        let len1 = (e1.0 * e1.0 + e1.1 * e1.1).sqrt();
        let len2 = (e2.0 * e2.0 + e2.1 * e2.1).sqrt();

        // Undirected line angle of the first edge, in [0, 180).
        let mut phi = e1.1.atan2(e1.0).to_degrees();
        if phi < 0.0 {
            phi += 180.0;
        }
        if phi >= 180.0 {
            phi -= 180.0;
        }

        // Exactly one of the two edge directions has a line angle in
        // [90, 180); mapping it down by 180 gives the OpenCV angle and names
        // that edge the width side.
        let (width, height, angle) = if phi >= 90.0 {
            (len1, len2, phi - 180.0)
        } else {
            (len2, len1, phi - 90.0)
        };

        Self {
            center,
            width,
            height,
            angle,
        }
    }

    /// Corner points of the rectangle, in traversal order.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let rad = self.angle.to_radians();
        let (sin, cos) = rad.sin_cos();
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let offsets = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
        offsets.map(|(dx, dy)| {
            (
                self.center.0 + dx * cos - dy * sin,
                self.center.1 + dx * sin + dy * cos,
            )
        })
    }

    pub fn short_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn long_side(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Area of a closed polygon by the shoelace formula, independent of winding
/// direction. Degenerate polygons (fewer than three points) have zero area.
pub fn polygon_area<T>(points: &[Point<T>]) -> f64
where
    T: AsPrimitive<f64>,
{
    if points.len() < 3 {
        return 0.0;
    }

    let mut acc = 0.0;
    for i in 0..points.len() {
        let a = &points[i];
        let b = &points[(i + 1) % points.len()];
        acc += a.x.as_() * b.y.as_() - b.x.as_() * a.y.as_();
    }
    acc.abs() / 2.0
}
