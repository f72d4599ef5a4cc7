use image::{ImageBuffer, Rgb, RgbImage};

/// Converts an 8-bit RGB image to HSV with OpenCV's 8-bit scaling: hue in
/// `[0, 180)` (degrees halved), saturation and value in `[0, 255]`. The
/// channels are packed into an `Rgb<u8>` buffer in H, S, V order.
///
/// The scaling matters: threshold bands tuned against OpenCV's `cvtColor`
/// output keep their meaning only under the same ranges.
pub fn rgb_to_hsv(image: &RgbImage) -> RgbImage {
    let mut out = ImageBuffer::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        out.put_pixel(x, y, pixel_to_hsv(pixel));
    }
    out
}

fn pixel_to_hsv(pixel: &Rgb<u8>) -> Rgb<u8> {
    let Rgb([r, g, b]) = *pixel;
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };

    let saturation = if max == 0.0 { 0.0 } else { delta / max * 255.0 };

    Rgb([
        (hue / 2.0).round() as u8 % 180,
        saturation.round() as u8,
        max as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_colors() {
        assert_eq!(pixel_to_hsv(&Rgb([255, 0, 0])), Rgb([0, 255, 255]));
        assert_eq!(pixel_to_hsv(&Rgb([0, 255, 0])), Rgb([60, 255, 255]));
        assert_eq!(pixel_to_hsv(&Rgb([0, 0, 255])), Rgb([120, 255, 255]));
    }

    #[test]
    fn greys_have_zero_hue_and_saturation() {
        assert_eq!(pixel_to_hsv(&Rgb([0, 0, 0])), Rgb([0, 0, 0]));
        assert_eq!(pixel_to_hsv(&Rgb([128, 128, 128])), Rgb([0, 0, 128]));
        assert_eq!(pixel_to_hsv(&Rgb([255, 255, 255])), Rgb([0, 0, 255]));
    }

    #[test]
    fn hue_wraps_below_180() {
        // Magenta-leaning red: hue just below 360 degrees halves into [0, 180).
        let Rgb([h, _, _]) = pixel_to_hsv(&Rgb([255, 0, 10]));
        assert!(h < 180);
        assert!(h > 170);
    }

    #[test]
    fn buffer_conversion_preserves_dimensions() {
        let img = RgbImage::from_pixel(7, 5, Rgb([0, 200, 40]));
        let hsv = rgb_to_hsv(&img);
        assert_eq!(hsv.dimensions(), (7, 5));
        assert_eq!(hsv.get_pixel(0, 0), hsv.get_pixel(6, 4));
    }
}
