use image::{GenericImageView, GrayImage, Luma, Pixel, Primitive};

/// Per-channel inclusive band test over a three-channel image, the
/// equivalent of OpenCV's `inRange`: a pixel maps to 255 when every channel
/// lies within `[lower, upper]` for its band, and to 0 otherwise.
pub fn in_range<I, P, S>(image: &I, lower: [S; 3], upper: [S; 3]) -> GrayImage
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.pixels() {
        let channels = pixel.channels();
        let inside = channels
            .iter()
            .take(3)
            .zip(lower.iter().zip(upper.iter()))
            .all(|(c, (lo, hi))| *lo <= *c && *c <= *hi);
        mask.put_pixel(x, y, Luma([if inside { 255 } else { 0 }]));
    }
    mask
}
