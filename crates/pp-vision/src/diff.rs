use image::{Rgb, RgbImage};
use pp_capture::Rect;

use crate::error::{ensure_same_size, Result};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Keep `observed` pixels that differ from `background`, blacken the rest.
///
/// A differing pixel whose observed color is itself pure black is
/// indistinguishable from a match in the output.
pub fn diff(observed: &RgbImage, background: &RgbImage) -> Result<RgbImage> {
    ensure_same_size(observed, background)?;
    let mut out = observed.clone();
    for (o, b) in out.pixels_mut().zip(background.pixels()) {
        if o == b {
            *o = BLACK;
        }
    }
    Ok(out)
}

/// Smallest rectangle containing every non-black pixel, or `None` if the image is all black.
pub fn bounding_box(image: &RgbImage) -> Option<Rect> {
    let mut found: Option<Rect> = None;
    for (x, y, p) in image.enumerate_pixels() {
        if p == &BLACK {
            continue;
        }
        found = Some(match found {
            None => Rect::new(x, y, x + 1, y + 1),
            Some(r) => Rect::new(
                r.left.min(x),
                r.top.min(y),
                r.right.max(x + 1),
                r.bottom.max(y + 1),
            ),
        });
    }
    found
}

/// Bounding box of whatever in `observed` is not `background`.
pub fn changed_region(observed: &RgbImage, background: &RgbImage) -> Result<Option<Rect>> {
    ensure_same_size(observed, background)?;
    let mut found: Option<Rect> = None;
    for ((x, y, o), b) in observed.enumerate_pixels().zip(background.pixels()) {
        if o == b {
            continue;
        }
        found = Some(match found {
            None => Rect::new(x, y, x + 1, y + 1),
            Some(r) => Rect::new(
                r.left.min(x),
                r.top.min(y),
                r.right.max(x + 1),
                r.bottom.max(y + 1),
            ),
        });
    }
    Ok(found)
}

/// Two-tone mask of `observed` against `background`: matching pixels become
/// black, differing ones take the `ink` pixel at the same position.
///
/// Used to strip a document's printed texture so only stamped content (a
/// seal, an overprinted number) remains, independent of its colors.
pub fn silhouette(observed: &RgbImage, background: &RgbImage, ink: &RgbImage) -> Result<RgbImage> {
    ensure_same_size(observed, background)?;
    ensure_same_size(ink, background)?;
    let mut out = RgbImage::new(observed.width(), observed.height());
    for (((o, b), i), dst) in observed
        .pixels()
        .zip(background.pixels())
        .zip(ink.pixels())
        .zip(out.pixels_mut())
    {
        if o != b {
            *dst = *i;
        }
    }
    Ok(out)
}

/// Silhouette with a single ink color.
pub fn silhouette_solid(observed: &RgbImage, background: &RgbImage, ink: Rgb<u8>) -> Result<RgbImage> {
    let ink = RgbImage::from_pixel(background.width(), background.height(), ink);
    silhouette(observed, background, &ink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisionError;

    fn paper() -> RgbImage {
        RgbImage::from_pixel(8, 6, Rgb([231, 226, 214]))
    }

    #[test]
    fn test_diff_blackens_background() {
        let bg = paper();
        let mut seen = bg.clone();
        seen.put_pixel(3, 2, Rgb([90, 20, 20]));

        let d = diff(&seen, &bg).unwrap();
        assert_eq!(d.get_pixel(0, 0), &BLACK);
        assert_eq!(d.get_pixel(3, 2), &Rgb([90, 20, 20]));
        assert_eq!(bounding_box(&d), Some(Rect::new(3, 2, 4, 3)));
    }

    #[test]
    fn test_bounding_box_spans_all_content() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(2, 7, Rgb([1, 0, 0]));
        img.put_pixel(6, 1, Rgb([0, 0, 9]));
        assert_eq!(bounding_box(&img), Some(Rect::new(2, 1, 7, 8)));
    }

    #[test]
    fn test_all_background_has_no_box() {
        let bg = paper();
        let d = diff(&bg, &bg).unwrap();
        assert_eq!(bounding_box(&d), None);
        assert_eq!(changed_region(&bg, &bg).unwrap(), None);
    }

    #[test]
    fn test_changed_region_sees_black_ink() {
        let bg = paper();
        let mut seen = bg.clone();
        seen.put_pixel(5, 4, BLACK);
        assert_eq!(changed_region(&seen, &bg).unwrap(), Some(Rect::new(5, 4, 6, 5)));
    }

    #[test]
    fn test_silhouette() {
        let bg = paper();
        let mut seen = bg.clone();
        seen.put_pixel(1, 1, Rgb([200, 30, 30]));
        let mask = silhouette_solid(&seen, &bg, Rgb([255, 255, 255])).unwrap();
        assert_eq!(mask.get_pixel(1, 1), &Rgb([255, 255, 255]));
        assert_eq!(mask.get_pixel(0, 0), &BLACK);
    }

    #[test]
    fn test_size_mismatch() {
        let err = diff(&RgbImage::new(3, 3), &paper()).unwrap_err();
        assert!(matches!(err, VisionError::SizeMismatch { expected: (8, 6), actual: (3, 3) }));
    }
}
