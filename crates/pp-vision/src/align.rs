use image::RgbImage;

use crate::error::{ensure_same_size, Result};
use crate::tolerance::columns_match;

/// Approximate first column at which `image` differs from `background`.
///
/// Bisects on "is everything left of here still background", so it assumes
/// the content is one contiguous run; stray pixels further right can pull the
/// answer past real content. The result is the first content column or the
/// one after it. An image with no content yields its width.
pub fn find_first_content(image: &RgbImage, background: &RgbImage) -> Result<u32> {
    ensure_same_size(image, background)?;
    let mut a = 0u32;
    let mut b = image.width();
    while a < b {
        let m = a + (b - a) / 2;
        if a == m {
            break;
        }
        if columns_match(image, background, a, m, 0) {
            a = m;
        } else {
            b = m - 1;
        }
    }
    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn field_with_ink_at(width: u32, columns: std::ops::Range<u32>) -> (RgbImage, RgbImage) {
        let bg = RgbImage::from_pixel(width, 6, Rgb([240, 235, 220]));
        let mut img = bg.clone();
        for x in columns {
            img.put_pixel(x, 3, Rgb([60, 50, 50]));
        }
        (img, bg)
    }

    #[test]
    fn test_within_one_of_true_start() {
        for k in 0..48 {
            let (img, bg) = field_with_ink_at(48, k..(k + 6).min(48));
            let found = find_first_content(&img, &bg).unwrap();
            assert!(found == k || found == k + 1, "k={k} found={found}");
        }
    }

    #[test]
    fn test_single_column_anywhere() {
        for k in 0..48 {
            let (img, bg) = field_with_ink_at(48, k..k + 1);
            let found = find_first_content(&img, &bg).unwrap();
            assert!(found == k || found == k + 1, "k={k} found={found}");
        }
    }

    #[test]
    fn test_empty_field_yields_width() {
        let (img, bg) = field_with_ink_at(30, 0..0);
        assert_eq!(find_first_content(&img, &bg).unwrap(), 30);
    }

    #[test]
    fn test_content_at_origin() {
        let (img, bg) = field_with_ink_at(17, 0..17);
        assert!(find_first_content(&img, &bg).unwrap() <= 1);
    }

    #[test]
    fn test_rejects_mismatched_sizes() {
        let (img, _) = field_with_ink_at(10, 0..1);
        assert!(find_first_content(&img, &RgbImage::new(11, 6)).is_err());
    }
}
