//! Seal checks on sealed documents.
//!
//! The seal area is reduced to a silhouette: pixels matching the printed
//! texture go black, everything else goes white. Authorized seals are stored
//! the same way, so presence is an exact sub-image search independent of the
//! stamp's colors.

use std::collections::HashMap;

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::diff::silhouette_solid;
use crate::error::{Result, VisionError};

pub const SEAL_INK: Rgb<u8> = Rgb([255, 255, 255]);
const EMPTY: Rgb<u8> = Rgb([0, 0, 0]);

/// Silhouette of whatever was stamped over `background`.
pub fn seal_canvas(observed: &RgbImage, background: &RgbImage) -> Result<RgbImage> {
    silhouette_solid(observed, background, SEAL_INK)
}

/// Top-left corner of the first exact occurrence of `needle` in `haystack`,
/// scanning rows top to bottom.
pub fn locate(haystack: &RgbImage, needle: &RgbImage) -> Option<(u32, u32)> {
    let (hw, hh) = haystack.dimensions();
    let (nw, nh) = needle.dimensions();
    if nw == 0 || nh == 0 || nw > hw || nh > hh {
        return None;
    }

    let stride = hw as usize * 3;
    let row_len = nw as usize * 3;
    let hay = haystack.as_raw();
    let pin = needle.as_raw();

    for y in 0..=(hh - nh) {
        for x in 0..=(hw - nw) {
            let found = (0..nh as usize).all(|dy| {
                let at = (y as usize + dy) * stride + x as usize * 3;
                hay[at..at + row_len] == pin[dy * row_len..(dy + 1) * row_len]
            });
            if found {
                return Some((x, y));
            }
        }
    }
    None
}

/// True if `seal` does not appear in the seal area.
pub fn seal_absent(observed: &RgbImage, background: &RgbImage, seal: &RgbImage) -> Result<bool> {
    let canvas = seal_canvas(observed, background)?;
    Ok(locate(&canvas, seal).is_none())
}

/// True if none of `seals` appears in the seal area.
pub fn has_no_seal(observed: &RgbImage, background: &RgbImage, seals: &[RgbImage]) -> Result<bool> {
    let canvas = seal_canvas(observed, background)?;
    for (i, seal) in seals.iter().enumerate() {
        if let Some(at) = locate(&canvas, seal) {
            debug!("Seal #{} found at {:?}", i, at);
            return Ok(false);
        }
    }
    Ok(true)
}

/// First stamped pixel in row-major order, relative to the seal area.
pub fn seal_position(observed: &RgbImage, background: &RgbImage) -> Result<(u32, u32)> {
    let canvas = seal_canvas(observed, background)?;
    canvas
        .enumerate_pixels()
        .find(|(_, _, p)| *p != &EMPTY)
        .map(|(x, y, _)| (x, y))
        .ok_or(VisionError::SealNotFound)
}

/// Named sets of authorized seal silhouettes.
#[derive(Debug, Clone, Default)]
pub struct SealCatalog {
    sets: HashMap<String, Vec<RgbImage>>,
}

impl SealCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, seals: Vec<RgbImage>) {
        self.sets.insert(id.into(), seals);
    }

    pub fn get(&self, id: &str) -> Option<&[RgbImage]> {
        self.sets.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Reduce an arbitrary seal image to a white-on-black silhouette.
pub fn to_silhouette(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        if *p != EMPTY {
            *p = SEAL_INK;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: Rgb<u8> = Rgb([214, 200, 180]);
    const RED: Rgb<u8> = Rgb([170, 40, 40]);

    fn area() -> RgbImage {
        RgbImage::from_fn(40, 30, |x, y| {
            if (x + y) % 9 == 0 {
                Rgb([120, 110, 100])
            } else {
                PAPER
            }
        })
    }

    /// A 5x4 ring.
    fn ring() -> RgbImage {
        RgbImage::from_fn(5, 4, |x, y| {
            if x == 0 || y == 0 || x == 4 || y == 3 {
                SEAL_INK
            } else {
                EMPTY
            }
        })
    }

    fn stamp(area: &RgbImage, at: (u32, u32), color: Rgb<u8>) -> RgbImage {
        let mut out = area.clone();
        let shape = ring();
        for (x, y, p) in shape.enumerate_pixels() {
            if *p == SEAL_INK {
                out.put_pixel(at.0 + x, at.1 + y, color);
            }
        }
        out
    }

    #[test]
    fn test_clean_area_has_no_seal() {
        let bg = area();
        assert!(seal_absent(&bg, &bg, &ring()).unwrap());
        assert!(matches!(seal_position(&bg, &bg), Err(VisionError::SealNotFound)));
    }

    #[test]
    fn test_stamped_seal_found_regardless_of_color() {
        let bg = area();
        for color in [RED, Rgb([20, 20, 140])] {
            let seen = stamp(&bg, (12, 7), color);
            assert!(!seal_absent(&seen, &bg, &ring()).unwrap());
            assert_eq!(seal_position(&seen, &bg).unwrap(), (12, 7));
        }
    }

    #[test]
    fn test_wrong_seal_is_absent() {
        let bg = area();
        let seen = stamp(&bg, (3, 3), RED);
        let other = RgbImage::from_pixel(3, 3, SEAL_INK);
        assert!(seal_absent(&seen, &bg, &other).unwrap());
        assert!(has_no_seal(&seen, &bg, &[other.clone()]).unwrap());
        assert!(!has_no_seal(&seen, &bg, &[other, ring()]).unwrap());
    }

    #[test]
    fn test_locate() {
        let mut hay = RgbImage::new(10, 8);
        hay.put_pixel(6, 5, SEAL_INK);
        let pin = RgbImage::from_pixel(1, 1, SEAL_INK);
        assert_eq!(locate(&hay, &pin), Some((6, 5)));
        assert_eq!(locate(&pin, &hay), None);
        assert_eq!(locate(&hay, &RgbImage::new(0, 0)), None);
    }

    #[test]
    fn test_catalog_and_silhouette() {
        let mut catalog = SealCatalog::new();
        let painted = RgbImage::from_fn(2, 1, |x, _| if x == 0 { RED } else { EMPTY });
        catalog.insert("permit", vec![to_silhouette(&painted)]);
        let seals = catalog.get("permit").unwrap();
        assert_eq!(seals[0].get_pixel(0, 0), &SEAL_INK);
        assert_eq!(seals[0].get_pixel(1, 0), &EMPTY);
        assert!(catalog.get("asylum").is_none());
        assert_eq!(catalog.len(), 1);
    }
}
