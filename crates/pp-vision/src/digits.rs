use anyhow::{bail, Context};
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use crate::error::{Result, VisionError};

/// Pre-rendered fixed-width digit bitmaps.
///
/// Used for numbers printed on a known flat color, where an exact compare
/// against a stored bitmap replaces glyph synthesis.
#[derive(Debug, Clone)]
pub struct DigitSheet {
    width: u32,
    height: u32,
    bitmaps: Vec<(char, RgbImage)>,
}

impl DigitSheet {
    /// Every bitmap must be exactly `width`x`height`.
    pub fn new(width: u32, height: u32, bitmaps: Vec<(char, RgbImage)>) -> Result<Self> {
        if let Some((_, bad)) = bitmaps.iter().find(|(_, b)| b.dimensions() != (width, height)) {
            return Err(VisionError::SizeMismatch {
                expected: (width, height),
                actual: bad.dimensions(),
            });
        }
        Ok(Self {
            width,
            height,
            bitmaps,
        })
    }

    /// Slice a strip holding `0` through `9` side by side, after an
    /// integer nearest-neighbour upscale. `width`/`height` are unscaled.
    pub fn from_strip(strip: &RgbImage, width: u32, height: u32, scale: u32) -> anyhow::Result<Self> {
        if scale == 0 {
            bail!("digit sheet has zero scale");
        }
        let strip = imageops::resize(
            strip,
            strip.width() * scale,
            strip.height() * scale,
            FilterType::Nearest,
        );
        let (w, h) = (width * scale, height * scale);
        if strip.width() < w * 10 || strip.height() < h {
            bail!(
                "digit strip is {}x{}, need {}x{}",
                strip.width(),
                strip.height(),
                w * 10,
                h
            );
        }

        let bitmaps = ('0'..='9')
            .enumerate()
            .map(|(i, c)| (c, imageops::crop_imm(&strip, i as u32 * w, 0, w, h).to_image()))
            .collect();
        let sheet = Self::new(w, h, bitmaps).context("Failed to slice digit strip")?;
        debug!("Loaded {}x{} digit sheet", w, h);
        Ok(sheet)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn matches_at(&self, image: &RgbImage, x: u32, bitmap: &RgbImage) -> bool {
        let stride = image.width() as usize * 3;
        let row_len = self.width as usize * 3;
        let start = x as usize * 3;
        let src = image.as_raw();
        let digit = bitmap.as_raw();
        (0..self.height as usize).all(|y| {
            let at = y * stride + start;
            src[at..at + row_len] == digit[y * row_len..(y + 1) * row_len]
        })
    }
}

/// Read a run of digits by exact comparison against `sheet`.
///
/// The window slides one column at a time and jumps a full digit width on a
/// match. Only the top `sheet.height()` rows are compared.
pub fn recognize_digits(image: &RgbImage, sheet: &DigitSheet) -> String {
    let mut out = String::new();
    if image.height() < sheet.height || sheet.width == 0 {
        return out;
    }

    let mut x = 0;
    while x + sheet.width <= image.width() {
        match sheet
            .bitmaps
            .iter()
            .find(|(_, bitmap)| sheet.matches_at(image, x, bitmap))
        {
            Some((c, _)) => {
                out.push(*c);
                x += sheet.width;
            }
            None => x += 1,
        }
    }
    out
}
