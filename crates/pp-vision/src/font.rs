//! Bitmap fonts and glyph synthesis.
//!
//! A glyph is drawn onto a copy of the field's empty background exactly the
//! way the game draws it: hard-edged, in the field's text color, shifted by
//! the font's pen and baseline offsets. Per-glyph patches then correct the few
//! pixels where the game's rendering differs from the sheet.

use std::collections::HashMap;

use anyhow::{bail, Result};
use image::imageops::{self, FilterType};
use image::{GenericImageView, Rgb, RgbImage, RgbaImage};
use pp_data::{FontSpec, GlyphAlias, PatchOp, WidthRule};
use tracing::debug;

/// Alpha at or above which a sheet pixel counts as ink.
const INK_ALPHA: u8 = 128;

#[derive(Debug, Clone)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage mask.
    ink: Vec<bool>,
    pub advance: u32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Glyph {
    pub fn new(width: u32, height: u32, ink: Vec<bool>, advance: u32) -> Self {
        debug_assert_eq!(ink.len(), (width * height) as usize);
        Self {
            width,
            height,
            ink,
            advance,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Glyph with no ink, such as a space.
    pub fn blank(advance: u32) -> Self {
        Self::new(0, 0, Vec::new(), advance)
    }

    /// Build a glyph from text rows where `#` marks ink.
    pub fn from_rows(rows: &[&str], advance: u32) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut ink = vec![false; (width * height) as usize];
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                ink[y * width as usize + x] = c == '#';
            }
        }
        Self::new(width, height, ink, advance)
    }

    pub fn with_offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    fn ink_pixels(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let w = self.width.max(1) as usize;
        self.ink
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(move |(i, _)| ((i % w) as i32, (i / w) as i32))
    }
}

/// Post-draw correction for one glyph.
#[derive(Debug, Clone, Copy)]
pub struct GlyphPatch {
    pub op: PatchOp,
    /// Relative to the drawing column.
    pub x: i32,
    /// Absolute within the field.
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Half-open column range touched by a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    fn include(span: Option<Span>, start: u32, end: u32) -> Option<Span> {
        if start >= end {
            return span;
        }
        Some(match span {
            None => Span { start, end },
            Some(s) => Span {
                start: s.start.min(start),
                end: s.end.max(end),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct BitmapFont {
    id: String,
    glyphs: HashMap<char, Glyph>,
    baseline_offset: i32,
    pen_shift: i32,
    width_rule: WidthRule,
    patches: HashMap<char, Vec<GlyphPatch>>,
    aliases: Vec<GlyphAlias>,
}

impl BitmapFont {
    pub fn new(id: impl Into<String>, width_rule: WidthRule) -> Self {
        Self {
            id: id.into(),
            glyphs: HashMap::new(),
            baseline_offset: 0,
            pen_shift: 0,
            width_rule,
            patches: HashMap::new(),
            aliases: Vec::new(),
        }
    }

    /// Cut every glyph described by `spec` out of its sheet.
    pub fn from_sheet(spec: &FontSpec, sheet: &RgbaImage) -> Result<Self> {
        if spec.scale == 0 {
            bail!("font {:?} has zero scale", spec.id);
        }
        let scaled;
        let sheet = if spec.scale == 1 {
            sheet
        } else {
            scaled = imageops::resize(
                sheet,
                sheet.width() * spec.scale,
                sheet.height() * spec.scale,
                FilterType::Nearest,
            );
            &scaled
        };

        let mut font = Self::new(&spec.id, spec.width_rule)
            .with_baseline_offset(spec.baseline_offset)
            .with_pen_shift(spec.pen_shift);

        for g in &spec.glyphs {
            let (x, y) = (g.x * spec.scale, g.y * spec.scale);
            let (w, h) = (g.width * spec.scale, g.height * spec.scale);
            if x + w > sheet.width() || y + h > sheet.height() {
                bail!(
                    "font {:?}: glyph {:?} at ({}, {}) {}x{} exceeds the {}x{} sheet",
                    spec.id,
                    g.ch,
                    x,
                    y,
                    w,
                    h,
                    sheet.width(),
                    sheet.height()
                );
            }
            let view = imageops::crop_imm(sheet, x, y, w, h);
            let ink = view.pixels().map(|(_, _, p)| p[3] >= INK_ALPHA).collect();
            let glyph = Glyph::new(w, h, ink, g.advance).with_offset(g.offset_x, g.offset_y);
            font.insert_glyph(g.ch, glyph);
        }

        for p in &spec.patches {
            font.add_patch(
                p.ch,
                GlyphPatch {
                    op: p.op,
                    x: p.x,
                    y: p.y,
                    width: p.width,
                    height: p.height,
                },
            );
        }
        font.aliases = spec.aliases.clone();

        debug!("Built font {:?} with {} glyphs", font.id, font.glyphs.len());
        Ok(font)
    }

    pub fn with_baseline_offset(mut self, offset: i32) -> Self {
        self.baseline_offset = offset;
        self
    }

    pub fn with_pen_shift(mut self, shift: i32) -> Self {
        self.pen_shift = shift;
        self
    }

    pub fn with_alias(mut self, alias: GlyphAlias) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn insert_glyph(&mut self, ch: char, glyph: Glyph) {
        self.glyphs.insert(ch, glyph);
    }

    /// Patches are applied in insertion order.
    pub fn add_patch(&mut self, ch: char, patch: GlyphPatch) {
        self.patches.entry(ch).or_default().push(patch);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    /// Whether the recognizer can try `ch` with this font.
    pub fn can_draw(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch) || (ch == ' ' && self.width_rule.space.is_some())
    }

    /// Horizontal extent of `ch`.
    ///
    /// The bare width bounds the compare window when `ch` is tried; the
    /// trailing width is how far the cursor moves after `ch` matched.
    /// Characters the font lacks are zero wide.
    pub fn glyph_width(&self, ch: char, trailing: bool) -> u32 {
        if ch == ' ' {
            if let Some(space) = self.width_rule.space {
                return if trailing { space.trailing } else { space.bare };
            }
        }
        let Some(glyph) = self.glyphs.get(&ch) else {
            return 0;
        };
        let trim = if trailing {
            self.width_rule.trailing_trim
        } else {
            self.width_rule.bare_trim
        };
        (glyph.advance as i32 - trim).max(0) as u32
    }

    /// Draw `ch` at column `x` onto a copy of `background`.
    pub fn render(&self, background: &RgbImage, ch: char, x: u32, color: Rgb<u8>) -> RgbImage {
        let mut canvas = background.clone();
        self.draw(&mut canvas, background, ch, x, color);
        canvas
    }

    /// Draw `ch` at column `x` into `canvas`, clipping at the edges.
    ///
    /// `background` supplies the pixels restored by background patches.
    /// Returns the columns that were written, if any.
    pub fn draw(
        &self,
        canvas: &mut RgbImage,
        background: &RgbImage,
        ch: char,
        x: u32,
        color: Rgb<u8>,
    ) -> Option<Span> {
        let (w, h) = canvas.dimensions();
        let mut span = None;

        if let Some(glyph) = self.glyphs.get(&ch) {
            let ox = x as i32 + self.pen_shift + glyph.offset_x;
            let oy = self.baseline_offset + glyph.offset_y;
            for (gx, gy) in glyph.ink_pixels() {
                let (tx, ty) = (ox + gx, oy + gy);
                if tx < 0 || ty < 0 || tx >= w as i32 || ty >= h as i32 {
                    continue;
                }
                canvas.put_pixel(tx as u32, ty as u32, color);
                span = Span::include(span, tx as u32, tx as u32 + 1);
            }
        }

        for patch in self.patches.get(&ch).into_iter().flatten() {
            let Some((x0, y0, x1, y1)) = clip(
                x as i32 + patch.x,
                patch.y,
                patch.width,
                patch.height,
                w,
                h,
            ) else {
                continue;
            };
            for py in y0..y1 {
                for px in x0..x1 {
                    let p = match patch.op {
                        PatchOp::Background => *background.get_pixel(px, py),
                        PatchOp::Ink => color,
                    };
                    canvas.put_pixel(px, py, p);
                }
            }
            span = Span::include(span, x0, x1);
        }

        span
    }

    /// Rewrite letters that follow a nonzero digit into the digit they are
    /// drawn identically to, e.g. `1O` into `10`.
    ///
    /// Best effort only. The glyphs are pixel-identical, so the context is
    /// all there is to go on, and text that really has a letter right after
    /// a digit (a code such as `7O`) gets rewritten too.
    pub fn disambiguate(&self, text: &str) -> String {
        if self.aliases.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut prev = None;
        for c in text.chars() {
            let after_digit = matches!(prev, Some('1'..='9'));
            let replaced = self
                .aliases
                .iter()
                .find(|a| after_digit && a.letter == c)
                .map_or(c, |a| a.digit);
            out.push(replaced);
            prev = Some(c);
        }
        out
    }
}

/// Copy `span` columns of `background` back into `canvas`.
pub(crate) fn restore(canvas: &mut RgbImage, background: &RgbImage, span: Span) {
    let stride = canvas.width() as usize * 3;
    let (start, end) = (span.start as usize * 3, span.end as usize * 3);
    let src = background.as_raw();
    let rows = canvas.height() as usize;
    let dst: &mut [u8] = canvas;
    for y in 0..rows {
        let row = y * stride;
        dst[row + start..row + end].copy_from_slice(&src[row + start..row + end]);
    }
}

fn clip(x: i32, y: i32, width: u32, height: u32, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = (x + width as i32).clamp(0, w as i32) as u32;
    let y1 = (y + height as i32).clamp(0, h as i32) as u32;
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}
