//! Left-to-right text recognition by synthesis.
//!
//! At each cursor column the candidates are drawn onto the empty field in
//! precedence order and compared against the screen over the glyph's compare
//! window. The first candidate that matches is emitted and the cursor jumps by
//! its trailing width; otherwise the cursor slides one column.

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::align::find_first_content;
use crate::error::{ensure_same_size, Result};
use crate::font::{restore, BitmapFont};
use crate::tolerance::{columns_match, TEXT_RECOGNITION_TOLERANCE};

/// Columns scanned left of the detected text start when alignment is on.
pub const ALIGNMENT_BACKOFF: u32 = 10;

/// Extra columns compared past a glyph's bare width.
const COMPARE_MARGIN: u32 = 2;

#[derive(Debug, Clone)]
pub struct TextOptions<'a> {
    /// Stop as soon as the output ends with this suffix.
    pub stop_suffix: Option<&'a str>,
    /// Start near the first non-background column instead of column 0.
    pub align_fix: bool,
    pub tolerance: u8,
    pub alignment_backoff: u32,
}

impl Default for TextOptions<'_> {
    fn default() -> Self {
        Self {
            stop_suffix: None,
            align_fix: false,
            tolerance: TEXT_RECOGNITION_TOLERANCE,
            alignment_backoff: ALIGNMENT_BACKOFF,
        }
    }
}

impl<'a> TextOptions<'a> {
    pub fn stop_at(mut self, suffix: &'a str) -> Self {
        self.stop_suffix = Some(suffix);
        self
    }

    pub fn aligned(mut self) -> Self {
        self.align_fix = true;
        self
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }
}

enum Probe {
    Hit(char),
    Miss,
    /// The next candidate's compare window would reach the right edge.
    Overflow(u32),
}

enum State {
    Scanning(u32),
    Matched(u32, char),
    Done,
}

struct CharacterStream<'a> {
    image: &'a RgbImage,
    background: &'a RgbImage,
    font: &'a BitmapFont,
    color: Rgb<u8>,
    candidates: Vec<char>,
    tolerance: u8,
    /// Always equal to `background` between probes.
    canvas: RgbImage,
}

impl CharacterStream<'_> {
    fn probe(&mut self, cursor: u32, leading: bool) -> Probe {
        let width = self.image.width();
        for &ch in &self.candidates {
            if leading && ch == ' ' {
                continue;
            }
            let bare = self.font.glyph_width(ch, false);
            if cursor.saturating_add(bare) >= width {
                return Probe::Overflow(bare);
            }

            let span = self
                .font
                .draw(&mut self.canvas, self.background, ch, cursor, self.color);
            let hit = columns_match(
                self.image,
                &self.canvas,
                cursor,
                cursor + bare + COMPARE_MARGIN,
                self.tolerance,
            );
            if let Some(span) = span {
                restore(&mut self.canvas, self.background, span);
            }
            if hit {
                return Probe::Hit(ch);
            }
        }
        Probe::Miss
    }
}

/// Read the text in `image`, a field drawn in `font` and `color` over `background`.
///
/// `charset` is the ordered candidate list; characters the font cannot draw
/// are skipped. Unreadable regions produce an empty or partial string, never
/// an error. Leading and trailing spaces are stripped and the font's
/// letter/digit aliases resolved.
pub fn recognize_text(
    image: &RgbImage,
    background: &RgbImage,
    font: &BitmapFont,
    color: Rgb<u8>,
    charset: &str,
    opts: &TextOptions<'_>,
) -> Result<String> {
    ensure_same_size(image, background)?;
    if image == background {
        return Ok(String::new());
    }

    let candidates: Vec<char> = charset.chars().filter(|&c| font.can_draw(c)).collect();
    if candidates.len() < charset.chars().count() {
        debug!("Font {:?} cannot draw part of charset {:?}", font.id(), charset);
    }
    let stop_suffix = opts.stop_suffix.filter(|s| !s.is_empty());

    let start = if opts.align_fix {
        find_first_content(image, background)?.saturating_sub(opts.alignment_backoff)
    } else {
        0
    };

    let mut stream = CharacterStream {
        image,
        background,
        font,
        color,
        candidates,
        tolerance: opts.tolerance,
        canvas: background.clone(),
    };

    let width = image.width();
    let mut leading = opts.align_fix;
    let mut result = String::new();
    let mut state = State::Scanning(start);

    loop {
        state = match state {
            State::Scanning(cursor) if cursor >= width => State::Done,
            State::Scanning(cursor) => match stream.probe(cursor, leading) {
                Probe::Hit(ch) => State::Matched(cursor, ch),
                Probe::Miss => State::Scanning(cursor + 1),
                Probe::Overflow(bare) => State::Scanning(cursor.saturating_add(bare).saturating_add(1)),
            },
            State::Matched(cursor, ch) => {
                result.push(ch);
                leading = false;
                if stop_suffix.is_some_and(|s| result.ends_with(s)) {
                    State::Done
                } else {
                    State::Scanning(cursor + font.glyph_width(ch, true).max(1))
                }
            }
            State::Done => break,
        };
    }

    let text = font.disambiguate(result.trim());
    debug!("Recognized {:?} in {:?}", text, font.id());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::{block_font, typeset, INK, PAPER};
    use pp_data::GlyphAlias;

    const CHARSET: &str = " ABCDEL.120";

    fn field(width: u32) -> RgbImage {
        RgbImage::from_pixel(width, 7, PAPER)
    }

    #[test]
    fn test_round_trip() {
        let font = block_font();
        let bg = field(48);
        for text in ["BAD CAB", "LEAD", "A", "DEC.12"] {
            let img = typeset(&font, &bg, text, 0, INK);
            let read = recognize_text(&img, &bg, &font, INK, CHARSET, &TextOptions::default()).unwrap();
            assert_eq!(read, text);
        }
    }

    #[test]
    fn test_round_trip_with_alignment() {
        let font = block_font();
        let bg = field(64);
        for k in [0, 3, 11, 13, 20] {
            let img = typeset(&font, &bg, "CABLE", k, INK);
            let opts = TextOptions::default().aligned();
            let read = recognize_text(&img, &bg, &font, INK, CHARSET, &opts).unwrap();
            assert_eq!(read, "CABLE", "offset {k}");
        }
    }

    #[test]
    fn test_blank_field_reads_empty() {
        let font = block_font();
        let bg = field(30);
        let read = recognize_text(&bg, &bg, &font, INK, CHARSET, &TextOptions::default()).unwrap();
        assert_eq!(read, "");
        let aligned = TextOptions::default().aligned();
        assert_eq!(recognize_text(&bg, &bg, &font, INK, CHARSET, &aligned).unwrap(), "");
    }

    #[test]
    fn test_stop_suffix() {
        let font = block_font();
        let bg = field(48);
        let img = typeset(&font, &bg, "BAD.CAB", 0, INK);
        let opts = TextOptions::default().stop_at(".");
        let read = recognize_text(&img, &bg, &font, INK, CHARSET, &opts).unwrap();
        assert_eq!(read, "BAD.");
    }

    #[test]
    fn test_tolerance_absorbs_small_noise() {
        let font = block_font();
        let bg = field(32);
        let mut img = typeset(&font, &bg, "DEAL", 0, INK);
        for p in img.pixels_mut() {
            p.0 = p.0.map(|c| c.saturating_add(3));
        }
        let read = recognize_text(&img, &bg, &font, INK, CHARSET, &TextOptions::default()).unwrap();
        assert_eq!(read, "DEAL");

        let exact = TextOptions::default().with_tolerance(0);
        let strict = recognize_text(&img, &bg, &font, INK, CHARSET, &exact).unwrap();
        assert_ne!(strict, "DEAL");
    }

    #[test]
    fn test_wrong_color_reads_nothing() {
        let font = block_font();
        let bg = field(32);
        let img = typeset(&font, &bg, "DEAL", 0, INK);
        let read = recognize_text(&img, &bg, &font, Rgb([200, 10, 10]), CHARSET, &TextOptions::default())
            .unwrap();
        assert_eq!(read, "");
    }

    #[test]
    fn test_clipped_glyph_at_edge_is_dropped() {
        let font = block_font();
        let bg = field(10);
        let img = typeset(&font, &bg, "ABC", 0, INK);
        let read = recognize_text(&img, &bg, &font, INK, CHARSET, &TextOptions::default()).unwrap();
        assert_eq!(read, "AB");
    }

    #[test]
    fn test_precedence_and_alias() {
        // 'O' and '0' share a bitmap; whichever comes first in the charset wins
        let font = block_font().with_alias(GlyphAlias {
            letter: 'O',
            digit: '0',
        });
        let bg = field(32);
        let img = typeset(&font, &bg, "1O", 0, INK);
        let read = recognize_text(&img, &bg, &font, INK, " O10", &TextOptions::default()).unwrap();
        assert_eq!(read, "10");
        let img = typeset(&font, &bg, "LO", 0, INK);
        let read = recognize_text(&img, &bg, &font, INK, " LO0", &TextOptions::default()).unwrap();
        assert_eq!(read, "LO");
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let font = block_font();
        assert!(recognize_text(&field(10), &field(12), &font, INK, CHARSET, &TextOptions::default()).is_err());
    }
}
