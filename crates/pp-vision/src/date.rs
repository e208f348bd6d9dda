use chrono::NaiveDate;
use image::{Rgb, RgbImage};
use pp_data::charsets;

use crate::error::{Result, VisionError};
use crate::font::BitmapFont;
use crate::text::{recognize_text, TextOptions};

/// Two-digit years on documents are all in the 1900s.
pub const YEAR_BASE: i32 = 1900;

/// Parse `YY.MM.DD`.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let invalid = || VisionError::InvalidDateFormat(text.to_string());

    let parts: Vec<&str> = text.split('.').collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(invalid());
    };
    let component = |s: &str| -> Option<u32> {
        if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };

    let year = component(*year).ok_or_else(invalid)?;
    let month = component(*month).ok_or_else(invalid)?;
    let day = component(*day).ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(YEAR_BASE + year as i32, month, day).ok_or_else(invalid)
}

/// Read a date field: text over the date charset, then `parse_date`.
pub fn recognize_date(
    image: &RgbImage,
    background: &RgbImage,
    font: &BitmapFont,
    color: Rgb<u8>,
    opts: &TextOptions<'_>,
) -> Result<NaiveDate> {
    let text = recognize_text(image, background, font, color, charsets::DATE, opts)?;
    parse_date(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::{block_font, typeset, INK, PAPER};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("24.11.23").unwrap(), ymd(1924, 11, 23));
        assert_eq!(parse_date("82.11.23").unwrap(), ymd(1982, 11, 23));
        assert_eq!(parse_date("00.01.01").unwrap(), ymd(1900, 1, 1));
        assert_eq!(parse_date("3.2.1").unwrap(), ymd(1903, 2, 1));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for bad in ["", "82.11", "82.11.12.1", "82.02.31", "82.11.1a", "82..12", "82.1.123", "+1.1.1"] {
            assert!(
                matches!(parse_date(bad), Err(VisionError::InvalidDateFormat(ref s)) if s == bad),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_recognize_date() {
        let font = block_font();
        let bg = RgbImage::from_pixel(60, 6, PAPER);
        let img = typeset(&font, &bg, "21.10.12", 0, INK);
        let date = recognize_date(&img, &bg, &font, INK, &TextOptions::default()).unwrap();
        assert_eq!(date, ymd(1921, 10, 12));
    }

    #[test]
    fn test_unreadable_date_is_invalid() {
        let font = block_font();
        let bg = RgbImage::from_pixel(40, 6, PAPER);
        let err = recognize_date(&bg, &bg, &font, INK, &TextOptions::default()).unwrap_err();
        assert!(matches!(err, VisionError::InvalidDateFormat(s) if s.is_empty()));
    }
}
