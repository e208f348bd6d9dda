//! Evaluate a layout's read specs against a scanned document.

use image::Rgb;
use pp_data::{charsets, ReadSpec};
use pp_state::RecognizedValue;
use tracing::debug;

use crate::date::recognize_date;
use crate::diff::silhouette_solid;
use crate::digits::recognize_digits;
use crate::error::{Result, VisionError};
use crate::field::FieldModel;
use crate::registry::Registry;
use crate::seal::{has_no_seal, seal_position};
use crate::text::{recognize_text, TextOptions, ALIGNMENT_BACKOFF};
use crate::tolerance::TEXT_RECOGNITION_TOLERANCE;

/// Knobs shared by every text read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSettings {
    pub tolerance: u8,
    pub alignment_backoff: u32,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            tolerance: TEXT_RECOGNITION_TOLERANCE,
            alignment_backoff: ALIGNMENT_BACKOFF,
        }
    }
}

impl ReadSettings {
    fn options<'a>(&self, stop_suffix: Option<&'a str>, align_fix: bool) -> TextOptions<'a> {
        TextOptions {
            stop_suffix,
            align_fix,
            tolerance: self.tolerance,
            alignment_backoff: self.alignment_backoff,
        }
    }
}

/// Read `field` as its layout describes, at most once per model.
pub fn read_field(
    registry: &Registry,
    model: &FieldModel<'_>,
    field: &str,
    settings: ReadSettings,
) -> Result<RecognizedValue> {
    let spec = model
        .layout()
        .read(field)
        .ok_or_else(|| VisionError::NoReadSpec(field.to_string()))?;
    model.get(field, |pixels, background| match spec {
        ReadSpec::Text(r) => {
            let font = registry.font(&r.font)?;
            let charset = resolve_charset(&r.charset)?;
            let opts = settings.options(r.stop_suffix.as_deref(), r.align_fix);
            recognize_text(pixels, background, font, Rgb(r.color), &charset, &opts).map(RecognizedValue::Text)
        }
        ReadSpec::Date(r) => {
            let font = registry.font(&r.font)?;
            let opts = settings.options(r.stop_suffix.as_deref(), false);
            recognize_date(pixels, background, font, Rgb(r.color), &opts).map(RecognizedValue::Date)
        }
        ReadSpec::Number(r) => {
            let font = registry.font(&r.font)?;
            let charset = resolve_charset(&r.charset)?;
            let opts = settings.options(None, false);
            let text = recognize_text(pixels, background, font, Rgb(r.color), &charset, &opts)?;
            parse_number(&text, r.unit.as_deref()).map(RecognizedValue::Number)
        }
        ReadSpec::Digits(r) => {
            let sheet = registry.digits().ok_or(VisionError::MissingDigitSheet)?;
            let text = match r.ink {
                Some(ink) => recognize_digits(&silhouette_solid(pixels, background, Rgb(ink))?, sheet),
                None => recognize_digits(pixels, sheet),
            };
            parse_number(&text, None).map(RecognizedValue::Number)
        }
    })
}

/// Parse an integer, dropping a trailing unit such as `cm`.
pub fn parse_number(text: &str, unit: Option<&str>) -> Result<i64> {
    let trimmed = text.trim();
    let digits = match unit {
        Some(unit) => trimmed.strip_suffix(unit).unwrap_or(trimmed).trim_end(),
        None => trimmed,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VisionError::InvalidNumber(text.to_string()));
    }
    digits
        .parse()
        .map_err(|_| VisionError::InvalidNumber(text.to_string()))
}

fn resolve_charset(spec: &str) -> Result<std::borrow::Cow<'static, str>> {
    charsets::resolve(spec).ok_or_else(|| VisionError::UnknownCharset(spec.to_string()))
}

/// Outcome of checking a sealed document's seal area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealCheck {
    /// No authorized seal was found.
    pub forged: bool,
    /// First stamped pixel inside the seal field, if anything is stamped.
    pub position: Option<(u32, u32)>,
}

/// Check the seal of a document whose layout names a seal set.
/// Returns `None` for documents that carry no seal.
pub fn inspect_seal(registry: &Registry, model: &FieldModel<'_>) -> Result<Option<SealCheck>> {
    let Some(binding) = model.layout().seal() else {
        return Ok(None);
    };
    let seals = registry
        .seals(&binding.set)
        .ok_or_else(|| VisionError::UnknownSealSet(binding.set.clone()))?;

    let area = model.crop(&binding.field)?;
    let background = model.background(&binding.field)?;

    let forged = has_no_seal(&area, background, seals)?;
    let position = match seal_position(&area, background) {
        Ok(p) => Some(p),
        Err(VisionError::SealNotFound) => None,
        Err(e) => return Err(e),
    };
    debug!(
        "{}: seal set {:?} forged={} position={:?}",
        model.layout().variant(),
        binding.set,
        forged,
        position
    );
    Ok(Some(SealCheck { forged, position }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digits::DigitSheet;
    use crate::field::{DocumentLayout, SealBinding};
    use crate::font::tests::{block_font, typeset, INK, PAPER};
    use chrono::NaiveDate;
    use image::RgbImage;
    use pp_capture::Rect;
    use pp_data::{DateRead, DigitsRead, NumberRead, TextRead};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn ink() -> [u8; 3] {
        INK.0
    }

    /// Document with a name, a date, a height and a digit counter.
    fn fixture() -> (Registry, DocumentLayout, RgbImage) {
        let mut registry = Registry::new();
        registry.insert_font(block_font());
        let cell = RgbImage::new(4, 5);
        let font = block_font();
        let bitmaps = ['0', '1', '2']
            .into_iter()
            .map(|c| (c, font.render(&cell, c, 0, WHITE)))
            .collect();
        registry.set_digits(DigitSheet::new(4, 5, bitmaps).unwrap());

        let paper = |w, h| RgbImage::from_pixel(w, h, PAPER);
        let mut layout = DocumentLayout::new("entry-ticket", 100, 60, "name");
        layout.declare_field("name", Rect::new(2, 2, 50, 9), paper(48, 7)).unwrap();
        layout.declare_field("date", Rect::new(2, 12, 50, 19), paper(48, 7)).unwrap();
        layout.declare_field("height", Rect::new(2, 22, 50, 29), paper(48, 7)).unwrap();
        layout.declare_field("counter", Rect::new(2, 32, 30, 37), RgbImage::new(28, 5)).unwrap();
        layout.declare_field("seal", Rect::new(60, 10, 90, 40), paper(30, 30)).unwrap();

        layout
            .set_read(
                "name",
                ReadSpec::Text(TextRead {
                    font: "block".into(),
                    color: ink(),
                    charset: "chars: ABCDEL".into(),
                    stop_suffix: None,
                    align_fix: true,
                }),
            )
            .unwrap();
        layout
            .set_read(
                "date",
                ReadSpec::Date(DateRead {
                    font: "block".into(),
                    color: ink(),
                    stop_suffix: None,
                }),
            )
            .unwrap();
        layout
            .set_read(
                "height",
                ReadSpec::Number(NumberRead {
                    font: "block".into(),
                    color: ink(),
                    charset: "chars:012".into(),
                    unit: Some("cm".into()),
                }),
            )
            .unwrap();
        layout
            .set_read("counter", ReadSpec::Digits(DigitsRead::default()))
            .unwrap();

        let mut doc = RgbImage::from_pixel(100, 60, PAPER);
        let font = block_font();
        let mut paste = |field: &str, text: &str, x: u32, color: Rgb<u8>| {
            let rect = layout.field_rect(field).unwrap();
            let img = typeset(&font, layout.field_background(field).unwrap(), text, x, color);
            image::imageops::replace(&mut doc, &img, rect.left as i64, rect.top as i64);
        };
        paste("name", "BLADE", 9, INK);
        paste("date", "22.01.12", 0, INK);
        paste("height", "120", 0, INK);
        paste("counter", "2021", 0, WHITE);

        (registry, layout, doc)
    }

    #[test]
    fn test_reads_every_kind() {
        let (registry, layout, doc) = fixture();
        let model = FieldModel::new(&layout, doc);
        let settings = ReadSettings::default();

        let name = read_field(&registry, &model, "name", settings).unwrap();
        assert_eq!(name, RecognizedValue::Text("BLADE".into()));
        let date = read_field(&registry, &model, "date", settings).unwrap();
        assert_eq!(date, RecognizedValue::Date(NaiveDate::from_ymd_opt(1922, 1, 12).unwrap()));
        let height = read_field(&registry, &model, "height", settings).unwrap();
        assert_eq!(height, RecognizedValue::Number(120));
        let counter = read_field(&registry, &model, "counter", settings).unwrap();
        assert_eq!(counter, RecognizedValue::Number(2021));
        assert!(model.is_cached("counter"));
    }

    #[test]
    fn test_field_without_read_spec() {
        let (registry, layout, doc) = fixture();
        let model = FieldModel::new(&layout, doc);
        let err = read_field(&registry, &model, "seal", ReadSettings::default()).unwrap_err();
        assert!(matches!(err, VisionError::NoReadSpec(_)));
    }

    #[test]
    fn test_missing_font_is_reported() {
        let (_, layout, doc) = fixture();
        let registry = Registry::new();
        let model = FieldModel::new(&layout, doc);
        let err = read_field(&registry, &model, "name", ReadSettings::default()).unwrap_err();
        assert!(matches!(err, VisionError::UnknownFont(ref f) if f == "block"));
        assert!(model.is_cached("name"));
        // the failure is remembered, not recomputed
        let full = fixture().0;
        assert_eq!(read_field(&full, &model, "name", ReadSettings::default()).unwrap_err(), err);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("182cm", Some("cm")).unwrap(), 182);
        assert_eq!(parse_number(" 64 kg", Some("kg")).unwrap(), 64);
        assert_eq!(parse_number("0420", None).unwrap(), 420);
        assert!(matches!(parse_number("", None), Err(VisionError::InvalidNumber(_))));
        assert!(parse_number("18c", Some("cm")).is_err());
    }

    #[test]
    fn test_seal_check() {
        let (mut registry, mut layout, mut doc) = fixture();
        let seal = RgbImage::from_fn(3, 3, |x, y| if x == 1 && y == 1 { Rgb([0, 0, 0]) } else { WHITE });
        registry.insert_seals("ministry", vec![seal.clone()]);
        layout
            .set_seal(SealBinding {
                set: "ministry".into(),
                field: "seal".into(),
            })
            .unwrap();

        let clean = FieldModel::new(&layout, doc.clone());
        let check = inspect_seal(&registry, &clean).unwrap().unwrap();
        assert!(check.forged);
        assert_eq!(check.position, None);

        for (x, y, p) in seal.enumerate_pixels() {
            if *p == WHITE {
                doc.put_pixel(70 + x, 20 + y, Rgb([160, 30, 30]));
            }
        }
        let stamped = FieldModel::new(&layout, doc);
        let check = inspect_seal(&registry, &stamped).unwrap().unwrap();
        assert!(!check.forged);
        assert_eq!(check.position, Some((10, 10)));
    }

    #[test]
    fn test_unsealed_document() {
        let (registry, layout, doc) = fixture();
        let model = FieldModel::new(&layout, doc);
        assert_eq!(inspect_seal(&registry, &model).unwrap(), None);
    }
}
