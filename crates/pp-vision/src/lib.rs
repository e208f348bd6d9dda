//! Screen text recognition for Papers, Please documents.
//!
//! The game draws every document field with a handful of bitmap fonts over a
//! fixed paper texture, so a field can be read by re-drawing candidate
//! glyphs onto the empty texture and comparing pixels.

pub mod align;
pub mod date;
pub mod diff;
pub mod digits;
pub mod error;
pub mod field;
pub mod font;
pub mod reader;
pub mod registry;
pub mod seal;
pub mod text;
pub mod tolerance;

pub use align::find_first_content;
pub use date::{parse_date, recognize_date};
pub use diff::{bounding_box, changed_region, diff, silhouette};
pub use digits::{recognize_digits, DigitSheet};
pub use error::{Result, VisionError};
pub use field::{DocumentLayout, FieldModel, SealBinding};
pub use font::{BitmapFont, Glyph, GlyphPatch};
pub use reader::{inspect_seal, read_field, ReadSettings, SealCheck};
pub use registry::Registry;
pub use seal::{has_no_seal, seal_absent, seal_position, SealCatalog};
pub use text::{recognize_text, TextOptions};
pub use tolerance::{equal_with_tolerance, TEXT_RECOGNITION_TOLERANCE};

use image::RgbImage;
use pp_capture::Rect;

/// Empty texture under `field` of document `variant`.
pub fn field_background<'r>(registry: &'r Registry, variant: &str, field: &str) -> Result<&'r RgbImage> {
    layout(registry, variant)?.field_background(field)
}

/// Rectangle of `field` in document `variant`, in document coordinates.
pub fn field_rect(registry: &Registry, variant: &str, field: &str) -> Result<Rect> {
    layout(registry, variant)?.field_rect(field)
}

fn layout<'r>(registry: &'r Registry, variant: &str) -> Result<&'r DocumentLayout> {
    registry
        .layout(variant)
        .ok_or_else(|| VisionError::UnknownDocument(variant.to_string()))
}
