//! Document layouts and lazily evaluated field values.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use image::RgbImage;
use pp_capture::{crop_region, Rect};
use pp_data::ReadSpec;
use pp_state::RecognizedValue;
use tracing::debug;

use crate::error::{ensure_same_size, Result, VisionError};
use crate::tolerance::equal_with_tolerance;

#[derive(Debug, Clone)]
struct FieldSlot {
    rect: Rect,
    background: RgbImage,
}

/// Named field rectangles of one document variant, each with the empty
/// texture that lies under it.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    variant: String,
    width: u32,
    height: u32,
    label: String,
    fields: BTreeMap<String, FieldSlot>,
    reads: BTreeMap<String, ReadSpec>,
    seal: Option<SealBinding>,
}

/// Which seal set authenticates a document and where it is stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealBinding {
    pub set: String,
    pub field: String,
}

impl DocumentLayout {
    /// `width`x`height` is the document's scan area; `label` names the field
    /// that identifies the variant and must be declared before `matches`.
    pub fn new(variant: impl Into<String>, width: u32, height: u32, label: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            width,
            height,
            label: label.into(),
            fields: BTreeMap::new(),
            reads: BTreeMap::new(),
            seal: None,
        }
    }

    /// Declare a field and its empty background.
    ///
    /// The rectangle must lie inside the scan area and the background must
    /// have the rectangle's size.
    pub fn declare_field(&mut self, name: impl Into<String>, rect: Rect, background: RgbImage) -> Result<()> {
        let name = name.into();
        if rect.is_empty() || !rect.fits_within(self.width, self.height) {
            return Err(VisionError::OutOfRangeField {
                field: name,
                rect,
                width: self.width,
                height: self.height,
            });
        }
        if background.dimensions() != (rect.width(), rect.height()) {
            return Err(VisionError::SizeMismatch {
                expected: (rect.width(), rect.height()),
                actual: background.dimensions(),
            });
        }
        self.fields.insert(name, FieldSlot { rect, background });
        Ok(())
    }

    /// Declare a field whose background is cut from a document texture.
    ///
    /// The texture's origin sits at `texture_origin` in document coordinates.
    pub fn declare_field_from_texture(
        &mut self,
        name: impl Into<String>,
        rect: Rect,
        texture: &RgbImage,
        texture_origin: (u32, u32),
    ) -> Result<()> {
        let name = name.into();
        let out_of_range = |name: String| VisionError::OutOfRangeField {
            field: name,
            rect,
            width: texture.width(),
            height: texture.height(),
        };
        let Some(local) = rect.relative_to(texture_origin) else {
            return Err(out_of_range(name));
        };
        let background = match crop_region(texture, &local) {
            Ok(bg) => bg,
            Err(_) => return Err(out_of_range(name)),
        };
        self.declare_field(name, rect, background)
    }

    pub fn set_read(&mut self, field: impl Into<String>, read: ReadSpec) -> Result<()> {
        let field = field.into();
        if !self.fields.contains_key(&field) {
            return Err(VisionError::UnknownField(field));
        }
        self.reads.insert(field, read);
        Ok(())
    }

    pub fn set_seal(&mut self, binding: SealBinding) -> Result<()> {
        if !self.fields.contains_key(&binding.field) {
            return Err(VisionError::UnknownField(binding.field));
        }
        self.seal = Some(binding);
        Ok(())
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn field_rect(&self, name: &str) -> Result<Rect> {
        self.slot(name).map(|s| s.rect)
    }

    pub fn field_background(&self, name: &str) -> Result<&RgbImage> {
        self.slot(name).map(|s| &s.background)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn reads(&self) -> impl Iterator<Item = (&str, &ReadSpec)> {
        self.reads.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn read(&self, field: &str) -> Option<&ReadSpec> {
        self.reads.get(field)
    }

    pub fn seal(&self) -> Option<&SealBinding> {
        self.seal.as_ref()
    }

    /// True if the label field of `document` is exactly its empty texture.
    pub fn matches(&self, document: &RgbImage) -> bool {
        let Ok(slot) = self.slot(&self.label) else {
            return false;
        };
        match crop_region(document, &slot.rect) {
            Ok(label) => equal_with_tolerance(&label, &slot.background, 0),
            Err(_) => false,
        }
    }

    fn slot(&self, name: &str) -> Result<&FieldSlot> {
        self.fields
            .get(name)
            .ok_or_else(|| VisionError::UnknownField(name.to_string()))
    }
}

/// One scanned document with memoized per-field values.
///
/// Each field is computed at most once per instance, and a failed
/// computation is remembered like a value. Not shareable across threads;
/// create one per document per thread.
pub struct FieldModel<'a> {
    layout: &'a DocumentLayout,
    document: RgbImage,
    cache: RefCell<HashMap<String, Result<RecognizedValue>>>,
}

impl<'a> FieldModel<'a> {
    /// `document` is the document's scan area, at least as large as the layout.
    pub fn new(layout: &'a DocumentLayout, document: RgbImage) -> Self {
        Self {
            layout,
            document,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn layout(&self) -> &'a DocumentLayout {
        self.layout
    }

    pub fn document(&self) -> &RgbImage {
        &self.document
    }

    /// Pixels of field `name` in this document.
    pub fn crop(&self, name: &str) -> Result<RgbImage> {
        let rect = self.layout.field_rect(name)?;
        crop_region(&self.document, &rect).map_err(|_| VisionError::OutOfRangeField {
            field: name.to_string(),
            rect,
            width: self.document.width(),
            height: self.document.height(),
        })
    }

    pub fn background(&self, name: &str) -> Result<&'a RgbImage> {
        self.layout.field_background(name)
    }

    /// Value of field `name`, computing it from the field's pixels and
    /// background on first access.
    pub fn get<F>(&self, name: &str, compute: F) -> Result<RecognizedValue>
    where
        F: FnOnce(&RgbImage, &RgbImage) -> Result<RecognizedValue>,
    {
        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }

        let pixels = self.crop(name)?;
        let background = self.background(name)?;
        ensure_same_size(&pixels, background)?;
        let value = compute(&pixels, background);

        match &value {
            Ok(v) => debug!("{}.{} = {}", self.layout.variant, name, v),
            Err(e) => debug!("{}.{} failed: {}", self.layout.variant, name, e),
        }
        self.cache
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        value
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.borrow().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::cell::Cell;

    const PAPER: Rgb<u8> = Rgb([231, 226, 214]);

    fn texture() -> RgbImage {
        RgbImage::from_fn(120, 80, |x, y| Rgb([(x % 7) as u8 * 30, (y % 5) as u8 * 40, 90]))
    }

    fn layout() -> DocumentLayout {
        let tex = texture();
        let mut layout = DocumentLayout::new("entry-ticket", 100, 60, "label");
        layout
            .declare_field_from_texture("label", Rect::new(30, 10, 70, 20), &tex, (10, 5))
            .unwrap();
        layout
            .declare_field("date", Rect::new(5, 40, 45, 52), RgbImage::from_pixel(40, 12, PAPER))
            .unwrap();
        layout
    }

    fn document_for(layout: &DocumentLayout) -> RgbImage {
        let mut doc = RgbImage::from_pixel(100, 60, PAPER);
        for name in ["label", "date"] {
            let rect = layout.field_rect(name).unwrap();
            image::imageops::replace(
                &mut doc,
                layout.field_background(name).unwrap(),
                rect.left as i64,
                rect.top as i64,
            );
        }
        doc
    }

    #[test]
    fn test_background_cut_from_texture() {
        let layout = layout();
        let bg = layout.field_background("label").unwrap();
        assert_eq!(bg.dimensions(), (40, 10));
        // document (30, 10) is texture (20, 5)
        assert_eq!(bg.get_pixel(0, 0), texture().get_pixel(20, 5));
    }

    #[test]
    fn test_field_outside_area_rejected() {
        let mut layout = layout();
        let err = layout
            .declare_field("stamp", Rect::new(90, 50, 101, 55), RgbImage::new(11, 5))
            .unwrap_err();
        assert!(matches!(err, VisionError::OutOfRangeField { width: 100, height: 60, .. }));

        let err = layout
            .declare_field_from_texture("stamp", Rect::new(0, 0, 10, 10), &texture(), (10, 5))
            .unwrap_err();
        assert!(matches!(err, VisionError::OutOfRangeField { .. }));
    }

    #[test]
    fn test_unknown_field() {
        let layout = layout();
        assert!(matches!(layout.field_rect("nope"), Err(VisionError::UnknownField(_))));
        assert!(layout.field_background("nope").is_err());
    }

    #[test]
    fn test_label_match() {
        let layout = layout();
        let mut doc = document_for(&layout);
        assert!(layout.matches(&doc));
        doc.put_pixel(35, 12, Rgb([0, 0, 0]));
        assert!(!layout.matches(&doc));
        assert!(!layout.matches(&RgbImage::new(20, 20)));
    }

    #[test]
    fn test_get_computes_once() {
        let layout = layout();
        let model = FieldModel::new(&layout, document_for(&layout));
        let calls = Cell::new(0);
        let compute = |pixels: &RgbImage, bg: &RgbImage| {
            calls.set(calls.get() + 1);
            assert_eq!(pixels, bg);
            Ok(RecognizedValue::Text("BLANK".into()))
        };

        assert!(!model.is_cached("date"));
        let first = model.get("date", compute).unwrap();
        let second = model.get("date", compute).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert!(model.is_cached("date"));
    }

    #[test]
    fn test_failed_compute_runs_once() {
        let layout = layout();
        let model = FieldModel::new(&layout, document_for(&layout));
        let calls = Cell::new(0);
        let compute = |_: &RgbImage, _: &RgbImage| -> Result<RecognizedValue> {
            calls.set(calls.get() + 1);
            Err(VisionError::InvalidDateFormat("1.".into()))
        };

        for _ in 0..3 {
            let err = model.get("date", compute).unwrap_err();
            assert_eq!(err, VisionError::InvalidDateFormat("1.".into()));
        }
        assert_eq!(calls.get(), 1);
        assert!(model.is_cached("date"));

        // a cached failure wins over a later compute that would succeed
        let again = model.get("date", |_, _| Ok(RecognizedValue::Flag(true)));
        assert!(again.is_err());
    }

    #[test]
    fn test_short_document_is_out_of_range() {
        let layout = layout();
        let model = FieldModel::new(&layout, RgbImage::new(50, 30));
        let err = model
            .get("date", |_, _| Ok(RecognizedValue::Number(0)))
            .unwrap_err();
        assert!(matches!(err, VisionError::OutOfRangeField { width: 50, height: 30, .. }));
    }
}
