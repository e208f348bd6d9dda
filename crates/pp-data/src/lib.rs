use anyhow::{bail, Context, Result};
use pp_capture::Rect;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub mod charsets;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Everything the recognizer needs from disk, described by `manifest.json`.
/// Image paths are relative to the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub fonts: Vec<FontSpec>,
    #[serde(default)]
    pub digits: Option<DigitSheetSpec>,
    #[serde(default)]
    pub documents: Vec<DocumentSpec>,
    #[serde(default)]
    pub seals: Vec<SealSetSpec>,
}

/// A bitmap font cut out of a glyph sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSpec {
    pub id: String,
    pub sheet: String,
    #[serde(default = "default_scale")]
    pub scale: u32,
    pub glyphs: Vec<GlyphSpec>,
    /// Vertical offset of the glyph origin inside a field.
    #[serde(default)]
    pub baseline_offset: i32,
    /// Horizontal shift applied when drawing at a column.
    #[serde(default)]
    pub pen_shift: i32,
    pub width_rule: WidthRule,
    #[serde(default)]
    pub patches: Vec<PatchSpec>,
    #[serde(default)]
    pub aliases: Vec<GlyphAlias>,
}

/// Sheet coordinates are in unscaled sheet pixels; `advance` and offsets are in field pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlyphSpec {
    pub ch: char,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub advance: u32,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
}

/// How a glyph's advance turns into the widths the recognizer steps by.
///
/// The bare width bounds the compare window, the trailing width moves the
/// cursor after a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WidthRule {
    pub bare_trim: i32,
    pub trailing_trim: i32,
    #[serde(default)]
    pub space: Option<SpaceWidth>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpaceWidth {
    pub bare: u32,
    pub trailing: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Restore the background under the rectangle.
    Background,
    /// Fill the rectangle with the text color.
    Ink,
}

/// Pixel correction applied after drawing `ch`. `x` is relative to the glyph
/// column, `y` is absolute within the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSpec {
    pub ch: char,
    pub op: PatchOp,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A letter whose glyph is indistinguishable from `digit`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlyphAlias {
    pub letter: char,
    pub digit: char,
}

/// Fixed-width digit strip: digit `i` sits at `(i * width, 0)` after scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitSheetSpec {
    pub sheet: String,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub kind: String,
    pub texture: String,
    #[serde(default = "default_scale")]
    pub texture_scale: u32,
    /// Where the texture's origin sits in document coordinates. A field's
    /// background is cut from the texture at `rect - table_offset`.
    #[serde(default)]
    pub table_offset: [u32; 2],
    pub size: [u32; 2],
    /// Field whose pixels identify this document kind.
    pub label: String,
    pub fields: BTreeMap<String, Rect>,
    #[serde(default)]
    pub reads: BTreeMap<String, ReadSpec>,
    #[serde(default)]
    pub seals: Option<String>,
    #[serde(default)]
    pub seal_field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadSpec {
    Text(TextRead),
    Date(DateRead),
    Number(NumberRead),
    Digits(DigitsRead),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRead {
    pub font: String,
    pub color: [u8; 3],
    pub charset: String,
    #[serde(default)]
    pub stop_suffix: Option<String>,
    #[serde(default)]
    pub align_fix: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRead {
    pub font: String,
    pub color: [u8; 3],
    #[serde(default)]
    pub stop_suffix: Option<String>,
}

/// Text read whose result is an integer followed by an optional unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberRead {
    pub font: String,
    pub color: [u8; 3],
    pub charset: String,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigitsRead {
    /// When set, the field is first reduced to a silhouette in this color.
    #[serde(default)]
    pub ink: Option<[u8; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealSetSpec {
    pub id: String,
    pub images: Vec<String>,
}

fn default_scale() -> u32 {
    1
}

impl ReadSpec {
    pub fn font(&self) -> Option<&str> {
        match self {
            ReadSpec::Text(r) => Some(&r.font),
            ReadSpec::Date(r) => Some(&r.font),
            ReadSpec::Number(r) => Some(&r.font),
            ReadSpec::Digits(_) => None,
        }
    }

    pub fn charset(&self) -> Option<&str> {
        match self {
            ReadSpec::Text(r) => Some(&r.charset),
            ReadSpec::Number(r) => Some(&r.charset),
            ReadSpec::Date(_) | ReadSpec::Digits(_) => None,
        }
    }
}

impl Manifest {
    /// Load and validate `manifest.json` from the data directory.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest = Self::from_json(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;

        tracing::info!(
            "Loaded manifest: {} font(s), {} document(s), {} seal set(s)",
            manifest.fonts.len(),
            manifest.documents.len(),
            manifest.seals.len()
        );
        Ok(manifest)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(content).context("Failed to parse manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Cross-check references between sections.
    pub fn validate(&self) -> Result<()> {
        let mut font_ids = HashSet::new();
        for font in &self.fonts {
            if !font_ids.insert(font.id.as_str()) {
                bail!("duplicate font id {:?}", font.id);
            }
            if font.scale == 0 {
                bail!("font {:?} has zero scale", font.id);
            }
        }

        let seal_ids: HashSet<&str> = self.seals.iter().map(|s| s.id.as_str()).collect();
        let mut kinds = HashSet::new();

        for doc in &self.documents {
            if !kinds.insert(doc.kind.as_str()) {
                bail!("duplicate document kind {:?}", doc.kind);
            }
            if !doc.fields.contains_key(&doc.label) {
                bail!("{}: label field {:?} is not declared", doc.kind, doc.label);
            }
            for (field, read) in &doc.reads {
                if !doc.fields.contains_key(field) {
                    bail!("{}: read for undeclared field {:?}", doc.kind, field);
                }
                if let Some(font) = read.font() {
                    if !font_ids.contains(font) {
                        bail!("{}.{}: unknown font {:?}", doc.kind, field, font);
                    }
                }
                if let Some(charset) = read.charset() {
                    if charsets::resolve(charset).is_none() {
                        bail!("{}.{}: unknown charset {:?}", doc.kind, field, charset);
                    }
                }
                if matches!(read, ReadSpec::Digits(_)) && self.digits.is_none() {
                    bail!("{}.{}: digit read without a digit sheet", doc.kind, field);
                }
            }
            match (&doc.seals, &doc.seal_field) {
                (Some(set), Some(field)) => {
                    if !seal_ids.contains(set.as_str()) {
                        bail!("{}: unknown seal set {:?}", doc.kind, set);
                    }
                    if !doc.fields.contains_key(field) {
                        bail!("{}: seal field {:?} is not declared", doc.kind, field);
                    }
                }
                (None, None) => {}
                _ => bail!("{}: seals and seal_field must be set together", doc.kind),
            }
        }

        Ok(())
    }

    pub fn document(&self, kind: &str) -> Option<&DocumentSpec> {
        self.documents.iter().find(|d| d.kind == kind)
    }
}
