use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use pp_data::{DocumentSpec, Manifest};
use tracing::{debug, info};

use crate::digits::DigitSheet;
use crate::error::VisionError;
use crate::field::{DocumentLayout, SealBinding};
use crate::font::BitmapFont;
use crate::seal::{to_silhouette, SealCatalog};

/// Fonts, digit bitmaps, layouts and seals, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    fonts: HashMap<String, BitmapFont>,
    digits: Option<DigitSheet>,
    layouts: Vec<DocumentLayout>,
    seals: SealCatalog,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load everything described by the data directory's manifest.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let manifest = Manifest::load(data_dir)?;
        Self::from_manifest(&manifest, data_dir)
    }

    pub fn from_manifest(manifest: &Manifest, data_dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        for spec in &manifest.fonts {
            let sheet = load_rgba(&data_dir.join(&spec.sheet))?;
            let font = BitmapFont::from_sheet(spec, &sheet)?;
            registry.insert_font(font);
        }

        if let Some(spec) = &manifest.digits {
            let strip = load_rgb(&data_dir.join(&spec.sheet))?;
            registry.digits = Some(DigitSheet::from_strip(&strip, spec.width, spec.height, spec.scale)?);
        }

        for set in &manifest.seals {
            let images = set
                .images
                .iter()
                .map(|p| load_rgb(&data_dir.join(p)).map(|img| to_silhouette(&img)))
                .collect::<Result<Vec<_>>>()?;
            debug!("Seal set {:?}: {} image(s)", set.id, images.len());
            registry.seals.insert(&set.id, images);
        }

        for doc in &manifest.documents {
            let layout =
                build_layout(doc, data_dir).with_context(|| format!("Failed to build layout {}", doc.kind))?;
            registry.layouts.push(layout);
        }

        info!(
            "Registry ready: {} font(s), {} layout(s), {} seal set(s), digits: {}",
            registry.fonts.len(),
            registry.layouts.len(),
            registry.seals.len(),
            registry.digits.is_some()
        );
        Ok(registry)
    }

    pub fn insert_font(&mut self, font: BitmapFont) {
        self.fonts.insert(font.id().to_string(), font);
    }

    pub fn insert_layout(&mut self, layout: DocumentLayout) {
        self.layouts.retain(|l| l.variant() != layout.variant());
        self.layouts.push(layout);
    }

    pub fn insert_seals(&mut self, id: impl Into<String>, seals: Vec<RgbImage>) {
        self.seals.insert(id, seals);
    }

    pub fn set_digits(&mut self, digits: DigitSheet) {
        self.digits = Some(digits);
    }

    pub fn font(&self, id: &str) -> crate::Result<&BitmapFont> {
        self.fonts
            .get(id)
            .ok_or_else(|| VisionError::UnknownFont(id.to_string()))
    }

    pub fn digits(&self) -> Option<&DigitSheet> {
        self.digits.as_ref()
    }

    pub fn layout(&self, variant: &str) -> Option<&DocumentLayout> {
        self.layouts.iter().find(|l| l.variant() == variant)
    }

    pub fn layouts(&self) -> &[DocumentLayout] {
        &self.layouts
    }

    pub fn seals(&self, id: &str) -> Option<&[RgbImage]> {
        self.seals.get(id)
    }

    /// First layout whose label matches the document.
    pub fn identify(&self, document: &RgbImage) -> Option<&DocumentLayout> {
        self.layouts.iter().find(|l| l.matches(document))
    }
}

fn build_layout(doc: &DocumentSpec, data_dir: &Path) -> Result<DocumentLayout> {
    let texture = upscale(load_rgb(&data_dir.join(&doc.texture))?, doc.texture_scale);
    let origin = (doc.table_offset[0], doc.table_offset[1]);

    let mut layout = DocumentLayout::new(&doc.kind, doc.size[0], doc.size[1], &doc.label);
    for (name, rect) in &doc.fields {
        layout.declare_field_from_texture(name, *rect, &texture, origin)?;
    }
    for (name, read) in &doc.reads {
        layout.set_read(name, read.clone())?;
    }
    if let (Some(set), Some(field)) = (&doc.seals, &doc.seal_field) {
        layout.set_seal(SealBinding {
            set: set.clone(),
            field: field.clone(),
        })?;
    }

    debug!("Layout {:?}: {} field(s)", doc.kind, doc.fields.len());
    Ok(layout)
}

fn upscale(image: RgbImage, scale: u32) -> RgbImage {
    if scale <= 1 {
        return image;
    }
    imageops::resize(&image, image.width() * scale, image.height() * scale, FilterType::Nearest)
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .to_rgb8())
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .to_rgba8())
}
