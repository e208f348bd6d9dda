use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use pp_capture::crop_at;
use pp_state::{FieldOutcome, RecognizedValue, ScanReport};
use pp_vision::{
    inspect_seal, read_field, DocumentLayout, FieldModel, ReadSettings, Registry, SealCheck,
};
use tracing::{debug, info, warn};

use crate::config::TasConfig;

/// Manages the screenshot → document → fields flow.
pub struct Pipeline {
    registry: Registry,
    settings: ReadSettings,
    window_titles: Vec<String>,
}

impl Pipeline {
    pub fn new(registry: Registry, settings: ReadSettings) -> Self {
        Self {
            registry,
            settings,
            window_titles: pp_capture::GAME_WINDOW_TITLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }

    /// Load the registry from the configured data directory.
    pub fn from_config(config: &TasConfig) -> Result<Self> {
        let registry = Registry::load(&config.data_dir)
            .with_context(|| format!("Failed to load assets from {}", config.data_dir.display()))?;
        let mut pipeline = Self::new(registry, config.recognition.read_settings());
        pipeline.window_titles = config.capture.window_titles.clone();
        Ok(pipeline)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Layout whose label matches `document`, if any.
    pub fn identify(&self, document: &RgbImage) -> Option<&DocumentLayout> {
        self.registry.identify(document)
    }

    /// Wrap a document crop for reading, identifying it unless `variant` is given.
    pub fn open(&self, document: RgbImage, variant: Option<&str>) -> Result<ScannedDocument<'_>> {
        let layout = match variant {
            Some(v) => self
                .registry
                .layout(v)
                .ok_or_else(|| anyhow!("unknown document variant {v:?}"))?,
            None => self
                .identify(&document)
                .ok_or_else(|| anyhow!("document matches no known layout"))?,
        };
        debug!("Opened {} ({}x{})", layout.variant(), document.width(), document.height());
        Ok(ScannedDocument {
            registry: &self.registry,
            model: FieldModel::new(layout, document),
            settings: self.settings,
        })
    }

    /// Find the document whose top-left corner sits at `origin` in
    /// `screenshot` and read it.
    pub fn scan_image(&self, screenshot: &RgbImage, origin: (u32, u32), variant: Option<&str>) -> Result<ScanReport> {
        let crop_layout = |layout: &DocumentLayout| crop_at(screenshot, origin, layout.size());

        let (layout, document) = match variant {
            Some(v) => {
                let layout = self
                    .registry
                    .layout(v)
                    .ok_or_else(|| anyhow!("unknown document variant {v:?}"))?;
                (layout, crop_layout(layout)?)
            }
            None => self
                .registry
                .layouts()
                .iter()
                .find_map(|layout| {
                    let document = crop_layout(layout).ok()?;
                    layout.matches(&document).then_some((layout, document))
                })
                .ok_or_else(|| anyhow!("no document found at {origin:?}"))?,
        };

        info!("Scanning {} at {:?}", layout.variant(), origin);
        let scanned = self.open(document, Some(layout.variant()))?;
        Ok(scanned.read_all())
    }

    /// Capture the game window.
    pub fn capture(&self) -> Result<RgbImage> {
        Ok(pp_capture::capture_game_window(&self.window_titles)?)
    }
}

/// One document being read; field values are computed once and reused.
pub struct ScannedDocument<'a> {
    registry: &'a Registry,
    model: FieldModel<'a>,
    settings: ReadSettings,
}

impl ScannedDocument<'_> {
    pub fn variant(&self) -> &str {
        self.model.layout().variant()
    }

    pub fn read(&self, field: &str) -> pp_vision::Result<RecognizedValue> {
        read_field(self.registry, &self.model, field, self.settings)
    }

    pub fn seal(&self) -> pp_vision::Result<Option<SealCheck>> {
        inspect_seal(self.registry, &self.model)
    }

    /// Read every field the layout describes. Failures are recorded per
    /// field, so the report is always complete.
    pub fn read_all(&self) -> ScanReport {
        let mut report = ScanReport::new(self.variant());

        for (field, _) in self.model.layout().reads() {
            let outcome = match self.read(field) {
                Ok(v) => FieldOutcome::Ok(v),
                Err(e) => {
                    warn!("{}.{}: {}", self.variant(), field, e);
                    FieldOutcome::Err(e.to_string())
                }
            };
            report.fields.insert(field.to_string(), outcome);
        }

        match self.seal() {
            Ok(Some(check)) => {
                report.forged = Some(check.forged);
                report.seal_position = check.position;
            }
            Ok(None) if report.kind.is_some_and(|k| k.is_sealed()) => {
                warn!("{}: sealed document has no seal area", self.variant());
            }
            Ok(None) => {}
            Err(e) => warn!("{}: seal check failed: {}", self.variant(), e),
        }
        report
    }
}
