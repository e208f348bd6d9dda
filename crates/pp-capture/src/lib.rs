use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use xcap::Window;

/// Pixel rectangle in some local coordinate space.
///
/// `right` and `bottom` are exclusive, so `width() == right - left`.
/// Serialized as `[left, top, right, bottom]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle of the given size anchored at `(x, y)`. `None` if an edge
    /// would overflow `u32`.
    pub fn from_origin(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        Some(Self::new(x, y, x.checked_add(width)?, y.checked_add(height)?))
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True if the rectangle is well formed and lies inside a `width`x`height` area.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left <= self.right
            && self.top <= self.bottom
            && self.right <= width
            && self.bottom <= height
    }

    /// Express this rectangle relative to `origin`. `None` if it starts before the origin.
    pub fn relative_to(&self, origin: (u32, u32)) -> Option<Self> {
        Some(Self::new(
            self.left.checked_sub(origin.0)?,
            self.top.checked_sub(origin.1)?,
            self.right.checked_sub(origin.0)?,
            self.bottom.checked_sub(origin.1)?,
        ))
    }
}

impl From<[u32; 4]> for Rect {
    fn from(b: [u32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<Rect> for [u32; 4] {
    fn from(r: Rect) -> Self {
        [r.left, r.top, r.right, r.bottom]
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("region {rect:?} exceeds {width}x{height} image")]
    OutOfRange { rect: Rect, width: u32, height: u32 },

    #[error("no window matching {0:?}")]
    WindowNotFound(Vec<String>),

    #[error("window capture failed: {0}")]
    Capture(String),
}

/// Crop `rect` out of `frame`.
///
/// Rectangles that reach past the frame are rejected, not clamped.
pub fn crop_region(frame: &RgbImage, rect: &Rect) -> Result<RgbImage, CaptureError> {
    let (w, h) = frame.dimensions();
    if !rect.fits_within(w, h) {
        return Err(CaptureError::OutOfRange {
            rect: *rect,
            width: w,
            height: h,
        });
    }

    Ok(image::imageops::crop_imm(frame, rect.left, rect.top, rect.width(), rect.height()).to_image())
}

/// Default titles the game window is known under.
pub const GAME_WINDOW_TITLES: &[&str] = &["Papers Please", "PapersPlease"];

/// Find the game window by case-insensitive substring match on its title.
pub fn find_game_window(titles: &[String]) -> Option<Window> {
    let windows = match Window::all() {
        Ok(w) => w,
        Err(e) => {
            warn!("Failed to enumerate windows: {}", e);
            return None;
        }
    };

    let wanted: Vec<String> = titles.iter().map(|t| t.to_lowercase()).collect();

    for window in windows {
        let title = match window.title() {
            Ok(t) => t.to_lowercase(),
            Err(_) => continue,
        };
        if wanted.iter().any(|t| title.contains(t.as_str())) {
            debug!("Found game window: {}", title);
            return Some(window);
        }
    }
    None
}

/// Crop a `size` region anchored at `origin` out of `frame`.
pub fn crop_at(frame: &RgbImage, origin: (u32, u32), size: (u32, u32)) -> Result<RgbImage, CaptureError> {
    let (x, y) = origin;
    let (w, h) = size;
    let rect = Rect::from_origin(x, y, w, h).ok_or(CaptureError::OutOfRange {
        rect: Rect::new(x, y, x.saturating_add(w), y.saturating_add(h)),
        width: frame.width(),
        height: frame.height(),
    })?;
    crop_region(frame, &rect)
}

/// Capture the game window as an RGB screenshot.
pub fn capture_game_window(titles: &[String]) -> Result<RgbImage, CaptureError> {
    let window =
        find_game_window(titles).ok_or_else(|| CaptureError::WindowNotFound(titles.to_vec()))?;
    let img = window
        .capture_image()
        .map_err(|e| CaptureError::Capture(e.to_string()))?;
    debug!("Captured {}x{} frame", img.width(), img.height());
    Ok(DynamicImage::ImageRgba8(img).to_rgb8())
}
