use pp_capture::Rect;
use thiserror::Error;

/// Hard failures of the recognition core.
///
/// Unreadable pixels are never an error: they come back as an empty or
/// partial string. These variants cover invalid parsed output and invalid
/// queries only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisionError {
    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("no seal found in the seal area")]
    SealNotFound,

    #[error("field {field:?} at {rect:?} lies outside the {width}x{height} area")]
    OutOfRangeField {
        field: String,
        rect: Rect,
        width: u32,
        height: u32,
    },

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("unknown document {0:?}")]
    UnknownDocument(String),

    #[error("unknown font {0:?}")]
    UnknownFont(String),

    #[error("unknown character set {0:?}")]
    UnknownCharset(String),

    #[error("no digit sheet loaded")]
    MissingDigitSheet,

    #[error("field {0:?} has no read spec")]
    NoReadSpec(String),

    #[error("unknown seal set {0:?}")]
    UnknownSealSet(String),

    #[error("image is {actual:?} but its reference is {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

pub type Result<T> = std::result::Result<T, VisionError>;

/// Fail with `SizeMismatch` unless both buffers have the same dimensions.
pub(crate) fn ensure_same_size(observed: &image::RgbImage, reference: &image::RgbImage) -> Result<()> {
    if observed.dimensions() != reference.dimensions() {
        return Err(VisionError::SizeMismatch {
            expected: reference.dimensions(),
            actual: observed.dimensions(),
        });
    }
    Ok(())
}
