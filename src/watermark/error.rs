//! Watermark error types.
//!
//! Descriptor errors are raised while building a [`WatermarkDescriptor`]
//! (malformed requests); compositor errors are raised while drawing.
//!
//! [`WatermarkDescriptor`]: super::WatermarkDescriptor

use thiserror::Error;

/// Errors raised when a watermark descriptor is rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    /// Text and tiled-text watermarks need something to draw.
    #[error("text watermark requires non-empty text")]
    EmptyText,

    /// Image watermarks need a decoded bitmap.
    #[error("image watermark requires an image source")]
    MissingImage,

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Failed to load the watermark image from disk.
    #[error("failed to load watermark image: {0}")]
    ImageLoad(String),
}

impl DescriptorError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the compositor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositorError {
    /// `kind = Image` without an image source.
    #[error("image watermark has no image source")]
    MissingImage,

    /// Failed to render the text sprite.
    #[error("failed to render text watermark: {0}")]
    Render(String),

    /// Failed to resize the image sprite.
    #[error("failed to resize image watermark: {0}")]
    Resize(String),
}
