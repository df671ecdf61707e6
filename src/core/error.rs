use thiserror::Error;

use crate::core::spec::MAX_PIXELS;

/// Conditions that abort a render attempt. Malformed input never shows up
/// here; the normalizer absorbs it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("image too large: {width}x{height} exceeds {max} pixels", max = MAX_PIXELS)]
    ImageTooLarge { width: u32, height: u32 },

    #[error("failed to allocate {width}x{height} drawing surface")]
    Surface { width: u32, height: u32 },

    #[error("failed to encode output: {0}")]
    Encode(String),

    #[error("render task failed: {0}")]
    Task(String),
}

/// Output-channel failures. None of these touch the current preview state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard does not support {0}")]
    Unsupported(String),

    #[error("clipboard write rejected: {0}")]
    Rejected(String),

    #[error("another clipboard write is still in progress")]
    Busy,

    #[error("nothing has been rendered yet")]
    Empty,
}
