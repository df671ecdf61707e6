use poem_openapi::{
    ApiResponse, Object,
    payload::{Attachment, Json},
};
use serde::{Deserialize, Serialize};

use crate::core::spec::{
    DEFAULT_BACKGROUND, DEFAULT_FONT_FAMILY, DEFAULT_FOREGROUND, MAX_PIXELS, RawInputs,
};

use super::common::{InternalServerErrorResponse, NotFoundResponse};

/// Raw form fields. Every value is optional and untrusted; the engine clamps
/// or defaults whatever is missing or malformed.
#[derive(Object, Deserialize, Clone, Default)]
pub struct RenderForm {
    /// Width in pixels (1-4000, default 150)
    pub width: Option<String>,

    /// Height in pixels (1-4000, default 150)
    pub height: Option<String>,

    /// Background color, `#rgb` or `#rrggbb`
    pub background: Option<String>,

    /// Text color, `#rgb` or `#rrggbb`
    pub foreground: Option<String>,

    /// Label; `{w}` and `{h}` are replaced by the final size.
    /// Empty means `{w} × {h}`.
    pub label: Option<String>,

    /// CSS-like font family list
    pub font_family: Option<String>,

    /// Corner radius in pixels (0-400)
    pub radius: Option<String>,

    /// Derive the font size from the image size. Default: true
    pub auto_font: Option<bool>,

    /// Fixed font size in pixels (6-512), used when `auto_font` is false
    pub font_size: Option<String>,

    /// Output format (png, svg)
    pub format: Option<String>,

    /// Return base64 encoded string instead of binary
    pub return_base64: Option<bool>,
}

impl From<RenderForm> for RawInputs {
    fn from(form: RenderForm) -> Self {
        Self {
            width: form.width.unwrap_or_default(),
            height: form.height.unwrap_or_default(),
            background: form
                .background
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            foreground: form
                .foreground
                .unwrap_or_else(|| DEFAULT_FOREGROUND.to_string()),
            label: form.label.unwrap_or_default(),
            font_family: form
                .font_family
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            radius: form.radius.unwrap_or_default(),
            auto_font: form.auto_font.unwrap_or(true),
            font_size: form.font_size.unwrap_or_default(),
            format: form.format.unwrap_or_default(),
        }
    }
}

#[derive(Object, Serialize)]
pub struct Base64Response {
    /// Base64 encoded image data
    pub data: String,

    /// MIME type of the image
    pub mime_type: String,

    /// Ready to embed `data:` URI
    pub data_uri: String,

    /// Suggested download name
    pub filename: String,

    pub meta: String,
}

#[derive(Object, Serialize)]
pub struct TooLargeResponse {
    pub message: String,
    pub width: u32,
    pub height: u32,
    pub max_pixels: u64,
}

impl TooLargeResponse {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            message: format!(
                "image too large: {}x{} exceeds {} pixels, reduce the size",
                width, height, MAX_PIXELS
            ),
            width,
            height,
            max_pixels: MAX_PIXELS,
        }
    }
}

#[derive(Object, Serialize)]
pub struct ShareResponse {
    /// Full shareable URL
    pub url: String,

    /// Canonical query string
    pub query: String,

    pub filename: String,

    pub meta: String,
}

#[derive(Object, Serialize)]
pub struct PreviewResponse {
    /// Path of the live preview object; the previous one for this slot is gone
    pub object_url: String,

    pub filename: String,

    pub meta: String,

    pub query: String,
}

#[derive(Object, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub live_objects: u64,
    pub previews: u64,
    pub fonts: u64,
}

#[derive(ApiResponse)]
pub enum RenderResponse {
    #[oai(status = 200, content_type = "image/png")]
    Png(Attachment<Vec<u8>>),

    #[oai(status = 200, content_type = "image/svg+xml")]
    Svg(Attachment<Vec<u8>>),

    #[oai(status = 200, content_type = "application/json")]
    Base64(Json<Base64Response>),

    #[oai(status = 413)]
    TooLarge(Json<TooLargeResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[derive(ApiResponse)]
pub enum PreviewResult {
    #[oai(status = 200)]
    Ok(Json<PreviewResponse>),

    #[oai(status = 413)]
    TooLarge(Json<TooLargeResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[derive(ApiResponse)]
pub enum ObjectResponse {
    #[oai(status = 200, content_type = "image/png")]
    Png(Attachment<Vec<u8>>),

    #[oai(status = 200, content_type = "image/svg+xml")]
    Svg(Attachment<Vec<u8>>),

    #[oai(status = 404)]
    NotFound(Json<NotFoundResponse>),
}

#[derive(ApiResponse)]
pub enum DeletePreviewResponse {
    #[oai(status = 204)]
    Deleted,

    #[oai(status = 404)]
    NotFound(Json<NotFoundResponse>),
}
