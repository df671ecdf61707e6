use serde::{Deserialize, Serialize};

use crate::core::error::RenderError;

pub const MIN_DIMENSION: i64 = 1;
pub const MAX_DIMENSION: i64 = 4000;
pub const MIN_RADIUS: i64 = 0;
pub const MAX_RADIUS: i64 = 400;
pub const MIN_FONT_PX: i64 = 6;
pub const MAX_FONT_PX: i64 = 512;

/// Upper bound on `width * height` accepted by the renderer.
pub const MAX_PIXELS: u64 = 16_000_000;

pub const DEFAULT_DIMENSION: i64 = 150;
pub const DEFAULT_RADIUS: i64 = 0;
pub const DEFAULT_FONT_PX: i64 = 24;
pub const DEFAULT_BACKGROUND: &str = "#d1d5db";
pub const DEFAULT_FOREGROUND: &str = "#6b7280";
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Label used when the caller leaves the text empty.
pub const TEXT_PLACEHOLDER: &str = "{w} × {h}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Png,
    Svg,
}

impl Format {
    /// Case-insensitive; anything unrecognised falls back to PNG.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("svg") {
            Format::Svg
        } else {
            Format::Png
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Svg => "svg",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Png => "image/png",
            Format::Svg => "image/svg+xml",
        }
    }
}

/// Untrusted form fields, exactly as a UI or a decoded query string hands
/// them over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInputs {
    pub width: String,
    pub height: String,
    pub background: String,
    pub foreground: String,
    pub label: String,
    pub font_family: String,
    pub radius: String,
    pub auto_font: bool,
    pub font_size: String,
    pub format: String,
}

impl Default for RawInputs {
    fn default() -> Self {
        Self {
            width: String::new(),
            height: String::new(),
            background: DEFAULT_BACKGROUND.to_string(),
            foreground: DEFAULT_FOREGROUND.to_string(),
            label: String::new(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            radius: String::new(),
            auto_font: true,
            font_size: String::new(),
            format: String::new(),
        }
    }
}

/// Canonical, fully clamped description of one placeholder image.
///
/// Only [`normalize`] builds these, so every field is already in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderSpec {
    width: u32,
    height: u32,
    background: String,
    foreground: String,
    text: String,
    font_family: String,
    corner_radius: u32,
    auto_font: bool,
    font_size_px: u32,
    format: Format,
}

impl RenderSpec {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn foreground(&self) -> &str {
        &self.foreground
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn corner_radius(&self) -> u32 {
        self.corner_radius
    }

    pub fn auto_font(&self) -> bool {
        self.auto_font
    }

    /// The fixed font size. Meaningless while `auto_font` is set.
    pub fn font_size_px(&self) -> u32 {
        self.font_size_px
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Guard applied before any drawing surface is created.
    pub fn check_size(&self) -> Result<(), RenderError> {
        check_pixels(self.width, self.height)
    }

    /// Suggested download name, e.g. `placeholder-300x150.png`.
    pub fn filename(&self) -> String {
        format!(
            "placeholder-{}x{}.{}",
            self.width,
            self.height,
            self.format.extension()
        )
    }

    /// Human readable one-liner, e.g. `300 × 150 PNG / bg #d1d5db fg #6b7280`.
    pub fn summary(&self) -> String {
        format!(
            "{} × {} {} / bg {} fg {}",
            self.width,
            self.height,
            self.format.as_str().to_uppercase(),
            self.background,
            self.foreground
        )
    }
}

/// Rejects canvases whose area exceeds [`MAX_PIXELS`].
pub fn check_pixels(width: u32, height: u32) -> Result<(), RenderError> {
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(RenderError::ImageTooLarge { width, height });
    }
    Ok(())
}

/// Turns raw input into a [`RenderSpec`]. Total: malformed fields degrade to
/// defaults or get clamped, nothing is ever rejected.
pub fn normalize(raw: &RawInputs) -> RenderSpec {
    let width = dimension(&raw.width);
    let height = dimension(&raw.height);
    let corner_radius = parse_int(&raw.radius)
        .unwrap_or(DEFAULT_RADIUS)
        .clamp(MIN_RADIUS, MAX_RADIUS) as u32;
    let font_size_px = if raw.auto_font {
        DEFAULT_FONT_PX as u32
    } else {
        parse_int(&raw.font_size)
            .unwrap_or(DEFAULT_FONT_PX)
            .clamp(MIN_FONT_PX, MAX_FONT_PX) as u32
    };

    let label = raw.label.trim();
    let template = if label.is_empty() { TEXT_PLACEHOLDER } else { label };
    let text = template
        .replace("{w}", &width.to_string())
        .replace("{h}", &height.to_string());

    let font_family = match raw.font_family.trim() {
        "" => DEFAULT_FONT_FAMILY.to_string(),
        family => family.to_string(),
    };

    RenderSpec {
        width,
        height,
        background: color(&raw.background, DEFAULT_BACKGROUND),
        foreground: color(&raw.foreground, DEFAULT_FOREGROUND),
        text,
        font_family,
        corner_radius,
        auto_font: raw.auto_font,
        font_size_px,
        format: Format::parse(&raw.format),
    }
}

// A zero dimension is treated the same as a missing one.
fn dimension(raw: &str) -> u32 {
    let value = match parse_int(raw) {
        Some(0) | None => DEFAULT_DIMENSION,
        Some(n) => n,
    };
    value.clamp(MIN_DIMENSION, MAX_DIMENSION) as u32
}

fn color(raw: &str, fallback: &str) -> String {
    if raw.trim().is_empty() {
        normalize_hex(fallback)
    } else {
        normalize_hex(raw)
    }
}

/// Normalizes a color to `#rrggbb`, lowercase.
///
/// Non-hex characters are dropped, a 3-digit shorthand is expanded, longer
/// input is truncated and shorter input is right-padded with `0`.
pub fn normalize_hex(raw: &str) -> String {
    let body = raw.strip_prefix('#').unwrap_or(raw);
    let digits: Vec<char> = body
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let mut hex: String = if digits.len() == 3 {
        digits.iter().flat_map(|&c| [c, c]).collect()
    } else {
        digits.into_iter().take(6).collect()
    };
    while hex.len() < 6 {
        hex.push('0');
    }

    format!("#{}", hex)
}

/// Base-10 prefix parse: optional leading whitespace and sign, then digits up
/// to the first non-digit. `"12px"` is 12, `"px"` is `None`. Saturates instead
/// of overflowing.
pub fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}
