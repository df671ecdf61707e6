use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Transform};

use crate::core::clipboard::ClipboardPayload;
use crate::core::error::RenderError;
use crate::core::fonts::FontBook;
use crate::core::layout::{Layout, effective_font_size};
use crate::core::spec::{Format, RenderSpec};

/// Control point ratio for approximating a quarter circle with a cubic.
const KAPPA: f32 = 0.552_284_8;

/// Encoded output of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    format: Format,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl Rendered {
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// MIME type with charset where one applies.
    pub fn content_type(&self) -> &'static str {
        match self.format {
            Format::Png => "image/png",
            Format::Svg => "image/svg+xml;charset=UTF-8",
        }
    }

    pub fn base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type(), self.base64())
    }

    pub fn clipboard_payload(&self) -> ClipboardPayload {
        ClipboardPayload::new(self.mime_type(), self.bytes.clone())
    }
}

#[derive(Clone)]
pub struct RenderingEngine {
    fonts: Arc<FontBook>,
}

impl RenderingEngine {
    pub fn new() -> Self {
        Self::with_fonts(FontBook::system())
    }

    pub fn with_fonts(fonts: FontBook) -> Self {
        Self {
            fonts: Arc::new(fonts),
        }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Renders on the blocking pool; large PNGs take a while to encode.
    pub async fn render(&self, spec: RenderSpec) -> Result<Rendered, RenderError> {
        let engine = self.clone();

        tokio::task::spawn_blocking(move || engine.render_sync(&spec))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }

    pub fn render_sync(&self, spec: &RenderSpec) -> Result<Rendered, RenderError> {
        spec.check_size()?;

        let bytes = match spec.format() {
            Format::Png => self.render_png(spec)?,
            Format::Svg => render_svg(spec).into_bytes(),
        };

        tracing::debug!(
            "rendered {} ({} bytes)",
            spec.filename(),
            bytes.len()
        );

        Ok(Rendered {
            format: spec.format(),
            width: spec.width(),
            height: spec.height(),
            bytes,
        })
    }

    /// Natural width of the label at the effective font size.
    pub fn measure_text(&self, spec: &RenderSpec) -> f64 {
        let size = f64::from(effective_font_size(spec));
        self.fonts.measure(spec.font_family(), spec.text(), size)
    }

    pub fn layout(&self, spec: &RenderSpec) -> Layout {
        Layout::compute(spec, self.measure_text(spec))
    }

    pub fn render_png(&self, spec: &RenderSpec) -> Result<Vec<u8>, RenderError> {
        let pixmap = self.draw(spec)?;
        pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    /// Paints the placeholder onto a fresh surface of exactly
    /// `width x height` pixels.
    pub fn draw(&self, spec: &RenderSpec) -> Result<Pixmap, RenderError> {
        spec.check_size()?;

        let (width, height) = (spec.width(), spec.height());
        let layout = self.layout(spec);
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;

        if let Some(background) = rounded_rect(&layout) {
            pixmap.fill_path(
                &background,
                &solid(spec.background()),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }

        if layout.scale <= 0.0 {
            return Ok(pixmap);
        }

        let size = f64::from(layout.effective_font_size);
        let Some(run) = self.fonts.glyph_run(spec.font_family(), spec.text(), size) else {
            return Ok(pixmap);
        };
        let Some(glyphs) = run.path.as_ref() else {
            return Ok(pixmap);
        };

        if layout.is_scaled() {
            tracing::debug!(
                "label overflows {}px, scaling by {:.3}",
                layout.max_width,
                layout.scale
            );
        }

        let (cx, cy) = layout.center();
        let scale = layout.scale as f32;
        let transform = Transform::from_translate(cx as f32, cy as f32)
            .pre_scale(scale, scale)
            .pre_translate((-run.advance / 2.0) as f32, run.middle_baseline() as f32);

        pixmap.fill_path(
            glyphs,
            &solid(spec.foreground()),
            FillRule::Winding,
            transform,
            None,
        );

        Ok(pixmap)
    }
}

impl Default for RenderingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Vector rendition. The label is set at the effective font size and is never
/// shrunk to fit, unlike the raster path.
pub fn render_svg(spec: &RenderSpec) -> String {
    let layout = Layout::compute(spec, 0.0);
    let (cx, cy) = layout.center();
    let (w, h) = (spec.width(), spec.height());

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <rect x="0" y="0" width="{w}" height="{h}" rx="{rx}" fill="{bg}"/>
  <g font-family="{family}" font-size="{size}" fill="{fg}">
    <text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="middle">{text}</text>
  </g>
</svg>"#,
        rx = layout.effective_radius,
        bg = spec.background(),
        family = escape_attr(spec.font_family()),
        size = layout.effective_font_size,
        fg = spec.foreground(),
        text = escape_text(spec.text()),
    )
}

pub fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// Attribute values are double-quoted, so the quote has to go too.
fn escape_attr(input: &str) -> String {
    escape_text(input).replace('"', "&quot;")
}

fn solid(hex: &str) -> Paint<'static> {
    let (r, g, b) = rgb(hex);
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = true;
    paint
}

/// `#rrggbb` to components. Input is always normalized, so bad digits read
/// as zero.
fn rgb(hex: &str) -> (u8, u8, u8) {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0)
    };
    (channel(0), channel(2), channel(4))
}

fn rounded_rect(layout: &Layout) -> Option<Path> {
    let (w, h) = (layout.width as f32, layout.height as f32);
    let r = layout.effective_radius as f32;
    if r <= 0.0 {
        return Rect::from_xywh(0.0, 0.0, w, h).map(PathBuilder::from_rect);
    }

    let k = r * KAPPA;
    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(w - r, 0.0);
    pb.cubic_to(w - r + k, 0.0, w, r - k, w, r);
    pb.line_to(w, h - r);
    pb.cubic_to(w, h - r + k, w - r + k, h, w - r, h);
    pb.line_to(r, h);
    pb.cubic_to(r - k, h, 0.0, h - r + k, 0.0, h - r);
    pb.line_to(0.0, r);
    pb.cubic_to(0.0, r - k, r - k, 0.0, r, 0.0);
    pb.close();
    pb.finish()
}
