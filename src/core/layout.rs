use crate::core::spec::RenderSpec;

/// Share of the short edge used as the font size in auto mode.
const AUTO_FONT_RATIO: f64 = 0.20;
const MIN_AUTO_FONT_PX: f64 = 6.0;
const MIN_PADDING: f64 = 8.0;
const PADDING_RATIO: f64 = 0.4;

/// Geometry and typography shared by the raster and vector renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub effective_radius: f64,
    pub effective_font_size: u32,
    pub padding: f64,
    pub max_width: f64,
    /// Uniform text scale about the canvas center. Never above 1.
    pub scale: f64,
}

impl Layout {
    /// `natural_width` is the advance width of `spec.text()` at the effective
    /// font size, in pixels.
    pub fn compute(spec: &RenderSpec, natural_width: f64) -> Self {
        let width = f64::from(spec.width());
        let height = f64::from(spec.height());
        let short_edge = width.min(height);

        let effective_radius = f64::from(spec.corner_radius()).clamp(0.0, short_edge / 2.0);
        let effective_font_size = effective_font_size(spec);

        let padding = MIN_PADDING.max(f64::from(effective_font_size) * PADDING_RATIO);
        let max_width = (width - padding * 2.0).max(0.0);

        let scale = if natural_width > max_width && natural_width > 0.0 {
            max_width / natural_width
        } else {
            1.0
        };

        Self {
            width,
            height,
            effective_radius,
            effective_font_size,
            padding,
            max_width,
            scale,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn is_scaled(&self) -> bool {
        self.scale < 1.0
    }
}

pub fn effective_font_size(spec: &RenderSpec) -> u32 {
    if spec.auto_font() {
        let short_edge = f64::from(spec.width().min(spec.height()));
        MIN_AUTO_FONT_PX.max((short_edge * AUTO_FONT_RATIO).round()) as u32
    } else {
        spec.font_size_px()
    }
}
