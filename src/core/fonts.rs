use std::path::Path;

use fontdb::{Database, Family, ID, Query, Stretch, Style, Weight};
use tiny_skia::PathBuilder;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// A laid out single line of glyphs, in pixels, with the pen starting at
/// `x = 0` on a baseline at `y = 0` (y grows downwards).
pub struct GlyphRun {
    pub path: Option<tiny_skia::Path>,
    pub advance: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl GlyphRun {
    /// Baseline offset that puts the middle of the em box on `y = 0`.
    pub fn middle_baseline(&self) -> f64 {
        (self.ascent + self.descent) / 2.0
    }
}

/// Font lookup and measurement for the raster renderer.
///
/// An empty book measures everything as zero width and produces no glyphs.
pub struct FontBook {
    db: Database,
}

impl FontBook {
    pub fn empty() -> Self {
        Self { db: Database::new() }
    }

    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::info!("loaded {} system font faces", db.len());
        let mut book = Self { db };
        book.assign_generic_families();
        book
    }

    pub fn load_dir(&mut self, dir: impl AsRef<Path>) {
        let before = self.db.len();
        self.db.load_fonts_dir(dir.as_ref());
        tracing::info!(
            "loaded {} font faces from {}",
            self.db.len() - before,
            dir.as_ref().display()
        );
        self.assign_generic_families();
    }

    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
        self.assign_generic_families();
    }

    /// Points the generic families at installed faces. fontdb defaults them
    /// to Arial, Times New Roman and Courier New, which most Linux hosts do
    /// not have.
    fn assign_generic_families(&mut self) {
        let families: Vec<String> = self
            .db
            .faces()
            .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .collect();

        let installed = |name: &str| families.iter().any(|family| family == name);
        // Shortest name wins, so "DejaVu Sans" beats "DejaVu Sans Condensed".
        let pick = |keep: &dyn Fn(&str) -> bool| {
            families
                .iter()
                .filter(|family| keep(family.as_str()))
                .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
                .cloned()
        };

        if !installed(self.db.family_name(&Family::SansSerif)) {
            if let Some(name) = pick(&|f: &str| f.contains("Sans") && !f.contains("Mono")) {
                tracing::debug!("sans-serif resolves to {}", name);
                self.db.set_sans_serif_family(name);
            }
        }
        if !installed(self.db.family_name(&Family::Serif)) {
            if let Some(name) = pick(&|f: &str| f.contains("Serif") && !f.contains("Sans")) {
                tracing::debug!("serif resolves to {}", name);
                self.db.set_serif_family(name);
            }
        }
        if !installed(self.db.family_name(&Family::Monospace)) {
            if let Some(name) = pick(&|f: &str| f.contains("Mono")) {
                tracing::debug!("monospace resolves to {}", name);
                self.db.set_monospace_family(name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Resolves a CSS-like `font-family` list. Falls back to the generic
    /// sans-serif face, then to whatever face comes first.
    fn resolve(&self, family_list: &str) -> Option<ID> {
        let mut families: Vec<Family<'_>> = family_list
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|name| !name.is_empty())
            .map(generic_family)
            .collect();
        families.push(Family::SansSerif);

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };

        self.db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))
    }

    /// Natural advance width of `text` at `size` pixels.
    pub fn measure(&self, family_list: &str, text: &str, size: f64) -> f64 {
        let Some(id) = self.resolve(family_list) else {
            return 0.0;
        };
        self.db
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                let scale = size / f64::from(face.units_per_em());
                Some(advance_units(&face, text) * scale)
            })
            .flatten()
            .unwrap_or(0.0)
    }

    pub fn glyph_run(&self, family_list: &str, text: &str, size: f64) -> Option<GlyphRun> {
        let id = self.resolve(family_list)?;
        self.db
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                Some(build_run(&face, text, size))
            })
            .flatten()
    }
}

fn generic_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" | "system-ui" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

fn glyph_for(face: &Face<'_>, c: char) -> GlyphId {
    face.glyph_index(c).unwrap_or(GlyphId(0))
}

fn advance_units(face: &Face<'_>, text: &str) -> f64 {
    text.chars()
        .map(|c| f64::from(face.glyph_hor_advance(glyph_for(face, c)).unwrap_or(0)))
        .sum()
}

fn build_run(face: &Face<'_>, text: &str, size: f64) -> GlyphRun {
    let scale = (size / f64::from(face.units_per_em())) as f32;
    let mut outline = GlyphOutline {
        builder: PathBuilder::new(),
        scale,
        x: 0.0,
    };

    let mut pen = 0.0f32;
    for c in text.chars() {
        let glyph = glyph_for(face, c);
        outline.x = pen;
        let _ = face.outline_glyph(glyph, &mut outline);
        pen += f32::from(face.glyph_hor_advance(glyph).unwrap_or(0)) * scale;
    }

    GlyphRun {
        path: outline.builder.finish(),
        advance: f64::from(pen),
        ascent: f64::from(face.ascender()) * f64::from(scale),
        descent: f64::from(face.descender()) * f64::from(scale),
    }
}

struct GlyphOutline {
    builder: PathBuilder,
    scale: f32,
    x: f32,
}

impl GlyphOutline {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, -y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// DejaVu Sans, Serif and Sans Mono, shipped with the test suite.
    pub(crate) fn fixture_book() -> FontBook {
        let mut book = FontBook::empty();
        book.load_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts"));
        assert!(!book.is_empty(), "font fixtures are missing");
        book
    }

    fn resolved_family(book: &FontBook, family_list: &str) -> String {
        let id = book.resolve(family_list).unwrap();
        book.db.face(id).unwrap().families[0].0.clone()
    }

    #[test]
    fn empty_book_measures_nothing() {
        let book = FontBook::empty();
        assert!(book.is_empty());
        assert_eq!(book.measure("sans-serif", "300 × 150", 30.0), 0.0);
        assert!(book.glyph_run("sans-serif", "300 × 150", 30.0).is_none());
    }

    #[test]
    fn garbage_font_data_is_ignored() {
        let mut book = FontBook::empty();
        book.load_font_data(vec![0u8; 64]);
        assert_eq!(book.measure("Nope, serif", "abc", 24.0), 0.0);
    }

    #[test]
    fn measurement_scales_with_size() {
        let book = fixture_book();
        let small = book.measure("sans-serif", "placeholder", 10.0);
        let large = book.measure("sans-serif", "placeholder", 20.0);
        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-6);
    }

    #[test]
    fn generic_families_map_to_installed_faces() {
        let book = fixture_book();
        assert_eq!(resolved_family(&book, "sans-serif"), "DejaVu Sans");
        assert_eq!(resolved_family(&book, "serif"), "DejaVu Serif");
        assert_eq!(resolved_family(&book, "monospace"), "DejaVu Sans Mono");
        assert_ne!(book.resolve("sans-serif"), book.resolve("serif"));
    }

    #[test]
    fn unknown_family_falls_back_to_sans_serif() {
        let book = fixture_book();
        assert_eq!(resolved_family(&book, "Nope, \"Also Nope\""), "DejaVu Sans");
        assert_eq!(resolved_family(&book, "Nope, serif"), "DejaVu Serif");
    }

    #[test]
    fn glyph_run_has_ink_and_metrics() {
        let book = fixture_book();
        let run = book.glyph_run("sans-serif", "Hg", 40.0).unwrap();
        assert!(run.path.is_some());
        assert!(run.advance > 0.0);
        assert!(run.ascent > 0.0 && run.descent < 0.0);
        assert!((run.advance - book.measure("sans-serif", "Hg", 40.0)).abs() < 1e-3);
    }

    #[test]
    fn generic_names_are_case_insensitive() {
        assert!(matches!(generic_family("Serif"), Family::Serif));
        assert!(matches!(generic_family("MONOSPACE"), Family::Monospace));
        assert!(matches!(generic_family("Inter"), Family::Name("Inter")));
    }
}
