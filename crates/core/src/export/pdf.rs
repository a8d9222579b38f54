use crate::export::text_layout::estimate_width;
use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbImage, RgbaImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Rgb,
};
use std::io::Cursor;

const MM_PER_INCH: f32 = 25.4;
const LAYER_NAME: &str = "Layer 1";

/// Page size and margins in millimetres. Defaults to portrait A4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Space kept free above the bottom edge for the footer.
    pub bottom_reserve: f32,
    /// Height of the page-1 header, measured from the top margin.
    pub header_height: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 20.0,
            bottom_reserve: 27.0,
            header_height: 60.0,
        }
    }
}

impl PageGeometry {
    pub fn printable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn printable_height(&self) -> f32 {
        self.height - self.margin - self.bottom_reserve
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shade(pub u8, pub u8, pub u8);

impl Shade {
    pub const TITLE: Shade = Shade(0x5f, 0x15, 0x81);
    pub const HEADING: Shade = Shade(0x33, 0x33, 0x33);
    pub const BODY: Shade = Shade(0x66, 0x66, 0x66);
    pub const MUTED: Shade = Shade(0x99, 0x99, 0x99);
    pub const RULE: Shade = Shade(0xe5, 0xe5, 0xe5);

    fn color(self) -> Color {
        let c = |v: u8| f32::from(v) / 255.0;
        Color::Rgb(Rgb::new(c(self.0), c(self.1), c(self.2), None))
    }
}

/// Multi-page drawing surface. Coordinates passed in are millimetres from the
/// top-left corner of a page; pages are 1-based.
pub(crate) struct PdfCanvas {
    doc: PdfDocumentReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    font: IndirectFontRef,
    unicode_font: bool,
    geometry: PageGeometry,
    #[cfg(test)]
    placed: Vec<(usize, String)>,
}

impl PdfCanvas {
    /// Creates a document with one empty page. `font_bytes` is an optional
    /// TrueType font; without it the built-in Helvetica is used.
    pub fn new(title: &str, geometry: PageGeometry, font_bytes: Option<Vec<u8>>) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(geometry.width),
            Mm(geometry.height),
            LAYER_NAME,
        );

        let (font, unicode_font) = match font_bytes {
            Some(bytes) => (
                doc.add_external_font(Cursor::new(bytes))
                    .map_err(|e| anyhow!("failed to embed export font: {e:?}"))?,
                true,
            ),
            None => (
                doc.add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(|e| anyhow!("failed to add builtin font: {e:?}"))?,
                false,
            ),
        };

        Ok(Self {
            doc,
            pages: vec![(page, layer)],
            font,
            unicode_font,
            geometry,
            #[cfg(test)]
            placed: Vec::new(),
        })
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends pages until `page` exists.
    pub fn ensure_page(&mut self, page: usize) {
        while self.pages.len() < page {
            let added = self.doc.add_page(
                Mm(self.geometry.width),
                Mm(self.geometry.height),
                LAYER_NAME,
            );
            self.pages.push(added);
        }
    }

    fn layer(&self, page: usize) -> Option<PdfLayerReference> {
        let (page_idx, layer_idx) = *self.pages.get(page.checked_sub(1)?)?;
        Some(self.doc.get_page(page_idx).get_layer(layer_idx))
    }

    /// Text drawn on `page`, in drawing order.
    #[cfg(test)]
    pub fn placed_text(&self, page: usize) -> Vec<&str> {
        self.placed
            .iter()
            .filter(|(p, _)| *p == page)
            .map(|(_, t)| t.as_str())
            .collect()
    }

    fn y(&self, from_top: f32) -> Mm {
        Mm(self.geometry.height - from_top)
    }

    pub fn text(&mut self, page: usize, x: f32, y: f32, size_pt: f32, shade: Shade, text: &str) {
        let Some(layer) = self.layer(page) else {
            return;
        };
        #[cfg(test)]
        self.placed.push((page, text.to_string()));
        layer.set_fill_color(shade.color());
        let text = if self.unicode_font {
            text.to_string()
        } else {
            builtin_safe(text)
        };
        layer.use_text(text, size_pt, Mm(x), self.y(y), &self.font);
    }

    /// Right-aligned text ending at `right`.
    pub fn text_right(&mut self, page: usize, right: f32, y: f32, size_pt: f32, shade: Shade, text: &str) {
        let x = right - estimate_width(text, size_pt);
        self.text(page, x, y, size_pt, shade, text);
    }

    /// Horizontal rule across the printable width.
    pub fn rule(&self, page: usize, y: f32, thickness: f32, shade: Shade) {
        let Some(layer) = self.layer(page) else {
            return;
        };
        let left = self.geometry.margin;
        let right = self.geometry.width - self.geometry.margin;
        layer.set_outline_color(shade.color());
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(left), self.y(y)), false),
                (Point::new(Mm(right), self.y(y)), false),
            ],
            is_closed: false,
        });
    }

    /// Places `band` with its top-left corner at (`x`, `y`), scaled to
    /// `width` millimetres. Returns the placed height.
    pub fn image(&self, page: usize, band: &RgbaImage, x: f32, y: f32, width: f32) -> f32 {
        let Some(layer) = self.layer(page) else {
            return 0.0;
        };
        if band.width() == 0 || band.height() == 0 || width <= 0.0 {
            return 0.0;
        }
        let dpi = band.width() as f32 * MM_PER_INCH / width;
        let height = band.height() as f32 * MM_PER_INCH / dpi;

        let flattened = DynamicImage::ImageRgb8(flatten_on_white(band));
        Image::from_dynamic_image(&flattened).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(self.y(y + height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        height
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| anyhow!("failed to serialize pdf: {e:?}"))
    }
}

/// Composites an RGBA image over a white background.
pub(crate) fn flatten_on_white(src: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Maps text onto what the built-in Helvetica encoding can show.
pub(crate) fn builtin_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{a0}' => out.push(' '),
            '•' => out.push('-'),
            '₽' => out.push_str("RUB"),
            '–' | '—' => out.push('-'),
            '«' | '»' | '“' | '”' => out.push('"'),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
