//! Line layout for the textual export body.
//!
//! Widths are estimated from an average glyph width rather than measured, so
//! wrapping is approximate. Coordinates are millimetres from the top-left
//! corner of the page.

const PT_TO_MM: f32 = 0.352_778;
/// Average Helvetica advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
const BULLET: &str = "• ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub kind: LineKind,
    pub x: f32,
    pub y: f32,
    pub size_pt: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextPage {
    pub lines: Vec<PlacedLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub bullets: Vec<String>,
}

impl Section {
    pub fn new(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            title: title.into(),
            bullets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub margin: f32,
    pub wrap_width: f32,
    /// Cursor position of the first line on page 1.
    pub first_page_start: f32,
    /// Cursor position of the first line on continuation pages.
    pub continue_start: f32,
    /// A new page is started before any line placed past this cursor.
    pub break_after: f32,
    pub heading_size: f32,
    pub body_size: f32,
    pub line_height: f32,
    pub heading_gap: f32,
    pub bullet_gap: f32,
    pub section_gap: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            margin: 20.0,
            wrap_width: 160.0,
            first_page_start: 80.0,
            continue_start: 40.0,
            break_after: 250.0,
            heading_size: 16.0,
            body_size: 11.0,
            line_height: 6.0,
            heading_gap: 15.0,
            bullet_gap: 3.0,
            section_gap: 10.0,
        }
    }
}

/// Estimated rendered width of `text` in millimetres.
pub fn estimate_width(text: &str, size_pt: f32) -> f32 {
    width_of_chars(text.chars().count(), size_pt)
}

fn width_of_chars(count: usize, size_pt: f32) -> f32 {
    count as f32 * size_pt * AVG_GLYPH_EM * PT_TO_MM
}

/// Greedy word wrap. A single word wider than `max_width` gets a line of its
/// own.
pub fn wrap_text(text: &str, max_width: f32, size_pt: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_chars = word_chars;
            continue;
        }
        if width_of_chars(current_chars + 1 + word_chars, size_pt) <= max_width {
            current.push(' ');
            current.push_str(word);
            current_chars += 1 + word_chars;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_chars = word_chars;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct Cursor<'a> {
    params: &'a LayoutParams,
    pages: Vec<TextPage>,
    y: f32,
}

impl Cursor<'_> {
    fn place(&mut self, kind: LineKind, x: f32, size_pt: f32, text: String) {
        if self.y > self.params.break_after {
            self.pages.push(TextPage::default());
            self.y = self.params.continue_start;
        }
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(PlacedLine {
                kind,
                x,
                y: self.y,
                size_pt,
                text,
            });
        }
    }
}

/// Lays out sections in order. Returns at least one page.
pub fn layout_sections(sections: &[Section], params: &LayoutParams) -> Vec<TextPage> {
    let bullet_indent = estimate_width(BULLET, params.body_size);
    let mut cursor = Cursor {
        params,
        pages: vec![TextPage::default()],
        y: params.first_page_start,
    };

    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            cursor.y += params.section_gap;
        }
        cursor.place(
            LineKind::Heading,
            params.margin,
            params.heading_size,
            section.title.clone(),
        );
        cursor.y += params.heading_gap;

        for bullet in &section.bullets {
            let wrapped = wrap_text(bullet, params.wrap_width - bullet_indent, params.body_size);
            for (n, line) in wrapped.into_iter().enumerate() {
                let (x, text) = if n == 0 {
                    (params.margin, format!("{BULLET}{line}"))
                } else {
                    (params.margin + bullet_indent, line)
                };
                cursor.place(LineKind::Body, x, params.body_size, text);
                cursor.y += params.line_height;
            }
            cursor.y += params.bullet_gap;
        }
    }

    cursor.pages
}
