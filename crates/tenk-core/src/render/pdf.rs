//! Minimal Markdown-to-PDF layout using lopdf and the standard Helvetica fonts.
//!
//! Supports the subset the report markup uses: `#` headings (centred),
//! `-` bullets, `**bold**` spans and plain paragraphs. Text is word-wrapped
//! to the page width and flows onto new pages as needed. No creation date or
//! document ID is written, so equal input gives equal bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

use super::DocumentRenderer;
use crate::error::RenderError;
use crate::models::config::RenderConfig;

// US Letter, in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const BULLET_INDENT: f32 = 14.0;
const LINE_SPACING: f32 = 1.4;

/// Lays out report markup on US-Letter pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfDocumentRenderer {
    font_size: f32,
    title_font_size: f32,
}

impl PdfDocumentRenderer {
    pub fn new(font_size: f32, title_font_size: f32) -> Self {
        Self {
            font_size,
            title_font_size,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.font_size, config.title_font_size)
    }
}

impl Default for PdfDocumentRenderer {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl DocumentRenderer for PdfDocumentRenderer {
    fn render(&self, markup: &str) -> Result<Vec<u8>, RenderError> {
        let mut layout = Layout::new();

        for block in parse_blocks(markup) {
            match block {
                Block::Heading(runs) => {
                    let size = self.title_font_size;
                    for line in wrap(&runs, size, CONTENT_WIDTH) {
                        let x = MARGIN + (CONTENT_WIDTH - line_width(&line, size)).max(0.0) / 2.0;
                        layout.write_line(x, &line, size, false);
                    }
                    layout.skip(size * 0.5);
                }
                Block::Bullet(runs) => {
                    let size = self.font_size;
                    for (i, line) in wrap(&runs, size, CONTENT_WIDTH - BULLET_INDENT)
                        .into_iter()
                        .enumerate()
                    {
                        layout.write_line(MARGIN + BULLET_INDENT, &line, size, i == 0);
                    }
                }
                Block::Paragraph(runs) => {
                    let size = self.font_size;
                    for line in wrap(&runs, size, CONTENT_WIDTH) {
                        layout.write_line(MARGIN, &line, size, false);
                    }
                }
                Block::Blank => layout.skip(self.font_size * 0.6),
            }
        }

        let pages = layout.finish();
        debug!("Laid out report on {} page(s)", pages.len());
        build_document(pages)
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// Glyph width in 1/1000 em (Adobe core font metrics).
    fn glyph_width(self, c: char) -> u16 {
        let table = match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match c {
            ' '..='~' => table[c as usize - 32],
            '\u{2022}' => 350,
            _ => 556,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Run {
    font: Font,
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading(Vec<Run>),
    Bullet(Vec<Run>),
    Paragraph(Vec<Run>),
    Blank,
}

fn parse_blocks(markup: &str) -> Vec<Block> {
    markup
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.trim().is_empty() {
                Block::Blank
            } else if let Some(rest) = line.strip_prefix('#') {
                let title = rest.trim_start_matches('#').trim();
                Block::Heading(parse_inline(title, Font::Bold))
            } else if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
                Block::Bullet(parse_inline(rest.trim(), Font::Regular))
            } else {
                Block::Paragraph(parse_inline(line.trim(), Font::Regular))
            }
        })
        .collect()
}

/// Split text on `**` markers into alternating font runs.
fn parse_inline(text: &str, base: Font) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut bold = false;

    for part in text.split("**") {
        if !part.is_empty() {
            let font = if bold || base == Font::Bold { Font::Bold } else { Font::Regular };
            runs.push(Run {
                font,
                text: part.to_string(),
            });
        }
        bold = !bold;
    }
    runs
}

#[derive(Debug, Clone, PartialEq)]
struct Word {
    font: Font,
    text: String,
    space_before: bool,
}

fn words(runs: &[Run]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut pending_space = false;

    for run in runs {
        let mut current = String::new();
        for c in run.text.chars() {
            if c.is_whitespace() {
                if !current.is_empty() {
                    words.push(Word {
                        font: run.font,
                        text: std::mem::take(&mut current),
                        space_before: pending_space,
                    });
                }
                pending_space = true;
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            words.push(Word {
                font: run.font,
                text: current,
                space_before: pending_space,
            });
            pending_space = false;
        }
    }
    words
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|c| f32::from(font.glyph_width(c))).sum::<f32>() * size / 1000.0
}

fn line_width(runs: &[Run], size: f32) -> f32 {
    runs.iter().map(|r| text_width(&r.text, r.font, size)).sum()
}

/// Greedy word wrap. A word wider than `max_width` gets a line of its own.
fn wrap(runs: &[Run], size: f32, max_width: f32) -> Vec<Vec<Run>> {
    let space = text_width(" ", Font::Regular, size);
    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut width = 0.0;

    for word in words(runs) {
        let word_width = text_width(&word.text, word.font, size);
        let gap = if word.space_before && !current.is_empty() { space } else { 0.0 };

        if !current.is_empty() && width + gap + word_width > max_width {
            lines.push(std::mem::take(&mut current));
            width = word_width;
        } else {
            width += gap + word_width;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.into_iter().map(merge_words).collect()
}

fn merge_words(words: Vec<Word>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();

    for (i, word) in words.into_iter().enumerate() {
        let separator = if i > 0 && word.space_before { " " } else { "" };
        match runs.last_mut() {
            Some(last) if last.font == word.font => {
                last.text.push_str(separator);
                last.text.push_str(&word.text);
            }
            _ => {
                if let Some(last) = runs.last_mut() {
                    last.text.push_str(separator);
                }
                runs.push(Run {
                    font: word.font,
                    text: word.text,
                });
            }
        }
    }
    runs
}

struct Layout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn skip(&mut self, amount: f32) {
        self.y -= amount;
    }

    fn write_line(&mut self, x: f32, runs: &[Run], size: f32, bullet: bool) {
        let height = size * LINE_SPACING;
        if self.y - height < MARGIN {
            self.new_page();
        }
        self.y -= height;

        if bullet {
            self.text_op(MARGIN, Font::Regular, size, "\u{2022}");
        }

        self.current.push(Operation::new("BT", vec![]));
        self.current
            .push(Operation::new("Td", vec![Object::Real(x), Object::Real(self.y)]));
        for run in runs {
            self.current.push(Operation::new(
                "Tf",
                vec![run.font.resource().into(), Object::Real(size)],
            ));
            self.current.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_win_ansi(&run.text))],
            ));
        }
        self.current.push(Operation::new("ET", vec![]));
    }

    fn text_op(&mut self, x: f32, font: Font, size: f32, text: &str) {
        self.current.push(Operation::new("BT", vec![]));
        self.current.push(Operation::new(
            "Tf",
            vec![font.resource().into(), Object::Real(size)],
        ));
        self.current
            .push(Operation::new("Td", vec![Object::Real(x), Object::Real(self.y)]));
        self.current.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(text))],
        ));
        self.current.push(Operation::new("ET", vec![]));
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource() => regular_id,
            Font::Bold.resource() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(buffer)
}

/// Encode text for a WinAnsiEncoding font; unmapped characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\t' => b' ',
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MARKUP: &str = "# Annual Report: Acme\n\n**Filing Date:** 2024-11-01\n\n- **Auditor:** KPMG LLP\n- **Total Revenue:** $1,000.00\n";

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_output_is_pdf() {
        let bytes = PdfDocumentRenderer::default().render(MARKUP).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_output_is_deterministic() {
        let renderer = PdfDocumentRenderer::default();
        assert_eq!(renderer.render(MARKUP).unwrap(), renderer.render(MARKUP).unwrap());
    }

    #[test]
    fn test_long_input_paginates() {
        let mut markup = String::from("# Annual Report: Acme\n\n");
        for i in 0..200 {
            markup.push_str(&format!("- **Risk {}:** supply chain disruption\n", i));
        }

        let bytes = PdfDocumentRenderer::default().render(&markup).unwrap();
        assert!(page_count(&bytes) > 1);
    }

    #[test]
    fn test_empty_markup_gives_one_page() {
        let bytes = PdfDocumentRenderer::default().render("").unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_parse_blocks() {
        let blocks = parse_blocks(MARKUP);
        assert_eq!(blocks.len(), 6);
        assert!(matches!(blocks[0], Block::Heading(_)));
        assert_eq!(blocks[1], Block::Blank);
        assert!(matches!(blocks[2], Block::Paragraph(_)));
        assert!(matches!(blocks[4], Block::Bullet(_)));
    }

    #[test]
    fn test_parse_inline_bold() {
        let runs = parse_inline("**Auditor:** KPMG LLP", Font::Regular);
        assert_eq!(runs, vec![
            Run { font: Font::Bold, text: "Auditor:".to_string() },
            Run { font: Font::Regular, text: " KPMG LLP".to_string() },
        ]);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(200);
        let runs = vec![Run { font: Font::Regular, text }];
        let lines = wrap(&runs, 11.0, CONTENT_WIDTH);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line_width(line, 11.0) <= CONTENT_WIDTH);
        }
    }

    #[test]
    fn test_wrap_keeps_spacing_between_fonts() {
        let runs = parse_inline("**Auditor:** KPMG LLP", Font::Regular);
        let lines = wrap(&runs, 11.0, CONTENT_WIDTH);

        assert_eq!(lines.len(), 1);
        let text: String = lines[0].iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, "Auditor: KPMG LLP");
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Caf\u{e9} \u{2022} \u{20AC}"), vec![b'C', b'a', b'f', 0xE9, b' ', 0x95, b' ', 0x80]);
        assert_eq!(encode_win_ansi("\u{4E2D}"), vec![b'?']);
    }
}
