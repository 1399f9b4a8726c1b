//! Report pagination
//!
//! A single cursor walks down the page in PDF user space (y grows upwards).
//! Every block measures itself first and then asks [`Paginator::ensure_space`]
//! for room; when the current page cannot hold it, the footer is drawn, a new
//! page is opened and the repeating header is redrawn. Blocks are never split,
//! with one exception: a block taller than a whole content area is flowed
//! line by line and reported as [`LayoutWarning::Overflow`].

use crate::config::ReportConfig;
use crate::metrics::{encode_win_ansi, Font};
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const REPORT_TITLE: &str = "Annotation Review Summary";

/// Space reserved at the top of every page for the running header
pub const HEADER_HEIGHT: f64 = 28.0;
/// Space reserved at the bottom of every page for the footer
pub const FOOTER_HEIGHT: f64 = 20.0;

pub type Rgb = [f32; 3];

pub const TEXT: Rgb = [0.12, 0.14, 0.17];
pub const MUTED: Rgb = [0.42, 0.45, 0.5];
pub const RULE: Rgb = [0.85, 0.87, 0.9];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Title,
    Metadata,
    StatCards,
    SectionHeading,
    TableHeader,
    TableRow,
    RuleCard,
    Note,
}

/// Where a block ended up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    /// One-based page number
    pub page: usize,
    /// Top edge in PDF user space
    pub top_y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutWarning {
    /// A block needed more than one page of content area and was flowed
    Overflow {
        block: String,
        height: f64,
        available: f64,
    },
}

/// Layout trace of a generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryLayout {
    pub page_count: usize,
    /// Top of the content area on every page
    pub content_top: f64,
    pub content_bottom: f64,
    pub blocks: Vec<PlacedBlock>,
    pub warnings: Vec<LayoutWarning>,
}

impl SummaryLayout {
    pub fn blocks_of(&self, kind: BlockKind) -> impl Iterator<Item = &PlacedBlock> {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }
}

/// Laid-out report: one operation list per page plus the trace
#[derive(Debug, Clone)]
pub struct ReportPages {
    pub layout: SummaryLayout,
    pub pages: Vec<Vec<Operation>>,
}

pub struct Paginator {
    config: ReportConfig,
    header: String,
    pages: Vec<Vec<Operation>>,
    cursor: f64,
    blocks: Vec<PlacedBlock>,
    warnings: Vec<LayoutWarning>,
}

impl Paginator {
    pub fn new(config: ReportConfig, header: impl Into<String>) -> Self {
        let mut paginator = Self {
            config,
            header: header.into(),
            pages: Vec::new(),
            cursor: 0.0,
            blocks: Vec::new(),
            warnings: Vec::new(),
        };
        paginator.open_page();
        paginator
    }

    pub fn left(&self) -> f64 {
        self.config.margin
    }

    pub fn content_width(&self) -> f64 {
        self.config.page_width - 2.0 * self.config.margin
    }

    pub fn content_top(&self) -> f64 {
        self.config.page_height - self.config.margin - HEADER_HEIGHT
    }

    pub fn content_bottom(&self) -> f64 {
        self.config.margin + FOOTER_HEIGHT
    }

    pub fn content_height(&self) -> f64 {
        self.content_top() - self.content_bottom()
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// One-based number of the current page
    pub fn page_number(&self) -> usize {
        self.pages.len()
    }

    pub fn remaining(&self) -> f64 {
        self.cursor - self.content_bottom()
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= self.content_top()
    }

    /// Break the page unless `height` fits below the cursor. A fresh page
    /// is never broken again, so oversized blocks start at the top.
    pub fn ensure_space(&mut self, height: f64) -> bool {
        if height > self.remaining() && !self.at_page_top() {
            self.new_page();
            return true;
        }
        false
    }

    pub fn new_page(&mut self) {
        self.draw_footer();
        self.open_page();
    }

    fn open_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = self.content_top();
        self.draw_header();
    }

    /// Record a block of `height` at the cursor and move below it
    pub fn place(&mut self, kind: BlockKind, height: f64) -> f64 {
        let top = self.cursor;
        self.blocks.push(PlacedBlock {
            kind,
            page: self.page_number(),
            top_y: top,
            height,
        });
        self.cursor -= height;
        top
    }

    /// Vertical gap after a block, never past the bottom of the content area
    pub fn gap(&mut self, height: f64) {
        self.cursor = (self.cursor - height).max(self.content_bottom());
    }

    /// Move the cursor without recording a block
    pub fn advance(&mut self, height: f64) {
        self.cursor -= height;
    }

    pub fn warn_overflow(&mut self, block: impl Into<String>, height: f64) {
        let block = block.into();
        let available = self.content_height();
        warn!(block = %block, height, available, "Report block taller than a page");
        self.warnings.push(LayoutWarning::Overflow {
            block,
            height,
            available,
        });
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn text(&mut self, font: Font, size: f64, x: f64, y: f64, text: &str, color: Rgb) {
        let [r, g, b] = color;
        self.ops().extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.resource_name().as_bytes().to_vec()),
                    Object::Real(size as f32),
                ],
            ),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("Td", vec![Object::Real(x as f32), Object::Real(y as f32)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Right-aligned text ending at `right`
    pub fn text_right(&mut self, font: Font, size: f64, right: f64, y: f64, text: &str, color: Rgb) {
        let x = right - font.text_width(text, size);
        self.text(font, size, x, y, text, color);
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
        let [r, g, b] = color;
        self.ops().extend([
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new(
                "re",
                vec![
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                    Object::Real(width as f32),
                    Object::Real(height as f32),
                ],
            ),
            Operation::new("f", vec![]),
        ]);
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
        let [r, g, b] = color;
        self.ops().extend([
            Operation::new("RG", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("w", vec![Object::Real(0.75)]),
            Operation::new(
                "re",
                vec![
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                    Object::Real(width as f32),
                    Object::Real(height as f32),
                ],
            ),
            Operation::new("S", vec![]),
        ]);
    }

    pub fn hline(&mut self, x1: f64, x2: f64, y: f64, color: Rgb) {
        let [r, g, b] = color;
        self.ops().extend([
            Operation::new("RG", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("w", vec![Object::Real(0.75)]),
            Operation::new("m", vec![Object::Real(x1 as f32), Object::Real(y as f32)]),
            Operation::new("l", vec![Object::Real(x2 as f32), Object::Real(y as f32)]),
            Operation::new("S", vec![]),
        ]);
    }

    fn draw_header(&mut self) {
        let baseline = self.config.page_height - self.config.margin - 10.0;
        let left = self.left();
        let right = left + self.content_width();
        let header = self.header.clone();
        self.text(Font::Helvetica, 9.0, left, baseline, &header, MUTED);
        self.text_right(Font::HelveticaBold, 9.0, right, baseline, REPORT_TITLE, MUTED);
        self.hline(left, right, baseline - 8.0, RULE);
    }

    fn draw_footer(&mut self) {
        let label = format!("Page {}", self.page_number());
        let x = (self.config.page_width - Font::Helvetica.text_width(&label, 9.0)) / 2.0;
        let y = self.config.margin;
        self.text(Font::Helvetica, 9.0, x, y, &label, MUTED);
    }

    /// Draw the final footer and hand back the pages
    pub fn finish(mut self) -> ReportPages {
        self.draw_footer();
        let layout = SummaryLayout {
            page_count: self.pages.len(),
            content_top: self.content_top(),
            content_bottom: self.content_bottom(),
            blocks: self.blocks,
            warnings: self.warnings,
        };
        ReportPages {
            layout,
            pages: self.pages,
        }
    }
}
