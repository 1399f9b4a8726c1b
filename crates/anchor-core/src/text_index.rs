//! Per-page searchable text index
//!
//! Each page keeps its raw text runs plus two normalized projections of the
//! page text. Every projection character carries a [`CharPos`] pointing back at
//! the run and character that produced it, so a match in normalized text can
//! be turned back into run-level offsets for geometry.
//!
//! - The *strict* projection lower-cases, folds typographic punctuation,
//!   collapses whitespace runs to a single space and treats end-of-line as a
//!   space. A run that ends in a hyphen at end-of-line is a wrapped word: the
//!   hyphen is dropped and the next line is joined without a space.
//! - The *compact* projection keeps only lower-cased alphanumerics, which
//!   absorbs hyphenation, OCR spacing noise and punctuation differences.

use crate::types::TextRun;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Position of a normalized character in the source runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharPos {
    /// Index of the run within the page
    pub run: usize,
    /// Character (not byte) offset within the run
    pub offset: usize,
}

/// Normalized page text with a parallel position map
///
/// Invariant: `text.chars().count() == map.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub text: String,
    pub map: Vec<CharPos>,
}

impl Projection {
    fn push(&mut self, c: char, pos: CharPos) {
        self.text.push(c);
        self.map.push(pos);
    }

    fn trim_trailing_space(&mut self) {
        while self.text.ends_with(' ') {
            self.text.pop();
            self.map.pop();
        }
    }

    pub fn char_len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Find `needle` starting at character index `from`, returning the
    /// character index of the first occurrence
    pub fn find_from(&self, needle: &str, from: usize) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let start_byte = if from == 0 {
            0
        } else {
            self.text.char_indices().nth(from).map(|(b, _)| b)?
        };
        let found = self.text[start_byte..].find(needle)?;
        Some(self.text[..start_byte + found].chars().count())
    }

    pub fn find(&self, needle: &str) -> Option<usize> {
        self.find_from(needle, 0)
    }
}

/// Raw text layer of one page as produced by a text extraction source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub runs: Vec<TextRun>,
    pub viewport: Viewport,
}

/// Anything able to yield ordered text runs for each page of a document
pub trait TextSource {
    fn page_count(&self) -> usize;

    /// Text layer of a zero-based page. Pages whose text cannot be read are
    /// returned with no runs.
    fn page_text(&self, page_index: usize) -> PageText;
}

/// Searchable index of one page. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageIndex {
    /// Zero-based page index
    pub page_index: usize,
    pub runs: Vec<TextRun>,
    pub viewport: Viewport,
    pub strict: Projection,
    pub compact: Projection,
}

impl PageIndex {
    pub fn build(page_index: usize, page: PageText) -> Self {
        let strict = strict_projection(&page.runs);
        let compact = compact_projection(&page.runs);
        Self {
            page_index,
            runs: page.runs,
            viewport: page.viewport,
            strict,
            compact,
        }
    }

    pub fn empty(page_index: usize, viewport: Viewport) -> Self {
        Self::build(
            page_index,
            PageText {
                runs: Vec::new(),
                viewport,
            },
        )
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Build the index for every page of a document, in page order
pub fn index_document<S: TextSource + ?Sized>(source: &S) -> Vec<PageIndex> {
    let pages: Vec<PageIndex> = (0..source.page_count())
        .map(|i| PageIndex::build(i, source.page_text(i)))
        .collect();
    let empty = pages.iter().filter(|p| p.is_empty()).count();
    debug!(pages = pages.len(), empty, "Indexed document text");
    pages
}

/// Map typographic variants onto their plain ASCII counterparts
fn fold_punctuation(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
        _ => c,
    }
}

/// Zero-width and soft-hyphen characters never reach a projection
fn is_ignorable(c: char) -> bool {
    matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}')
}

fn push_strict(p: &mut Projection, c: char, pos: CharPos) {
    let c = fold_punctuation(c);
    if is_ignorable(c) {
        return;
    }
    if c.is_whitespace() {
        if !p.text.is_empty() && !p.text.ends_with(' ') {
            p.push(' ', pos);
        }
        return;
    }
    for lower in c.to_lowercase() {
        p.push(lower, pos);
    }
}

fn push_compact(p: &mut Projection, c: char, pos: CharPos) {
    for lower in fold_punctuation(c).to_lowercase() {
        if lower.is_alphanumeric() {
            p.push(lower, pos);
        }
    }
}

fn strict_projection(runs: &[TextRun]) -> Projection {
    let mut p = Projection::default();
    for (run_idx, run) in runs.iter().enumerate() {
        let chars: Vec<char> = run.text.chars().collect();
        let wrapped = run.has_eol
            && chars
                .last()
                .is_some_and(|c| fold_punctuation(*c) == '-');
        let take = if wrapped { chars.len() - 1 } else { chars.len() };

        for (offset, &c) in chars[..take].iter().enumerate() {
            push_strict(&mut p, c, CharPos { run: run_idx, offset });
        }

        if run.has_eol && !wrapped && !chars.is_empty() {
            let offset = chars.len() - 1;
            push_strict(&mut p, ' ', CharPos { run: run_idx, offset });
        }
    }
    p.trim_trailing_space();
    p
}

fn compact_projection(runs: &[TextRun]) -> Projection {
    let mut p = Projection::default();
    for (run_idx, run) in runs.iter().enumerate() {
        for (offset, c) in run.text.chars().enumerate() {
            push_compact(&mut p, c, CharPos { run: run_idx, offset });
        }
    }
    p
}

/// Normalize free text the same way as the strict projection
pub fn normalize_strict(text: &str) -> String {
    let mut p = Projection::default();
    let pos = CharPos { run: 0, offset: 0 };
    for c in text.chars() {
        push_strict(&mut p, c, pos);
    }
    p.trim_trailing_space();
    p.text
}

/// Normalize free text the same way as the compact projection
pub fn normalize_compact(text: &str) -> String {
    let mut p = Projection::default();
    let pos = CharPos { run: 0, offset: 0 };
    for c in text.chars() {
        push_compact(&mut p, c, pos);
    }
    p.text
}
