//! Text runs from PDF content streams
//!
//! Interprets the text and graphics state operators of each page's content
//! stream, descending into Form XObjects, and emits one [`TextRun`] per
//! text-showing operator. String operands are decoded through the font's
//! encoding (see [`crate::encoding`]). Glyph advances come from the font's
//! `/Widths` or `/W` arrays when present and from the standard Helvetica
//! metrics otherwise.

use crate::encoding::{FontDecoder, Glyph};
use crate::metrics::Font;
use crate::pdf::{inherited, media_box, number, page_ids, resolve, rotation};
use anchor_core::viewport::{multiply, Matrix, IDENTITY};
use anchor_core::{PageText, TextRun, TextSource, Viewport};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use tracing::debug;

/// TJ adjustments below this (in thousandths of an em) read as a word gap
const KERNING_SPACE_THRESHOLD: f64 = -100.0;

/// Gaps wider than this share of the font height between runs on one
/// baseline are emitted as a space run
const WORD_GAP_RATIO: f64 = 0.15;

/// Nesting limit for Form XObjects drawing other forms
const MAX_FORM_DEPTH: usize = 8;

/// [`TextSource`] over a parsed lopdf document
pub struct LopdfTextSource<'a> {
    doc: &'a Document,
    pages: Vec<ObjectId>,
    scale: f64,
}

impl<'a> LopdfTextSource<'a> {
    pub fn new(doc: &'a Document, scale: f64) -> Self {
        Self {
            doc,
            pages: page_ids(doc),
            scale,
        }
    }
}

impl TextSource for LopdfTextSource<'_> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> PageText {
        let Some(&page_id) = self.pages.get(page_index) else {
            return PageText {
                runs: Vec::new(),
                viewport: Viewport::new(crate::pdf::DEFAULT_MEDIA_BOX, self.scale, 0),
            };
        };
        let viewport = page_viewport(self.doc, page_id, self.scale);
        let runs = match extract_runs(self.doc, page_id) {
            Some(runs) => runs,
            None => {
                debug!(page = page_index, "Page content could not be decoded");
                Vec::new()
            }
        };
        PageText { runs, viewport }
    }
}

/// Display viewport of a page at `scale`
pub fn page_viewport(doc: &Document, page_id: ObjectId, scale: f64) -> Viewport {
    Viewport::new(media_box(doc, page_id), scale, rotation(doc, page_id))
}

/// Text runs of one page in content stream order
pub fn extract_runs(doc: &Document, page_id: ObjectId) -> Option<Vec<TextRun>> {
    let content = doc.get_page_content(page_id).ok()?;
    let content = Content::decode(&content).ok()?;
    let resources = inherited(doc, page_id, b"Resources").and_then(|o| o.as_dict().ok());

    let mut interpreter = Interpreter::new(doc, resources);
    interpreter.run(&content.operations);
    Some(finish_runs(interpreter.runs))
}

/// Glyph advance source for one font resource
#[derive(Debug, Clone)]
struct FontMetrics {
    first_char: u32,
    widths: Vec<f64>,
    /// `/W` of a composite font's descendant, keyed by CID
    cid_widths: HashMap<u32, f64>,
    /// `/DW` of a composite font; `None` for simple fonts
    default_width: Option<f64>,
    fallback: Font,
}

impl FontMetrics {
    fn standard(fallback: Font) -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: None,
            fallback,
        }
    }

    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let bold = matches!(
            dict.get(b"BaseFont").map(|o| resolve(doc, o)),
            Ok(Object::Name(name)) if String::from_utf8_lossy(name).contains("Bold")
        );
        let fallback = if bold { Font::HelveticaBold } else { Font::Helvetica };

        let descendant = dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|fonts| fonts.first())
            .and_then(|o| resolve(doc, o).as_dict().ok());
        if let Some(cid_font) = descendant {
            let default_width = cid_font
                .get(b"DW")
                .ok()
                .and_then(|o| number(resolve(doc, o)))
                .unwrap_or(1000.0);
            let cid_widths = cid_font
                .get(b"W")
                .ok()
                .and_then(|o| resolve(doc, o).as_array().ok())
                .map(|w| parse_cid_widths(doc, w))
                .unwrap_or_default();
            return Self {
                cid_widths,
                default_width: Some(default_width),
                ..Self::standard(fallback)
            };
        }

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            first_char,
            widths,
            ..Self::standard(fallback)
        }
    }

    /// Advance of one glyph in 1/1000 em
    fn advance(&self, glyph: &Glyph) -> f64 {
        if let Some(default_width) = self.default_width {
            return self.cid_widths.get(&glyph.code).copied().unwrap_or(default_width);
        }
        glyph
            .code
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or_else(|| {
                let c = glyph.text.chars().next().unwrap_or(' ');
                self.fallback.char_width(c) as f64
            })
    }
}

/// `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while let Some(first) = w.get(i).and_then(|o| number(resolve(doc, o))) {
        let first = first.max(0.0) as u32;
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (k, width) in list.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        widths.insert(first + k as u32, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) =
                    (number(last), w.get(i + 2).and_then(|o| number(resolve(doc, o))))
                else {
                    break;
                };
                let last = (last.max(0.0) as u32).min(first.saturating_add(0xFFFF));
                for cid in first..=last {
                    widths.insert(cid, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// What a `/Font` resource entry contributes to text extraction
#[derive(Debug, Clone)]
struct FontResource {
    metrics: FontMetrics,
    decoder: FontDecoder,
}

impl FontResource {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        Self {
            metrics: FontMetrics::from_dict(doc, dict),
            decoder: FontDecoder::from_font(doc, dict),
        }
    }

    /// Text shown before any resolvable `Tf`
    fn unresolved() -> Self {
        Self {
            metrics: FontMetrics::standard(Font::Helvetica),
            decoder: FontDecoder::unknown(),
        }
    }
}

type FontMap = HashMap<Vec<u8>, FontResource>;

fn resource_fonts(doc: &Document, resources: Option<&Dictionary>) -> FontMap {
    let Some(Ok(fonts)) = resources
        .and_then(|r| r.get(b"Font").ok())
        .map(|o| resolve(doc, o).as_dict())
    else {
        return HashMap::new();
    };
    fonts
        .iter()
        .filter_map(|(name, obj)| {
            let dict = resolve(doc, obj).as_dict().ok()?;
            Some((name.clone(), FontResource::from_dict(doc, dict)))
        })
        .collect()
}

/// Text state parameters saved and restored with the graphics state
#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

enum Piece<'o> {
    Text(&'o [u8]),
    Adjust(f64),
}

struct Interpreter<'a> {
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    fonts: FontMap,
    /// Form XObjects currently being drawn
    depth: usize,
    ctm: Matrix,
    state: TextState,
    stack: Vec<(Matrix, TextState)>,
    tm: Matrix,
    tlm: Matrix,
    runs: Vec<TextRun>,
}

fn operand(op: &Operation, i: usize) -> f64 {
    op.operands.get(i).and_then(number).unwrap_or(0.0)
}

fn matrix_of(values: &[Object]) -> Option<Matrix> {
    if values.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = number(&values[i])?;
    }
    Some(m)
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a Document, resources: Option<&'a Dictionary>) -> Self {
        Self {
            doc,
            resources,
            fonts: resource_fonts(doc, resources),
            depth: 0,
            ctm: IDENTITY,
            state: TextState::default(),
            stack: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
            runs: Vec::new(),
        }
    }

    fn run(&mut self, operations: &[Operation]) {
        for op in operations {
            self.execute(op);
        }
    }

    fn execute(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.stack.pop() {
                    self.ctm = ctm;
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix_of(&op.operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.draw_form(name);
                }
            }
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                self.state.size = operand(op, 1);
            }
            "Tc" => self.state.char_spacing = operand(op, 0),
            "Tw" => self.state.word_spacing = operand(op, 0),
            "Tz" => self.state.h_scale = operand(op, 0) / 100.0,
            "TL" => self.state.leading = operand(op, 0),
            "Ts" => self.state.rise = operand(op, 0),
            "Td" => self.translate(operand(op, 0), operand(op, 1)),
            "TD" => {
                self.state.leading = -operand(op, 1);
                self.translate(operand(op, 0), operand(op, 1));
            }
            "Tm" => {
                if let Some(m) = matrix_of(&op.operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" | "TJ" => {
                if let Some(obj) = op.operands.first() {
                    self.show(&pieces(obj));
                }
            }
            "'" => {
                self.next_line();
                if let Some(obj) = op.operands.first() {
                    self.show(&pieces(obj));
                }
            }
            "\"" => {
                self.state.word_spacing = operand(op, 0);
                self.state.char_spacing = operand(op, 1);
                self.next_line();
                if let Some(obj) = op.operands.get(2) {
                    self.show(&pieces(obj));
                }
            }
            _ => {}
        }
    }

    /// Interpret a Form XObject named in the current resources
    fn draw_form(&mut self, name: &[u8]) {
        let doc = self.doc;
        let Some(form) = self
            .resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|o| resolve(doc, o).as_stream().ok())
        else {
            return;
        };
        if !matches!(form.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Form") {
            return;
        }
        if self.depth >= MAX_FORM_DEPTH {
            debug!(form = %String::from_utf8_lossy(name), "Form nesting limit reached");
            return;
        }
        let data = form
            .decompressed_content()
            .unwrap_or_else(|_| form.content.clone());
        let Ok(content) = Content::decode(&data) else {
            debug!(form = %String::from_utf8_lossy(name), "Form content could not be decoded");
            return;
        };

        let resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .or(self.resources);
        let matrix = form
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|values| matrix_of(values))
            .unwrap_or(IDENTITY);

        let (ctm, state, tm, tlm, stack_len) =
            (self.ctm, self.state.clone(), self.tm, self.tlm, self.stack.len());
        let outer_fonts = std::mem::replace(&mut self.fonts, resource_fonts(doc, resources));
        let outer_resources = std::mem::replace(&mut self.resources, resources);
        self.ctm = multiply(&matrix, &ctm);
        self.depth += 1;

        self.run(&content.operations);

        self.depth -= 1;
        self.resources = outer_resources;
        self.fonts = outer_fonts;
        self.stack.truncate(stack_len);
        self.ctm = ctm;
        self.state = state;
        self.tm = tm;
        self.tlm = tlm;
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.tlm = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.state.leading);
    }

    fn show(&mut self, pieces: &[Piece]) {
        let state = &self.state;
        let unresolved = FontResource::unresolved();
        let font = state
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&unresolved);

        let mut text = String::new();
        let mut advance = 0.0;
        for piece in pieces {
            match piece {
                Piece::Text(bytes) => {
                    for glyph in font.decoder.decode(bytes) {
                        let width = font.metrics.advance(&glyph) / 1000.0 * state.size;
                        let word_space = !font.decoder.is_composite() && glyph.code == 32;
                        let spacing =
                            state.char_spacing + if word_space { state.word_spacing } else { 0.0 };
                        advance += (width + spacing) * state.h_scale;
                        text.push_str(&glyph.text);
                    }
                }
                Piece::Adjust(n) => {
                    advance -= n / 1000.0 * state.size * state.h_scale;
                    if *n < KERNING_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }

        let line_matrix = multiply(&self.tm, &self.ctm);
        let trm = multiply(
            &[state.size * state.h_scale, 0.0, 0.0, state.size, 0.0, state.rise],
            &line_matrix,
        );
        let width = advance * line_matrix[0].hypot(line_matrix[1]);
        let height = trm[2].hypot(trm[3]);

        self.tm = multiply(&[1.0, 0.0, 0.0, 1.0, advance, 0.0], &self.tm);

        if !text.is_empty() {
            self.runs.push(TextRun::new(text, trm, width, height));
        }
    }
}

fn pieces(obj: &Object) -> Vec<Piece<'_>> {
    match obj {
        Object::String(bytes, _) => vec![Piece::Text(bytes)],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Object::String(bytes, _) => Some(Piece::Text(bytes)),
                other => number(other).map(Piece::Adjust),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn same_baseline(a: &TextRun, b: &TextRun) -> bool {
    let tolerance = (0.5 * a.height.min(b.height)).max(1.0);
    (a.transform[5] - b.transform[5]).abs() <= tolerance
}

/// Flag line ends and insert space runs for visual word gaps
fn finish_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(prev) = out.last_mut() {
            if !same_baseline(prev, &run) {
                prev.has_eol = true;
            } else {
                let prev_end = prev.transform[4] + prev.width;
                let gap = run.transform[4] - prev_end;
                let spaced = prev.text.ends_with(char::is_whitespace)
                    || run.text.starts_with(char::is_whitespace);
                if !spaced && gap > WORD_GAP_RATIO * prev.height {
                    let mut transform = prev.transform;
                    transform[4] = prev_end;
                    let height = prev.height;
                    out.push(TextRun::new(" ", transform, gap, height));
                }
            }
        }
        out.push(run);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};
    use pretty_assertions::assert_eq;

    fn build_doc(
        content: &str,
        resources: impl FnOnce(&mut Document) -> Dictionary,
    ) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let resources = resources(&mut doc);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Parent", pages_id);
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page_id)
    }

    fn doc_with_content(content: &str, font: Dictionary) -> (Document, ObjectId) {
        build_doc(content, |doc| {
            let font_id = doc.add_object(font);
            dictionary! { "Font" => dictionary! { "F1" => font_id } }
        })
    }

    /// Page resources with F1 and a form `Fm1` drawing `form_content`
    fn doc_with_form(
        page_content: &str,
        form_content: &str,
        form_dict: Dictionary,
    ) -> (Document, ObjectId) {
        build_doc(page_content, |doc| {
            let font_id = doc.add_object(helvetica());
            let mut dict = form_dict;
            dict.set("Type", "XObject");
            dict.set("Subtype", "Form");
            dict.set("BBox", vec![0.into(), 0.into(), 612.into(), 792.into()]);
            let form_id = doc.add_object(Stream::new(dict, form_content.as_bytes().to_vec()));
            dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => dictionary! { "Fm1" => form_id },
            }
        })
    }

    fn helvetica() -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        }
    }

    #[test]
    fn test_single_tj_run() {
        let (doc, page_id) =
            doc_with_content("BT /F1 12 Tf 50 700 Td (Hi) Tj ET", helvetica());
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Hi");
        assert_eq!(runs[0].transform, [12.0, 0.0, 0.0, 12.0, 50.0, 700.0]);
        // (722 + 222) / 1000 * 12
        assert!((runs[0].width - 11.328).abs() < 1e-9);
        assert!((runs[0].height - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_widths_array_overrides_metrics() {
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Custom",
            "FirstChar" => 65,
            "LastChar" => 66,
            "Widths" => vec![500.into(), 1000.into()],
        };
        let (doc, page_id) = doc_with_content("BT /F1 10 Tf 0 0 Td (AB) Tj ET", font);
        let runs = extract_runs(&doc, page_id).unwrap();
        assert!((runs[0].width - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_lines_get_eol_flags() {
        let (doc, page_id) = doc_with_content(
            "BT /F1 12 Tf 14 TL 50 700 Td (first line) Tj T* (second line) Tj ET",
            helvetica(),
        );
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].has_eol);
        assert!(!runs[1].has_eol);
        assert_eq!(runs[1].transform[5], 686.0);
    }

    #[test]
    fn test_tj_kerning_inserts_space() {
        let (doc, page_id) = doc_with_content(
            "BT /F1 12 Tf 50 700 Td [(Total:) -250 (due)] TJ ET",
            helvetica(),
        );
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Total: due");
    }

    #[test]
    fn test_gap_between_runs_becomes_space() {
        let (doc, page_id) = doc_with_content(
            "BT /F1 12 Tf 50 700 Td (Total:) Tj 100 0 Td (due) Tj ET",
            helvetica(),
        );
        let runs = extract_runs(&doc, page_id).unwrap();
        let texts: Vec<&str> = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Total:", " ", "due"]);
    }

    #[test]
    fn test_cm_and_graphics_stack() {
        let (doc, page_id) = doc_with_content(
            "q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (A) Tj ET Q BT /F1 10 Tf 10 10 Td (B) Tj ET",
            helvetica(),
        );
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs[0].transform[4], 20.0);
        assert!((runs[0].height - 20.0).abs() < 1e-9);
        assert_eq!(runs[1].transform[4], 10.0);
    }

    #[test]
    fn test_text_inside_form_xobject() {
        let (doc, page_id) = doc_with_form(
            "q /Fm1 Do Q",
            "BT /F1 12 Tf 72 700 Td (Total: $542.10 due Friday) Tj ET",
            Dictionary::new(),
        );
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Total: $542.10 due Friday");
        assert_eq!(runs[0].transform, [12.0, 0.0, 0.0, 12.0, 72.0, 700.0]);
    }

    #[test]
    fn test_form_matrix_and_own_resources() {
        let (doc, page_id) = build_doc("1 0 0 1 0 -100 cm /Fm1 Do BT /F2 10 Tf 5 5 Td (after) Tj ET", |doc| {
            let inner_font = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Custom",
                "FirstChar" => 65,
                "Widths" => vec![1000.into()],
            });
            let page_font = doc.add_object(helvetica());
            let form_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "Matrix" => vec![2.into(), 0.into(), 0.into(), 2.into(), 10.into(), 20.into()],
                    "Resources" => dictionary! { "Font" => dictionary! { "F9" => inner_font } },
                },
                b"BT /F9 10 Tf 0 0 Td (A) Tj ET".to_vec(),
            ));
            dictionary! {
                "Font" => dictionary! { "F2" => page_font },
                "XObject" => dictionary! { "Fm1" => form_id },
            }
        });
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs[0].text, "A");
        assert_eq!(runs[0].transform, [20.0, 0.0, 0.0, 20.0, 10.0, -80.0]);
        assert!((runs[0].width - 20.0).abs() < 1e-9);
        // Graphics state is restored after the form
        assert_eq!(runs.last().unwrap().text, "after");
        assert_eq!(runs.last().unwrap().transform[5], -95.0);
    }

    #[test]
    fn test_self_referencing_form_stops_at_depth_limit() {
        let (doc, page_id) = doc_with_form("/Fm1 Do", "BT /F1 12 Tf (x) Tj ET /Fm1 Do", Dictionary::new());
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs.len(), MAX_FORM_DEPTH);
    }

    #[test]
    fn test_image_xobject_is_skipped() {
        let (doc, page_id) = build_doc("/Im1 Do BT /F1 12 Tf (Hi) Tj ET", |doc| {
            let font_id = doc.add_object(helvetica());
            let image_id = doc.add_object(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Image" },
                vec![0u8; 4],
            ));
            dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => dictionary! { "Im1" => image_id },
            }
        });
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Hi");
    }

    #[test]
    fn test_win_ansi_apostrophe_decodes() {
        let mut font = helvetica();
        font.set("Encoding", "WinAnsiEncoding");
        let (doc, page_id) =
            doc_with_content("BT /F1 12 Tf 50 700 Td (Tenant\\222s) Tj ET", font);
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs[0].text, "Tenant\u{2019}s");
        // T e n a n t ' s: 611 + 556 + 556 + 556 + 556 + 278 + 222 + 500
        assert!((runs[0].width - 3.835 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_composite_font_uses_to_unicode_and_cid_widths() {
        let cmap = "1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
                    2 beginbfchar <0001> <0048> <0002> <0069> endbfchar";
        let (doc, page_id) = build_doc("BT /F1 10 Tf 0 0 Td <00010002> Tj ET", |doc| {
            let cmap_id = doc.add_object(Stream::new(Dictionary::new(), cmap.as_bytes().to_vec()));
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => "Embedded",
                "Encoding" => "Identity-H",
                "ToUnicode" => cmap_id,
                "DescendantFonts" => vec![Object::Dictionary(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "CIDFontType2",
                    "DW" => 1000,
                    "W" => vec![Object::Integer(1), Object::Array(vec![500.into(), 600.into()])],
                })],
            });
            dictionary! { "Font" => dictionary! { "F1" => font_id } }
        });
        let runs = extract_runs(&doc, page_id).unwrap();
        assert_eq!(runs[0].text, "Hi");
        assert!((runs[0].width - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_reports_pages_and_viewport() {
        let (doc, _) = doc_with_content("BT /F1 12 Tf 50 700 Td (Hi) Tj ET", helvetica());
        let source = LopdfTextSource::new(&doc, 2.0);
        assert_eq!(source.page_count(), 1);
        let page = source.page_text(0);
        assert_eq!(page.viewport.width, 1224.0);
        assert_eq!(page.runs.len(), 1);
        assert!(source.page_text(5).runs.is_empty());
    }
}
