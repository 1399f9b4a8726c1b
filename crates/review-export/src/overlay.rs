//! Burn highlights and comment markers into a copy of the document
//!
//! Every touched page gets one extra content stream holding all of its
//! highlight fills. The original content is wrapped in `q`/`Q` so whatever
//! graphics state it leaves behind cannot leak into the overlay. Each
//! annotation also gets a `/Text` comment annotation at the top-left corner
//! of its first highlight box.

use crate::error::ExportError;
use crate::pdf::{dict_value, inherited, load_document, page_ids, real, resolve, save_document, text_string};
use anchor_core::{
    anchor_annotation, AnchorCache, Annotation, AnnotationColor, AnnotationCoord, DocumentVersion,
    EngineConfig, Label, PageIndex,
};
use anchor_core::types::find_label;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// ExtGState resource name of the highlight fill state
const HIGHLIGHT_GS: &str = "GSAnchorHighlight";

/// Side length of the comment marker in points
const MARKER_SIZE: f64 = 18.0;

/// Everything needed to draw one annotation
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMark {
    pub annotation_id: String,
    pub coords: Vec<AnnotationCoord>,
    pub color: AnnotationColor,
    pub label: String,
    pub rationale: String,
}

impl OverlayMark {
    fn comment(&self) -> String {
        if self.rationale.trim().is_empty() {
            self.label.clone()
        } else {
            format!("{}: {}", self.label, self.rationale)
        }
    }
}

/// Resolve geometry for every non-rejected annotation
///
/// Unanchorable annotations are left out and logged; they never fail the
/// batch.
pub fn plan_overlay(
    annotations: &[Annotation],
    pages: &[PageIndex],
    labels: &[Label],
    config: &EngineConfig,
    cache: &mut AnchorCache,
    version: &DocumentVersion,
) -> Vec<OverlayMark> {
    annotations
        .iter()
        .filter(|a| !a.is_rejected())
        .filter_map(|a| {
            match anchor_annotation(a, pages, labels, config, cache, version) {
                Ok(anchored) => Some(OverlayMark {
                    annotation_id: a.id.clone(),
                    coords: anchored.coords,
                    color: anchored.color,
                    label: find_label(labels, &a.label_id)
                        .map(|l| l.name.clone())
                        .unwrap_or_else(|| a.label_id.clone()),
                    rationale: a.rationale.clone(),
                }),
                Err(e) => {
                    debug!(annotation = %a.id, error = %e, "Skipping overlay");
                    None
                }
            }
        })
        .collect()
}

/// Draw `marks` into a copy of `bytes`
///
/// `pages` supplies the viewport each mark's coordinates were computed in.
/// Marks on pages missing from either the document or `pages` are skipped.
#[instrument(skip_all, fields(marks = marks.len()))]
pub fn write_overlay(
    bytes: &[u8],
    marks: &[OverlayMark],
    pages: &[PageIndex],
    opacity: f32,
) -> Result<Vec<u8>, ExportError> {
    let mut doc = load_document(bytes)?;
    let page_ids = page_ids(&doc);

    let mut by_page: BTreeMap<usize, Vec<(&AnnotationCoord, &AnnotationColor)>> = BTreeMap::new();
    for mark in marks {
        for coord in &mark.coords {
            by_page
                .entry(coord.page_index)
                .or_default()
                .push((coord, &mark.color));
        }
    }

    let mut drawn = 0;
    for (page_index, boxes) in &by_page {
        let (Some(&page_id), Some(page)) = (page_ids.get(*page_index), pages.get(*page_index)) else {
            debug!(page = page_index, "Highlight page out of range");
            continue;
        };
        let mut ops = vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(HIGHLIGHT_GS.as_bytes().to_vec())]),
        ];
        let mut current: Option<[f32; 3]> = None;
        for (coord, color) in boxes {
            if current != Some(color.rgb) {
                let [r, g, b] = color.rgb;
                ops.push(Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]));
                current = Some(color.rgb);
            }
            let [x1, y1, x2, y2] = page.viewport.to_page_rect(&coord.bounding_rect);
            ops.push(Operation::new(
                "re",
                vec![real(x1), real(y1), real(x2 - x1), real(y2 - y1)],
            ));
            ops.push(Operation::new("f", vec![]));
            drawn += 1;
        }
        ops.push(Operation::new("Q", vec![]));

        register_highlight_state(&mut doc, page_id, opacity)?;
        wrap_page_content(&mut doc, page_id, ops)?;
    }

    for mark in marks {
        let Some(first) = mark.coords.first() else {
            continue;
        };
        let (Some(&page_id), Some(page)) = (page_ids.get(first.page_index), pages.get(first.page_index)) else {
            continue;
        };
        let rect = &first.bounding_rect;
        let (x, y) = page.viewport.to_page_point(rect.x, rect.y);
        add_comment(&mut doc, page_id, (x, y), mark)?;
    }

    info!(highlights = drawn, pages = by_page.len(), "Wrote annotation overlay");
    save_document(&mut doc)
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ExportError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ExportError::MalformedDocument(e.to_string()))
}

/// Give the page its own resource dictionary with the highlight ExtGState
fn register_highlight_state(doc: &mut Document, page_id: ObjectId, opacity: f32) -> Result<(), ExportError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();
    let mut states = dict_value(doc, &resources, b"ExtGState").unwrap_or_default();

    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
        "BM" => "Multiply",
    });
    states.set(HIGHLIGHT_GS, gs_id);
    resources.set("ExtGState", states);

    page_dict_mut(doc, page_id)?.set("Resources", resources);
    Ok(())
}

/// Prepend a `q` stream and append the overlay stream to the page contents
fn wrap_page_content(doc: &mut Document, page_id: ObjectId, overlay: Vec<Operation>) -> Result<(), ExportError> {
    let existing: Vec<Object> = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| ExportError::MalformedDocument(e.to_string()))?;
        match page.get(b"Contents") {
            Ok(obj @ Object::Reference(_)) => match resolve(doc, obj) {
                Object::Array(items) => items.clone(),
                _ => vec![obj.clone()],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };

    let mut prefix = Content {
        operations: vec![Operation::new("q", vec![])],
    }
    .encode()
    .map_err(|e| ExportError::WriteError(e.to_string()))?;
    prefix.push(b'\n');
    // Streams are concatenated as-is by some readers; keep the first
    // operator clear of the original content's last token
    let mut body = vec![b'\n'];
    body.extend(
        Content { operations: overlay }
            .encode()
            .map_err(|e| ExportError::WriteError(e.to_string()))?,
    );

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), prefix));
    let body_id = doc.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(body_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn add_comment(doc: &mut Document, page_id: ObjectId, at: (f64, f64), mark: &OverlayMark) -> Result<(), ExportError> {
    let (x, y) = at;
    let [r, g, b] = mark.color.rgb;
    let annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Text",
        "Name" => "Comment",
        "Rect" => vec![real(x), real(y), real(x + MARKER_SIZE), real(y + MARKER_SIZE)],
        "T" => text_string(&mark.label),
        "Contents" => text_string(&mark.comment()),
        "NM" => text_string(&mark.annotation_id),
        "C" => vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        "F" => 4,
        "P" => page_id,
    };
    let annot_id = doc.add_object(annot);
    add_annotation_to_page(doc, page_id, annot_id)
}

fn add_annotation_to_page(doc: &mut Document, page_id: ObjectId, annot_id: ObjectId) -> Result<(), ExportError> {
    let mut annots = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| ExportError::MalformedDocument(e.to_string()))?;
        match page.get(b"Annots").map(|obj| resolve(doc, obj)) {
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };
    annots.push(Object::Reference(annot_id));
    page_dict_mut(doc, page_id)?.set("Annots", Object::Array(annots));
    Ok(())
}
