//! Annotation anchoring: text match, geometry and colour in one step

use crate::cache::{AnchorCache, DocumentVersion};
use crate::color::resolve_label_color;
use crate::config::EngineConfig;
use crate::error::AnchorError;
use crate::geometry::boxes_for_match;
use crate::matcher::find_match;
use crate::text_index::PageIndex;
use crate::types::{Annotation, AnnotationColor, AnnotationCoord, Label};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Highlight geometry and colour of an anchored annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchored {
    pub coords: Vec<AnnotationCoord>,
    pub color: AnnotationColor,
}

/// Locate `text` in the indexed pages and build its highlight boxes
///
/// Returns `None` when the text cannot be found or the match has no visible
/// extent.
pub fn match_annotation(
    pages: &[PageIndex],
    text: &str,
    label_id: &str,
    labels: &[Label],
    config: &EngineConfig,
) -> Option<Anchored> {
    let m = find_match(pages, text, &config.matching)?;
    let coords: Vec<AnnotationCoord> = boxes_for_match(&m, &config.merge)
        .into_iter()
        .map(|bounding_rect| AnnotationCoord {
            page_index: m.page_index,
            bounding_rect,
        })
        .collect();
    if coords.is_empty() {
        debug!(page = m.page_index, "Match has no visible extent");
        return None;
    }
    Some(Anchored {
        coords,
        color: resolve_label_color(label_id, labels),
    })
}

/// Resolve an annotation's geometry and colour
///
/// The annotation's own memoised `coords` win, then the cache, then a fresh
/// match. Fresh results, including misses, are written to the cache.
///
/// # Errors
///
/// Returns [`AnchorError::Unanchorable`] when the annotation text cannot be
/// located in the document.
#[instrument(skip_all, fields(annotation = %annotation.id))]
pub fn anchor_annotation(
    annotation: &Annotation,
    pages: &[PageIndex],
    labels: &[Label],
    config: &EngineConfig,
    cache: &mut AnchorCache,
    version: &DocumentVersion,
) -> Result<Anchored, AnchorError> {
    if let Some(coords) = annotation.coords.as_ref().filter(|c| !c.is_empty()) {
        let color = annotation
            .color
            .clone()
            .unwrap_or_else(|| resolve_label_color(&annotation.label_id, labels));
        return Ok(Anchored {
            coords: coords.clone(),
            color,
        });
    }

    let cached = match cache.get(version, &annotation.id) {
        Some(hit) => hit.clone(),
        None => {
            let fresh = match_annotation(pages, &annotation.text, &annotation.label_id, labels, config);
            cache.insert(version.clone(), annotation.id.clone(), fresh.clone());
            fresh
        }
    };

    cached.ok_or_else(|| AnchorError::Unanchorable {
        annotation_id: annotation.id.clone(),
    })
}
