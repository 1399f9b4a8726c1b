//! Text anchoring for document annotations
//!
//! Locates free text inside a document's extracted text layer and turns the
//! match into viewport-space highlight boxes with a stable label colour.
//! This crate is format independent: text runs come from any [`TextSource`].
//!
//! Pipeline: [`index_document`] → [`find_match`] → [`boxes_for_match`], with
//! [`match_annotation`] and [`anchor_annotation`] wrapping all three.

pub mod anchor;
pub mod cache;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod matcher;
pub mod style;
pub mod text_index;
pub mod types;
pub mod viewport;

pub use anchor::{anchor_annotation, match_annotation, Anchored};
pub use cache::{AnchorCache, DocumentVersion};
pub use color::{color_from_name, resolve_color, resolve_label_color};
pub use config::{EngineConfig, MatchConfig, MergeConfig};
pub use error::AnchorError;
pub use geometry::{boxes_for_match, compute_boxes, merge_boxes};
pub use matcher::{find_match, MatchStrategy, TextMatch};
pub use style::{highlight_style, HighlightStyle};
pub use text_index::{index_document, PageIndex, PageText, Projection, TextSource};
pub use types::{
    Annotation, AnnotationColor, AnnotationCoord, AnnotationStatus, Label, Rect, TextRun,
};
pub use viewport::Viewport;
