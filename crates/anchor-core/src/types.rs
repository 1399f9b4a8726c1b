//! Shared data model for text anchoring and annotation geometry

use serde::{Deserialize, Serialize};

/// One contiguous piece of extracted text sharing a single font transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// Text rendering matrix `[a, b, c, d, e, f]` in page space
    pub transform: [f64; 6],
    /// Advance width in page units
    pub width: f64,
    /// Line height in page units
    pub height: f64,
    /// The run is the last one on its line
    #[serde(default)]
    pub has_eol: bool,
}

impl TextRun {
    pub fn new(text: impl Into<String>, transform: [f64; 6], width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            transform,
            width,
            height,
            has_eol: false,
        }
    }

    pub fn with_eol(mut self, has_eol: bool) -> Self {
        self.has_eol = has_eol;
        self
    }

    /// Number of characters (not bytes) in the run
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Axis-aligned rectangle in viewport pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Build a rectangle from two opposite corners in any order
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// One highlight rectangle on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationCoord {
    /// Zero-based page index
    pub page_index: usize,
    pub bounding_rect: Rect,
}

/// Display colour of a label in the three shapes drawing code needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationColor {
    /// RGB components in the 0-1 range
    pub rgb: [f32; 3],
    /// `#rrggbb`
    pub hex: String,
    /// CSS `rgba(...)` with highlight alpha
    pub translucent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    Pending,
    Accepted,
    Rejected,
}

/// An AI-proposed annotation under human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub text: String,
    pub label_id: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub status: AnnotationStatus,
    /// Memoised geometry from an earlier anchoring pass
    #[serde(default)]
    pub coords: Option<Vec<AnnotationCoord>>,
    /// Memoised colour from an earlier anchoring pass
    #[serde(default)]
    pub color: Option<AnnotationColor>,
}

impl Annotation {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        label_id: impl Into<String>,
        status: AnnotationStatus,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            label_id: label_id.into(),
            rationale: String::new(),
            confidence: None,
            status,
            coords: None,
            color: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn is_rejected(&self) -> bool {
        self.status == AnnotationStatus::Rejected
    }
}

/// A label definition from the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// Either a `#rrggbb` hex string or a palette token such as `blue` or `bg-blue-500`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            desc: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Find the label an annotation refers to, by id first and then by name
pub fn find_label<'a>(labels: &'a [Label], label_id: &str) -> Option<&'a Label> {
    labels
        .iter()
        .find(|l| l.id == label_id)
        .or_else(|| labels.iter().find(|l| l.name == label_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_corners_normalizes() {
        let r = Rect::from_corners(10.0, 20.0, 4.0, 2.0);
        assert_eq!(r, Rect::new(4.0, 2.0, 6.0, 18.0));
    }

    #[test]
    fn test_rect_new_clamps_negative_extents() {
        let r = Rect::new(1.0, 1.0, -3.0, -4.0);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.height, 0.0);
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(15.0, 2.0, 5.0, 12.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 20.0, 14.0));
    }

    #[test]
    fn test_annotation_deserializes_camel_case() {
        let json = r#"{
            "id": "a1",
            "text": "$542.10",
            "labelId": "Amount",
            "rationale": "Invoice total",
            "status": "accepted"
        }"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.label_id, "Amount");
        assert_eq!(annotation.status, AnnotationStatus::Accepted);
        assert!(annotation.coords.is_none());
        assert!(annotation.confidence.is_none());
    }

    #[test]
    fn test_find_label_by_id_then_name() {
        let labels = vec![
            Label::new("l1", "Amount"),
            Label::new("l2", "Due date"),
        ];
        assert_eq!(find_label(&labels, "l2").unwrap().name, "Due date");
        assert_eq!(find_label(&labels, "Amount").unwrap().id, "l1");
        assert!(find_label(&labels, "Missing").is_none());
    }

    #[test]
    fn test_char_len_counts_chars() {
        let run = TextRun::new("café", [1.0, 0.0, 0.0, 1.0, 0.0, 0.0], 20.0, 10.0);
        assert_eq!(run.char_len(), 4);
        assert_eq!(run.text.len(), 5);
    }
}
