//! Render-time highlight styling
//!
//! Styling is a pure function of the annotation id, the currently active id
//! and the label colour. Nothing is stored on the highlight itself.

use crate::color::HIGHLIGHT_ALPHA;
use crate::types::AnnotationColor;
use serde::{Deserialize, Serialize};

const ACTIVE_ALPHA: f32 = 0.55;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightStyle {
    /// CSS fill colour
    pub background: String,
    /// CSS outline, only set for the active annotation
    pub outline: Option<String>,
    pub z_index: u32,
    pub active: bool,
}

pub fn highlight_style(
    annotation_id: &str,
    active_id: Option<&str>,
    color: &AnnotationColor,
) -> HighlightStyle {
    let active = active_id == Some(annotation_id);
    let [r, g, b] = color.rgb.map(|c| (c * 255.0).round() as u8);
    if active {
        HighlightStyle {
            background: format!("rgba({}, {}, {}, {})", r, g, b, ACTIVE_ALPHA),
            outline: Some(format!("2px solid {}", color.hex)),
            z_index: 2,
            active,
        }
    } else {
        HighlightStyle {
            background: format!("rgba({}, {}, {}, {})", r, g, b, HIGHLIGHT_ALPHA),
            outline: None,
            z_index: 1,
            active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inactive_uses_translucent_fill() {
        let color = AnnotationColor::from_rgb8([59, 130, 246]);
        let style = highlight_style("a1", Some("a2"), &color);
        assert_eq!(style.background, color.translucent);
        assert_eq!(style.outline, None);
        assert!(!style.active);
    }

    #[test]
    fn test_active_gets_outline() {
        let color = AnnotationColor::from_rgb8([59, 130, 246]);
        let style = highlight_style("a1", Some("a1"), &color);
        assert!(style.active);
        assert_eq!(style.background, "rgba(59, 130, 246, 0.55)");
        assert_eq!(style.outline.as_deref(), Some("2px solid #3b82f6"));
        assert!(style.z_index > highlight_style("a1", None, &color).z_index);
    }
}
