//! Page-to-display coordinate transformation
//!
//! PDF page space has its origin at the bottom-left and y growing upwards.
//! Display (viewport) space has its origin at the top-left, y growing
//! downwards, and is scaled by the render scale. Every highlight rectangle the
//! engine produces lives in viewport space.

use crate::types::Rect;
use serde::{Deserialize, Serialize};

/// 2D affine matrix `[a, b, c, d, e, f]` using the PDF row-vector convention:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
pub type Matrix = [f64; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Multiply two affine matrices (`m1` applied first, then `m2`)
pub fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Apply an affine matrix to a point
pub fn apply(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Invert an affine matrix. Returns `None` for degenerate matrices.
pub fn invert(m: &Matrix) -> Option<Matrix> {
    let det = m[0] * m[3] - m[1] * m[2];
    if det.abs() < f64::EPSILON {
        return None;
    }
    Some([
        m[3] / det,
        -m[1] / det,
        -m[2] / det,
        m[0] / det,
        (m[2] * m[5] - m[3] * m[4]) / det,
        (m[1] * m[4] - m[0] * m[5]) / det,
    ])
}

/// Display viewport of a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Viewport width in display pixels
    pub width: f64,
    /// Viewport height in display pixels
    pub height: f64,
    /// Render scale (display pixels per PDF point)
    pub scale: f64,
    /// Page rotation in degrees (0, 90, 180 or 270)
    pub rotation: i32,
    /// Page space to viewport space transform
    pub transform: Matrix,
}

impl Viewport {
    /// Build a viewport for a page
    ///
    /// `media_box` is `[x1, y1, x2, y2]` in page space. Rotation values that
    /// are not a multiple of 90 are treated as 0.
    pub fn new(media_box: [f64; 4], scale: f64, rotation: i32) -> Self {
        let [x1, y1, x2, y2] = media_box;
        let rotation = rotation.rem_euclid(360);
        let (ra, rb, rc, rd) = match rotation {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };
        let rotation = if matches!(rotation, 90 | 180 | 270) {
            rotation
        } else {
            0
        };

        let center_x = (x1 + x2) / 2.0;
        let center_y = (y1 + y2) / 2.0;

        let (offset_x, offset_y, width, height) = if ra == 0.0 {
            (
                (center_y - y1).abs() * scale,
                (center_x - x1).abs() * scale,
                (y2 - y1).abs() * scale,
                (x2 - x1).abs() * scale,
            )
        } else {
            (
                (center_x - x1).abs() * scale,
                (center_y - y1).abs() * scale,
                (x2 - x1).abs() * scale,
                (y2 - y1).abs() * scale,
            )
        };

        let transform = [
            ra * scale,
            rb * scale,
            rc * scale,
            rd * scale,
            offset_x - ra * scale * center_x - rc * scale * center_y,
            offset_y - rb * scale * center_x - rd * scale * center_y,
        ];

        Self {
            width,
            height,
            scale,
            rotation,
            transform,
        }
    }

    pub fn to_viewport_point(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.transform, x, y)
    }

    /// Map a viewport point back into page space
    pub fn to_page_point(&self, x: f64, y: f64) -> (f64, f64) {
        match invert(&self.transform) {
            Some(inv) => apply(&inv, x, y),
            None => (x, y),
        }
    }

    /// Project a page-space rectangle `[x1, y1, x2, y2]` into viewport space
    pub fn to_viewport_rect(&self, page_rect: [f64; 4]) -> Rect {
        let (ax, ay) = self.to_viewport_point(page_rect[0], page_rect[1]);
        let (bx, by) = self.to_viewport_point(page_rect[2], page_rect[3]);
        Rect::from_corners(ax, ay, bx, by)
    }

    /// Project a viewport rectangle back into page space as `[x1, y1, x2, y2]`
    /// with `x1 <= x2` and `y1 <= y2`
    pub fn to_page_rect(&self, rect: &Rect) -> [f64; 4] {
        let (ax, ay) = self.to_page_point(rect.x, rect.y);
        let (bx, by) = self.to_page_point(rect.x + rect.width, rect.y + rect.height);
        [ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)]
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn rotation() -> impl Strategy<Value = i32> {
        prop_oneof![Just(0), Just(90), Just(180), Just(270)]
    }

    proptest! {
        /// Property: page -> viewport -> page returns the original point
        #[test]
        fn roundtrip_page_viewport_page(
            w in dimension(),
            h in dimension(),
            scale in 0.25f64..4.0,
            rot in rotation(),
        ) {
            let vp = Viewport::new([0.0, 0.0, w, h], scale, rot);
            let (px, py) = (w / 3.0, h / 4.0);
            let (vx, vy) = vp.to_viewport_point(px, py);
            let (bx, by) = vp.to_page_point(vx, vy);
            prop_assert!((bx - px).abs() < 1e-6, "X: {} vs {}", bx, px);
            prop_assert!((by - py).abs() < 1e-6, "Y: {} vs {}", by, py);
        }

        /// Property: every page corner lands inside the viewport bounds
        #[test]
        fn corners_inside_viewport(
            w in dimension(),
            h in dimension(),
            scale in 0.25f64..4.0,
            rot in rotation(),
        ) {
            let vp = Viewport::new([0.0, 0.0, w, h], scale, rot);
            for (x, y) in [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)] {
                let (vx, vy) = vp.to_viewport_point(x, y);
                prop_assert!(vx > -1e-6 && vx < vp.width + 1e-6);
                prop_assert!(vy > -1e-6 && vy < vp.height + 1e-6);
            }
        }
    }
}
