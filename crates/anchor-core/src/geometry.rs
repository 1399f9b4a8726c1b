//! Highlight geometry from matched runs
//!
//! Character widths are approximated as `run.width / run.char_len()`, which is
//! accurate enough for runs drawn in a single font and size. Each clipped run
//! becomes one page-space rectangle that is projected into viewport space;
//! the per-run rectangles are then merged into one box per visual line.

use crate::config::MergeConfig;
use crate::matcher::TextMatch;
use crate::types::{Rect, TextRun};
use crate::viewport::Viewport;
use std::cmp::Ordering;

/// Viewport rectangles covering `runs`, clipped to start at `start_offset`
/// in the first run and end (exclusive) at `end_offset` in the last run
pub fn compute_boxes(
    runs: &[TextRun],
    viewport: &Viewport,
    start_offset: usize,
    end_offset: usize,
) -> Vec<Rect> {
    let last = runs.len().saturating_sub(1);
    let mut boxes = Vec::with_capacity(runs.len());

    for (i, run) in runs.iter().enumerate() {
        let len = run.char_len();
        if len == 0 {
            continue;
        }
        let from = if i == 0 { start_offset.min(len) } else { 0 };
        let to = if i == last { end_offset.min(len) } else { len };
        if to <= from {
            continue;
        }

        let char_width = run.width / len as f64;
        let [_, _, _, scale_y, tx, ty] = run.transform;
        let x = tx + from as f64 * char_width;
        let width = (to - from) as f64 * char_width;
        let height = scale_y.abs();

        let rect = viewport.to_viewport_rect([x, ty, x + width, ty + height]);
        if rect.area() > 0.0 {
            boxes.push(rect);
        }
    }
    boxes
}

/// Merged highlight boxes for a text match
pub fn boxes_for_match(m: &TextMatch, merge: &MergeConfig) -> Vec<Rect> {
    let boxes = compute_boxes(&m.runs, &m.viewport, m.start_offset, m.end_offset);
    merge_boxes(&boxes, merge.gap_window(m.viewport.scale))
}

fn same_row(a: &Rect, b: &Rect) -> bool {
    (a.center_y() - b.center_y()).abs() < 0.5 * a.height.min(b.height)
}

/// Group rectangles into rows, top to bottom. Returns `(row, rect)` pairs.
fn assign_rows(rects: &[Rect]) -> Vec<(usize, Rect)> {
    let mut by_center: Vec<Rect> = rects.to_vec();
    by_center.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

    let mut rows = Vec::with_capacity(by_center.len());
    let mut row = 0;
    let mut anchor: Option<Rect> = None;
    for rect in by_center {
        match anchor {
            Some(a) if same_row(&a, &rect) => {}
            Some(_) => {
                row += 1;
                anchor = Some(rect);
            }
            None => anchor = Some(rect),
        }
        rows.push((row, rect));
    }
    rows
}

/// Merge rectangles into reading-order line boxes
///
/// Rectangles are ordered by row, then by x. A rectangle joins the running
/// box when it sits on the same row and its horizontal gap to the box lies
/// strictly inside `gap_window`.
pub fn merge_boxes(rects: &[Rect], gap_window: (f64, f64)) -> Vec<Rect> {
    if rects.len() < 2 {
        return rects.to_vec();
    }
    let (min_gap, max_gap) = gap_window;

    let mut rows = assign_rows(rects);
    rows.sort_by(|(ra, a), (rb, b)| match ra.cmp(rb) {
        Ordering::Equal => a.x.total_cmp(&b.x),
        other => other,
    });

    let mut merged = Vec::new();
    let mut iter = rows.into_iter();
    let Some((mut acc_row, mut acc)) = iter.next() else {
        return merged;
    };

    for (row, rect) in iter {
        let gap = rect.x - acc.right();
        if row == acc_row && gap > min_gap && gap < max_gap {
            acc = acc.union(&rect);
        } else {
            merged.push(acc);
            acc = rect;
            acc_row = row;
        }
    }
    merged.push(acc);
    merged
}
