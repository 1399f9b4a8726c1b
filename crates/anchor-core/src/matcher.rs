//! Locate free text inside indexed pages
//!
//! Pages are searched in order and the first page with a match wins. On each
//! page the matcher tries, in order:
//!
//! 1. an exact substring of the strict projection;
//! 2. an exact substring of the compact projection;
//! 3. a head/tail fuzzy match on the compact projection, accepted only when
//!    the spanned text is at most `max_span_ratio` times the needle length.
//!
//! Steps 2 and 3 only run for compact needles of at least `min_fuzzy_chars`
//! characters. Short strings either match strictly or not at all.

use crate::config::MatchConfig;
use crate::text_index::{normalize_compact, normalize_strict, PageIndex, Projection};
use crate::types::TextRun;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which step of the search produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    Strict,
    Compact,
    HeadTail,
}

/// A located span of text on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    pub page_index: usize,
    /// Index of `runs[0]` within the page
    pub first_run: usize,
    /// Contiguous slice of page runs covered by the match
    pub runs: Vec<TextRun>,
    pub viewport: Viewport,
    /// Character offset of the match start within `runs[0]`
    pub start_offset: usize,
    /// Exclusive character offset of the match end within the last run
    pub end_offset: usize,
    pub strategy: MatchStrategy,
}

impl TextMatch {
    /// Text covered by the match, with line breaks joined the same way the
    /// strict projection joins them
    pub fn matched_text(&self) -> String {
        let last = self.runs.len().saturating_sub(1);
        let mut out = String::new();
        for (i, run) in self.runs.iter().enumerate() {
            let chars: Vec<char> = run.text.chars().collect();
            let start = if i == 0 { self.start_offset } else { 0 };
            let end = if i == last {
                self.end_offset.min(chars.len())
            } else {
                chars.len()
            };
            if start < end {
                out.extend(&chars[start..end]);
            }
            if i != last && run.has_eol {
                if out.ends_with('-') {
                    out.pop();
                } else {
                    out.push(' ');
                }
            }
        }
        out
    }
}

/// Span of projection characters, both ends inclusive
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

/// Find `needle` in the indexed pages
///
/// Returns `None` when the text cannot be anchored on any page.
pub fn find_match(pages: &[PageIndex], needle: &str, config: &MatchConfig) -> Option<TextMatch> {
    let strict_needle = normalize_strict(needle);
    let compact_needle = normalize_compact(needle);
    if strict_needle.is_empty() && compact_needle.is_empty() {
        return None;
    }

    for page in pages {
        if let Some(found) = match_page(page, &strict_needle, &compact_needle, config) {
            return Some(found);
        }
    }

    debug!(
        needle_chars = compact_needle.chars().count(),
        pages = pages.len(),
        "No anchor found for text"
    );
    None
}

fn match_page(
    page: &PageIndex,
    strict_needle: &str,
    compact_needle: &str,
    config: &MatchConfig,
) -> Option<TextMatch> {
    if let Some(span) = exact_span(&page.strict, strict_needle) {
        return to_match(page, &page.strict, span, MatchStrategy::Strict);
    }

    let needle_len = compact_needle.chars().count();
    if needle_len == 0 || needle_len < config.min_fuzzy_chars {
        return None;
    }

    if let Some(span) = exact_span(&page.compact, compact_needle) {
        return to_match(page, &page.compact, span, MatchStrategy::Compact);
    }

    let span = head_tail_span(&page.compact, compact_needle, needle_len, config)?;
    to_match(page, &page.compact, span, MatchStrategy::HeadTail)
}

fn exact_span(projection: &Projection, needle: &str) -> Option<Span> {
    let start = projection.find(needle)?;
    let len = needle.chars().count();
    Some(Span {
        start,
        end: start + len - 1,
    })
}

/// Match the needle's head fragment, then its tail fragment after it, and
/// accept the covered span when it is not much longer than the needle
fn head_tail_span(
    projection: &Projection,
    needle: &str,
    needle_len: usize,
    config: &MatchConfig,
) -> Option<Span> {
    let frag = config.fragment_len(needle_len);
    let head: String = needle.chars().take(frag).collect();
    let tail: String = needle.chars().skip(needle_len - frag).collect();
    let max_span = needle_len as f64 * config.max_span_ratio;

    let mut from = 0;
    while let Some(head_pos) = projection.find_from(&head, from) {
        // No tail after this head means no tail after any later head either
        let tail_pos = projection.find_from(&tail, head_pos + frag)?;
        let span_len = tail_pos + frag - head_pos;
        if span_len as f64 <= max_span {
            return Some(Span {
                start: head_pos,
                end: tail_pos + frag - 1,
            });
        }
        from = head_pos + 1;
    }
    None
}

fn to_match(
    page: &PageIndex,
    projection: &Projection,
    span: Span,
    strategy: MatchStrategy,
) -> Option<TextMatch> {
    let start = *projection.map.get(span.start)?;
    let end = *projection.map.get(span.end)?;
    if end.run < start.run {
        return None;
    }
    Some(TextMatch {
        page_index: page.page_index,
        first_run: start.run,
        runs: page.runs[start.run..=end.run].to_vec(),
        viewport: page.viewport.clone(),
        start_offset: start.offset,
        end_offset: end.offset + 1,
        strategy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_index::PageText;

    fn run(text: &str, y: f64) -> TextRun {
        TextRun::new(
            text,
            [12.0, 0.0, 0.0, 12.0, 72.0, y],
            text.chars().count() as f64 * 6.0,
            12.0,
        )
    }

    fn page(index: usize, runs: Vec<TextRun>) -> PageIndex {
        PageIndex::build(
            index,
            PageText {
                runs,
                viewport: Viewport::new([0.0, 0.0, 612.0, 792.0], 1.0, 0),
            },
        )
    }

    fn cfg() -> MatchConfig {
        MatchConfig::default()
    }

    #[test]
    fn test_strict_match_single_run() {
        let pages = vec![page(0, vec![run("Total: $542.10 due Friday", 700.0)])];
        let m = find_match(&pages, "$542.10", &cfg()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Strict);
        assert_eq!(m.page_index, 0);
        assert_eq!(m.runs.len(), 1);
        assert_eq!(m.start_offset, 7);
        assert_eq!(m.end_offset, 14);
        assert_eq!(m.matched_text(), "$542.10");
    }

    #[test]
    fn test_strict_match_is_case_and_space_insensitive() {
        let pages = vec![page(0, vec![run("Payment   DUE on Friday", 700.0)])];
        let m = find_match(&pages, "payment due", &cfg()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Strict);
        assert_eq!(m.matched_text(), "Payment   DUE");
    }

    #[test]
    fn test_strict_match_spans_runs() {
        let pages = vec![page(
            0,
            vec![
                run("The quick brown", 700.0).with_eol(true),
                run("fox jumps", 686.0),
            ],
        )];
        let m = find_match(&pages, "brown fox", &cfg()).unwrap();
        assert_eq!(m.first_run, 0);
        assert_eq!(m.runs.len(), 2);
        assert_eq!(m.start_offset, 10);
        assert_eq!(m.end_offset, 3);
        assert_eq!(m.matched_text(), "brown fox");
    }

    #[test]
    fn test_hyphenated_wrap_matches_whole_word() {
        let pages = vec![page(
            0,
            vec![run("confiden-", 700.0).with_eol(true), run("tial terms", 686.0)],
        )];
        let m = find_match(&pages, "confidential", &cfg()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Strict);
        assert_eq!(m.matched_text(), "confidential");
    }

    #[test]
    fn test_short_needle_never_fuzzy() {
        // Compact text contains "54210" but the strict form does not match
        let pages = vec![page(0, vec![run("Total: 542 . 10 due", 700.0)])];
        assert!(find_match(&pages, "$542.10", &cfg()).is_none());
    }

    #[test]
    fn test_compact_match_absorbs_ocr_spacing() {
        let pages = vec![page(
            0,
            vec![run("Termi nation fee is pay-able within 30 days", 700.0)],
        )];
        let m = find_match(&pages, "termination fee is payable", &cfg()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Compact);
        assert_eq!(m.start_offset, 0);
        assert_eq!(m.matched_text(), "Termi nation fee is pay-able");
    }

    #[test]
    fn test_head_tail_match_tolerates_noise() {
        // One garbled character in the middle defeats exact matching
        let pages = vec![page(
            0,
            vec![run("The tenant shall pay the lamdlord monthly rent on time", 700.0)],
        )];
        let m = find_match(&pages, "the tenant shall pay the landlord monthly rent", &cfg())
            .unwrap();
        assert_eq!(m.strategy, MatchStrategy::HeadTail);
        assert_eq!(m.start_offset, 0);
        assert!(m.matched_text().ends_with("monthly rent"));
    }

    #[test]
    fn test_head_tail_rejects_overlong_span() {
        let filler = "unrelated words ".repeat(10);
        let text = format!("alpha beta gamma {}delta epsilon zeta", filler);
        let pages = vec![page(0, vec![run(&text, 700.0)])];
        assert!(find_match(&pages, "alpha beta gamma delta epsilon zeta", &cfg()).is_none());
    }

    #[test]
    fn test_head_tail_skips_distant_repeated_head() {
        let filler = "x".repeat(80);
        let text = format!(
            "alpha beta gamma {} alpha beta gamma dleta epsilon zeta",
            filler
        );
        let pages = vec![page(0, vec![run(&text, 700.0)])];
        let m = find_match(&pages, "alpha beta gamma delta epsilon zeta", &cfg()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::HeadTail);
        assert!(m.start_offset > 80);
    }

    #[test]
    fn test_first_page_wins() {
        let pages = vec![
            page(0, vec![run("nothing here", 700.0)]),
            page(1, vec![run("Amount due: $10", 700.0)]),
            page(2, vec![run("Amount due: $10", 700.0)]),
        ];
        let m = find_match(&pages, "amount due", &cfg()).unwrap();
        assert_eq!(m.page_index, 1);
    }

    #[test]
    fn test_empty_needle_and_empty_pages() {
        let pages = vec![page(0, vec![])];
        assert!(find_match(&pages, "anything at all, really long text", &cfg()).is_none());
        let pages = vec![page(0, vec![run("text", 700.0)])];
        assert!(find_match(&pages, "  ...  ", &cfg()).is_none());
    }
}
