//! Report content blocks
//!
//! Each block measures itself, reserves space through the paginator and
//! then draws at the returned top edge.

use super::layout::{BlockKind, Paginator, Rgb, MUTED, REPORT_TITLE, RULE, TEXT};
use super::payload::{LabelSummary, RuleEvaluation, SummaryPayload, Verdict};
use crate::metrics::{truncate_to_width, wrap_text, Font};
use anchor_core::resolve_color;

pub const BLOCK_GAP: f64 = 12.0;
pub const ROW_HEIGHT: f64 = 22.0;

const TITLE_HEIGHT: f64 = 48.0;
const META_LINE: f64 = 14.0;
const HEADING_HEIGHT: f64 = 24.0;
const CARD_HEIGHT: f64 = 64.0;
const CARD_GAP: f64 = 12.0;

const CARD_PADDING: f64 = 10.0;
const CARD_HEADER: f64 = 22.0;
const LINE_HEIGHT: f64 = 12.0;

const NUMBER_COLUMN: f64 = 46.0;
const SWATCH: f64 = 10.0;

const PASS: Rgb = [0.09, 0.64, 0.29];
const FAIL: Rgb = [0.86, 0.15, 0.15];
const WHITE: Rgb = [1.0, 1.0, 1.0];

pub fn title(p: &mut Paginator, payload: &SummaryPayload) {
    p.ensure_space(TITLE_HEIGHT);
    let top = p.place(BlockKind::Title, TITLE_HEIGHT);
    let left = p.left();
    let width = p.content_width();
    p.text(Font::HelveticaBold, 20.0, left, top - 20.0, REPORT_TITLE, TEXT);
    let name = truncate_to_width(&payload.document_name, Font::Helvetica, 11.0, width);
    p.text(Font::Helvetica, 11.0, left, top - 38.0, &name, MUTED);
    p.gap(BLOCK_GAP);
}

pub fn metadata(p: &mut Paginator, payload: &SummaryPayload) {
    let mut lines: Vec<(&str, String)> = Vec::new();
    if let Some(project) = &payload.project_name {
        lines.push(("Project", project.clone()));
    }
    if let Some(model) = &payload.model_name {
        lines.push(("Model", model.clone()));
    }
    lines.push((
        "Generated",
        payload.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    ));
    lines.push(("Engine version", payload.version.clone()));

    let height = lines.len() as f64 * META_LINE;
    p.ensure_space(height);
    let top = p.place(BlockKind::Metadata, height);
    let left = p.left();
    let value_width = p.content_width() - 90.0;
    for (i, (key, value)) in lines.iter().enumerate() {
        let y = top - 10.0 - i as f64 * META_LINE;
        p.text(Font::HelveticaBold, 9.0, left, y, key, MUTED);
        let value = truncate_to_width(value, Font::Helvetica, 9.0, value_width);
        p.text(Font::Helvetica, 9.0, left + 90.0, y, &value, TEXT);
    }
    p.gap(BLOCK_GAP);
}

/// Section heading, kept on the same page as at least `follow` points of content
pub fn heading(p: &mut Paginator, text: &str, follow: f64) {
    p.ensure_space(HEADING_HEIGHT + follow);
    let top = p.place(BlockKind::SectionHeading, HEADING_HEIGHT);
    let left = p.left();
    let right = left + p.content_width();
    p.text(Font::HelveticaBold, 13.0, left, top - 15.0, text, TEXT);
    p.hline(left, right, top - 21.0, RULE);
}

pub fn stat_cards(p: &mut Paginator, payload: &SummaryPayload) {
    let stats = &payload.stats;
    let share = |n: usize| {
        if stats.total == 0 {
            0
        } else {
            (n * 100 + stats.total / 2) / stats.total
        }
    };
    let cards = [
        ("Total", stats.total, format!("{} pending", stats.pending)),
        (
            "Accepted",
            stats.accepted,
            format!("{} anchored", stats.anchored),
        ),
        (
            "Rejected",
            stats.rejected,
            format!("{}% of total", share(stats.rejected)),
        ),
    ];

    p.ensure_space(CARD_HEIGHT);
    let top = p.place(BlockKind::StatCards, CARD_HEIGHT);
    let card_width = (p.content_width() - 2.0 * CARD_GAP) / 3.0;
    for (i, (caption, value, sub)) in cards.iter().enumerate() {
        let x = p.left() + i as f64 * (card_width + CARD_GAP);
        p.stroke_rect(x, top - CARD_HEIGHT, card_width, CARD_HEIGHT, RULE);
        p.text(Font::Helvetica, 9.0, x + 10.0, top - 16.0, caption, MUTED);
        p.text(Font::HelveticaBold, 20.0, x + 10.0, top - 40.0, &value.to_string(), TEXT);
        p.text(Font::Helvetica, 8.0, x + 10.0, top - 55.0, sub, MUTED);
    }
    p.gap(BLOCK_GAP);
}

struct Columns {
    swatch_x: f64,
    name_x: f64,
    name_width: f64,
    desc_x: f64,
    desc_width: f64,
    /// Right edges of Total, Accepted, Rejected, Pending
    numbers: [f64; 4],
}

impl Columns {
    fn new(p: &Paginator) -> Self {
        let left = p.left();
        let right = left + p.content_width();
        let numbers_left = right - 4.0 * NUMBER_COLUMN;
        let name_x = left + 4.0 + SWATCH + 8.0;
        let name_width = (p.content_width() * 0.22).max(40.0);
        let desc_x = name_x + name_width + 8.0;
        Self {
            swatch_x: left + 4.0,
            name_x,
            name_width,
            desc_x,
            desc_width: (numbers_left - desc_x - 8.0).max(0.0),
            numbers: [
                numbers_left + NUMBER_COLUMN - 4.0,
                numbers_left + 2.0 * NUMBER_COLUMN - 4.0,
                numbers_left + 3.0 * NUMBER_COLUMN - 4.0,
                right - 4.0,
            ],
        }
    }
}

/// Label breakdown table. Rows are atomic; the header is not repeated after a
/// page break.
pub fn label_table(p: &mut Paginator, labels: &[LabelSummary]) {
    let cols = Columns::new(p);
    let left = p.left();
    let right = left + p.content_width();

    heading(p, "Labels", 2.0 * ROW_HEIGHT);
    p.ensure_space(2.0 * ROW_HEIGHT);
    let top = p.place(BlockKind::TableHeader, ROW_HEIGHT);
    let y = top - 14.0;
    p.text(Font::HelveticaBold, 9.0, cols.name_x, y, "Label", MUTED);
    p.text(Font::HelveticaBold, 9.0, cols.desc_x, y, "Description", MUTED);
    for (right_edge, caption) in cols
        .numbers
        .iter()
        .zip(["Total", "Accepted", "Rejected", "Pending"])
    {
        p.text_right(Font::HelveticaBold, 9.0, *right_edge, y, caption, MUTED);
    }
    p.hline(left, right, top - ROW_HEIGHT, RULE);

    if labels.is_empty() {
        p.ensure_space(ROW_HEIGHT);
        let top = p.place(BlockKind::TableRow, ROW_HEIGHT);
        p.text(Font::Helvetica, 9.0, cols.name_x, top - 14.0, "No labels defined", MUTED);
        p.gap(BLOCK_GAP);
        return;
    }

    for label in labels {
        p.ensure_space(ROW_HEIGHT);
        let top = p.place(BlockKind::TableRow, ROW_HEIGHT);
        let y = top - 14.0;
        let color = resolve_color(&label.as_label());
        p.fill_rect(cols.swatch_x, top - 16.0, SWATCH, SWATCH, color.rgb);

        let name = truncate_to_width(&label.name, Font::HelveticaBold, 9.0, cols.name_width);
        p.text(Font::HelveticaBold, 9.0, cols.name_x, y, &name, TEXT);
        if let Some(desc) = label.desc.as_deref().filter(|d| !d.trim().is_empty()) {
            let desc = truncate_to_width(desc, Font::Helvetica, 9.0, cols.desc_width);
            p.text(Font::Helvetica, 9.0, cols.desc_x, y, &desc, MUTED);
        }
        let counts = [label.total, label.accepted, label.rejected, label.pending];
        for (right_edge, count) in cols.numbers.iter().zip(counts) {
            p.text_right(Font::Helvetica, 9.0, *right_edge, y, &count.to_string(), TEXT);
        }
        p.hline(left, right, top - ROW_HEIGHT, RULE);
    }
    p.gap(BLOCK_GAP);
}

struct CardLine {
    font: Font,
    size: f64,
    indent: f64,
    text: String,
    color: Rgb,
}

struct RuleCard {
    id: String,
    name: String,
    verdict: Verdict,
    lines: Vec<CardLine>,
}

impl RuleCard {
    fn measure(payload: &SummaryPayload, evaluation: &RuleEvaluation, width: f64) -> Self {
        let rule = payload.rule(&evaluation.rule_id);
        let name = rule
            .map(|r| r.name.clone())
            .unwrap_or_else(|| evaluation.rule_id.clone());
        let inner = width - 2.0 * CARD_PADDING;

        let mut lines = Vec::new();
        let mut push = |font: Font, size: f64, indent: f64, text: String, color: Rgb| {
            lines.push(CardLine {
                font,
                size,
                indent,
                text,
                color,
            })
        };

        if let Some(rule) = rule {
            for line in wrap_text(&rule.logic, Font::Helvetica, 9.0, inner) {
                push(Font::Helvetica, 9.0, 0.0, line, MUTED);
            }
        }
        for line in wrap_text(&evaluation.rationale, Font::Helvetica, 10.0, inner) {
            push(Font::Helvetica, 10.0, 0.0, line, TEXT);
        }
        if !evaluation.citations.is_empty() {
            push(Font::HelveticaBold, 9.0, 0.0, "Citations".to_string(), MUTED);
            for citation in &evaluation.citations {
                let wrapped = wrap_text(citation, Font::Helvetica, 9.0, inner - 10.0);
                for (i, line) in wrapped.into_iter().enumerate() {
                    let text = if i == 0 { format!("- {}", line) } else { line };
                    let indent = if i == 0 { 0.0 } else { 10.0 };
                    push(Font::Helvetica, 9.0, indent, text, TEXT);
                }
            }
        }

        Self {
            id: evaluation.rule_id.clone(),
            name,
            verdict: evaluation.verdict,
            lines,
        }
    }

    fn height(&self) -> f64 {
        2.0 * CARD_PADDING + CARD_HEADER + self.lines.len() as f64 * LINE_HEIGHT
    }
}

fn verdict_color(verdict: Verdict) -> Rgb {
    match verdict {
        Verdict::Pass => PASS,
        Verdict::Fail => FAIL,
        Verdict::Na => MUTED,
    }
}

fn card_header(p: &mut Paginator, card: &RuleCard, top: f64) {
    let left = p.left() + CARD_PADDING;
    let right = p.left() + p.content_width() - CARD_PADDING;
    let badge = card.verdict.badge();
    let badge_width = Font::HelveticaBold.text_width(badge, 8.0) + 12.0;
    let name_width = right - left - badge_width - 8.0;
    let name = truncate_to_width(&card.name, Font::HelveticaBold, 11.0, name_width);
    p.text(Font::HelveticaBold, 11.0, left, top - CARD_PADDING - 12.0, &name, TEXT);
    p.fill_rect(
        right - badge_width,
        top - CARD_PADDING - 15.0,
        badge_width,
        14.0,
        verdict_color(card.verdict),
    );
    p.text(
        Font::HelveticaBold,
        8.0,
        right - badge_width + 6.0,
        top - CARD_PADDING - 11.0,
        badge,
        WHITE,
    );
}

fn draw_line(p: &mut Paginator, line: &CardLine, top: f64) {
    let x = p.left() + CARD_PADDING + line.indent;
    p.text(line.font, line.size, x, top - 9.0, &line.text, line.color);
}

/// One card per rule evaluation, or a note when there are none
pub fn rule_cards(p: &mut Paginator, payload: &SummaryPayload) {
    heading(p, "Rules", ROW_HEIGHT);
    if payload.rule_evaluations.is_empty() {
        p.ensure_space(ROW_HEIGHT);
        let top = p.place(BlockKind::Note, ROW_HEIGHT);
        let left = p.left();
        p.text(Font::Helvetica, 9.0, left, top - 14.0, "No rule evaluations", MUTED);
        return;
    }

    let width = p.content_width();
    for evaluation in &payload.rule_evaluations {
        let card = RuleCard::measure(payload, evaluation, width);
        let height = card.height();
        if height > p.content_height() {
            flow_card(p, &card, height);
        } else {
            p.ensure_space(height);
            let top = p.place(BlockKind::RuleCard, height);
            p.stroke_rect(p.left(), top - height, width, height, RULE);
            card_header(p, &card, top);
            let mut y = top - CARD_PADDING - CARD_HEADER;
            for line in &card.lines {
                draw_line(p, line, y);
                y -= LINE_HEIGHT;
            }
        }
        p.gap(BLOCK_GAP);
    }
}

/// Draw a card taller than a page line by line across as many pages as needed
fn flow_card(p: &mut Paginator, card: &RuleCard, height: f64) {
    p.warn_overflow(format!("rule:{}", card.id), height);
    p.ensure_space(CARD_PADDING + CARD_HEADER + LINE_HEIGHT);
    let top = p.place(BlockKind::RuleCard, CARD_PADDING + CARD_HEADER);
    card_header(p, card, top);
    for line in &card.lines {
        p.ensure_space(LINE_HEIGHT);
        let top = p.cursor();
        draw_line(p, line, top);
        p.advance(LINE_HEIGHT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::report::payload::{RuleDefinition, SummaryStats};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn payload() -> SummaryPayload {
        SummaryPayload {
            document_name: "lease.pdf".to_string(),
            project_name: Some("Leases".to_string()),
            model_name: None,
            generated_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            version: "0.1.0".to_string(),
            labels: Vec::new(),
            stats: SummaryStats::default(),
            rules: vec![RuleDefinition {
                id: "r1".to_string(),
                name: "Rent is stated".to_string(),
                logic: "Passes when a monthly amount is annotated".to_string(),
            }],
            rule_evaluations: Vec::new(),
        }
    }

    fn paginator() -> Paginator {
        Paginator::new(ReportConfig::default(), "lease.pdf")
    }

    #[test]
    fn test_card_height_counts_wrapped_lines() {
        let mut payload = payload();
        payload.rule_evaluations.push(RuleEvaluation {
            rule_id: "r1".to_string(),
            verdict: Verdict::Pass,
            rationale: "Found on page 1".to_string(),
            citations: vec!["p. 1".to_string(), "p. 3".to_string()],
        });
        let card = RuleCard::measure(&payload, &payload.rule_evaluations[0], 516.0);
        // logic, rationale, caption, two citations
        assert_eq!(card.lines.len(), 5);
        assert_eq!(card.name, "Rent is stated");
        assert_eq!(card.height(), 2.0 * CARD_PADDING + CARD_HEADER + 5.0 * LINE_HEIGHT);
    }

    #[test]
    fn test_unknown_rule_uses_id_as_name() {
        let payload = payload();
        let evaluation = RuleEvaluation {
            rule_id: "r9".to_string(),
            verdict: Verdict::Na,
            rationale: String::new(),
            citations: Vec::new(),
        };
        let card = RuleCard::measure(&payload, &evaluation, 516.0);
        assert_eq!(card.name, "r9");
        assert!(card.lines.is_empty());
    }

    #[test]
    fn test_metadata_skips_missing_fields() {
        let mut p = paginator();
        metadata(&mut p, &payload());
        let pages = p.finish();
        let block = pages.layout.blocks_of(BlockKind::Metadata).next().cloned();
        // project, generated, version
        assert_eq!(block.map(|b| b.height), Some(3.0 * META_LINE));
    }

    #[test]
    fn test_empty_table_has_placeholder_row() {
        let mut p = paginator();
        label_table(&mut p, &[]);
        let pages = p.finish();
        assert_eq!(pages.layout.blocks_of(BlockKind::TableRow).count(), 1);
    }

    #[test]
    fn test_oversized_card_flows_with_warning() {
        let mut payload = payload();
        payload.rule_evaluations.push(RuleEvaluation {
            rule_id: "r1".to_string(),
            verdict: Verdict::Fail,
            rationale: String::new(),
            citations: (0..80).map(|i| format!("Clause {}", i)).collect(),
        });
        let mut p = paginator();
        rule_cards(&mut p, &payload);
        let pages = p.finish();
        assert_eq!(pages.layout.warnings.len(), 1);
        assert!(pages.layout.page_count >= 2);
    }
}
