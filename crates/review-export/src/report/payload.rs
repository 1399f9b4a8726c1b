//! Summary report input
//!
//! A read-only snapshot of the review, built by the caller or derived from
//! annotations and labels with [`SummaryPayload::from_review`].

use anchor_core::types::find_label;
use anchor_core::{Annotation, AnnotationStatus, Label};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub document_name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub labels: Vec<LabelSummary>,
    pub stats: SummaryStats,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub rule_evaluations: Vec<RuleEvaluation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
    /// Annotations with highlight geometry
    #[serde(default)]
    pub anchored: usize,
}

/// One row of the label breakdown table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub accepted: usize,
    #[serde(default)]
    pub rejected: usize,
    #[serde(default)]
    pub pending: usize,
}

impl LabelSummary {
    pub fn from_label(label: &Label) -> Self {
        Self {
            id: label.id.clone(),
            name: label.name.clone(),
            color: label.color.clone(),
            desc: label.desc.clone(),
            total: 0,
            accepted: 0,
            rejected: 0,
            pending: 0,
        }
    }

    /// Label definition used to resolve the swatch colour
    pub fn as_label(&self) -> Label {
        Label {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            desc: self.desc.clone(),
        }
    }

    fn count(&mut self, status: AnnotationStatus) {
        self.total += 1;
        match status {
            AnnotationStatus::Accepted => self.accepted += 1,
            AnnotationStatus::Rejected => self.rejected += 1,
            AnnotationStatus::Pending => self.pending += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    #[serde(alias = "n/a", alias = "not_applicable")]
    Na,
}

impl Verdict {
    pub fn badge(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Na => "N/A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluation {
    pub rule_id: String,
    pub verdict: Verdict,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl SummaryPayload {
    /// Parse a payload from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Derive statistics and the label breakdown from review state
    ///
    /// Annotations whose label is not among `labels` get a row of their own,
    /// named after the label reference.
    pub fn from_review(
        document_name: impl Into<String>,
        version: impl Into<String>,
        generated_at: DateTime<Utc>,
        annotations: &[Annotation],
        labels: &[Label],
    ) -> Self {
        let mut rows: Vec<LabelSummary> = labels.iter().map(LabelSummary::from_label).collect();
        let mut stats = SummaryStats::default();

        for annotation in annotations {
            stats.total += 1;
            match annotation.status {
                AnnotationStatus::Accepted => stats.accepted += 1,
                AnnotationStatus::Rejected => stats.rejected += 1,
                AnnotationStatus::Pending => stats.pending += 1,
            }
            if annotation.coords.as_ref().is_some_and(|c| !c.is_empty()) {
                stats.anchored += 1;
            }

            let id = find_label(labels, &annotation.label_id)
                .map(|l| l.id.clone())
                .unwrap_or_else(|| annotation.label_id.clone());
            let row = match rows.iter().position(|r| r.id == id) {
                Some(i) => &mut rows[i],
                None => {
                    rows.push(LabelSummary::from_label(&Label::new(id.clone(), id)));
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            row.count(annotation.status);
        }

        Self {
            document_name: document_name.into(),
            project_name: None,
            model_name: None,
            generated_at,
            version: version.into(),
            labels: rows,
            stats,
            rules: Vec::new(),
            rule_evaluations: Vec::new(),
        }
    }

    pub fn rule(&self, rule_id: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.id == rule_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_core::{AnnotationCoord, Rect};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_from_review_counts() {
        let mut anchored = Annotation::new("a1", "$10", "l1", AnnotationStatus::Accepted);
        anchored.coords = Some(vec![AnnotationCoord {
            page_index: 0,
            bounding_rect: Rect::new(0.0, 0.0, 1.0, 1.0),
        }]);
        let annotations = vec![
            anchored,
            Annotation::new("a2", "x", "Amount", AnnotationStatus::Rejected),
            Annotation::new("a3", "y", "Party", AnnotationStatus::Pending),
        ];
        let labels = vec![Label::new("l1", "Amount"), Label::new("l2", "Date")];

        let payload = SummaryPayload::from_review("lease.pdf", "0.1.0", at(), &annotations, &labels);
        assert_eq!(
            payload.stats,
            SummaryStats {
                total: 3,
                accepted: 1,
                rejected: 1,
                pending: 1,
                anchored: 1,
            }
        );
        assert_eq!(payload.labels.len(), 3);
        assert_eq!(payload.labels[0].total, 2);
        assert_eq!(payload.labels[0].rejected, 1);
        assert_eq!(payload.labels[1].total, 0);
        assert_eq!(payload.labels[2].name, "Party");
        assert_eq!(payload.labels[2].pending, 1);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "documentName": "lease.pdf",
            "generatedAt": "2026-03-14T09:30:00Z",
            "version": "0.1.0",
            "stats": {"total": 0, "accepted": 0, "rejected": 0, "pending": 0},
            "ruleEvaluations": [
                {"ruleId": "r1", "verdict": "n/a", "citations": ["p. 2"]}
            ]
        }"#;
        let payload = SummaryPayload::from_json(json).unwrap();
        assert_eq!(payload.generated_at, at());
        assert!(payload.labels.is_empty());
        assert_eq!(payload.rule_evaluations[0].verdict, Verdict::Na);
        assert_eq!(payload.rule_evaluations[0].verdict.badge(), "N/A");
    }
}
