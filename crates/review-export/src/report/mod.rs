//! Multi-page summary report
//!
//! Blocks are laid out by [`layout::Paginator`] and the resulting page
//! operations are assembled into a standalone PDF using the standard
//! Helvetica fonts.

mod blocks;
pub mod layout;
pub mod payload;

pub use layout::{BlockKind, LayoutWarning, PlacedBlock, SummaryLayout};
pub use payload::{
    LabelSummary, RuleDefinition, RuleEvaluation, SummaryPayload, SummaryStats, Verdict,
};

use crate::config::ReportConfig;
use crate::error::ExportError;
use crate::metrics::Font;
use crate::pdf::{real, save_document, text_string};
use layout::{Paginator, ReportPages};
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use tracing::{info, instrument};

/// Lay out the report without producing bytes
pub fn layout_summary(payload: &SummaryPayload, config: &ReportConfig) -> ReportPages {
    let mut p = Paginator::new(config.clone(), payload.document_name.clone());
    blocks::title(&mut p, payload);
    blocks::metadata(&mut p, payload);
    blocks::heading(&mut p, "Overview", 64.0);
    blocks::stat_cards(&mut p, payload);
    blocks::label_table(&mut p, &payload.labels);
    blocks::rule_cards(&mut p, payload);
    p.finish()
}

/// Build the report PDF
pub fn build_summary(payload: &SummaryPayload, config: &ReportConfig) -> Result<Vec<u8>, ExportError> {
    build_summary_with_layout(payload, config).map(|(bytes, _)| bytes)
}

/// Build the report PDF and return its layout trace alongside
#[instrument(skip_all, fields(document = %payload.document_name))]
pub fn build_summary_with_layout(
    payload: &SummaryPayload,
    config: &ReportConfig,
) -> Result<(Vec<u8>, SummaryLayout), ExportError> {
    config.validate()?;
    let ReportPages { layout, pages } = layout_summary(payload, config);
    let mut doc = render(&pages, config, payload)?;
    let bytes = save_document(&mut doc)?;
    info!(
        pages = layout.page_count,
        blocks = layout.blocks.len(),
        warnings = layout.warnings.len(),
        "Summary report built"
    );
    Ok((bytes, layout))
}

fn font_dictionary(font: Font) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn render(
    pages: &[Vec<lopdf::content::Operation>],
    config: &ReportConfig,
    payload: &SummaryPayload,
) -> Result<Document, ExportError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(font_dictionary(Font::Helvetica));
    let bold = doc.add_object(font_dictionary(Font::HelveticaBold));

    let media_box: Vec<Object> = vec![
        real(0.0),
        real(0.0),
        real(config.page_width),
        real(config.page_height),
    ];

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content {
            operations: operations.clone(),
        };
        let encoded = content
            .encode()
            .map_err(|e| ExportError::WriteError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    Font::Helvetica.resource_name() => regular,
                    Font::HelveticaBold.resource_name() => bold,
                },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&format!("{} - {}", layout::REPORT_TITLE, payload.document_name)),
        "Producer" => text_string(concat!("review-export ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();
    Ok(doc)
}
