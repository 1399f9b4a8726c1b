//! Review Export
//!
//! PDF side of the annotation review engine: text-run extraction feeding
//! [`anchor_core`], burned-in highlight overlays, the generated summary
//! report and the page merge that puts the report in front of the
//! annotated document.
//!
//! ```no_run
//! use review_export::{ReviewExporter, SummaryPayload};
//! # fn run(bytes: &[u8], annotations: &[anchor_core::Annotation], labels: &[anchor_core::Label], payload: &SummaryPayload) -> Result<(), review_export::ExportError> {
//! let mut exporter = ReviewExporter::default();
//! let exported = exporter.export(bytes, annotations, labels, payload)?;
//! # let _ = exported;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod merge;
pub mod metrics;
pub mod overlay;
pub mod pdf;
pub mod report;

pub use anchor_core::{find_match, match_annotation, Anchored, PageIndex, TextMatch};
pub use config::{ExportConfig, ReportConfig};
pub use error::ExportError;
pub use extract::LopdfTextSource;
pub use merge::prepend_pages;
pub use overlay::{plan_overlay, write_overlay, OverlayMark};
pub use report::{
    build_summary, build_summary_with_layout, LayoutWarning, SummaryLayout, SummaryPayload,
};

use anchor_core::{
    anchor_annotation, index_document, AnchorCache, Annotation, DocumentVersion, EngineConfig,
    Label, TextSource,
};
use tracing::{debug, info, instrument};

/// Build the searchable text index of every page
#[instrument(skip_all, fields(len = bytes.len()))]
pub fn index_pages(bytes: &[u8], config: &EngineConfig) -> Result<Vec<PageIndex>, ExportError> {
    let doc = pdf::load_document(bytes)?;
    let source = LopdfTextSource::new(&doc, config.render_scale);
    Ok(index_document(&source))
}

/// Index a single zero-based page
pub fn index_page(
    bytes: &[u8],
    page_index: usize,
    config: &EngineConfig,
) -> Result<PageIndex, ExportError> {
    let doc = pdf::load_document(bytes)?;
    let source = LopdfTextSource::new(&doc, config.render_scale);
    if page_index >= source.page_count() {
        return Err(ExportError::PageNotFound(page_index as u32 + 1));
    }
    Ok(PageIndex::build(page_index, source.page_text(page_index)))
}

/// Burn highlights for every non-rejected annotation into a copy of `bytes`
pub fn overlay_annotations(
    bytes: &[u8],
    annotations: &[Annotation],
    pages: &[PageIndex],
    labels: &[Label],
) -> Result<Vec<u8>, ExportError> {
    let config = ExportConfig::default();
    let mut cache = AnchorCache::new();
    let version = DocumentVersion::from_bytes(bytes);
    let marks = plan_overlay(annotations, pages, labels, &config.engine, &mut cache, &version);
    write_overlay(bytes, &marks, pages, config.highlight_opacity)
}

/// Prepend report pages to a document
pub fn prepend_summary(report: &[u8], document: &[u8]) -> Result<Vec<u8>, ExportError> {
    prepend_pages(report, document)
}

/// Build the summary report and put it in front of `overlaid`
pub fn build_and_prepend_summary(
    overlaid: &[u8],
    payload: &SummaryPayload,
) -> Result<Vec<u8>, ExportError> {
    let report = build_summary(payload, &ReportConfig::default())?;
    prepend_summary(&report, overlaid)
}

/// Export session holding configuration and the coordinate cache
#[derive(Debug, Default)]
pub struct ReviewExporter {
    config: ExportConfig,
    cache: AnchorCache,
}

impl ReviewExporter {
    pub fn new(config: ExportConfig) -> Result<Self, ExportError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: AnchorCache::new(),
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnchorCache {
        &self.cache
    }

    pub fn index_pages(&self, bytes: &[u8]) -> Result<Vec<PageIndex>, ExportError> {
        index_pages(bytes, &self.config.engine)
    }

    /// Memoise coordinates and colour on every anchorable annotation
    ///
    /// Returns the ids of annotations that could not be located.
    pub fn anchor_all(
        &mut self,
        bytes: &[u8],
        annotations: &mut [Annotation],
        pages: &[PageIndex],
        labels: &[Label],
    ) -> Vec<String> {
        let version = DocumentVersion::from_bytes(bytes);
        let mut unanchored = Vec::new();
        for annotation in annotations.iter_mut() {
            match anchor_annotation(annotation, pages, labels, &self.config.engine, &mut self.cache, &version) {
                Ok(anchored) => {
                    annotation.coords = Some(anchored.coords);
                    annotation.color = Some(anchored.color);
                }
                Err(e) => {
                    debug!(error = %e, "Annotation left without geometry");
                    unanchored.push(annotation.id.clone());
                }
            }
        }
        unanchored
    }

    /// Overlay using this session's configuration and cache
    pub fn overlay(
        &mut self,
        bytes: &[u8],
        annotations: &[Annotation],
        pages: &[PageIndex],
        labels: &[Label],
    ) -> Result<Vec<u8>, ExportError> {
        let version = DocumentVersion::from_bytes(bytes);
        let marks = plan_overlay(
            annotations,
            pages,
            labels,
            &self.config.engine,
            &mut self.cache,
            &version,
        );
        write_overlay(bytes, &marks, pages, self.config.highlight_opacity)
    }

    /// Index, overlay and prepend the summary report in one pass
    #[instrument(skip_all, fields(annotations = annotations.len()))]
    pub fn export(
        &mut self,
        bytes: &[u8],
        annotations: &[Annotation],
        labels: &[Label],
        payload: &SummaryPayload,
    ) -> Result<Vec<u8>, ExportError> {
        let pages = self.index_pages(bytes)?;
        let overlaid = self.overlay(bytes, annotations, &pages, labels)?;
        let (report, layout) = build_summary_with_layout(payload, &self.config.report)?;
        let merged = prepend_pages(&report, &overlaid)?;
        info!(
            report_pages = layout.page_count,
            document_pages = pages.len(),
            "Export complete"
        );
        Ok(merged)
    }

    /// Forget cached geometry for one document
    pub fn invalidate(&mut self, bytes: &[u8]) -> usize {
        self.cache.invalidate(&DocumentVersion::from_bytes(bytes))
    }
}
