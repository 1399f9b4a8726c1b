use anchor_core::AnchorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to parse PDF: {0}")]
    MalformedDocument(String),

    #[error("Page {0} not found")]
    PageNotFound(u32),

    #[error("Failed to write PDF: {0}")]
    WriteError(String),

    #[error("Invalid export configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Anchor(#[from] AnchorError),
}
