use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorError {
    #[error("Annotation {annotation_id} could not be anchored in the document text")]
    Unanchorable { annotation_id: String },

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}
