use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("Source already exists: {0}")]
    DuplicateSource(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Layer already exists: {0}")]
    DuplicateLayer(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer '{layer}' references missing source '{source_id}'")]
    MissingLayerSource { layer: String, source_id: String },
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
