use demuxprims_frame::SourceId;
use demuxprims_registry::RegistryError;

/// Errors reported synchronously by the dispatcher.
///
/// Per-frame failures never surface here; they become
/// [`ParseOutcome`](crate::ParseOutcome)s.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A batch with no images was submitted.
    #[error("batch contains no frame images")]
    EmptyBatch,

    /// An image with no bytes was submitted.
    #[error("frame image from {source_id} is empty")]
    EmptyImage { source_id: SourceId },

    /// The parser configuration is unusable.
    #[error("invalid parser configuration: {0}")]
    InvalidConfig(String),

    /// Frame type registry error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// JSON configuration could not be read.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
