use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Content source unreachable or returned malformed pages. Aborts the run.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A record is missing a property or the property has an unexpected type.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The contributions database has no checkbox column for the current month.
    #[error("Contributions database has no '{0}' column")]
    MissingEligibilityColumn(String),

    /// Download, resize or upload of a single companion picture failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// Upload of the roster feed failed. Aborts the run.
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<notion_client::NotionError> for SyncError {
    fn from(err: notion_client::NotionError) -> Self {
        SyncError::UpstreamUnavailable(err.to_string())
    }
}

impl From<image::ImageError> for SyncError {
    fn from(err: image::ImageError) -> Self {
        SyncError::ImageProcessing(err.to_string())
    }
}
