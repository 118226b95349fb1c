use std::sync::Arc;

use tracing::info;

use crate::error::{Result, SyncError};
use crate::traits::ObjectSink;
use crate::types::PublishedCompanion;

/// Well-known path the static site reads the roster from.
pub const FEED_PATH: &str = "companions.json";

/// Compact JSON array, field order as declared on `PublishedCompanion`.
pub fn render(roster: &[PublishedCompanion]) -> Result<Vec<u8>> {
    serde_json::to_vec(roster).map_err(|e| SyncError::Publish(format!("serialize roster: {e}")))
}

/// Writes the roster feed, replacing the previous version wholesale.
pub struct Publisher {
    sink: Arc<dyn ObjectSink>,
}

impl Publisher {
    pub fn new(sink: Arc<dyn ObjectSink>) -> Self {
        Self { sink }
    }

    /// Returns the number of bytes written.
    pub async fn publish(&self, roster: &[PublishedCompanion]) -> Result<usize> {
        let body = render(roster)?;
        let bytes = body.len();

        self.sink
            .put(FEED_PATH, body, "application/json")
            .await
            .map_err(|e| SyncError::Publish(e.to_string()))?;

        info!(companions = roster.len(), bytes, path = FEED_PATH, "Published roster");
        Ok(bytes)
    }
}
