use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::eligibility::{eligible_companions, month_key};
use crate::error::Result;
use crate::images::{ImageRefresher, ImageStats};
use crate::projector::{is_publishable, project_roster};
use crate::publisher::Publisher;
use crate::sanitizer::scrub_keywords;
use crate::traits::{ContentSource, ImageFetcher, ObjectSink};
use crate::types::CompanionRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Publish the feed only; leave pictures untouched.
    pub skip_images: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub month_key: String,
    pub contributions: u32,
    pub eligible: u32,
    pub banned_keywords: u32,
    pub companions_fetched: u32,
    pub published: u32,
    pub keywords_removed: u32,
    /// `None` when the picture refresh was skipped.
    pub images: Option<ImageStats>,
    pub feed_bytes: usize,
}

impl std::fmt::Display for SyncStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Companion Sync Complete ===")?;
        writeln!(f, "Month:              {}", self.month_key)?;
        writeln!(f, "Contributions:      {}", self.contributions)?;
        writeln!(f, "Eligible:           {}", self.eligible)?;
        writeln!(f, "Companions fetched: {}", self.companions_fetched)?;
        writeln!(f, "Published:          {}", self.published)?;
        writeln!(f, "Banned keywords:    {}", self.banned_keywords)?;
        writeln!(f, "Keywords removed:   {}", self.keywords_removed)?;
        match &self.images {
            Some(images) => writeln!(
                f,
                "Pictures:           {} refreshed, {} failed",
                images.refreshed, images.failed
            )?,
            None => writeln!(f, "Pictures:           skipped")?,
        }
        write!(f, "Feed size:          {} bytes", self.feed_bytes)
    }
}

/// One full refresh: fetch, filter, project, refresh pictures, scrub, publish.
///
/// Independent of how it is triggered; the binary drives it either once or
/// on a `Schedule`.
pub struct SyncPipeline {
    source: Arc<dyn ContentSource>,
    images: ImageRefresher,
    publisher: Publisher,
}

impl SyncPipeline {
    pub fn new(
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn ObjectSink>,
        fetcher: Arc<dyn ImageFetcher>,
        image_concurrency: usize,
    ) -> Self {
        Self {
            source,
            images: ImageRefresher::new(fetcher, sink.clone(), image_concurrency),
            publisher: Publisher::new(sink),
        }
    }

    /// Run once as of `now`. Upstream, schema and publish failures abort the
    /// run; picture failures are counted in the stats.
    pub async fn run(&self, now: DateTime<Utc>, options: RunOptions) -> Result<SyncStats> {
        let month = month_key(now);
        let mut stats = SyncStats {
            month_key: month.clone(),
            ..SyncStats::default()
        };

        info!(month = month.as_str(), "Getting contributions");
        let contributions = self.source.contributions().await?;
        let eligible = eligible_companions(&contributions, &month)?;
        stats.contributions = contributions.len() as u32;
        stats.eligible = eligible.len() as u32;

        info!("Getting banned keywords");
        let banned = self.source.banned_keywords().await?;
        stats.banned_keywords = banned.len() as u32;

        info!("Getting companions");
        let companions = self.source.companions().await?;
        stats.companions_fetched = companions.len() as u32;

        let mut roster = project_roster(&companions, &eligible, now);
        stats.published = roster.len() as u32;

        if options.skip_images {
            info!("Skipping picture refresh");
        } else {
            let targets: Vec<&CompanionRecord> = companions
                .iter()
                .filter(|c| is_publishable(c, &eligible, now))
                .collect();
            stats.images = Some(self.images.refresh_all(&targets).await);
        }

        stats.keywords_removed = scrub_keywords(&mut roster, &banned) as u32;

        stats.feed_bytes = self.publisher.publish(&roster).await?;
        info!(companions = stats.published, "Updated companions");

        Ok(stats)
    }
}
