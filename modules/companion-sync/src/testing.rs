// Test fakes for the sync pipeline.
//
// Three fakes matching the three trait boundaries:
// - MockSource (ContentSource): fixed record sets, or a forced upstream failure
// - MemorySink (ObjectSink): in-memory path→object map with optional failing paths
// - MockImageFetcher (ImageFetcher): URL→bytes map, errors for unknown URLs
//
// Plus builders for records and a tiny PNG generator.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::{Result, SyncError};
use crate::traits::{ContentSource, ImageFetcher, ObjectSink};
use crate::types::{Attributes, BannedKeyword, CompanionRecord, ContributionRecord};

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSource {
    contributions: Vec<ContributionRecord>,
    banned: Vec<BannedKeyword>,
    companions: Vec<CompanionRecord>,
    unavailable: bool,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contribution(mut self, record: ContributionRecord) -> Self {
        self.contributions.push(record);
        self
    }

    pub fn with_banned(mut self, token: &str) -> Self {
        self.banned.push(BannedKeyword {
            token: token.to_string(),
        });
        self
    }

    pub fn with_companion(mut self, record: CompanionRecord) -> Self {
        self.companions.push(record);
        self
    }

    /// Every query fails with `UpstreamUnavailable`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(SyncError::UpstreamUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn contributions(&self) -> Result<Vec<ContributionRecord>> {
        self.check()?;
        Ok(self.contributions.clone())
    }

    async fn banned_keywords(&self) -> Result<Vec<BannedKeyword>> {
        self.check()?;
        Ok(self.banned.clone())
    }

    async fn companions(&self) -> Result<Vec<CompanionRecord>> {
        self.check()?;
        Ok(self.companions.clone())
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store. Paths registered with `fail_on` reject uploads.
#[derive(Default)]
pub struct MemorySink {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing: HashSet<String>,
    writes: Mutex<u32>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of successful uploads, overwrites included.
    pub fn writes(&self) -> u32 {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ObjectSink for MemorySink {
    async fn put(&self, path: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        if self.failing.contains(path) {
            bail!("simulated upload failure for {path}");
        }
        self.objects.lock().unwrap().insert(
            path.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockImageFetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockImageFetcher {
    images: HashMap<String, Bytes>,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_url(mut self, url: &str, body: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), Bytes::from(body));
        self
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Bytes> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 for {url}"))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn contribution(companion_id: &str, lifetime: bool, periods: &[(&str, bool)]) -> ContributionRecord {
    ContributionRecord {
        companion_id: companion_id.to_string(),
        lifetime,
        periods: periods
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// A companion with one picture at `https://files.test/<id>.png`.
pub fn companion(id: &str, name: &str) -> CompanionRecord {
    CompanionRecord {
        id: id.to_string(),
        name: name.to_string(),
        website: None,
        image_urls: vec![picture_url(id)],
        attributes: Attributes::default(),
        tagline: None,
        keywords: None,
        retirement: None,
    }
}

pub fn picture_url(id: &str) -> String {
    format!("https://files.test/{id}.png")
}

/// Encoded PNG with a gradient so the entropy crop has something to bite on.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode test png");
    buf.into_inner()
}
