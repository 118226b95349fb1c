// Seams between the pipeline and the outside world.
//
// ContentSource: the three upstream record sets (Notion in production).
// ObjectSink:    "upload bytes to path, overwrite if exists" (Azure $web).
// ImageFetcher:  raw bytes of a companion's source picture.
//
// The pipeline only sees these traits; `testing` provides in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use notion_client::NotionClient;

use crate::config::DatabaseIds;
use crate::error::Result;
use crate::records;
use crate::types::{BannedKeyword, CompanionRecord, ContributionRecord};

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn contributions(&self) -> Result<Vec<ContributionRecord>>;

    /// Banned tokens in upstream order; order matters for scrubbing.
    async fn banned_keywords(&self) -> Result<Vec<BannedKeyword>>;

    async fn companions(&self) -> Result<Vec<CompanionRecord>>;
}

#[async_trait]
pub trait ObjectSink: Send + Sync {
    /// Write `body` at `path`, replacing whatever was there.
    async fn put(&self, path: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Bytes>;
}

// ---------------------------------------------------------------------------
// Notion
// ---------------------------------------------------------------------------

pub struct NotionSource {
    client: NotionClient,
    databases: DatabaseIds,
}

impl NotionSource {
    pub fn new(client: NotionClient, databases: DatabaseIds) -> Self {
        Self { client, databases }
    }
}

#[async_trait]
impl ContentSource for NotionSource {
    async fn contributions(&self) -> Result<Vec<ContributionRecord>> {
        let pages = self.client.query_database(&self.databases.contributions).await?;
        records::contributions_from_pages(&pages)
    }

    async fn banned_keywords(&self) -> Result<Vec<BannedKeyword>> {
        let pages = self.client.query_database(&self.databases.keywords).await?;
        records::banned_keywords_from_pages(&pages)
    }

    async fn companions(&self) -> Result<Vec<CompanionRecord>> {
        let pages = self.client.query_database(&self.databases.companions).await?;
        records::companions_from_pages(&pages)
    }
}

// ---------------------------------------------------------------------------
// Azure Blob
// ---------------------------------------------------------------------------

#[async_trait]
impl ObjectSink for blob_client::BlobContainerClient {
    async fn put(&self, path: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        Ok(self.upload(path, body, content_type).await?)
    }
}

// ---------------------------------------------------------------------------
// HTTP image download
// ---------------------------------------------------------------------------

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Bytes> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("image download returned {status}");
        }

        Ok(resp.bytes().await?)
    }
}
