pub mod error;
pub mod types;

pub use error::{NotionError, Result};
pub use types::{
    DateValue, FileLink, FileObject, Page, PropertyValue, RelationRef, RichText, SelectOption,
};

use std::future::Future;
use std::time::Duration;

use types::{QueryRequest, QueryResponse};

const BASE_URL: &str = "https://api.notion.com/v1";

/// API version pinned for the property payload shapes in `types`.
const NOTION_VERSION: &str = "2022-06-28";

/// Notion caps database queries at 100 rows per page.
const PAGE_SIZE: u32 = 100;

pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl NotionClient {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            token,
        })
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Query one page of a database. `cursor` is the `next_cursor` of the previous page.
    pub async fn query_page(&self, database_id: &str, cursor: Option<&str>) -> Result<QueryResponse> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        let body = QueryRequest {
            page_size: PAGE_SIZE,
            start_cursor: cursor,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetch every row of a database, following pagination until exhausted.
    pub async fn query_database(&self, database_id: &str) -> Result<Vec<Page>> {
        let pages = collect_pages(move |cursor: Option<String>| async move {
            let resp = self.query_page(database_id, cursor.as_deref()).await?;
            tracing::debug!(
                database_id,
                rows = resp.results.len(),
                has_more = resp.has_more,
                "Fetched database page"
            );
            Ok(resp)
        })
        .await?;

        tracing::info!(database_id, count = pages.len(), "Fetched database rows");
        Ok(pages)
    }
}

/// Drive `fetch` from the first page to the last, passing each page's
/// `next_cursor` to the following call. Rows are returned in upstream order.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<Vec<Page>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<QueryResponse>>,
{
    let mut pages = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let resp = fetch(cursor.take()).await?;
        let next = next_cursor(&resp)?;
        pages.extend(resp.results);

        match next {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    Ok(pages)
}

/// Cursor for the following page, or `None` when the result set is exhausted.
fn next_cursor(resp: &QueryResponse) -> Result<Option<String>> {
    if !resp.has_more {
        return Ok(None);
    }
    match resp.next_cursor.as_deref() {
        Some(c) if !c.is_empty() => Ok(Some(c.to_string())),
        _ => Err(NotionError::Parse(
            "has_more is true but next_cursor is missing".to_string(),
        )),
    }
}
