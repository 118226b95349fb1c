pub mod connection;
pub mod error;

pub use connection::ConnectionString;
pub use error::{BlobError, Result};

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

/// Service version sent with every request; fixes the Shared Key string-to-sign layout.
const API_VERSION: &str = "2021-08-06";

type HmacSha256 = Hmac<Sha256>;

/// Client scoped to a single container, e.g. the static website's `$web`.
pub struct BlobContainerClient {
    client: reqwest::Client,
    connection: ConnectionString,
    container: String,
    /// Decoded account key, present when authorizing with Shared Key.
    signing_key: Option<Vec<u8>>,
}

impl BlobContainerClient {
    pub fn from_connection_string(raw: &str, container: &str, timeout: Duration) -> Result<Self> {
        let connection = ConnectionString::parse(raw)?;
        let signing_key = connection
            .account_key
            .as_deref()
            .map(|key| {
                STANDARD
                    .decode(key)
                    .map_err(|e| BlobError::Config(format!("AccountKey is not valid base64: {e}")))
            })
            .transpose()?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            connection,
            container: container.to_string(),
            signing_key,
        })
    }

    /// Absolute URL of a blob within this container (without SAS).
    pub fn blob_url(&self, path: &str) -> Result<Url> {
        let url = Url::parse(&format!(
            "{}/{}/{}",
            self.connection.blob_endpoint,
            self.container,
            path.trim_start_matches('/')
        ))?;
        Ok(url)
    }

    /// Put Blob: create or fully overwrite the block blob at `path`.
    pub async fn upload(&self, path: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let content_length = body.len();
        let request = self.put_request(path, body, content_type, &date)?;

        let resp = self.client.execute(request).await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BlobError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(container = %self.container, path, bytes = content_length, "Uploaded blob");
        Ok(())
    }

    /// Authorized Put Blob request. Shared Key signs it when an account key is
    /// configured; otherwise the SAS token becomes the query string.
    fn put_request(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        date: &str,
    ) -> Result<reqwest::Request> {
        let mut url = self.blob_url(path)?;
        let canonical_resource = format!("/{}{}", self.connection.account_name, url.path());
        if self.signing_key.is_none() {
            if let Some(sas) = &self.connection.sas_token {
                url.set_query(Some(sas));
            }
        }

        let mut request = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .header("Content-Type", content_type);

        if let Some(key) = &self.signing_key {
            let to_sign = string_to_sign(
                "PUT",
                body.len(),
                content_type,
                &[
                    ("x-ms-blob-type", "BlockBlob"),
                    ("x-ms-date", date),
                    ("x-ms-version", API_VERSION),
                ],
                &canonical_resource,
            );
            let signature = sign(key, &to_sign)?;
            request = request.header(
                "Authorization",
                format!("SharedKey {}:{}", self.connection.account_name, signature),
            );
        }

        Ok(request.body(body).build()?)
    }
}

/// Shared Key string-to-sign for Blob service versions 2015-02-21 and later.
/// `ms_headers` must already be lowercase; they are sorted here.
fn string_to_sign(
    method: &str,
    content_length: usize,
    content_type: &str,
    ms_headers: &[(&str, &str)],
    canonical_resource: &str,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut headers = ms_headers.to_vec();
    headers.sort_by(|a, b| a.0.cmp(b.0));
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();

    // Content-Encoding, Content-Language, Content-Length, Content-MD5,
    // Content-Type, Date, If-Modified-Since, If-Match, If-None-Match,
    // If-Unmodified-Since, Range
    format!(
        "{method}\n\n\n{length}\n\n{content_type}\n\n\n\n\n\n\n{canonical_headers}{canonical_resource}"
    )
}

fn sign(key: &[u8], to_sign: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| BlobError::Config(format!("invalid signing key: {e}")))?;
    mac.update(to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(conn: &str) -> BlobContainerClient {
        BlobContainerClient::from_connection_string(conn, "$web", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn blob_url_joins_endpoint_container_and_path() {
        let c = client("AccountName=roster;AccountKey=a2V5");
        let url = c.blob_url("img/companions/abc.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://roster.blob.core.windows.net/$web/img/companions/abc.jpg"
        );
    }

    #[test]
    fn string_to_sign_layout() {
        let s = string_to_sign(
            "PUT",
            11,
            "application/json",
            &[
                ("x-ms-version", API_VERSION),
                ("x-ms-blob-type", "BlockBlob"),
                ("x-ms-date", "Fri, 16 Oct 2026 12:00:00 GMT"),
            ],
            "/roster/$web/companions.json",
        );

        let expected = "PUT\n\n\n11\n\napplication/json\n\n\n\n\n\n\n\
            x-ms-blob-type:BlockBlob\n\
            x-ms-date:Fri, 16 Oct 2026 12:00:00 GMT\n\
            x-ms-version:2021-08-06\n\
            /roster/$web/companions.json";
        assert_eq!(s, expected);
    }

    #[test]
    fn empty_body_leaves_length_blank() {
        let s = string_to_sign("PUT", 0, "text/plain", &[], "/a/b/c");
        assert!(s.starts_with("PUT\n\n\n\n\ntext/plain\n"));
    }

    #[test]
    fn signature_is_deterministic_base64() {
        let a = sign(b"key", "payload").unwrap();
        let b = sign(b"key", "payload").unwrap();
        assert_eq!(a, b);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
        assert_ne!(a, sign(b"other", "payload").unwrap());
    }

    const DATE: &str = "Fri, 16 Oct 2026 12:00:00 GMT";

    #[test]
    fn sas_request_carries_token_as_query_and_no_authorization() {
        let c = client(
            "BlobEndpoint=https://roster.blob.core.windows.net;SharedAccessSignature=?sv=2022-11-02&sig=abc%3D",
        );
        let req = c
            .put_request("companions.json", b"[]".to_vec(), "application/json", DATE)
            .unwrap();

        assert_eq!(req.method(), reqwest::Method::PUT);
        assert_eq!(req.url().path(), "/$web/companions.json");
        assert_eq!(req.url().query(), Some("sv=2022-11-02&sig=abc%3D"));
        assert!(req.headers().get("authorization").is_none());
        assert_eq!(req.headers()["x-ms-blob-type"], "BlockBlob");
        assert_eq!(req.headers()["x-ms-version"], API_VERSION);
    }

    #[test]
    fn shared_key_request_is_signed_over_its_own_headers() {
        let c = client("AccountName=roster;AccountKey=a2V5");
        let req = c
            .put_request("img/companions/abc.jpg", vec![0u8; 7], "image/jpeg", DATE)
            .unwrap();

        assert_eq!(req.url().query(), None);
        assert_eq!(req.headers()["x-ms-date"], DATE);
        assert_eq!(req.headers()["content-type"], "image/jpeg");

        let expected = sign(
            b"key",
            &string_to_sign(
                "PUT",
                7,
                "image/jpeg",
                &[
                    ("x-ms-blob-type", "BlockBlob"),
                    ("x-ms-date", DATE),
                    ("x-ms-version", API_VERSION),
                ],
                "/roster/$web/img/companions/abc.jpg",
            ),
        )
        .unwrap();
        let auth = req.headers()["authorization"].to_str().unwrap();
        assert!(auth.starts_with("SharedKey roster:"));
        assert_eq!(auth, format!("SharedKey roster:{expected}"));
    }

    #[test]
    fn account_key_takes_precedence_over_sas() {
        let c = client("AccountName=roster;AccountKey=a2V5;SharedAccessSignature=sv=1&sig=x");
        let req = c
            .put_request("companions.json", b"[]".to_vec(), "application/json", DATE)
            .unwrap();

        assert_eq!(req.url().query(), None);
        assert!(req.headers().contains_key("authorization"));
    }

    #[test]
    fn invalid_account_key_rejected() {
        let err = BlobContainerClient::from_connection_string(
            "AccountName=roster;AccountKey=not base64!",
            "$web",
            Duration::from_secs(5),
        )
        .err()
        .unwrap();
        assert!(matches!(err, BlobError::Config(_)));
    }
}
