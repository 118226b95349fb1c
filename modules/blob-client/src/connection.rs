use crate::error::{BlobError, Result};

/// Parsed form of an Azure Storage connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: String,
    pub account_key: Option<String>,
    pub sas_token: Option<String>,
    pub blob_endpoint: String,
}

impl ConnectionString {
    /// Parse `Key=Value;Key=Value` pairs. Values may themselves contain `=`
    /// (base64 padding, SAS query strings).
    pub fn parse(raw: &str) -> Result<Self> {
        let mut protocol = "https".to_string();
        let mut account_name = None;
        let mut account_key = None;
        let mut sas_token = None;
        let mut endpoint_suffix = "core.windows.net".to_string();
        let mut blob_endpoint = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                BlobError::Config(format!("malformed connection string segment '{part}'"))
            })?;
            match key {
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "SharedAccessSignature" => {
                    sas_token = Some(value.trim_start_matches('?').to_string())
                }
                "EndpointSuffix" => endpoint_suffix = value.to_string(),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                _ => {}
            }
        }

        let account_name = match (account_name, &blob_endpoint) {
            (Some(name), _) => name,
            // SAS-only strings name the account through the endpoint host.
            (None, Some(endpoint)) => account_from_endpoint(endpoint).ok_or_else(|| {
                BlobError::Config("AccountName missing and not derivable from BlobEndpoint".into())
            })?,
            (None, None) => return Err(BlobError::Config("AccountName is required".into())),
        };

        if account_key.is_none() && sas_token.is_none() {
            return Err(BlobError::Config(
                "connection string needs AccountKey or SharedAccessSignature".into(),
            ));
        }

        let blob_endpoint = blob_endpoint
            .unwrap_or_else(|| format!("{protocol}://{account_name}.blob.{endpoint_suffix}"));

        Ok(Self {
            account_name,
            account_key,
            sas_token,
            blob_endpoint,
        })
    }
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "[redacted]"))
            .field("sas_token", &self.sas_token.as_ref().map(|_| "[redacted]"))
            .field("blob_endpoint", &self.blob_endpoint)
            .finish()
    }
}

fn account_from_endpoint(endpoint: &str) -> Option<String> {
    let url = url::Url::parse(endpoint).ok()?;
    let host = url.host_str()?;
    host.split_once(".blob.").map(|(account, _)| account.to_string())
}
