use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::ObjectStorageConfig;
use crate::error::{Result, ShopError};

#[derive(Debug, Clone, Deserialize)]
pub struct StorageHealth {
    pub healthy: bool,
}

/// Object metadata as the storage API reports it. Field names differ
/// between service revisions, hence the aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectInfo {
    #[serde(default)]
    pub size: u64,
    #[serde(default, alias = "contentType", alias = "mimetype")]
    pub content_type: Option<String>,
    #[serde(default, alias = "lastModified", alias = "updated_at")]
    pub updated_at: Option<String>,
}

/// Supabase-style storage service holding product images. The service key
/// goes out as both a bearer token and an `apikey` header.
pub struct ObjectStorageClient {
    client: reqwest::Client,
    config: ObjectStorageConfig,
}

impl ObjectStorageClient {
    pub fn new(config: &ObjectStorageConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/storage/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        );
        self.client
            .get(&url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
    }

    pub async fn health(&self) -> Result<StorageHealth> {
        let response = self.get("health").send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_health_response(status, &body)
    }

    /// Metadata for one object in the configured bucket.
    pub async fn object_info(&self, path: &str) -> Result<ObjectInfo> {
        let response = self
            .get(&format!(
                "object/info/{}/{}",
                self.config.bucket,
                path.trim_start_matches('/')
            ))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_object_info_response(status, &body)
    }
}

fn parse_health_response(status: StatusCode, body: &str) -> Result<StorageHealth> {
    if !status.is_success() {
        return Err(ShopError::StorageUnavailable);
    }
    serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)
}

fn parse_object_info_response(status: StatusCode, body: &str) -> Result<ObjectInfo> {
    if !status.is_success() {
        return Err(ShopError::StorageUnavailable);
    }
    serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)
}
