use reqwest::{Client, Error as ReqwestError, StatusCode};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompatApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
    #[error("compatibility service returned status {0}")]
    Status(StatusCode),
}

/// Year entry inside a descriptor
///
/// The service is loose about types: a year may arrive as a JSON number or
/// as a string, and may be missing entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct CompatYear {
    pub year: Option<YearValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearValue {
    Number(i64),
    Text(String),
}

/// One compatible-model descriptor returned by the lookup service
#[derive(Debug, Clone, Deserialize)]
pub struct CompatDescriptor {
    pub brand_name: Option<String>,
    pub car_version: Option<String>,
    #[serde(default)]
    pub years: Vec<CompatYear>,
}

/// Trait for compatibility lookups (allows mocking for tests)
#[async_trait::async_trait]
pub trait CompatSource: Send + Sync {
    async fn fetch_models(
        &self,
        model_ids: &[i64],
    ) -> Result<Vec<CompatDescriptor>, CompatApiError>;
}

/// Production client for the external compatibility service
#[derive(Clone)]
pub struct CompatApiClient {
    client: Client,
    base_url: String,
}

impl CompatApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl CompatSource for CompatApiClient {
    /// Fetch model descriptors for the given model ids
    ///
    /// Failures surface to the caller as-is; there are no retries here.
    async fn fetch_models(
        &self,
        model_ids: &[i64],
    ) -> Result<Vec<CompatDescriptor>, CompatApiError> {
        let url = format!("{}/get-models-aggr", self.base_url);

        let response = self.client.post(&url).json(&model_ids).send().await?;

        if response.status().is_success() {
            let descriptors: Vec<CompatDescriptor> = response.json().await?;
            Ok(descriptors)
        } else {
            Err(CompatApiError::Status(response.status()))
        }
    }
}
