use crate::config::ClientConfig;
use crate::error::QuotaError;
use async_trait::async_trait;
use quotadeck_core::CredentialFileDescriptor;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Body of the management `api-call` endpoint, which performs an outbound
/// HTTP call using the stored credential selected by `auth_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCallPayload {
    pub auth_index: String,
    pub method: String,
    pub url: String,
    pub header: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn api_call(&self, payload: &ApiCallPayload) -> Result<Value, QuotaError>;

    async fn download_auth_file(&self, name: &str) -> Result<Vec<u8>, QuotaError>;

    async fn list_auth_files(&self) -> Result<Vec<CredentialFileDescriptor>, QuotaError>;
}

pub struct HttpManagementApi {
    http_client: Client,
    config: ClientConfig,
}

impl HttpManagementApi {
    pub fn new(config: ClientConfig) -> Result<Self, QuotaError> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.management_key.as_deref() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, QuotaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(QuotaError::Management {
            status: status.as_u16(),
            message: management_error_message(&body),
        })
    }
}

/// The management API answers errors as `{"error": "..."}`; anything else is
/// passed through as text.
fn management_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ManagementApi for HttpManagementApi {
    async fn api_call(&self, payload: &ApiCallPayload) -> Result<Value, QuotaError> {
        debug!(
            "api-call {} {} via auth index {}",
            payload.method, payload.url, payload.auth_index
        );
        let request = self
            .http_client
            .post(self.config.management_url("api-call"))
            .json(payload);
        let response = Self::check(self.authorize(request).send().await?).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn download_auth_file(&self, name: &str) -> Result<Vec<u8>, QuotaError> {
        let request = self
            .http_client
            .get(self.config.management_url("auth-files/download"))
            .query(&[("name", name)]);
        let response = Self::check(self.authorize(request).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn list_auth_files(&self) -> Result<Vec<CredentialFileDescriptor>, QuotaError> {
        let request = self
            .http_client
            .get(self.config.management_url("auth-files"));
        let response = Self::check(self.authorize(request).send().await?).await?;
        let listing = response.json::<Value>().await?;

        let files = match listing {
            Value::Object(mut object) => match object.remove("files") {
                Some(Value::Array(files)) => files,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(QuotaError::InvalidResponse(
                        "auth-files listing 'files' is not an array".to_string(),
                    ))
                }
            },
            Value::Array(files) => files,
            _ => {
                return Err(QuotaError::InvalidResponse(
                    "auth-files listing must be an object or an array".to_string(),
                ))
            }
        };

        Ok(files
            .into_iter()
            .filter_map(|file| match serde_json::from_value(file) {
                Ok(descriptor) => Some(descriptor),
                Err(error) => {
                    warn!("skipping unreadable auth-file entry: {error}");
                    None
                }
            })
            .collect())
    }
}
