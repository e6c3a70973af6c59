use crate::error::QuotaError;
use crate::introspect::resolve_gemini_cli_project_id;
use crate::management::ManagementApi;
use crate::wire::{non_2xx_error, proxied_call, ProxiedCallRequest, TOKEN_PLACEHOLDER};
use quotadeck_core::{parse_gemini_cli_buckets, CredentialFileDescriptor, GeminiCliQuota};
use serde_json::{json, Value};

pub const GEMINI_CLI_QUOTA_URL: &str =
    "https://cloudcode-pa.googleapis.com/v1internal:retrieveUserQuota";

#[derive(Debug, Clone)]
pub struct GeminiCliResolver {
    pub url: String,
}

impl Default for GeminiCliResolver {
    fn default() -> Self {
        Self {
            url: GEMINI_CLI_QUOTA_URL.to_string(),
        }
    }
}

impl GeminiCliResolver {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub async fn fetch(
        &self,
        api: &dyn ManagementApi,
        file: &CredentialFileDescriptor,
        auth_index: &str,
    ) -> Result<GeminiCliQuota, QuotaError> {
        // Without a project the field is left out entirely.
        let body = match resolve_gemini_cli_project_id(api, &file.name).await {
            Some(project) => json!({ "project": project }),
            None => json!({}),
        };

        let request = ProxiedCallRequest::post(self.url.as_str())
            .with_headers(&[
                ("Authorization", TOKEN_PLACEHOLDER),
                ("Content-Type", "application/json"),
            ])
            .with_json_body(&body);

        let response = proxied_call(api, auth_index, request).await?;
        if !response.is_success() {
            return Err(non_2xx_error(&response));
        }

        match &response.body {
            Value::Object(_) => Ok(parse_gemini_cli_buckets(&response.body)),
            Value::Null => Err(QuotaError::EmptyResponse),
            _ => Err(QuotaError::InvalidResponse(
                "expected a JSON object from the quota endpoint".to_string(),
            )),
        }
    }
}
