use crate::error::QuotaError;
use crate::introspect::resolve_codex_account_id;
use crate::management::ManagementApi;
use crate::wire::{non_2xx_error, proxied_call, ProxiedCallRequest, TOKEN_PLACEHOLDER};
use chrono::Utc;
use quotadeck_core::{codex_plan_type, parse_codex_usage, CodexQuota, CredentialFileDescriptor};
use serde_json::Value;

pub const CODEX_USAGE_URL: &str = "https://chatgpt.com/backend-api/wham/usage";
pub const CODEX_USER_AGENT: &str = "codex_cli_rs/0.76.0 (Debian 13.0.0; x86_64) WindowsTerminal";
pub const ACCOUNT_ID_HEADER: &str = "Chatgpt-Account-Id";

#[derive(Debug, Clone)]
pub struct CodexResolver {
    pub url: String,
}

impl Default for CodexResolver {
    fn default() -> Self {
        Self {
            url: CODEX_USAGE_URL.to_string(),
        }
    }
}

impl CodexResolver {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub async fn fetch(
        &self,
        api: &dyn ManagementApi,
        file: &CredentialFileDescriptor,
        auth_index: &str,
    ) -> Result<CodexQuota, QuotaError> {
        let account_id = resolve_codex_account_id(api, file)
            .await
            .ok_or(QuotaError::MissingAccountId)?;
        let fallback_plan = codex_plan_type(&file.fields_value());

        let request = ProxiedCallRequest::get(self.url.as_str())
            .with_headers(&[
                ("Authorization", TOKEN_PLACEHOLDER),
                ("Content-Type", "application/json"),
                ("User-Agent", CODEX_USER_AGENT),
            ])
            .with_header(ACCOUNT_ID_HEADER, account_id);

        let response = proxied_call(api, auth_index, request).await?;
        if !response.is_success() {
            return Err(non_2xx_error(&response));
        }

        match &response.body {
            Value::Object(_) => Ok(parse_codex_usage(
                &response.body,
                fallback_plan.as_deref(),
                Utc::now(),
            )),
            Value::Null => Err(QuotaError::EmptyResponse),
            _ => Err(QuotaError::InvalidResponse(
                "expected a JSON object from the usage endpoint".to_string(),
            )),
        }
    }
}
