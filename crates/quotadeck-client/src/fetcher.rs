use crate::antigravity::AntigravityResolver;
use crate::codex::CodexResolver;
use crate::config::ClientConfig;
use crate::error::QuotaError;
use crate::gemini_cli::GeminiCliResolver;
use crate::management::ManagementApi;
use quotadeck_core::{CredentialFileDescriptor, ProviderType, QuotaResult};
use std::sync::Arc;
use tracing::debug;

/// Entry point for quota lookups: picks the resolver for a file's type.
pub struct QuotaFetcher {
    api: Arc<dyn ManagementApi>,
    antigravity: AntigravityResolver,
    gemini_cli: GeminiCliResolver,
    codex: CodexResolver,
}

impl QuotaFetcher {
    pub fn new(api: Arc<dyn ManagementApi>, config: &ClientConfig) -> Self {
        Self {
            api,
            antigravity: AntigravityResolver::new(config.antigravity_default_project.clone()),
            gemini_cli: GeminiCliResolver::default(),
            codex: CodexResolver::default(),
        }
    }

    pub fn with_antigravity(mut self, resolver: AntigravityResolver) -> Self {
        self.antigravity = resolver;
        self
    }

    pub fn with_gemini_cli(mut self, resolver: GeminiCliResolver) -> Self {
        self.gemini_cli = resolver;
        self
    }

    pub fn with_codex(mut self, resolver: CodexResolver) -> Self {
        self.codex = resolver;
        self
    }

    pub fn api(&self) -> &dyn ManagementApi {
        self.api.as_ref()
    }

    pub async fn fetch_quota_by_type(
        &self,
        file: &CredentialFileDescriptor,
    ) -> Result<QuotaResult, QuotaError> {
        let auth_index = file.auth_index().ok_or(QuotaError::MissingAuthIndex)?;
        let provider = file.provider_type().ok_or_else(|| {
            QuotaError::UnsupportedType(file.file_type.trim().to_ascii_lowercase())
        })?;

        debug!("fetching {provider} quota for {}", file.name);
        let api = self.api.as_ref();
        match provider {
            ProviderType::Antigravity => self
                .antigravity
                .fetch(api, file, auth_index)
                .await
                .map(QuotaResult::Antigravity),
            ProviderType::GeminiCli => self
                .gemini_cli
                .fetch(api, file, auth_index)
                .await
                .map(QuotaResult::GeminiCli),
            ProviderType::Codex => self
                .codex
                .fetch(api, file, auth_index)
                .await
                .map(QuotaResult::Codex),
        }
    }
}
