//! Quota lookups for stored AI-provider credentials, performed through the
//! proxy service's management API.
//!
//! The console never holds provider secrets: every upstream call goes through
//! the management `api-call` endpoint with a `$TOKEN$` placeholder that the
//! service fills in. [`QuotaFetcher::fetch_quota_by_type`] is the entry point.

mod antigravity;
mod batch;
mod codex;
mod config;
mod error;
mod fetcher;
mod gemini_cli;
mod introspect;
mod management;
mod wire;

#[cfg(test)]
mod testing;

pub use antigravity::{AntigravityResolver, ANTIGRAVITY_QUOTA_URLS, ANTIGRAVITY_USER_AGENT};
pub use batch::{refresh_quotas, RefreshSummary, DEFAULT_CONCURRENCY};
pub use codex::{CodexResolver, ACCOUNT_ID_HEADER, CODEX_USAGE_URL, CODEX_USER_AGENT};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::QuotaError;
pub use fetcher::QuotaFetcher;
pub use gemini_cli::{GeminiCliResolver, GEMINI_CLI_QUOTA_URL};
pub use introspect::{
    download_auth_json, resolve_antigravity_project_id, resolve_codex_account_id,
    resolve_gemini_cli_project_id,
};
pub use management::{ApiCallPayload, HttpManagementApi, ManagementApi};
pub use wire::{non_2xx_error, proxied_call, ProxiedCallRequest, ProxiedCallResponse, TOKEN_PLACEHOLDER};
