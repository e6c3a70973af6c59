use crate::management::ManagementApi;
use quotadeck_core::{
    antigravity_project_id, codex_account_id_from_descriptor, codex_account_id_from_raw,
    gemini_cli_project_id, CredentialFileDescriptor,
};
use serde_json::Value;
use tracing::warn;

pub async fn download_auth_json(api: &dyn ManagementApi, name: &str) -> Option<Value> {
    if name.trim().is_empty() {
        return None;
    }

    let bytes = match api.download_auth_file(name).await {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!("failed to download auth file {name}: {error}");
            return None;
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!("auth file {name} is not valid JSON: {error}");
            None
        }
    }
}

pub async fn resolve_antigravity_project_id(
    api: &dyn ManagementApi,
    name: &str,
    default_project: &str,
) -> String {
    download_auth_json(api, name)
        .await
        .as_ref()
        .and_then(antigravity_project_id)
        .unwrap_or_else(|| default_project.to_string())
}

pub async fn resolve_gemini_cli_project_id(api: &dyn ManagementApi, name: &str) -> Option<String> {
    download_auth_json(api, name)
        .await
        .as_ref()
        .and_then(gemini_cli_project_id)
}

/// The listing's own id tokens first; the stored file only if they fail.
pub async fn resolve_codex_account_id(
    api: &dyn ManagementApi,
    file: &CredentialFileDescriptor,
) -> Option<String> {
    if let Some(account_id) = codex_account_id_from_descriptor(file) {
        return Some(account_id);
    }

    download_auth_json(api, &file.name)
        .await
        .as_ref()
        .and_then(codex_account_id_from_raw)
}
