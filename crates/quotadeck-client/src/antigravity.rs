use crate::error::QuotaError;
use crate::introspect::resolve_antigravity_project_id;
use crate::management::ManagementApi;
use crate::wire::{non_2xx_error, proxied_call, ProxiedCallRequest, TOKEN_PLACEHOLDER};
use quotadeck_core::{
    parse_antigravity_groups, AntigravityQuota, AntigravityQuotaGroup, CredentialFileDescriptor,
    ANTIGRAVITY_QUOTA_GROUPS,
};
use serde_json::json;
use tracing::debug;

/// The same endpoint on the daily, sandbox and production hosts. Which one
/// serves a given account is not known up front.
pub const ANTIGRAVITY_QUOTA_URLS: [&str; 3] = [
    "https://daily-cloudcode-pa.googleapis.com/v1internal:fetchAvailableModels",
    "https://daily-cloudcode-pa.sandbox.googleapis.com/v1internal:fetchAvailableModels",
    "https://cloudcode-pa.googleapis.com/v1internal:fetchAvailableModels",
];

/// The upstream rejects requests without a client user agent.
pub const ANTIGRAVITY_USER_AGENT: &str = "antigravity/1.11.5 windows/amd64";

#[derive(Debug, Clone)]
pub struct AntigravityResolver {
    pub urls: Vec<String>,
    pub default_project: String,
    pub groups: Vec<AntigravityQuotaGroup>,
}

impl AntigravityResolver {
    pub fn new(default_project: impl Into<String>) -> Self {
        Self {
            urls: ANTIGRAVITY_QUOTA_URLS.iter().map(|url| url.to_string()).collect(),
            default_project: default_project.into(),
            groups: ANTIGRAVITY_QUOTA_GROUPS.to_vec(),
        }
    }

    pub fn with_urls(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.urls = urls.into_iter().collect();
        self
    }

    /// Tries each URL in turn, one at a time, and stops at the first 2xx
    /// answer with a JSON body. If none succeeds the last failure is returned.
    pub async fn fetch(
        &self,
        api: &dyn ManagementApi,
        file: &CredentialFileDescriptor,
        auth_index: &str,
    ) -> Result<AntigravityQuota, QuotaError> {
        let project = resolve_antigravity_project_id(api, &file.name, &self.default_project).await;
        let body = json!({ "project": project });
        let mut last_error = None;

        for url in &self.urls {
            let request = ProxiedCallRequest::post(url.as_str())
                .with_headers(&[
                    ("Authorization", TOKEN_PLACEHOLDER),
                    ("Content-Type", "application/json"),
                    ("User-Agent", ANTIGRAVITY_USER_AGENT),
                ])
                .with_json_body(&body);

            let error = match proxied_call(api, auth_index, request).await {
                Ok(response) if response.is_success() && response.body.is_object() => {
                    debug!("antigravity quota for {} served by {url}", file.name);
                    return Ok(parse_antigravity_groups(&response.body, &self.groups));
                }
                Ok(response) if response.is_success() => {
                    if response.body.is_null() {
                        QuotaError::EmptyResponse
                    } else {
                        QuotaError::InvalidResponse(format!(
                            "expected a JSON object from {url}"
                        ))
                    }
                }
                Ok(response) => non_2xx_error(&response),
                Err(error) => error,
            };

            debug!("antigravity candidate {url} failed for {}: {error}", file.name);
            last_error = Some(error);
        }

        Err(last_error.unwrap_or(QuotaError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use serde_json::json;

    fn file() -> CredentialFileDescriptor {
        CredentialFileDescriptor::new("antigravity-user.json", "antigravity").with_auth_index("1")
    }

    fn models_body() -> serde_json::Value {
        json!({
            "models": {
                "gemini-2.5-flash": {"quotaInfo": {"remainingFraction": "30%"}}
            }
        })
    }

    #[tokio::test]
    async fn third_url_succeeds_after_two_server_errors() {
        let api = ScriptedApi::new()
            .respond(500, json!("boom"))
            .respond(500, json!({"error": {"code": 500, "message": "internal"}}))
            .respond(200, models_body())
            .respond(200, models_body());
        let resolver = AntigravityResolver::new("fallback-project");

        let quota = resolver.fetch(&api, &file(), "1").await.unwrap();

        assert_eq!(quota.groups[0].label, "Gemini 2.5 Flash");
        assert_eq!(quota.groups[0].percent, Some(30.0));

        let calls = api.calls();
        assert_eq!(calls.len(), 3);
        let urls = calls.iter().map(|call| call.url.as_str()).collect::<Vec<_>>();
        assert_eq!(urls, ANTIGRAVITY_QUOTA_URLS.to_vec());
        assert_eq!(calls[0].header["User-Agent"], ANTIGRAVITY_USER_AGENT);
        assert_eq!(calls[0].header["Authorization"], "Bearer $TOKEN$");
    }

    #[tokio::test]
    async fn first_success_stops_the_loop() {
        let api = ScriptedApi::new().respond(200, models_body());
        let resolver = AntigravityResolver::new("fallback-project");

        resolver.fetch(&api, &file(), "1").await.unwrap();
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn all_failures_surface_the_last_error() {
        let api = ScriptedApi::new()
            .fail(QuotaError::Transport("connection reset".to_string()))
            .respond(200, json!(""))
            .respond(403, json!({"error": {"message": "denied"}}));
        let resolver = AntigravityResolver::new("fallback-project");

        let error = resolver.fetch(&api, &file(), "1").await.unwrap_err();
        assert_eq!(error.to_string(), "HTTP 403: denied");
        assert_eq!(error.status_code(), Some(403));
    }

    #[tokio::test]
    async fn project_comes_from_file_or_injected_default() {
        let api = ScriptedApi::new()
            .with_file("antigravity-user.json", json!({"installed": {"project_id": "proj-7"}}))
            .respond(200, models_body());
        let resolver = AntigravityResolver::new("fallback-project");
        resolver.fetch(&api, &file(), "1").await.unwrap();
        assert_eq!(api.calls()[0].data.as_deref(), Some(r#"{"project":"proj-7"}"#));

        let api = ScriptedApi::new().respond(200, models_body());
        resolver.fetch(&api, &file(), "1").await.unwrap();
        assert_eq!(
            api.calls()[0].data.as_deref(),
            Some(r#"{"project":"fallback-project"}"#)
        );
        assert_eq!(api.downloads(), vec!["antigravity-user.json".to_string()]);
    }

    #[tokio::test]
    async fn overridden_urls_are_used() {
        let api = ScriptedApi::new().respond(200, models_body());
        let resolver = AntigravityResolver::new("p").with_urls(["https://mock.test/models".to_string()]);

        resolver.fetch(&api, &file(), "1").await.unwrap();
        assert_eq!(api.calls()[0].url, "https://mock.test/models");
    }
}
