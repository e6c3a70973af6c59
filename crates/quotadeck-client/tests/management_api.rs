use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use quotadeck_client::{
    ClientConfig, HttpManagementApi, ManagementApi, QuotaError, QuotaFetcher, CODEX_USAGE_URL,
};
use quotadeck_core::{CredentialFileDescriptor, ProviderType, QuotaResult};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri()).with_management_key(Some("secret-key".to_string()))
}

#[tokio::test]
async fn lists_auth_files_with_management_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/management/auth-files"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"name": "codex-a.json", "type": "codex", "auth_index": "abc"},
                {"name": "gem.json", "type": "gemini-cli", "authIndex": 3},
                {"name": "anti.json", "type": "antigravity", "auth_index": "9", "authIndex": "9"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpManagementApi::new(config(&server)).unwrap();
    let files = api.list_auth_files().await.unwrap();

    assert_eq!(files.len(), 3);
    assert_eq!(files[0].auth_index(), Some("abc"));
    assert_eq!(files[1].auth_index(), Some("3"));
    assert_eq!(files[1].provider_type(), Some(ProviderType::GeminiCli));
    assert_eq!(files[2].auth_index(), Some("9"));
}

#[tokio::test]
async fn downloads_file_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/management/auth-files/download"))
        .and(query_param("name", "my file.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"project_id":"p1"}"#))
        .mount(&server)
        .await;

    let api = HttpManagementApi::new(config(&server)).unwrap();
    let bytes = api.download_auth_file("my file.json").await.unwrap();
    assert_eq!(bytes, br#"{"project_id":"p1"}"#.to_vec());
}

#[tokio::test]
async fn management_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/management/auth-files"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid management key"})),
        )
        .mount(&server)
        .await;

    let api = HttpManagementApi::new(config(&server)).unwrap();
    let error = api.list_auth_files().await.unwrap_err();
    assert_eq!(
        error,
        QuotaError::Management {
            status: 401,
            message: "invalid management key".to_string()
        }
    );
}

#[tokio::test]
async fn codex_quota_through_api_call_endpoint() {
    let server = MockServer::start().await;
    let claims = URL_SAFE_NO_PAD.encode(json!({"chatgpt_account_id": "acct_123"}).to_string());
    let upstream_body = json!({
        "plan_type": "pro",
        "rate_limit": {
            "primary_window": {"limit_window_seconds": 18000, "used_percent": 75},
            "secondary_window": {"limit_window_seconds": 604800, "used_percent": 10}
        }
    });

    Mock::given(method("POST"))
        .and(path("/v0/management/api-call"))
        .and(body_partial_json(json!({
            "auth_index": "7",
            "method": "GET",
            "url": CODEX_USAGE_URL,
            "header": {
                "Authorization": "Bearer $TOKEN$",
                "Chatgpt-Account-Id": "acct_123"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 200,
            "header": {"Content-Type": ["application/json"]},
            "body": upstream_body.to_string()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = Arc::new(HttpManagementApi::new(config(&server)).unwrap());
    let fetcher = QuotaFetcher::new(api, &ClientConfig::default());
    let file: CredentialFileDescriptor = serde_json::from_value(json!({
        "name": "codex.json",
        "type": "codex",
        "auth_index": "7",
        "id_token": format!("e30.{claims}.sig")
    }))
    .unwrap();

    let result = fetcher.fetch_quota_by_type(&file).await.unwrap();
    let QuotaResult::Codex(quota) = result else {
        panic!("expected a codex result");
    };
    assert_eq!(quota.plan_type, "pro");
    let labels = quota
        .limits
        .iter()
        .map(|item| (item.label.as_str(), item.used, item.remaining))
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![("5h", Some(75.0), Some(25.0)), ("Weekly", Some(10.0), Some(90.0))]
    );
}
