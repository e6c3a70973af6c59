use crate::fields::first_string;
use crate::jwt::id_token_claims;
use crate::CredentialFileDescriptor;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const DEFAULT_ANTIGRAVITY_PROJECT: &str = "bamboo-precept-lgxtn";

const ANTIGRAVITY_PROJECT_PATHS: &[&str] = &[
    "/project_id",
    "/projectId",
    "/installed/project_id",
    "/web/project_id",
];

const ACCOUNT_ID_PATHS: &[&str] = &[
    "/chatgpt_account_id",
    "/chatgptAccountId",
    "/https:~1~1api.openai.com~1auth/chatgpt_account_id",
    "/https:~1~1api.openai.com~1auth/chatgptAccountId",
];

const PLAN_TYPE_PATHS: &[&str] = &[
    "/plan_type",
    "/planType",
    "/chatgpt_plan_type",
    "/chatgptPlanType",
    "/https:~1~1api.openai.com~1auth/chatgpt_plan_type",
];

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*)\)").expect("parenthesized group pattern"));

pub fn antigravity_project_id(raw: &Value) -> Option<String> {
    first_string(raw, ANTIGRAVITY_PROJECT_PATHS)
}

/// Project id from an `account` label such as `"me@example.com (my-project)"`.
pub fn gemini_cli_project_id(raw: &Value) -> Option<String> {
    let account = raw.get("account")?.as_str()?;
    PARENTHESIZED
        .captures_iter(account)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|group| group.as_str().trim())
        .filter(|project| !project.is_empty())
        .map(ToOwned::to_owned)
}

pub fn codex_account_id_from_id_token(id_token: &Value) -> Option<String> {
    let claims = id_token_claims(id_token)?;
    first_string(&claims, ACCOUNT_ID_PATHS)
}

/// Looks at the id tokens the listing already carries: the file's own,
/// then `metadata.id_token`, then `attributes.id_token`.
pub fn codex_account_id_from_descriptor(file: &CredentialFileDescriptor) -> Option<String> {
    let nested = |key: &str| file.field(key).and_then(|value| value.get("id_token"));

    [file.field("id_token"), nested("metadata"), nested("attributes")]
        .into_iter()
        .flatten()
        .find_map(codex_account_id_from_id_token)
}

pub fn codex_account_id_from_raw(raw: &Value) -> Option<String> {
    raw.get("id_token")
        .and_then(codex_account_id_from_id_token)
}

/// Plan type from the file body, its id token, `metadata` (and the token
/// nested in it), then `attributes`. Lower-cased.
pub fn codex_plan_type(file: &Value) -> Option<String> {
    let claims = |holder: Option<&Value>| {
        holder
            .and_then(|holder| holder.get("id_token"))
            .and_then(id_token_claims)
    };
    let metadata = file.get("metadata");

    let candidates = [
        Some(file.clone()),
        claims(Some(file)),
        metadata.cloned(),
        claims(metadata),
        file.get("attributes").cloned(),
    ];

    candidates
        .iter()
        .flatten()
        .find_map(|candidate| first_string(candidate, PLAN_TYPE_PATHS))
        .map(|plan| plan.to_lowercase())
}
