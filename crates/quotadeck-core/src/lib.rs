mod antigravity;
mod cache;
mod codex;
mod fields;
mod gemini_cli;
mod introspection;
mod jwt;
mod report;

pub use antigravity::{
    parse_antigravity_groups, AntigravityQuotaGroup, ANTIGRAVITY_QUOTA_GROUPS,
};
pub use cache::{
    CacheEntry, CacheStatus, QuotaCache, ERROR_TTL_SECS, LOADING_STALE_SECS, SUCCESS_TTL_SECS,
};
pub use codex::{parse_codex_usage, FIVE_HOUR_WINDOW_SECONDS, WEEKLY_WINDOW_SECONDS};
pub use fields::{first_number, first_string, first_value, parse_fraction, to_f64};
pub use gemini_cli::parse_gemini_cli_buckets;
pub use introspection::{
    antigravity_project_id, codex_account_id_from_descriptor, codex_account_id_from_id_token,
    codex_account_id_from_raw, codex_plan_type, gemini_cli_project_id,
    DEFAULT_ANTIGRAVITY_PROJECT,
};
pub use jwt::decode_jwt_claims;
pub use report::{now_iso8601, QuotaReport, ReportEntry};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    Antigravity,
    GeminiCli,
    Codex,
}

impl ProviderType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "antigravity" => Some(Self::Antigravity),
            "gemini-cli" => Some(Self::GeminiCli),
            "codex" => Some(Self::Codex),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Antigravity => "antigravity",
            Self::GeminiCli => "gemini-cli",
            Self::Codex => "codex",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored credential file as returned by the auth-file listing.
///
/// Everything besides the name, type tag and auth index is kept verbatim in
/// `fields` (`id_token`, `metadata`, `attributes`, `plan_type`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawCredentialFileDescriptor")]
pub struct CredentialFileDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_index: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawCredentialFileDescriptor {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    file_type: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<RawCredentialFileDescriptor> for CredentialFileDescriptor {
    fn from(raw: RawCredentialFileDescriptor) -> Self {
        let mut fields = raw.fields;
        let snake = fields.remove("auth_index");
        let camel = fields.remove("authIndex");
        let auth_index = snake.iter().chain(camel.iter()).find_map(auth_index_from_value);

        Self {
            name: raw.name,
            file_type: raw.file_type,
            auth_index,
            fields,
        }
    }
}

impl CredentialFileDescriptor {
    pub fn new(name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_type: file_type.into(),
            ..Self::default()
        }
    }

    pub fn with_auth_index(mut self, auth_index: impl Into<String>) -> Self {
        self.auth_index = Some(auth_index.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn auth_index(&self) -> Option<&str> {
        self.auth_index
            .as_deref()
            .map(str::trim)
            .filter(|index| !index.is_empty())
    }

    pub fn provider_type(&self) -> Option<ProviderType> {
        ProviderType::from_tag(&self.file_type)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    /// The descriptor's extra fields as a JSON object, for path lookups.
    pub fn fields_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

fn auth_index_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(index) if !index.trim().is_empty() => Some(index.clone()),
        Value::Number(index) => Some(index.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResetTime {
    Epoch(i64),
    Text(String),
}

impl ResetTime {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(Self::Text(text.to_string()))
                }
            }
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|seconds| seconds as i64))
                .map(Self::Epoch),
            _ => None,
        }
    }
}

impl fmt::Display for ResetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch(seconds) => match DateTime::from_timestamp(*seconds, 0) {
                Some(timestamp) => write!(f, "{}", timestamp.to_rfc3339()),
                None => write!(f, "unix:{seconds}"),
            },
            Self::Text(text) => f.write_str(text),
        }
    }
}

pub const QUOTA_TOTAL: f64 = 100.0;

/// Provider-independent quota line.
///
/// `percent` and `remaining` always carry the same value; `used` is
/// `100 - percent`. A `None` percent means the provider did not say, and
/// must not be read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuotaItem {
    pub label: String,
    pub percent: Option<f64>,
    pub remaining: Option<f64>,
    pub used: Option<f64>,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<ResetTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hide_in_table: bool,
}

impl NormalizedQuotaItem {
    pub fn from_remaining(label: impl Into<String>, remaining_percent: Option<f64>) -> Self {
        let percent = remaining_percent
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, QUOTA_TOTAL));

        Self {
            label: label.into(),
            percent,
            remaining: percent,
            used: percent.map(|value| QUOTA_TOTAL - value),
            total: QUOTA_TOTAL,
            reset_time: None,
            token_type: None,
            hide_in_table: false,
        }
    }

    pub fn from_used(label: impl Into<String>, used_percent: Option<f64>) -> Self {
        Self::from_remaining(
            label,
            used_percent.map(|used| (QUOTA_TOTAL - used).max(0.0)),
        )
    }

    pub fn with_reset_time(mut self, reset_time: Option<ResetTime>) -> Self {
        self.reset_time = reset_time;
        self
    }

    pub fn with_token_type(mut self, token_type: Option<String>) -> Self {
        self.token_type = token_type;
        self
    }

    pub fn hidden_in_table(mut self, hidden: bool) -> Self {
        self.hide_in_table = hidden;
        self
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AntigravityQuota {
    pub groups: Vec<NormalizedQuotaItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiCliQuota {
    pub buckets: Vec<NormalizedQuotaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodexQuota {
    pub plan_type: String,
    pub limits: Vec<NormalizedQuotaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum QuotaResult {
    Antigravity(AntigravityQuota),
    GeminiCli(GeminiCliQuota),
    Codex(CodexQuota),
}

impl QuotaResult {
    pub fn provider(&self) -> ProviderType {
        match self {
            Self::Antigravity(_) => ProviderType::Antigravity,
            Self::GeminiCli(_) => ProviderType::GeminiCli,
            Self::Codex(_) => ProviderType::Codex,
        }
    }

    pub fn items(&self) -> &[NormalizedQuotaItem] {
        match self {
            Self::Antigravity(quota) => &quota.groups,
            Self::GeminiCli(quota) => &quota.buckets,
            Self::Codex(quota) => &quota.limits,
        }
    }

    pub fn table_items(&self) -> impl Iterator<Item = &NormalizedQuotaItem> {
        self.items().iter().filter(|item| !item.hide_in_table)
    }

    /// Hidden items count here: a file with only a hidden group still has quota.
    pub fn has_any_quota(&self) -> bool {
        self.items().iter().any(|item| item.percent.is_some())
    }

    pub fn lowest_percent(&self) -> Option<f64> {
        self.table_items()
            .filter_map(|item| item.percent)
            .reduce(f64::min)
    }

    pub fn plan_type(&self) -> Option<&str> {
        match self {
            Self::Codex(quota) => Some(quota.plan_type.as_str()),
            _ => None,
        }
    }
}
