use crate::{CacheStatus, ProviderType, QuotaCache, QuotaResult};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaReport {
    pub generated_at: String,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub provider: Option<ProviderType>,
    pub status: CacheStatus,
    pub quota: Option<QuotaResult>,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub updated_at: String,
}

impl QuotaReport {
    pub fn from_cache(cache: &QuotaCache) -> Self {
        let entries = cache
            .iter()
            .map(|(name, entry)| ReportEntry {
                name: name.to_string(),
                provider: entry.provider,
                status: entry.status,
                quota: entry.data.clone(),
                error: entry.error.clone(),
                status_code: entry.status_code,
                updated_at: entry.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .collect();

        Self {
            generated_at: now_iso8601(),
            entries,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status == CacheStatus::Error)
    }
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
