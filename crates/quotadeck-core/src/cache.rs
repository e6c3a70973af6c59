use crate::{ProviderType, QuotaResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const SUCCESS_TTL_SECS: i64 = 5 * 60;
pub const ERROR_TTL_SECS: i64 = 60;
/// A loading entry older than this was abandoned and may be fetched again.
pub const LOADING_STALE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub status: CacheStatus,
    #[serde(rename = "type")]
    pub provider: Option<ProviderType>,
    pub data: Option<QuotaResult>,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let ttl = match self.status {
            CacheStatus::Loading => return false,
            CacheStatus::Success => SUCCESS_TTL_SECS,
            CacheStatus::Error => ERROR_TTL_SECS,
        };
        now.signed_duration_since(self.updated_at) < Duration::seconds(ttl)
    }
}

/// Quota results keyed by auth-file name.
#[derive(Debug, Default)]
pub struct QuotaCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl QuotaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the previous data (if any) so a reload can still show it.
    pub fn mark_loading(&mut self, key: &str, provider: Option<ProviderType>, now: DateTime<Utc>) {
        let previous = self.entries.remove(key);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                status: CacheStatus::Loading,
                provider: provider.or_else(|| previous.as_ref().and_then(|entry| entry.provider)),
                data: previous.and_then(|entry| entry.data),
                error: None,
                status_code: None,
                updated_at: now,
            },
        );
    }

    pub fn record_success(&mut self, key: &str, result: QuotaResult, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                status: CacheStatus::Success,
                provider: Some(result.provider()),
                data: Some(result),
                error: None,
                status_code: None,
                updated_at: now,
            },
        );
    }

    pub fn record_error(
        &mut self,
        key: &str,
        provider: Option<ProviderType>,
        message: impl Into<String>,
        status_code: Option<u16>,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                status: CacheStatus::Error,
                provider,
                data: None,
                error: Some(message.into()),
                status_code,
                updated_at: now,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn fresh(&self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| entry.is_fresh_at(now))
    }

    /// In-flight entries are not refreshed a second time until they go stale.
    pub fn needs_refresh(&self, key: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.status == CacheStatus::Loading => {
                now.signed_duration_since(entry.updated_at)
                    >= Duration::seconds(LOADING_STALE_SECS)
            }
            Some(entry) => !entry.is_fresh_at(now),
            None => true,
        }
    }

    /// Drops entries for files missing from the current listing; returns how many.
    pub fn prune<'a>(&mut self, present: impl IntoIterator<Item = &'a str>) -> usize {
        let present = present.into_iter().collect::<HashSet<_>>();
        let before = self.entries.len();
        self.entries.retain(|key, _| present.contains(key.as_str()));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
