use crate::fetcher::QuotaFetcher;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use quotadeck_core::{CredentialFileDescriptor, QuotaCache};
use tracing::{debug, warn};

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pruned: usize,
}

/// Refreshes quota for every quota-capable file in `files` whose cache entry
/// has expired, with at most `concurrency` fetches in flight.
///
/// Per-file failures land in the cache as error entries; this never fails as
/// a whole. Cache entries for files absent from `files` are dropped first.
pub async fn refresh_quotas(
    fetcher: &QuotaFetcher,
    cache: &mut QuotaCache,
    files: &[CredentialFileDescriptor],
    concurrency: usize,
) -> RefreshSummary {
    let mut summary = RefreshSummary {
        pruned: cache.prune(files.iter().map(|file| file.name.as_str())),
        ..RefreshSummary::default()
    };

    let now = Utc::now();
    let mut pending = Vec::new();
    for file in files.iter().filter(|file| file.provider_type().is_some()) {
        if cache.needs_refresh(&file.name, now) {
            cache.mark_loading(&file.name, file.provider_type(), now);
            pending.push(file);
        } else {
            summary.skipped += 1;
        }
    }

    debug!(
        "refreshing {} quota entries ({} still fresh)",
        pending.len(),
        summary.skipped
    );

    let mut outcomes = stream::iter(pending)
        .map(|file| async move { (file, fetcher.fetch_quota_by_type(file).await) })
        .buffer_unordered(concurrency.max(1));

    while let Some((file, outcome)) = outcomes.next().await {
        match outcome {
            Ok(result) => {
                cache.record_success(&file.name, result, Utc::now());
                summary.refreshed += 1;
            }
            Err(error) => {
                warn!("quota fetch for {} failed: {error}", file.name);
                cache.record_error(
                    &file.name,
                    file.provider_type(),
                    error.to_string(),
                    error.status_code(),
                    Utc::now(),
                );
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::QuotaError;
    use crate::testing::ScriptedApi;
    use quotadeck_core::CacheStatus;
    use serde_json::json;
    use std::sync::Arc;

    fn listing() -> Vec<CredentialFileDescriptor> {
        vec![
            CredentialFileDescriptor::new("ok.json", "gemini-cli").with_auth_index("1"),
            CredentialFileDescriptor::new("denied.json", "gemini-cli").with_auth_index("2"),
            CredentialFileDescriptor::new("claude.json", "claude").with_auth_index("3"),
            CredentialFileDescriptor::new("no-index.json", "codex"),
        ]
    }

    fn routed_api() -> ScriptedApi {
        ScriptedApi::new().route(|payload| match payload.auth_index.as_str() {
            "1" => Ok(json!({
                "status_code": 200,
                "body": r#"{"buckets":[{"modelId":"gemini-2.5-pro","remainingFraction":0.5}]}"#
            })),
            _ => Ok(json!({"status_code": 403, "body": "forbidden"})),
        })
    }

    #[tokio::test]
    async fn records_successes_and_failures() {
        let api = Arc::new(routed_api());
        let fetcher = QuotaFetcher::new(api.clone(), &ClientConfig::default());
        let mut cache = QuotaCache::new();

        let summary = refresh_quotas(&fetcher, &mut cache, &listing(), 2).await;

        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.failed, 2);
        assert!(cache.get("claude.json").is_none());

        let ok = cache.get("ok.json").unwrap();
        assert_eq!(ok.status, CacheStatus::Success);
        assert_eq!(ok.data.as_ref().unwrap().items()[0].percent, Some(50.0));

        let denied = cache.get("denied.json").unwrap();
        assert_eq!(denied.status, CacheStatus::Error);
        assert_eq!(denied.status_code, Some(403));
        assert_eq!(denied.error.as_deref(), Some("forbidden"));

        let missing = cache.get("no-index.json").unwrap();
        assert_eq!(
            missing.error.as_deref(),
            Some(QuotaError::MissingAuthIndex.to_string().as_str())
        );
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn fresh_entries_are_skipped_and_stale_files_pruned() {
        let api = Arc::new(routed_api());
        let fetcher = QuotaFetcher::new(api.clone(), &ClientConfig::default());
        let mut cache = QuotaCache::new();

        refresh_quotas(&fetcher, &mut cache, &listing(), 4).await;
        let calls_after_first = api.calls().len();

        let shrunk = listing().into_iter().take(1).collect::<Vec<_>>();
        let summary = refresh_quotas(&fetcher, &mut cache, &shrunk, 4).await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.refreshed, 0);
        assert_eq!(summary.pruned, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(api.calls().len(), calls_after_first);
    }
}
