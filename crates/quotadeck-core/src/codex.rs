use crate::fields::{first_number, first_string, first_value};
use crate::{CodexQuota, NormalizedQuotaItem, ResetTime};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const FIVE_HOUR_WINDOW_SECONDS: f64 = 18_000.0;
pub const WEEKLY_WINDOW_SECONDS: f64 = 604_800.0;

const UNKNOWN_PLAN: &str = "unknown";

const PLAN_TYPE_PATHS: &[&str] = &["/plan_type", "/planType"];
const WINDOW_PATHS: [&[&str]; 2] = [
    &["/primary_window", "/primaryWindow"],
    &["/secondary_window", "/secondaryWindow"],
];
const WINDOW_SECONDS_PATHS: &[&str] = &["/limit_window_seconds", "/limitWindowSeconds"];
const USED_PERCENT_PATHS: &[&str] = &["/used_percent", "/usedPercent"];
const LIMIT_REACHED_PATHS: &[&str] = &["/limit_reached", "/limitReached"];
const ALLOWED_PATHS: &[&str] = &["/allowed"];
const RESET_AT_PATHS: &[&str] = &["/reset_at", "/resetAt"];
const RESET_AFTER_PATHS: &[&str] = &["/reset_after_seconds", "/resetAfterSeconds"];

struct LimitKind {
    paths: &'static [&'static str],
    five_hour: &'static str,
    weekly: &'static str,
    extra_prefix: &'static str,
}

const LIMIT_KINDS: [LimitKind; 2] = [
    LimitKind {
        paths: &["/rate_limit", "/rateLimit"],
        five_hour: "5h",
        weekly: "Weekly",
        extra_prefix: "Window",
    },
    LimitKind {
        paths: &["/code_review_rate_limit", "/codeReviewRateLimit"],
        five_hour: "Review 5h",
        weekly: "Review Weekly",
        extra_prefix: "Review",
    },
];

/// A window seen in a limit object, with its 1-based position.
struct Window<'a> {
    position: usize,
    value: &'a Value,
}

fn flag(value: &Value, paths: &[&str]) -> Option<bool> {
    first_value(value, paths).and_then(Value::as_bool)
}

/// Used percent, or 100 when the limit says it is spent. `None` when neither
/// the window nor its limit tells.
fn used_percent(window: &Value, limit: &Value) -> Option<f64> {
    if let Some(used) = first_value(window, USED_PERCENT_PATHS).and_then(Value::as_f64) {
        return Some(used);
    }

    let exhausted = [window, limit].iter().any(|holder| {
        flag(holder, LIMIT_REACHED_PATHS) == Some(true) || flag(holder, ALLOWED_PATHS) == Some(false)
    });
    exhausted.then_some(100.0)
}

fn reset_time(window: &Value, now: DateTime<Utc>) -> Option<ResetTime> {
    if let Some(reset_at) = first_number(window, RESET_AT_PATHS) {
        return Some(ResetTime::Epoch(reset_at as i64));
    }

    first_number(window, RESET_AFTER_PATHS)
        .map(|after| ResetTime::Epoch(now.timestamp() + after as i64))
}

fn normalize_window(
    label: String,
    window: &Window<'_>,
    limit: &Value,
    now: DateTime<Utc>,
) -> NormalizedQuotaItem {
    NormalizedQuotaItem::from_used(label, used_percent(window.value, limit))
        .with_reset_time(reset_time(window.value, now))
}

/// Items for one limit object; `None` when the limit is absent.
///
/// Windows are placed by `limit_window_seconds`. Only when no window could be
/// placed that way are the unplaced ones assigned by position (first to 5h,
/// second to weekly). Anything still unplaced keeps a positional label.
fn try_normalize_limit(
    limit: &Value,
    kind: &LimitKind,
    now: DateTime<Utc>,
) -> Option<Vec<NormalizedQuotaItem>> {
    if !limit.is_object() {
        return None;
    }

    let windows = WINDOW_PATHS
        .iter()
        .enumerate()
        .filter_map(|(index, paths)| {
            first_value(limit, paths)
                .filter(|value| value.is_object())
                .map(|value| Window {
                    position: index + 1,
                    value,
                })
        })
        .collect::<Vec<_>>();

    let mut five_hour = None;
    let mut weekly = None;
    let mut unmatched = Vec::new();

    for window in windows {
        let seconds = first_number(window.value, WINDOW_SECONDS_PATHS);
        match seconds {
            Some(seconds) if seconds == FIVE_HOUR_WINDOW_SECONDS && five_hour.is_none() => {
                five_hour = Some(window)
            }
            Some(seconds) if seconds == WEEKLY_WINDOW_SECONDS && weekly.is_none() => {
                weekly = Some(window)
            }
            _ => unmatched.push(window),
        }
    }

    if five_hour.is_none() && weekly.is_none() {
        let mut positional = std::mem::take(&mut unmatched).into_iter();
        five_hour = positional.next();
        weekly = positional.next();
        unmatched = positional.collect();
    }

    let mut items = Vec::new();
    if let Some(window) = five_hour {
        items.push(normalize_window(kind.five_hour.to_string(), &window, limit, now));
    }
    if let Some(window) = weekly {
        items.push(normalize_window(kind.weekly.to_string(), &window, limit, now));
    }
    for window in unmatched {
        let label = format!("{} {}", kind.extra_prefix, window.position);
        items.push(normalize_window(label, &window, limit, now));
    }

    Some(items)
}

/// Normalizes a usage response. The response's own plan type wins over
/// `fallback_plan`, which comes from the credential file.
pub fn parse_codex_usage(body: &Value, fallback_plan: Option<&str>, now: DateTime<Utc>) -> CodexQuota {
    let plan_type = first_string(body, PLAN_TYPE_PATHS)
        .or_else(|| fallback_plan.map(ToOwned::to_owned))
        .unwrap_or_else(|| UNKNOWN_PLAN.to_string());

    let limits = LIMIT_KINDS
        .iter()
        .filter_map(|kind| {
            first_value(body, kind.paths).and_then(|limit| try_normalize_limit(limit, kind, now))
        })
        .flatten()
        .collect();

    CodexQuota { plan_type, limits }
}
