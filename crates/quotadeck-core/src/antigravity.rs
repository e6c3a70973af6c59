use crate::fields::{first_string, first_value, fraction_to_percent, parse_fraction};
use crate::{AntigravityQuota, NormalizedQuotaItem, ResetTime};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntigravityQuotaGroup {
    pub id: &'static str,
    pub label: &'static str,
    pub model_ids: &'static [&'static str],
    pub hide_in_table: bool,
}

pub const ANTIGRAVITY_QUOTA_GROUPS: [AntigravityQuotaGroup; 8] = [
    AntigravityQuotaGroup {
        id: "claude-gpt",
        label: "Claude/GPT",
        model_ids: &[
            "claude-sonnet-4-5",
            "claude-sonnet-4-5-thinking",
            "claude-opus-4-5-thinking",
            "gpt-oss-120b-medium",
        ],
        hide_in_table: false,
    },
    AntigravityQuotaGroup {
        id: "gemini-3-pro",
        label: "Gemini 3 Pro",
        model_ids: &["gemini-3-pro-high", "gemini-3-pro-low"],
        hide_in_table: false,
    },
    AntigravityQuotaGroup {
        id: "gemini-3-pro-image",
        label: "Gemini 3 Pro Image",
        model_ids: &["gemini-3-pro-image"],
        hide_in_table: false,
    },
    AntigravityQuotaGroup {
        id: "gemini-3-flash",
        label: "Gemini 3 Flash",
        model_ids: &["gemini-3-flash"],
        hide_in_table: false,
    },
    AntigravityQuotaGroup {
        id: "gemini-2-5-pro",
        label: "Gemini 2.5 Pro",
        model_ids: &["gemini-2.5-pro"],
        hide_in_table: false,
    },
    AntigravityQuotaGroup {
        id: "gemini-2-5-flash",
        label: "Gemini 2.5 Flash",
        model_ids: &["gemini-2.5-flash", "gemini-2.5-flash-thinking"],
        hide_in_table: false,
    },
    AntigravityQuotaGroup {
        id: "gemini-2-5-flash-lite",
        label: "Gemini 2.5 Flash Lite",
        model_ids: &["gemini-2.5-flash-lite"],
        hide_in_table: true,
    },
    AntigravityQuotaGroup {
        id: "gemini-2-5-computer-use",
        label: "Gemini 2.5 Computer Use",
        model_ids: &["rev19-uic3-1p"],
        hide_in_table: false,
    },
];

const QUOTA_INFO_PATHS: &[&str] = &["/quotaInfo", "/quota_info"];
const REMAINING_FRACTION_PATHS: &[&str] =
    &["/remainingFraction", "/remaining_fraction", "/remaining"];
const RESET_TIME_PATHS: &[&str] = &["/resetTime", "/reset_time"];
const DISPLAY_NAME_PATHS: &[&str] = &["/displayName", "/display_name"];

struct ModelQuota {
    fraction: f64,
    reset_time: Option<ResetTime>,
}

/// `None` drops the model: no fraction could be read and no reset time
/// hints that it is exhausted.
fn try_normalize_model(model: &Value) -> Option<ModelQuota> {
    let quota_info = first_value(model, QUOTA_INFO_PATHS)?;
    let reset_time = first_value(quota_info, RESET_TIME_PATHS).and_then(ResetTime::from_value);
    let fraction = first_value(quota_info, REMAINING_FRACTION_PATHS)
        .and_then(parse_fraction)
        .or_else(|| reset_time.as_ref().map(|_| 0.0))?;

    Some(ModelQuota {
        fraction,
        reset_time,
    })
}

fn matched_models<'a>(
    group: &AntigravityQuotaGroup,
    models: &'a Map<String, Value>,
) -> Vec<&'a Value> {
    let mut keys: Vec<&'a str> = Vec::new();

    for alias in group.model_ids {
        let matched = models.contains_key(*alias).then_some(*alias).or_else(|| {
            models.iter().find_map(|(key, model)| {
                first_string(model, DISPLAY_NAME_PATHS)
                    .filter(|name| name.eq_ignore_ascii_case(alias))
                    .map(|_| key.as_str())
            })
        });

        if let Some(key) = matched {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    keys.into_iter().filter_map(|key| models.get(key)).collect()
}

/// A group reports its most exhausted model.
fn try_normalize_group(
    group: &AntigravityQuotaGroup,
    models: &Map<String, Value>,
) -> Option<NormalizedQuotaItem> {
    let quotas = matched_models(group, models)
        .into_iter()
        .filter_map(try_normalize_model)
        .collect::<Vec<_>>();

    let fraction = quotas.iter().map(|quota| quota.fraction).reduce(f64::min)?;
    let reset_time = quotas.into_iter().find_map(|quota| quota.reset_time);

    Some(
        NormalizedQuotaItem::from_remaining(group.label, Some(fraction_to_percent(fraction)))
            .with_reset_time(reset_time)
            .hidden_in_table(group.hide_in_table),
    )
}

pub fn parse_antigravity_groups(body: &Value, groups: &[AntigravityQuotaGroup]) -> AntigravityQuota {
    let empty = Map::new();
    let models = body
        .get("models")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    AntigravityQuota {
        groups: groups
            .iter()
            .filter_map(|group| try_normalize_group(group, models))
            .collect(),
    }
}
