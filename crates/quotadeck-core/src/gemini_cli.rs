use crate::fields::{first_number, first_string, first_value, fraction_to_percent, parse_fraction};
use crate::{GeminiCliQuota, NormalizedQuotaItem, ResetTime};
use serde_json::Value;

const VERTEX_SUFFIX: &str = "_vertex";

const MODEL_ID_PATHS: &[&str] = &["/modelId", "/model_id"];
const REMAINING_FRACTION_PATHS: &[&str] = &["/remainingFraction", "/remaining_fraction"];
const REMAINING_AMOUNT_PATHS: &[&str] = &["/remainingAmount", "/remaining_amount"];
const RESET_TIME_PATHS: &[&str] = &["/resetTime", "/reset_time"];
const TOKEN_TYPE_PATHS: &[&str] = &["/tokenType", "/token_type"];

fn normalize_model_id(model_id: &str) -> &str {
    model_id.strip_suffix(VERTEX_SUFFIX).unwrap_or(model_id)
}

fn fallback_fraction(bucket: &Value, reset_time: Option<&ResetTime>) -> Option<f64> {
    match first_number(bucket, REMAINING_AMOUNT_PATHS) {
        Some(amount) if amount <= 0.0 => Some(0.0),
        Some(_) => None,
        None => reset_time.map(|_| 0.0),
    }
}

fn try_normalize_bucket(bucket: &Value) -> Option<NormalizedQuotaItem> {
    let model_id = first_string(bucket, MODEL_ID_PATHS)?;
    let model_id = normalize_model_id(&model_id);
    if model_id.is_empty() {
        return None;
    }

    let reset_time = first_value(bucket, RESET_TIME_PATHS).and_then(ResetTime::from_value);
    let fraction = first_value(bucket, REMAINING_FRACTION_PATHS)
        .and_then(parse_fraction)
        .or_else(|| fallback_fraction(bucket, reset_time.as_ref()))?;

    Some(
        NormalizedQuotaItem::from_remaining(model_id, Some(fraction_to_percent(fraction)))
            .with_reset_time(reset_time)
            .with_token_type(first_string(bucket, TOKEN_TYPE_PATHS)),
    )
}

pub fn parse_gemini_cli_buckets(body: &Value) -> GeminiCliQuota {
    GeminiCliQuota {
        buckets: body
            .get("buckets")
            .and_then(Value::as_array)
            .map(|buckets| buckets.iter().filter_map(try_normalize_bucket).collect())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_vertex_suffix() {
        let body = json!({
            "buckets": [
                {"modelId": "gemini-pro_vertex", "remainingFraction": 0.75, "tokenType": "REQUESTS"}
            ]
        });

        let quota = parse_gemini_cli_buckets(&body);
        assert_eq!(quota.buckets.len(), 1);
        assert_eq!(quota.buckets[0].label, "gemini-pro");
        assert_eq!(quota.buckets[0].percent, Some(75.0));
        assert_eq!(quota.buckets[0].used, Some(25.0));
        assert_eq!(quota.buckets[0].token_type.as_deref(), Some("REQUESTS"));
    }

    #[test]
    fn remaining_amount_fallbacks() {
        let body = json!({
            "buckets": [
                {"modelId": "exhausted", "remainingAmount": "0"},
                {"modelId": "unknown-amount", "remainingAmount": 12, "resetTime": "2026-01-01T00:00:00Z"},
                {"modelId": "reset-only", "reset_time": "2026-01-01T00:00:00Z"},
                {"modelId": "nothing"},
                {"remainingFraction": 0.5}
            ]
        });

        let quota = parse_gemini_cli_buckets(&body);
        let labels = quota
            .buckets
            .iter()
            .map(|bucket| (bucket.label.as_str(), bucket.percent))
            .collect::<Vec<_>>();

        assert_eq!(
            labels,
            vec![("exhausted", Some(0.0)), ("reset-only", Some(0.0))]
        );
    }

    #[test]
    fn percentage_strings_and_missing_buckets() {
        let quota = parse_gemini_cli_buckets(&json!({
            "buckets": [{"model_id": "gemini-2.5-pro", "remaining_fraction": "12.4%"}]
        }));
        assert_eq!(quota.buckets[0].percent, Some(12.0));

        assert!(parse_gemini_cli_buckets(&json!({})).buckets.is_empty());
    }
}
