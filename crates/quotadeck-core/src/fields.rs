use serde_json::Value;

pub fn first_value<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| value.pointer(path))
        .find(|candidate| !candidate.is_null())
}

pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| value.pointer(path))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(ToOwned::to_owned)
}

pub fn first_number(value: &Value, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .filter_map(|path| value.pointer(path))
        .find_map(to_f64)
}

pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(string_value) => string_value.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

/// Reads a remaining-quota fraction: `"42%"` is 0.42, `0.42` and `"0.42"`
/// are taken as-is.
pub fn parse_fraction(value: &Value) -> Option<f64> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            match raw.strip_suffix('%') {
                Some(percent) => percent
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .map(|percent| percent / 100.0),
                None => raw.parse::<f64>().ok(),
            }
        }
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
    .filter(|fraction| fraction.is_finite())
}

pub(crate) fn fraction_to_percent(fraction: f64) -> f64 {
    (fraction.clamp(0.0, 1.0) * 100.0).round()
}
