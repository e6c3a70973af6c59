use crate::error::QuotaError;
use crate::management::{ApiCallPayload, ManagementApi};
use quotadeck_core::first_value;
use serde_json::Value;
use std::collections::BTreeMap;

/// Swapped for the stored secret by the management service before dispatch.
pub const TOKEN_PLACEHOLDER: &str = "Bearer $TOKEN$";

const STATUS_CODE_PATHS: &[&str] = &["/status_code", "/statusCode"];
const HEADER_PATHS: &[&str] = &["/header", "/headers"];

#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedCallRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl ProxiedCallRequest {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn with_headers(self, headers: &[(&str, &str)]) -> Self {
        headers
            .iter()
            .fold(self, |request, (name, value)| request.with_header(name, *value))
    }

    pub fn with_json_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    fn into_payload(self, auth_index: &str) -> ApiCallPayload {
        ApiCallPayload {
            auth_index: auth_index.to_string(),
            method: self.method,
            url: self.url,
            header: self.headers,
            data: self.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedCallResponse {
    pub status_code: u16,
    pub headers: Value,
    pub body_text: String,
    /// Parsed JSON, the raw string when it does not parse, `Null` when empty.
    pub body: Value,
}

impl ProxiedCallResponse {
    pub fn from_envelope(envelope: &Value) -> Self {
        let status_code = first_value(envelope, STATUS_CODE_PATHS)
            .and_then(|status| match status {
                Value::Number(number) => number.as_u64(),
                Value::String(text) => text.trim().parse::<u64>().ok(),
                _ => None,
            })
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(0);

        let headers = first_value(envelope, HEADER_PATHS)
            .cloned()
            .unwrap_or(Value::Null);

        let (body_text, body) = match envelope.get("body") {
            Some(Value::String(text)) if text.trim().is_empty() => (text.clone(), Value::Null),
            Some(Value::String(text)) => {
                let parsed = serde_json::from_str::<Value>(text)
                    .unwrap_or_else(|_| Value::String(text.clone()));
                (text.clone(), parsed)
            }
            Some(Value::Null) | None => (String::new(), Value::Null),
            Some(structured) => (structured.to_string(), structured.clone()),
        };

        Self {
            status_code,
            headers,
            body_text,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Any completed round trip is `Ok`, whatever the upstream status; callers
/// decide what a non-2xx answer means. Only transport failures are `Err`.
pub async fn proxied_call(
    api: &dyn ManagementApi,
    auth_index: &str,
    request: ProxiedCallRequest,
) -> Result<ProxiedCallResponse, QuotaError> {
    let envelope = api.api_call(&request.into_payload(auth_index)).await?;
    Ok(ProxiedCallResponse::from_envelope(&envelope))
}

/// Describes a non-2xx upstream answer as `HTTP <status> <code>: <message>`
/// when the body carries `{"error": {"code", "message"}}`, else the body
/// text, else just `HTTP <status>`.
pub fn non_2xx_error(response: &ProxiedCallResponse) -> QuotaError {
    let status = response.status_code;

    let structured = response
        .body
        .get("error")
        .filter(|error| error.is_object())
        .and_then(|error| {
            let code = error.get("code").and_then(|code| match code {
                Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            });
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|message| !message.is_empty());

            if code.is_none() && message.is_none() {
                return None;
            }

            let mut text = format!("HTTP {status}");
            if let Some(code) = code {
                text.push(' ');
                text.push_str(&code);
            }
            if let Some(message) = message {
                text.push_str(": ");
                text.push_str(message);
            }
            Some(text)
        });

    let message = structured.unwrap_or_else(|| {
        let text = response.body_text.trim();
        if text.is_empty() {
            format!("HTTP {status}")
        } else {
            text.to_string()
        }
    });

    QuotaError::Upstream { status, message }
}
