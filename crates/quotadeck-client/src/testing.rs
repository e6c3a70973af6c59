use crate::error::QuotaError;
use crate::management::{ApiCallPayload, ManagementApi};
use async_trait::async_trait;
use quotadeck_core::CredentialFileDescriptor;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Route = Box<dyn Fn(&ApiCallPayload) -> Result<Value, QuotaError> + Send + Sync>;

/// In-process management API: queued envelopes first, then `route`.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    responses: Mutex<VecDeque<Result<Value, QuotaError>>>,
    route: Option<Route>,
    files: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<ApiCallPayload>>,
    downloads: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, status: u16, body: Value) -> Self {
        let body = match body {
            Value::String(text) => Value::String(text),
            other => Value::String(other.to_string()),
        };
        self.push(Ok(json!({"status_code": status, "header": {}, "body": body})))
    }

    pub(crate) fn fail(self, error: QuotaError) -> Self {
        self.push(Err(error))
    }

    fn push(self, outcome: Result<Value, QuotaError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(outcome);
        self
    }

    pub(crate) fn route(
        mut self,
        route: impl Fn(&ApiCallPayload) -> Result<Value, QuotaError> + Send + Sync + 'static,
    ) -> Self {
        self.route = Some(Box::new(route));
        self
    }

    pub(crate) fn with_file(mut self, name: &str, body: Value) -> Self {
        self.files
            .insert(name.to_string(), body.to_string().into_bytes());
        self
    }

    pub(crate) fn with_raw_file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.files.insert(name.to_string(), bytes.to_vec());
        self
    }

    pub(crate) fn calls(&self) -> Vec<ApiCallPayload> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManagementApi for ScriptedApi {
    async fn api_call(&self, payload: &ApiCallPayload) -> Result<Value, QuotaError> {
        self.calls.lock().unwrap().push(payload.clone());

        let queued = self.responses.lock().unwrap().pop_front();
        match (queued, &self.route) {
            (Some(outcome), _) => outcome,
            (None, Some(route)) => route(payload),
            (None, None) => Err(QuotaError::Transport("no scripted response".to_string())),
        }
    }

    async fn download_auth_file(&self, name: &str) -> Result<Vec<u8>, QuotaError> {
        self.downloads.lock().unwrap().push(name.to_string());
        self.files.get(name).cloned().ok_or(QuotaError::Management {
            status: 404,
            message: "file not found".to_string(),
        })
    }

    async fn list_auth_files(&self) -> Result<Vec<CredentialFileDescriptor>, QuotaError> {
        Ok(Vec::new())
    }
}
