use quotadeck_core::DEFAULT_ANTIGRAVITY_PROJECT;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8317";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub management_key: Option<String>,
    pub timeout: Duration,
    /// Project sent to Antigravity when the credential file names none.
    pub antigravity_default_project: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            management_key: None,
            timeout: DEFAULT_TIMEOUT,
            antigravity_default_project: DEFAULT_ANTIGRAVITY_PROJECT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_management_key(mut self, key: Option<String>) -> Self {
        self.management_key = key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_antigravity_default_project(mut self, project: impl Into<String>) -> Self {
        self.antigravity_default_project = project.into();
        self
    }

    pub fn management_url(&self, path: &str) -> String {
        format!(
            "{}/v0/management/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
