use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::errors::{DealerApiError, Result};

pub const DEFAULT_BASE_URL: &str = "http://api.coxauto-interview.com/api/";

/// Settings for talking to the dealer API. Every field has a default so an
/// empty YAML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root of the API; all resource paths are resolved against it.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Upper bound on concurrent fetches during fan-out. `None` means unbounded.
    pub max_in_flight: Option<usize>,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_in_flight: None,
            user_agent: format!("dealer-assign/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // serde_yaml maps an empty document to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| DealerApiError::Config(format!("invalid config file: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DealerApiError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Overlay `DEALER_API_*` environment variables on top of this config.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base_url) = lookup("DEALER_API_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = base_url;
        }
        if let Some(timeout) = lookup("DEALER_API_TIMEOUT_SECS").filter(|v| !v.is_empty()) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                DealerApiError::Config(format!("DEALER_API_TIMEOUT_SECS is not a number: {}", timeout))
            })?;
        }
        if let Some(limit) = lookup("DEALER_API_MAX_IN_FLIGHT").filter(|v| !v.is_empty()) {
            let limit = limit.trim().parse().map_err(|_| {
                DealerApiError::Config(format!("DEALER_API_MAX_IN_FLIGHT is not a number: {}", limit))
            })?;
            self.max_in_flight = Some(limit);
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse the base URL, forcing a trailing slash so relative joins keep
    /// the `/api/` prefix.
    pub fn base(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| DealerApiError::Config(format!("invalid base url '{}': {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DealerApiError::Config(format!(
                "unsupported url scheme '{}'",
                other
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.base()?;
        if self.max_in_flight == Some(0) {
            return Err(DealerApiError::Config(
                "max_in_flight must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(DealerApiError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
